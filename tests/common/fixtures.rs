use std::fs;
use std::path::{Path, PathBuf};

/// All fixture names, without extension
pub const FIXTURES: &[&str] = &["basic", "classes", "module"];

/// Load a .js file from tests/fixtures/
pub fn load_fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.js", name))
}
