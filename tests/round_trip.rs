//! Instrumenting instrumented code leaves it alone and recovers the
//! descriptor the first pass embedded.

mod common;

use common::assertions::{instrument, preamble_count};
use common::fixtures::{load_fixture, FIXTURES};
use jscover::{Instrumenter, InstrumenterOptions};
use pretty_assertions::assert_eq;

#[test]
fn e2e_fixtures_round_trip() {
    for name in FIXTURES {
        let source = load_fixture(name);
        let path = format!("src/{}.js", name);
        let (first, fresh) = instrument(&source, &path);
        assert_eq!(preamble_count(&first), 1, "{}", name);

        let mut instrumenter = Instrumenter::new(InstrumenterOptions::default());
        let second = instrumenter
            .instrument_sync(first.as_str(), &path, None)
            .unwrap_or_else(|e| panic!("Failed to re-instrument {}: {}", name, e));

        assert_eq!(preamble_count(&second), 1, "{} was instrumented twice", name);
        assert_eq!(instrumenter.last_file_coverage(), Some(&fresh), "{}", name);
    }
}

#[test]
fn e2e_round_trip_with_readable_output() {
    let options = InstrumenterOptions {
        compact: false,
        preserve_comments: true,
        ..InstrumenterOptions::default()
    };
    let source = load_fixture("module");

    let mut instrumenter = Instrumenter::new(options.clone());
    let first = instrumenter.instrument_sync(source.as_str(), "module.js", None).unwrap();
    let fresh = instrumenter.last_file_coverage().cloned().unwrap();
    assert!(first.contains('\n'));
    assert!(first.contains("sourceMappingURL=module.js.map"));

    let mut again = Instrumenter::new(options);
    again.instrument_sync(first.as_str(), "module.js", None).unwrap();
    assert_eq!(again.last_file_coverage(), Some(&fresh));
}

#[test]
fn e2e_round_trip_with_custom_global() {
    let options = InstrumenterOptions {
        coverage_variable: "__jscov__".to_string(),
        coverage_global_scope: "window".to_string(),
        coverage_global_scope_func: false,
        ..InstrumenterOptions::default()
    };
    let source = load_fixture("basic");

    let mut instrumenter = Instrumenter::new(options.clone());
    let first = instrumenter.instrument_sync(source.as_str(), "basic.js", None).unwrap();
    let fresh = instrumenter.last_file_coverage().cloned().unwrap();
    assert_eq!(fresh.global_variable_name, "__jscov__");

    // Recovery reads the descriptor from the code, not from the options
    let mut defaults = Instrumenter::new(InstrumenterOptions::default());
    defaults.instrument_sync(first.as_str(), "basic.js", None).unwrap();
    assert_eq!(defaults.last_file_coverage(), Some(&fresh));
}

#[test]
fn e2e_recovered_hash_matches_embedded_hash() {
    let (code, fresh) = instrument(&load_fixture("classes"), "classes.js");
    assert_eq!(fresh.hash.len(), 64);
    assert!(code.contains(&format!("\"{}\"", fresh.hash)));
    assert!(!fresh.coverage_data.contains_key("hash"));
    assert!(!fresh.coverage_data.contains_key(jscover::recovery::MAGIC_KEY));
}

#[test]
fn e2e_different_paths_get_different_functions() {
    let source = load_fixture("basic");
    let (a, _) = instrument(&source, "a.js");
    let (b, _) = instrument(&source, "b.js");
    let a_name = jscover::instrument::coverage_function_name("a.js");
    let b_name = jscover::instrument::coverage_function_name("b.js");
    assert!(a.contains(&a_name) && !a.contains(&b_name));
    assert!(b.contains(&b_name) && !b.contains(&a_name));
}

#[test]
fn e2e_ignore_class_methods_changes_counts() {
    let source = load_fixture("classes");
    let (_, all) = instrument(&source, "classes.js");

    let mut instrumenter = Instrumenter::new(InstrumenterOptions {
        ignore_class_methods: vec!["render".to_string()],
        ..InstrumenterOptions::default()
    });
    instrumenter.instrument_sync(source.as_str(), "classes.js", None).unwrap();
    let ignored = instrumenter.last_file_coverage().unwrap();

    let functions =
        |d: &jscover::CoverageDescriptor| d.coverage_data["f"].as_object().unwrap().len();
    assert_eq!(functions(ignored), functions(&all) - 1);
}
