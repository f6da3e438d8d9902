use jscover::ast::Program;
use jscover::{CoverageDescriptor, Instrumenter, InstrumenterOptions};

/// Instrument with default options and return the code and descriptor
pub fn instrument(source: &str, path: &str) -> (String, CoverageDescriptor) {
    let mut instrumenter = Instrumenter::new(InstrumenterOptions::default());
    let code = instrumenter
        .instrument_sync(source, path, None)
        .unwrap_or_else(|e| panic!("Failed to instrument {}: {}", path, e));
    let coverage = instrumenter
        .last_file_coverage()
        .cloned()
        .unwrap_or_else(|| panic!("Expected coverage for {}", path));
    (code, coverage)
}

/// Parse the way the instrumenter does
pub fn parse(source: &str) -> Program {
    jscover::parser::parse(source, &InstrumenterOptions::default().parse_options())
        .expect("Expected source to parse successfully")
}

/// Assert that recovery finds nothing in `source`
pub fn assert_not_recovered(source: &str) {
    let program = parse(source);
    let recovered = jscover::recovery::read_initial_coverage(&program);
    assert!(
        recovered.is_none(),
        "Expected no coverage to be recovered, got {:?}",
        recovered
    );
}

/// Number of coverage preambles in generated code
pub fn preamble_count(code: &str) -> usize {
    code.matches("__cov__marker").count()
}
