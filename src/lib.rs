//! jscover - Coverage instrumentation for JavaScript
//!
//! This is the root workspace crate that provides integration tests.
//! The implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use jscover_ast as ast;
pub use jscover_instrument as instrument;
pub use jscover_parser as parser;
pub use jscover_recovery as recovery;
pub use jscover_scope as scope;

pub use jscover_instrument::{
    CoverageDescriptor, InstrumentError, InstrumentInput, Instrumenter, InstrumenterOptions,
};
