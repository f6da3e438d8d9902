//! jscover Instrument - Statement, function and branch coverage for JavaScript
//!
//! [`Instrumenter`] parses a file, inserts counter increments and a preamble
//! that registers the file's coverage object on a global variable, and
//! prints the result. Instrumenting already instrumented code leaves it
//! unchanged and recovers the original coverage descriptor instead.
//!
//! ```ignore
//! use jscover_instrument::{Instrumenter, InstrumenterOptions};
//!
//! let mut instrumenter = Instrumenter::new(InstrumenterOptions::default());
//! let code = instrumenter.instrument_sync("foo();", "src/a.js", None)?;
//! let coverage = instrumenter.last_file_coverage();
//! ```

mod coverage;
mod error;
mod instrumenter;
mod options;
mod rewrite;
mod template;
mod visitor;

pub use coverage::{BranchKind, FileCoverage};
pub use error::InstrumentError;
pub use instrumenter::{InstrumentInput, Instrumenter};
pub use options::InstrumenterOptions;
pub use visitor::{
    coverage_function_name, coverage_hash, ProgramVisitor, VisitorOptions, VisitorOutput,
    IGNORE_FILE_HINT,
};

pub use jscover_recovery::CoverageDescriptor;
