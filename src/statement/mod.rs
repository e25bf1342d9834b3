//! Statement template parsing and execution
//!
//! * Quoted-span scanning (`scan_quoted`)
//! * Procedural block classification (`Classifier`)
//! * Splitting, placeholder substitution, and ordered execution (`StatementExecutor`)

mod classifier;
mod executor;
mod scanner;

pub use classifier::{is_multi_statement, BlockDelimiter, Classifier};
pub use executor::{
    execute_statements, prepare_units, substitute, StatementExecutor, StatementParams,
};
pub use scanner::{scan_quoted, split_outside_quotes, strip_quoted, QuotedSpan};
