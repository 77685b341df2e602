//! The collaborator boundary: everything here may be `async` and talk to the
//! outside world. The decision core never depends on this module.

pub mod executor;

pub use executor::{ExecutionResult, OrderExecutor, PaperExecutor};
