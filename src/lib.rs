pub use crate::diagnostics::{CheckInfo, Diagnostic, Severity};
pub use crate::errors::RectifyError;

pub mod ast;
pub mod checkers;
pub mod cli;
pub mod config;
pub mod constant;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod fix;
pub mod matchers;
pub mod refaster;
pub mod resolve;
pub mod runner;
pub mod syntax;
