//! Fact store errors definitions.

use crate::Addr;
use std::io;
use thiserror::Error;

/// An alias for result that can be a [`FactsError`].
pub type FactsResult<T> = Result<T, FactsError>;

/// The fact store error type.
#[derive(Debug, Error)]
pub enum FactsError {
    /// Error that can be returned when reading listing files.
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Error that can be returned at listing parsing.
    #[error("parsing error at line {line}: {text}")]
    Parsing { line: usize, text: String },

    /// A register spelling that is neither `vN` nor `pN`.
    #[error("invalid register: {0}")]
    InvalidRegister(String),

    /// Error that can be returned from pattern compilation.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("instruction not found (address: {0})")]
    InstructionNotFound(Addr),

    #[error("instruction outside of any method at line {0}")]
    OutsideMethod(usize),
}
