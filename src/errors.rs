//! Global error handling.
//!
//! Each sub-crate of the project defines its own type error.
//! Their types are unified here, when winding results at the top-level.

use df_analysis::errors::AnalysisError;
use df_facts::errors::FactsError;
use std::io;
use thiserror::Error;

/// An alias for result that can be a [`DfError`].
pub type DfResult<T> = Result<T, DfError>;

/// The main error type for error winding at the top-level.
#[derive(Debug, Error)]
pub enum DfError {
    /// Custom error for reporting bad command line arguments usage.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error(transparent)]
    IO(#[from] io::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error that can be returned from [`df_analysis`] functions.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Error that can be returned from [`df_facts`] functions.
    #[error(transparent)]
    Facts(#[from] FactsError),
}
