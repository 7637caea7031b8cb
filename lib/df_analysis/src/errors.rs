//! Analysis errors definition.

use crate::graph::GraphNode;
use df_facts::Addr;
use std::sync::Arc;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The operand does not denote registers (type, field or method
    /// reference, literal...).
    #[error("operand does not denote registers: {0}")]
    RegisterDecode(String),

    /// The data-flow graph grew beyond the configured budget.
    #[error("graph too large at {addr}: {size} nodes (limit {limit})")]
    GraphSize { addr: Addr, size: usize, limit: usize },

    /// Argument index out of range, or no graph could be built at all.
    #[error("no such value: {0}")]
    NoSuchValue(String),

    /// A graph exists but the targeted register does not resolve to a
    /// constant. The graph is kept for diagnostics.
    #[error("unsolvable value: {reason}")]
    UnsolvableValue {
        reason: String,
        graph: Option<Arc<GraphNode>>,
    },
}

impl AnalysisError {
    /// Checks if the error means that a value could not be established
    /// (as opposed to a misuse or an infrastructure failure).
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::NoSuchValue(_) | Self::UnsolvableValue { .. })
    }
}
