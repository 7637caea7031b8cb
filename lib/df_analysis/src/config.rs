//! Resolution limits.

/// Default maximum number of nodes in one resolution graph.
pub const DEFAULT_MAX_GRAPH_SIZE: usize = 2 << 20;

/// Maximum recursion depth of the graph builder.
pub const DEFAULT_MAX_STAGE: u32 = 64;

/// Maximum number of caller hops when a parameter register is resolved.
pub const DEFAULT_MAX_HOPS: u32 = 5;

/// Limits bounding the cost of one resolution query.
///
/// The configuration is carried by each [`DataFlow`](crate::DataFlow)
/// value rather than being process-wide, so that concurrent queries with
/// different limits never observe each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    pub max_graph_size: usize,
    pub max_stage: u32,
    pub max_hops: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_graph_size: DEFAULT_MAX_GRAPH_SIZE,
            max_stage: DEFAULT_MAX_STAGE,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl FlowConfig {
    #[must_use]
    pub const fn with_max_graph_size(self, max_graph_size: usize) -> Self {
        Self {
            max_graph_size,
            ..self
        }
    }

    #[must_use]
    pub const fn with_max_stage(self, max_stage: u32) -> Self {
        Self { max_stage, ..self }
    }
}
