//! This crate provides the backward data-flow resolution engine of the
//! `DroidFlow` project.
//!
//! Starting from an instruction operand at a given program point, the
//! engine walks backward through register definitions, caller arguments
//! and field writes to decide whether the value is a constant, one of a
//! few constants, or of some assumed type. Precision is deliberately
//! bounded (recursion depth, caller hops, graph size) in favor of
//! termination on large or adversarial bytecode.
//!
//! ```rust
//! use df_analysis::{DataFlow, FlowConfig};
//! use df_facts::{load_str, Addr, FactStore};
//!
//! let store = load_str(r#"
//! .method static m()V
//!     const-string v0, "secret"
//!     invoke-static {v0}, Lx;->m(Ljava/lang/String;)V
//! .end method
//! "#)?;
//! let flow = DataFlow::new(&store, FlowConfig::default());
//! let call = store.lookup(Addr(1)).expect("invocation");
//! assert_eq!(flow.solved_constant_data_in_invocation(&call, 0)?, "secret");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codeflow;
pub mod config;
pub mod dataflow;
pub mod errors;
pub mod graph;
pub mod query;
pub mod registers;
pub mod resolver;

pub use config::FlowConfig;
pub use dataflow::{DataFlow, QueryState};
pub use graph::GraphNode;
