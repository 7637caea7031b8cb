//! # `DroidFlow`
//!
//! `droidflow` is the main crate of the `DroidFlow` project. It loads
//! disassembled Android bytecode listings into an instruction fact store
//! and resolves, for a given call site, which constants or types may flow
//! into its arguments. Detection rules build on these queries, for
//! example to flag a `Cipher.getInstance("DES")` call:
//!
//! ```rust
//! use droidflow::prelude::*;
//!
//! let store = df_facts::load_str(r#"
//! .method static m()V
//!     const-string v0, "DES"
//!     invoke-static {v0}, Ljavax/crypto/Cipher;->getInstance(Ljava/lang/String;)Ljavax/crypto/Cipher;
//! .end method
//! "#)?;
//! let flow = DataFlow::new(&store, FlowConfig::default());
//! for call in store.find(&InstrPattern::new("^invoke-", &["", "Cipher;->getInstance"])?) {
//!     println!("{}", flow.solved_constant_data_in_invocation(&call, 0)?);
//! }
//! # Ok::<(), DfError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`df_facts`] contains the instruction model, the listing parser and
//!    the fact store,
//!  - [`df_analysis`] contains the data-flow resolution engine.

mod errors;

pub mod cli;
pub mod df_find;
pub mod df_graph;
pub mod df_resolve;

pub use df_analysis as analysis;
pub use df_facts as facts;

/// Reexport module of commonly used structures and functions from `DroidFlow`
/// project sub-crates:
///
/// ```rust
/// use droidflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{DfError, DfResult};

    pub use df_analysis::errors::AnalysisError;
    pub use df_analysis::{DataFlow, FlowConfig, GraphNode, QueryState};

    pub use df_facts::{Addr, FactStore, InstrPattern, Instruction, MemoryStore};

    use clap::ArgMatches;

    pub fn init_logger(args: &ArgMatches) {
        let env = env_logger::Env::new()
            .filter_or("DF_LOG", "info")
            .write_style("DF_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if args.get_flag("verbose") {
            builder.filter_level(log::LevelFilter::Trace);
        } else if args.get_flag("debug") {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if args.get_flag("ecslog") {
            builder.format(ecs_logger::format);
        }
        builder.init();
    }

    /// Loads every `--input` listing into one store.
    ///
    /// # Errors
    ///
    /// Returns an error if no input is given or if a listing cannot be
    /// read or parsed.
    pub fn load_inputs(args: &ArgMatches) -> DfResult<MemoryStore> {
        let inputs = args
            .get_many::<String>("input")
            .ok_or_else(|| DfError::BadArguments("--input needed".to_string()))?;
        let mut store = MemoryStore::new();
        for input in inputs {
            store.load_file(input)?;
        }
        log::info!(
            "{} instructions loaded from {} methods",
            store.nb_instructions(),
            store.nb_methods()
        );
        Ok(store)
    }

    /// Builds the resolution limits from command line arguments.
    #[must_use]
    pub fn flow_config(args: &ArgMatches) -> FlowConfig {
        let mut config = FlowConfig::default();
        if let Some(size) = args.get_one::<usize>("max-graph-size") {
            config = config.with_max_graph_size(*size);
        }
        if let Some(stage) = args.get_one::<u32>("max-stage") {
            config = config.with_max_stage(*stage);
        }
        config
    }
}
