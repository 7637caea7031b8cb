//! Recursive data-flow graph construction.
//!
//! Given an instruction, [`DataFlow::analyze`] explains where the values of
//! its input registers come from, walking backward through definitions,
//! caller arguments and field writes until it reaches constant-producing
//! instructions. Results are memoized per program point for the duration
//! of one top-level query.

use crate::config::FlowConfig;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::graph::{approximate_size, GraphNode, Inputs};
use crate::registers::decode_registers;
use crate::resolver::Resolver;
use df_facts::{Addr, FactStore, Instruction, Operand, Reg};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

// Instructions producing a value without inputs.
const LEAVES: &[&str] = &["const", "new-", "move-exception"];

/// Per-query bookkeeping.
///
/// In the memo, an absent address has never been visited, while an
/// address mapped to `None` has been visited and given up on.
#[derive(Debug, Default)]
pub struct QueryState {
    memo: HashMap<Addr, Option<Arc<GraphNode>>>,
    sizes: HashMap<Addr, usize>,
    truncated: usize,
}

impl QueryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized result for an address, `None` if never visited.
    #[must_use]
    pub fn memoized(&self, addr: Addr) -> Option<&Option<Arc<GraphNode>>> {
        self.memo.get(&addr)
    }

    #[must_use]
    pub fn nb_visited(&self) -> usize {
        self.memo.len()
    }

    /// Number of sub-graphs dropped because of the size budget.
    #[must_use]
    pub const fn nb_truncated(&self) -> usize {
        self.truncated
    }

    fn remember(&mut self, addr: Addr, node: Option<Arc<GraphNode>>) -> Option<Arc<GraphNode>> {
        self.memo.insert(addr, node.clone());
        node
    }
}

/// The graph builder.
pub struct DataFlow<'s, S: ?Sized> {
    store: &'s S,
    config: FlowConfig,
}

impl<'s, S: FactStore + ?Sized> DataFlow<'s, S> {
    pub fn new(store: &'s S, config: FlowConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn store(&self) -> &'s S {
        self.store
    }

    #[must_use]
    pub const fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Runs `f` with a graph builder sharing this one's store but using a
    /// different graph size limit.
    pub fn with_max_graph_size<R, F>(&self, max_graph_size: usize, f: F) -> R
    where
        F: FnOnce(&DataFlow<'s, S>) -> R,
    {
        let scoped = DataFlow {
            store: self.store,
            config: self.config.with_max_graph_size(max_graph_size),
        };
        f(&scoped)
    }

    fn resolver(&self) -> Resolver<'s, S> {
        Resolver::new(self.store, self.config.max_hops)
    }

    /// Builds the graph of `op` with a fresh query state.
    pub fn analyze(&self, op: &Arc<Instruction>) -> Option<Arc<GraphNode>> {
        let mut state = QueryState::new();
        self.analyze_in(op, &mut state)
    }

    /// Builds the graph of `op`, reusing (and filling) the given state.
    pub fn analyze_in(&self, op: &Arc<Instruction>, state: &mut QueryState) -> Option<Arc<GraphNode>> {
        self.analyze_at(Some(op.clone()), state, 0)
    }

    fn analyze_at(
        &self,
        op: Option<Arc<Instruction>>,
        state: &mut QueryState,
        stage: u32,
    ) -> Option<Arc<GraphNode>> {
        let op = op?;
        if stage > self.config.max_stage {
            log::trace!("stage limit reached at {}", op.addr());
            return None;
        }
        if let Some(cached) = state.memo.get(&op.addr()) {
            return cached.clone();
        }
        log::trace!("{:>width$}{}: {op}", "", op.addr(), width = stage as usize);

        if op.is_any_of(LEAVES) {
            let leaf = Arc::new(GraphNode::Leaf(op.clone()));
            return state.remember(op.addr(), Some(leaf));
        }

        if op.mnemonic().starts_with("move-result") {
            let invocation = self.resolver().analyze_recent_invocation(&op);
            let node = self.analyze_at(invocation, state, stage + 1);
            return state.remember(op.addr(), node);
        }

        let inputs = match self.inputs_of(&op, state, stage) {
            Ok(inputs) => inputs,
            Err(err) => {
                log::trace!("{}: {err}", op.addr());
                return state.remember(op.addr(), None);
            }
        };
        let node = Arc::new(GraphNode::Internal(op.clone(), inputs));

        match self.check_size(&node, state) {
            Ok(()) => state.remember(op.addr(), Some(node)),
            Err(err) => {
                log::warn!("{err}");
                state.truncated += 1;
                state.remember(op.addr(), None)
            }
        }
    }

    fn inputs_of(
        &self,
        op: &Arc<Instruction>,
        state: &mut QueryState,
        stage: u32,
    ) -> AnalysisResult<Inputs> {
        let resolver = self.resolver();

        if op.is_any_of(&["move", "array-length"]) {
            let regs = decode_registers(operand(op, 1)?)?;
            let loads = resolver.analyze_recent_loads_of(op, &regs, 0);
            Ok(self.analyze_loads(loads, state, stage))
        } else if op.is_any_of(&["aget"]) {
            let mut regs = decode_registers(operand(op, 1)?)?;
            regs.extend(decode_registers(operand(op, 2)?)?);
            let loads = resolver.analyze_recent_array_load_of(op, &regs, 0);
            Ok(self.analyze_loads(loads, state, stage))
        } else if op.is_any_of(&["sget"]) {
            let regs = decode_registers(operand(op, 0)?)?;
            let write = resolver.analyze_recent_static_load_of(op);
            Ok(self.analyze_shared(regs, write, state, stage))
        } else if op.is_any_of(&["iget"]) {
            let regs = decode_registers(operand(op, 0)?)?;
            let write = resolver.analyze_recent_instance_load_of(op);
            Ok(self.analyze_shared(regs, write, state, stage))
        } else {
            let regs = decode_registers(operand(op, 0)?)?;
            let loads = resolver.analyze_recent_loads_of(op, &regs, 0);
            Ok(self.analyze_loads(loads, state, stage))
        }
    }

    fn analyze_loads(
        &self,
        loads: BTreeMap<Reg, Option<Arc<Instruction>>>,
        state: &mut QueryState,
        stage: u32,
    ) -> Inputs {
        loads
            .into_iter()
            .map(|(reg, def)| (reg, self.analyze_at(def, state, stage + 1)))
            .collect()
    }

    // Every register is explained by the same field write.
    fn analyze_shared(
        &self,
        regs: BTreeSet<Reg>,
        write: Option<Arc<Instruction>>,
        state: &mut QueryState,
        stage: u32,
    ) -> Inputs {
        let node = self.analyze_at(write, state, stage + 1);
        regs.into_iter().map(|reg| (reg, node.clone())).collect()
    }

    fn check_size(&self, node: &GraphNode, state: &mut QueryState) -> AnalysisResult<()> {
        let size = approximate_size(node, &mut state.sizes);
        if size > self.config.max_graph_size {
            state.sizes.remove(&node.addr());
            return Err(AnalysisError::GraphSize {
                addr: node.addr(),
                size,
                limit: self.config.max_graph_size,
            });
        }
        Ok(())
    }
}

fn operand(op: &Instruction, i: usize) -> AnalysisResult<&Operand> {
    op.operand(i)
        .ok_or_else(|| AnalysisError::RegisterDecode(format!("{op}: missing operand {i}")))
}
