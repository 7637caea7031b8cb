//! Data-flow graph nodes.

use df_facts::{Addr, Instruction, Reg};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Children of an internal node: each live input register mapped to its
/// resolved definition, `None` when it could not be resolved.
pub type Inputs = BTreeMap<Reg, Option<Arc<GraphNode>>>;

/// A node of a resolution graph.
///
/// Nodes are shared between parents when the same program point is
/// reached twice during one query, so a graph is a DAG keyed by
/// instruction address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    /// A terminal value-producing instruction (constant load, allocation,
    /// exception binding).
    Leaf(Arc<Instruction>),
    /// An instruction whose input registers are explained by sub-graphs.
    Internal(Arc<Instruction>, Inputs),
}

impl GraphNode {
    #[must_use]
    pub fn instruction(&self) -> &Arc<Instruction> {
        match self {
            Self::Leaf(instr) | Self::Internal(instr, _) => instr,
        }
    }

    #[inline]
    #[must_use]
    pub fn addr(&self) -> Addr {
        self.instruction().addr()
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    #[must_use]
    pub const fn inputs(&self) -> Option<&Inputs> {
        match self {
            Self::Leaf(_) => None,
            Self::Internal(_, inputs) => Some(inputs),
        }
    }

    /// Returns the sub-graph explaining `reg`, if resolved.
    #[must_use]
    pub fn input(&self, reg: Reg) -> Option<&Arc<Self>> {
        self.inputs()
            .and_then(|inputs| inputs.get(&reg))
            .and_then(Option::as_ref)
    }

    /// Returns every leaf instruction reachable from this node (itself
    /// included when it is a leaf), in address order.
    #[must_use]
    pub fn leaves(&self) -> Vec<Arc<Instruction>> {
        let mut visited = BTreeSet::new();
        let mut leaves = BTreeMap::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.addr()) {
                continue;
            }
            match node {
                Self::Leaf(instr) => {
                    leaves.insert(instr.addr(), instr.clone());
                }
                Self::Internal(_, inputs) => {
                    stack.extend(inputs.values().flatten().map(Arc::as_ref));
                }
            }
        }
        leaves.into_values().collect()
    }
}

/// Approximates the number of nodes of a graph as the number of distinct
/// instruction addresses it reaches.
///
/// The result is cached per root address, so a sub-graph already measured
/// is not walked again.
pub fn approximate_size(node: &GraphNode, cache: &mut HashMap<Addr, usize>) -> usize {
    if let Some(size) = cache.get(&node.addr()) {
        return *size;
    }
    let mut visited = HashSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.addr()) {
            continue;
        }
        if let GraphNode::Internal(_, inputs) = current {
            stack.extend(inputs.values().flatten().map(Arc::as_ref));
        }
    }
    let size = visited.len();
    cache.insert(node.addr(), size);
    size
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter, node: &GraphNode, depth: usize) -> fmt::Result {
            writeln!(f, "{}: {}", node.addr(), node.instruction())?;
            if let GraphNode::Internal(_, inputs) = node {
                for (reg, input) in inputs {
                    write!(f, "{:indent$}{reg} <- ", "", indent = 2 * (depth + 1))?;
                    match input {
                        Some(input) => write_node(f, input, depth + 1)?,
                        None => writeln!(f, "?")?,
                    }
                }
            }
            Ok(())
        }
        write_node(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use df_facts::{MethodId, Operand};

    fn instr(addr: usize, mnemonic: &str, operands: Vec<Operand>) -> Arc<Instruction> {
        Arc::new(Instruction::new(Addr(addr), MethodId(0), mnemonic, operands))
    }

    fn sample() -> GraphNode {
        let shared = Arc::new(GraphNode::Leaf(instr(
            0,
            "const/4",
            vec![Operand::Reg(Reg::local(0)), Operand::Num("0x1".into())],
        )));
        let mv = Arc::new(GraphNode::Internal(
            instr(1, "move", vec![Operand::Reg(Reg::local(1)), Operand::Reg(Reg::local(0))]),
            BTreeMap::from([(Reg::local(0), Some(shared.clone()))]),
        ));
        GraphNode::Internal(
            instr(
                2,
                "invoke-static",
                vec![Operand::RegList(vec![Reg::local(0), Reg::local(1), Reg::local(2)])],
            ),
            BTreeMap::from([
                (Reg::local(0), Some(shared)),
                (Reg::local(1), Some(mv)),
                (Reg::local(2), None),
            ]),
        )
    }

    #[test]
    fn graph_accessors() {
        let graph = sample();
        assert!(!graph.is_leaf());
        assert_eq!(graph.input(Reg::local(1)).unwrap().addr(), Addr(1));
        assert!(graph.input(Reg::local(2)).is_none());
        assert!(graph.input(Reg::local(9)).is_none());
        let leaves = graph.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].addr(), Addr(0));
    }

    #[test]
    fn graph_size() {
        let mut cache = HashMap::new();
        let graph = sample();
        assert_eq!(approximate_size(&graph, &mut cache), 3);
        assert_eq!(cache[&Addr(2)], 3);
        let mv = graph.input(Reg::local(1)).unwrap();
        assert_eq!(approximate_size(mv, &mut cache), 2);
    }

    #[test]
    fn graph_size_of_shared_chain() {
        // each level reads the previous one through two registers
        let mut node = Arc::new(GraphNode::Leaf(instr(
            0,
            "const/4",
            vec![Operand::Reg(Reg::local(0)), Operand::Num("0x0".into())],
        )));
        for addr in 1..=40 {
            let regs = vec![Reg::local(0), Reg::local(1)];
            node = Arc::new(GraphNode::Internal(
                instr(addr, "aget", regs.iter().copied().map(Operand::Reg).collect()),
                regs.into_iter().map(|reg| (reg, Some(node.clone()))).collect(),
            ));
        }
        let mut cache = HashMap::new();
        assert_eq!(approximate_size(&node, &mut cache), 41);
        assert_eq!(node.leaves().len(), 1);
    }

    #[test]
    fn graph_rendering() {
        let text = sample().to_string();
        assert!(text.starts_with("0002: invoke-static {v0, v1, v2}\n"));
        assert!(text.contains("  v1 <- 0001: move v1, v0\n    v0 <- 0000: const/4 v0, 0x1\n"));
        assert!(text.contains("  v2 <- ?\n"));
    }
}
