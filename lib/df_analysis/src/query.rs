//! Value queries over invocation arguments.
//!
//! These are the entry points used by detection rules: they locate the
//! register carrying one argument of a call, build its data-flow graph and
//! project it onto a constant, a set of candidate constants, or a set of
//! assumed types.

use crate::dataflow::DataFlow;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::graph::GraphNode;
use crate::registers::decode_register_list;
use df_facts::{FactStore, Instruction, Reg};
use std::collections::BTreeSet;
use std::sync::Arc;

const INTEGER_TYPE: &str = "Ljava/lang/Integer;";
const STRING_TYPE: &str = "Ljava/lang/String;";
const OBJECT_TYPE: &str = "Ljava/lang/Object;";

/// Returns the register holding the `index`-th argument of an invocation.
///
/// For instance calls the receiver occupies the first register, so
/// argument 0 is the second register of the list.
///
/// # Errors
///
/// Returns [`AnalysisError::NoSuchValue`] when the call has no such
/// argument or no register list.
pub fn argument_register(invocation: &Instruction, index: usize) -> AnalysisResult<Reg> {
    let regs = invocation
        .operand(0)
        .map(decode_register_list)
        .transpose()
        .map_err(|_| AnalysisError::NoSuchValue(format!("{invocation}: not an invocation")))?
        .unwrap_or_default();
    let offset = usize::from(!invocation.mnemonic().starts_with("invoke-static"));
    index
        .checked_add(offset)
        .and_then(|i| regs.get(i))
        .copied()
        .ok_or_else(|| AnalysisError::NoSuchValue(format!("{invocation}: no argument {index}")))
}

fn constant_value(instr: &Instruction) -> Option<String> {
    if instr.mnemonic().starts_with("const") {
        instr.operand(1).map(df_facts::Operand::value)
    } else {
        None
    }
}

fn assumed_type(instr: &Instruction) -> String {
    match instr.mnemonic() {
        "const/4" => INTEGER_TYPE.to_string(),
        "const-string" | "const-string/jumbo" => STRING_TYPE.to_string(),
        "new-array" => instr
            .operand(2)
            .map_or_else(|| OBJECT_TYPE.to_string(), df_facts::Operand::value),
        _ => OBJECT_TYPE.to_string(),
    }
}

impl<'s, S: FactStore + ?Sized> DataFlow<'s, S> {
    // Graph of the invocation and the sub-graph of the targeted argument.
    fn argument_graph(
        &self,
        invocation: &Arc<Instruction>,
        index: usize,
    ) -> AnalysisResult<(Option<Arc<GraphNode>>, Option<Arc<GraphNode>>)> {
        let reg = argument_register(invocation, index)?;
        let graph = self.analyze(invocation);
        let input = graph.as_ref().and_then(|g| g.input(reg)).cloned();
        Ok((graph, input))
    }

    /// Returns the constant passed as argument `index` of `invocation`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoSuchValue`] if the argument does not exist
    /// or no graph could be built, and [`AnalysisError::UnsolvableValue`]
    /// (carrying the graph) if the argument does not resolve to a constant.
    pub fn solved_constant_data_in_invocation(
        &self,
        invocation: &Arc<Instruction>,
        index: usize,
    ) -> AnalysisResult<String> {
        let (graph, input) = self.argument_graph(invocation, index)?;
        if graph.is_none() {
            return Err(AnalysisError::NoSuchValue(format!(
                "{invocation}: no data-flow graph"
            )));
        }
        match input.as_deref() {
            Some(GraphNode::Leaf(instr)) => constant_value(instr).ok_or_else(|| {
                AnalysisError::UnsolvableValue {
                    reason: format!("argument {index} comes from {instr}"),
                    graph,
                }
            }),
            Some(GraphNode::Internal(instr, _)) => Err(AnalysisError::UnsolvableValue {
                reason: format!("argument {index} is computed by {instr}"),
                graph,
            }),
            None => Err(AnalysisError::UnsolvableValue {
                reason: format!("argument {index} is unresolved"),
                graph,
            }),
        }
    }

    /// Returns every constant that may flow into argument `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoSuchValue`] if the argument does not
    /// exist. An empty set is returned when nothing could be resolved.
    pub fn solved_possible_constant_data_in_invocation(
        &self,
        invocation: &Arc<Instruction>,
        index: usize,
    ) -> AnalysisResult<BTreeSet<String>> {
        let (_, input) = self.argument_graph(invocation, index)?;
        Ok(input
            .map(|node| {
                node.leaves()
                    .iter()
                    .filter_map(|leaf| constant_value(leaf))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Returns the types assumed for the values that may flow into
    /// argument `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoSuchValue`] if the argument does not
    /// exist. An empty set is returned when nothing could be resolved.
    pub fn solved_typeset_in_invocation(
        &self,
        invocation: &Arc<Instruction>,
        index: usize,
    ) -> AnalysisResult<BTreeSet<String>> {
        let (_, input) = self.argument_graph(invocation, index)?;
        Ok(input
            .map(|node| {
                node.leaves()
                    .iter()
                    .map(|leaf| assumed_type(leaf))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;
    use df_facts::{load_str, Addr, MemoryStore};

    fn invocation(store: &MemoryStore, addr: usize) -> Arc<Instruction> {
        store.lookup(Addr(addr)).unwrap()
    }

    #[test]
    fn constant_argument() {
        let store = load_str(
            r#"
.method static m()V
    const-string v0, "secret"
    invoke-static {v0}, Lx;->m(Ljava/lang/String;)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 1);
        assert_eq!(
            flow.solved_constant_data_in_invocation(&call, 0).unwrap(),
            "secret"
        );
        assert!(matches!(
            flow.solved_constant_data_in_invocation(&call, 1),
            Err(AnalysisError::NoSuchValue(_))
        ));
    }

    #[test]
    fn argument_offsets() {
        let store = load_str(
            r#"
.method m(II)V
    invoke-virtual {p0, p1, p2}, La;->f(II)V
    invoke-static {p0, p1, p2}, La;->g(III)V
.end method
"#,
        )
        .unwrap();
        let virt = invocation(&store, 0);
        let stat = invocation(&store, 1);
        assert_eq!(argument_register(&virt, 0).unwrap(), Reg::param(1));
        assert_eq!(argument_register(&stat, 0).unwrap(), Reg::param(0));
        assert_eq!(argument_register(&virt, 1).unwrap(), Reg::param(2));
        assert!(argument_register(&virt, 2).is_err());
        assert_eq!(argument_register(&stat, 2).unwrap(), Reg::param(2));
        assert!(matches!(
            argument_register(&virt, usize::MAX),
            Err(AnalysisError::NoSuchValue(_))
        ));
        assert!(argument_register(&stat, usize::MAX).is_err());
    }

    #[test]
    fn possible_constants() {
        let store = load_str(
            r#"
.method static m(Z)V
    const-string v0, "a"
    const-string v1, "b"
    invoke-static {p0, v0, v1}, Lx;->choose(ZLjava/lang/String;Ljava/lang/String;)Ljava/lang/String;
    move-result-object v2
    invoke-static {v2}, Lx;->use(Ljava/lang/String;)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 4);
        assert_eq!(
            flow.solved_possible_constant_data_in_invocation(&call, 0)
                .unwrap(),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        match flow.solved_constant_data_in_invocation(&call, 0) {
            Err(AnalysisError::UnsolvableValue { graph, .. }) => {
                assert_eq!(graph.unwrap().addr(), Addr(4));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(
            flow.solved_typeset_in_invocation(&call, 0).unwrap(),
            BTreeSet::from([STRING_TYPE.to_string()])
        );
    }

    #[test]
    fn non_constant_leaf_is_unsolvable() {
        let store = load_str(
            r#"
.method static m()V
    const/16 v0, 0x10
    new-array v1, v0, [B
    new-instance v2, Ljavax/crypto/spec/SecretKeySpec;
    const-string v3, "AES"
    invoke-direct {v2, v1, v3}, Ljavax/crypto/spec/SecretKeySpec;-><init>([BLjava/lang/String;)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 4);
        assert!(matches!(
            flow.solved_constant_data_in_invocation(&call, 0),
            Err(AnalysisError::UnsolvableValue { graph: Some(_), .. })
        ));
        assert_eq!(flow.solved_constant_data_in_invocation(&call, 1).unwrap(), "AES");
        assert_eq!(
            flow.solved_typeset_in_invocation(&call, 0).unwrap(),
            BTreeSet::from(["[B".to_string()])
        );
        assert!(flow
            .solved_possible_constant_data_in_invocation(&call, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn typeset_mapping() {
        let store = load_str(
            r#"
.method static m()V
    const/4 v0, 0x1
    const-wide/16 v1, 0x2
    invoke-static {v0, v1}, Lx;->pair(IJ)Ljava/lang/Object;
    move-result-object v3
    invoke-static {v3}, Lx;->use(Ljava/lang/Object;)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 4);
        assert_eq!(
            flow.solved_typeset_in_invocation(&call, 0).unwrap(),
            BTreeSet::from([INTEGER_TYPE.to_string(), OBJECT_TYPE.to_string()])
        );
    }

    #[test]
    fn caught_exception_is_an_object() {
        let store = load_str(
            r#"
.method static m()V
    :try_start_0
    invoke-static {}, Lx;->run()V
    :try_end_0
    .catch Ljava/lang/Exception; {:try_start_0 .. :try_end_0} :catch_0
    return-void
    :catch_0
    move-exception v0
    invoke-static {v0}, Lx;->report(Ljava/lang/Throwable;)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 7);
        assert_eq!(
            flow.solved_typeset_in_invocation(&call, 0).unwrap(),
            BTreeSet::from([OBJECT_TYPE.to_string()])
        );
        assert!(matches!(
            flow.solved_constant_data_in_invocation(&call, 0),
            Err(AnalysisError::UnsolvableValue { .. })
        ));
    }

    #[test]
    fn unresolved_argument() {
        let store = load_str(
            r#"
.method static m()V
    invoke-static {v0}, Lx;->use(I)V
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 0);
        let err = flow.solved_constant_data_in_invocation(&call, 0).unwrap_err();
        assert!(err.is_unresolved());
        assert!(matches!(err, AnalysisError::UnsolvableValue { .. }));
        assert!(flow
            .solved_possible_constant_data_in_invocation(&call, 0)
            .unwrap()
            .is_empty());
        assert!(flow.solved_typeset_in_invocation(&call, 0).unwrap().is_empty());
    }

    #[test]
    fn constant_from_caller() {
        let store = load_str(
            r#"
.class La;
.method static caller()V
    const-string v0, "DES"
    invoke-static {v0}, La;->wrap(Ljava/lang/String;)V
    return-void
.end method
.method static wrap(Ljava/lang/String;)V
    invoke-static {p0}, Ljavax/crypto/Cipher;->getInstance(Ljava/lang/String;)Ljavax/crypto/Cipher;
    return-void
.end method
"#,
        )
        .unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = invocation(&store, 3);
        assert_eq!(
            flow.solved_constant_data_in_invocation(&call, 0).unwrap(),
            "DES"
        );
    }
}
