//! Def-use resolution: finding the most recent definition of a register or
//! a field, within a method and then through call sites.

use crate::codeflow::{callers_of, looking_behind_from};
use crate::registers::{decode_register_list, decode_registers};
use df_facts::{FactStore, Instruction, Reg};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// Instructions defining the registers of their first operand.
const DEFINING: &[&str] = &[
    "const",
    "new-",
    "move",
    "array-length",
    "aget",
    "sget",
    "iget",
];

// Invocations considered as defining their receiver.
const RECEIVER_MUTATING: &[&str] = &["invoke-direct", "invoke-virtual", "invoke-interface"];

/// Returns the registers an instruction is considered to define.
#[must_use]
pub fn defined_registers(instr: &Instruction) -> BTreeSet<Reg> {
    let Some(first) = instr.operand(0) else {
        return BTreeSet::new();
    };
    if instr.is_any_of(DEFINING) {
        decode_registers(first).unwrap_or_default()
    } else if instr.is_any_of(RECEIVER_MUTATING) {
        decode_register_list(first)
            .ok()
            .and_then(|regs| regs.first().copied())
            .into_iter()
            .collect()
    } else {
        BTreeSet::new()
    }
}

/// Def-use resolver over a fact store.
pub struct Resolver<'s, S: ?Sized> {
    store: &'s S,
    max_hops: u32,
}

impl<'s, S: FactStore + ?Sized> Resolver<'s, S> {
    pub const fn new(store: &'s S, max_hops: u32) -> Self {
        Self { store, max_hops }
    }

    /// Finds the most recent definition of `reg` before `from`.
    ///
    /// Parameter registers that are not defined locally are looked up at
    /// the call sites of the enclosing method, the first caller providing
    /// a definition wins. `stage` counts the caller hops already done.
    pub fn analyze_recent_load_of(
        &self,
        from: &Instruction,
        reg: Reg,
        stage: u32,
    ) -> Option<Arc<Instruction>> {
        self.analyze_recent_loads_of(from, &BTreeSet::from([reg]), stage)
            .remove(&reg)
            .flatten()
    }

    /// Resolves several registers at once, with a single backward scan
    /// from `from` and at most one scan per call site for the parameters
    /// left undefined.
    pub fn analyze_recent_loads_of(
        &self,
        from: &Instruction,
        regs: &BTreeSet<Reg>,
        stage: u32,
    ) -> BTreeMap<Reg, Option<Arc<Instruction>>> {
        let mut found: BTreeMap<Reg, Option<Arc<Instruction>>> = BTreeMap::new();
        if !regs.is_empty() {
            for instr in looking_behind_from(self.store, from) {
                for reg in defined_registers(&instr) {
                    if regs.contains(&reg) && !found.contains_key(&reg) {
                        found.insert(reg, Some(instr.clone()));
                    }
                }
                if found.len() == regs.len() {
                    break;
                }
            }
        }
        let pending: BTreeSet<Reg> = regs
            .iter()
            .filter(|reg| !found.contains_key(reg))
            .copied()
            .collect();
        found.extend(self.analyze_caller_loads_of(from, pending, stage));
        found
    }

    // Every register of `pending` gets an entry, `None` for locals and for
    // parameters no caller defines.
    fn analyze_caller_loads_of(
        &self,
        from: &Instruction,
        mut pending: BTreeSet<Reg>,
        stage: u32,
    ) -> BTreeMap<Reg, Option<Arc<Instruction>>> {
        let mut found: BTreeMap<Reg, Option<Arc<Instruction>>> =
            pending.iter().map(|reg| (*reg, None)).collect();
        pending.retain(|reg| reg.is_param());
        if pending.is_empty() {
            return found;
        }
        if stage >= self.max_hops {
            log::trace!("hop limit reached at {}", from.addr());
            return found;
        }

        for caller in callers_of(self.store, from) {
            if pending.is_empty() {
                break;
            }
            let Some(args) = caller
                .operand(0)
                .and_then(|operand| decode_register_list(operand).ok())
            else {
                continue;
            };
            let bindings: BTreeMap<Reg, Reg> = pending
                .iter()
                .filter_map(|reg| {
                    args.get(usize::from(reg.index()))
                        .map(|caller_reg| (*reg, *caller_reg))
                })
                .collect();
            if bindings.is_empty() {
                continue;
            }
            log::debug!(
                "{:?} of {} bound at {} (stage {stage})",
                bindings,
                self.store.qualified_name_of(from).unwrap_or("?"),
                caller.addr()
            );

            let caller_regs: BTreeSet<Reg> = bindings.values().copied().collect();
            let loads = self.analyze_recent_loads_of(&caller, &caller_regs, stage + 1);
            for (reg, caller_reg) in bindings {
                if let Some(Some(def)) = loads.get(&caller_reg) {
                    found.insert(reg, Some(def.clone()));
                    pending.remove(&reg);
                }
            }
        }
        found
    }

    /// Array elements are not tracked: the array and index registers are
    /// resolved as plain registers.
    pub fn analyze_recent_array_load_of(
        &self,
        from: &Instruction,
        regs: &BTreeSet<Reg>,
        stage: u32,
    ) -> BTreeMap<Reg, Option<Arc<Instruction>>> {
        self.analyze_recent_loads_of(from, regs, stage)
    }

    /// Finds the `sput*` feeding an `sget*`.
    ///
    /// Falls back to the first write to the field found anywhere in the
    /// store, which is not necessarily the one executed.
    pub fn analyze_recent_static_load_of(&self, op: &Instruction) -> Option<Arc<Instruction>> {
        self.analyze_recent_field_load_of(op, "sput", |field| self.store.static_writes_to(field))
    }

    /// Finds the `iput*` feeding an `iget*`, matching on the field name only
    /// (receivers are not told apart).
    pub fn analyze_recent_instance_load_of(&self, op: &Instruction) -> Option<Arc<Instruction>> {
        self.analyze_recent_field_load_of(op, "iput", |field| {
            self.store.instance_writes_to(field)
        })
    }

    fn analyze_recent_field_load_of<F>(
        &self,
        op: &Instruction,
        writer: &str,
        global: F,
    ) -> Option<Arc<Instruction>>
    where
        F: Fn(&str) -> Vec<Arc<Instruction>>,
    {
        let field = op.field_ref()?;
        looking_behind_from(self.store, op)
            .find(|instr| instr.mnemonic().starts_with(writer) && instr.field_ref() == Some(field))
            .or_else(|| {
                log::trace!("no local {writer} to {field}, using global writes");
                global(field).into_iter().next()
            })
    }

    /// Finds the invocation whose result a `move-result*` reads.
    pub fn analyze_recent_invocation(&self, from: &Instruction) -> Option<Arc<Instruction>> {
        looking_behind_from(self.store, from).find(|instr| instr.mnemonic().starts_with("invoke"))
    }
}
