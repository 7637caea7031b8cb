//! Instruction fact store.
//!
//! The analysis layer only relies on the [`FactStore`] trait; the
//! [`MemoryStore`] is the in-process implementation populated from
//! disassembly listings.

use crate::errors::FactsResult;
use crate::instrs::{Instruction, MethodId, Operand};
use crate::parsers::{parse_listing, Listing};
use crate::Addr;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Lookup primitives over stored instructions.
pub trait FactStore {
    /// Fetches an instruction by address.
    fn lookup(&self, addr: Addr) -> Option<Arc<Instruction>>;

    /// Iterates over the instructions of the method containing `addr`
    /// that strictly precede it, in descending address order.
    fn reverse_instructions_before(
        &self,
        addr: Addr,
    ) -> Box<dyn Iterator<Item = Arc<Instruction>> + '_>;

    /// All `sput*` instructions writing the given field.
    fn static_writes_to(&self, field: &str) -> Vec<Arc<Instruction>>;

    /// All `iput*` instructions writing the given field, whatever the receiver.
    fn instance_writes_to(&self, field: &str) -> Vec<Arc<Instruction>>;

    /// All `invoke*` call sites targeting the given qualified method name.
    fn callers_of(&self, method: &str) -> Vec<Arc<Instruction>>;

    /// Qualified name (`Lcls;->name(desc)ret`) of the method enclosing `instr`.
    fn qualified_name_of(&self, instr: &Instruction) -> Option<&str>;

    /// All instructions matching the given pattern, in address order.
    fn find(&self, pattern: &InstrPattern) -> Vec<Arc<Instruction>>;
}

/// A pattern over instructions: a mnemonic regex and positional operand regexes.
///
/// Operand regexes are matched against the display form of the operand at
/// the same position; an instruction with fewer operands than patterns
/// never matches.
#[derive(Debug, Clone)]
pub struct InstrPattern {
    mnemonic: Regex,
    operands: Vec<Regex>,
}

impl InstrPattern {
    /// Builds a pattern from its textual regexes.
    ///
    /// # Errors
    ///
    /// Returns a regex error if one of the given expressions is invalid.
    pub fn new<S: AsRef<str>>(mnemonic: &str, operands: &[S]) -> FactsResult<Self> {
        Ok(Self {
            mnemonic: Regex::new(mnemonic)?,
            operands: operands
                .iter()
                .map(|op| Regex::new(op.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    #[must_use]
    pub fn is_match(&self, instr: &Instruction) -> bool {
        self.mnemonic.is_match(instr.mnemonic())
            && self.operands.len() <= instr.operands().len()
            && self
                .operands
                .iter()
                .zip(instr.operands())
                .all(|(re, op)| re.is_match(&op.to_string()))
    }
}

#[derive(Debug)]
struct MethodScope {
    qualified_name: String,
    range: Range<usize>,
}

/// In-memory fact store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    instrs: Vec<Arc<Instruction>>,
    methods: Vec<MethodScope>,
    static_writes: BTreeMap<String, Vec<Addr>>,
    instance_writes: BTreeMap<String, Vec<Addr>>,
    call_sites: BTreeMap<String, Vec<Addr>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a listing file and loads it into a new store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_listing_file<P: AsRef<Path>>(path: P) -> FactsResult<Self> {
        let mut store = Self::new();
        store.load_file(path)?;
        Ok(store)
    }

    /// Parses a listing file and appends its methods to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> FactsResult<()> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("loading listing {:?}", path.as_ref());
        let listing = parse_listing(&text)?;
        self.load(listing);
        Ok(())
    }

    /// Appends the methods of a parsed listing, assigning fresh addresses.
    pub fn load(&mut self, listing: Listing) {
        for method in listing.methods {
            let id = MethodId(self.methods.len());
            let start = self.instrs.len();
            for listed in method.body {
                let addr = Addr(self.instrs.len());
                let instr = Instruction::new(addr, id, &listed.mnemonic, listed.operands);
                self.index(&instr);
                self.instrs.push(Arc::new(instr));
            }
            self.methods.push(MethodScope {
                qualified_name: method.qualified_name,
                range: start..self.instrs.len(),
            });
        }
        log::debug!(
            "store holds {} instructions in {} methods",
            self.instrs.len(),
            self.methods.len()
        );
    }

    fn index(&mut self, instr: &Instruction) {
        let table = if instr.mnemonic().starts_with("sput") {
            &mut self.static_writes
        } else if instr.mnemonic().starts_with("iput") {
            &mut self.instance_writes
        } else if instr.mnemonic().starts_with("invoke") {
            &mut self.call_sites
        } else {
            return;
        };
        let key = instr.operands().iter().rev().find_map(|op| match op {
            Operand::Field(name) | Operand::Method(name) => Some(name.clone()),
            _ => None,
        });
        if let Some(key) = key {
            table.entry(key).or_default().push(instr.addr());
        }
    }

    #[must_use]
    pub fn nb_instructions(&self) -> usize {
        self.instrs.len()
    }

    #[must_use]
    pub fn nb_methods(&self) -> usize {
        self.methods.len()
    }

    /// Iterates over the stored instructions in address order.
    pub fn iter_instructions(&self) -> impl Iterator<Item = &Arc<Instruction>> {
        self.instrs.iter()
    }

    fn collect(&self, addrs: Option<&Vec<Addr>>) -> Vec<Arc<Instruction>> {
        addrs
            .into_iter()
            .flatten()
            .filter_map(|addr| self.instrs.get(addr.0).cloned())
            .collect()
    }
}

impl FactStore for MemoryStore {
    fn lookup(&self, addr: Addr) -> Option<Arc<Instruction>> {
        self.instrs.get(addr.0).cloned()
    }

    fn reverse_instructions_before(
        &self,
        addr: Addr,
    ) -> Box<dyn Iterator<Item = Arc<Instruction>> + '_> {
        let Some(instr) = self.instrs.get(addr.0) else {
            return Box::new(std::iter::empty());
        };
        let start = self.methods[instr.method().0].range.start;
        Box::new(self.instrs[start..addr.0].iter().rev().cloned())
    }

    fn static_writes_to(&self, field: &str) -> Vec<Arc<Instruction>> {
        self.collect(self.static_writes.get(field))
    }

    fn instance_writes_to(&self, field: &str) -> Vec<Arc<Instruction>> {
        self.collect(self.instance_writes.get(field))
    }

    fn callers_of(&self, method: &str) -> Vec<Arc<Instruction>> {
        self.collect(self.call_sites.get(method))
    }

    fn qualified_name_of(&self, instr: &Instruction) -> Option<&str> {
        self.methods
            .get(instr.method().0)
            .map(|scope| scope.qualified_name.as_str())
    }

    fn find(&self, pattern: &InstrPattern) -> Vec<Arc<Instruction>> {
        self.instrs
            .iter()
            .filter(|instr| pattern.is_match(instr))
            .cloned()
            .collect()
    }
}
