//! This crate provides the instruction fact store of the `DroidFlow`
//! project: typed views over disassembled Dalvik instructions, a parser
//! for smali-style listings and the lookup primitives the data-flow
//! analysis relies on.

mod addr;
pub mod errors;
pub mod instrs;
pub mod parsers;
pub mod registers;
pub mod store;

pub use addr::Addr;
pub use instrs::{Instruction, MethodId, Operand};
pub use registers::{Reg, RegKind};
pub use store::{FactStore, InstrPattern, MemoryStore};

use crate::errors::FactsResult;

/// Parses listing text and loads it into a fresh [`MemoryStore`].
///
/// # Errors
///
/// Returns an error if the listing cannot be parsed.
pub fn load_str(text: &str) -> FactsResult<MemoryStore> {
    let mut store = MemoryStore::new();
    store.load(parsers::parse_listing(text)?);
    Ok(store)
}
