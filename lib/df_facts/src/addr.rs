//! Instruction address representation.

use serde::Serialize;
use std::fmt;

/// Stable address of an instruction in a fact store.
///
/// Addresses are dense and increasing in program order, so that the
/// instructions of one method always occupy a contiguous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Addr(pub usize);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}
