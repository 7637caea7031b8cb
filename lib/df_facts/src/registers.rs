//! Types definitions to address Dalvik registers in disassembled code.
//!
//! Disassembled bytecode names registers either as locals (`v0`, `v1`, ...)
//! or as incoming parameters (`p0`, `p1`, ...). Names are only meaningful
//! within the scope of one method; they are never compared across methods.

use crate::errors::FactsError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The two register namespaces of a method frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RegKind {
    Local,
    Param,
}

impl RegKind {
    const fn prefix(self) -> char {
        match self {
            Self::Local => 'v',
            Self::Param => 'p',
        }
    }
}

/// The register type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Reg {
    kind: RegKind,
    index: u16,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

impl FromStr for Reg {
    type Err = FactsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.chars().next() {
            Some('v') => RegKind::Local,
            Some('p') => RegKind::Param,
            _ => return Err(FactsError::InvalidRegister(s.to_string())),
        };
        let index = s[1..]
            .parse::<u16>()
            .map_err(|_| FactsError::InvalidRegister(s.to_string()))?;
        Ok(Self { kind, index })
    }
}

impl Reg {
    #[inline]
    #[must_use]
    pub const fn new(kind: RegKind, index: u16) -> Self {
        Self { kind, index }
    }

    #[inline]
    #[must_use]
    pub const fn local(index: u16) -> Self {
        Self::new(RegKind::Local, index)
    }

    #[inline]
    #[must_use]
    pub const fn param(index: u16) -> Self {
        Self::new(RegKind::Param, index)
    }

    #[inline]
    #[must_use]
    pub const fn kind(self) -> RegKind {
        self.kind
    }

    /// Returns the register slot number within its namespace.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.index
    }

    /// Checks if the register denotes an incoming parameter (`this`
    /// included, as `p0` of instance methods).
    #[inline]
    #[must_use]
    pub const fn is_param(self) -> bool {
        matches!(self.kind, RegKind::Param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_parsing() {
        assert_eq!("v12".parse::<Reg>().unwrap(), Reg::local(12));
        assert_eq!("p0".parse::<Reg>().unwrap(), Reg::param(0));
        assert!("x1".parse::<Reg>().is_err());
        assert!("v".parse::<Reg>().is_err());
        assert!("vx".parse::<Reg>().is_err());
    }

    #[test]
    fn reg_display() {
        assert_eq!(Reg::param(3).to_string(), "p3");
        assert_eq!(Reg::local(0).to_string(), "v0");
    }
}
