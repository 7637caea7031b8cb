//! Disassembled instructions and their operands.
//!
//! An [`Instruction`] is one line of a method body as produced by the
//! disassembler: a textual mnemonic followed by a small list of operand
//! tokens. Labels (`:cond_0`) and in-body directives (`.catch ...`) are
//! stored as instructions too, so that they get an address and can be
//! found while scanning a method.

use crate::registers::Reg;
use crate::Addr;
use serde::Serialize;
use std::fmt;

/// Index of a method in its fact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MethodId(pub usize);

/// An operand token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum Operand {
    Reg(Reg),
    RegRange(Reg, Reg),
    RegList(Vec<Reg>),
    /// String literal, kept with its escape sequences but without quotes.
    Str(String),
    Num(String),
    Type(String),
    Field(String),
    Method(String),
    /// Label reference, without the leading colon.
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Reg(reg) => write!(f, "{reg}"),
            Self::RegRange(first, last) => write!(f, "{{{first} .. {last}}}"),
            Self::RegList(regs) => {
                write!(f, "{{")?;
                for (i, reg) in regs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{reg}")?;
                }
                write!(f, "}}")
            }
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Num(s) | Self::Type(s) | Self::Field(s) | Self::Method(s) => write!(f, "{s}"),
            Self::Label(name) => write!(f, ":{name}"),
        }
    }
}

impl Operand {
    /// Returns the literal text carried by the operand.
    ///
    /// String literals are returned without their quotes; register
    /// operands are returned in their display form.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Str(s)
            | Self::Num(s)
            | Self::Type(s)
            | Self::Field(s)
            | Self::Method(s)
            | Self::Label(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Classifies a raw, unquoted, unbraced token.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if let Some(label) = raw.strip_prefix(':') {
            return Self::Label(label.to_string());
        }
        if let Ok(reg) = raw.parse::<Reg>() {
            return Self::Reg(reg);
        }
        if let Some((_, member)) = raw.split_once("->") {
            return if member.contains('(') {
                Self::Method(raw.to_string())
            } else {
                Self::Field(raw.to_string())
            };
        }
        match raw.chars().next() {
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => Self::Num(raw.to_string()),
            _ => Self::Type(raw.to_string()),
        }
    }
}

/// A disassembled instruction, immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    addr: Addr,
    method: MethodId,
    mnemonic: String,
    operands: Vec<Operand>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {operand}")?;
            } else {
                write!(f, ", {operand}")?;
            }
        }
        Ok(())
    }
}

impl Instruction {
    #[must_use]
    pub fn new(addr: Addr, method: MethodId, mnemonic: &str, operands: Vec<Operand>) -> Self {
        Self {
            addr,
            method,
            mnemonic: mnemonic.to_string(),
            operands,
        }
    }

    #[inline]
    #[must_use]
    pub const fn addr(&self) -> Addr {
        self.addr
    }

    #[inline]
    #[must_use]
    pub const fn method(&self) -> MethodId {
        self.method
    }

    #[inline]
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    #[inline]
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    #[inline]
    #[must_use]
    pub fn operand(&self, i: usize) -> Option<&Operand> {
        self.operands.get(i)
    }

    /// Checks if the mnemonic starts with any of the given prefixes.
    #[must_use]
    pub fn is_any_of(&self, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|p| self.mnemonic.starts_with(p))
    }

    /// Checks if this entry is a label line (`:name`).
    #[inline]
    #[must_use]
    pub fn is_label(&self) -> bool {
        self.mnemonic.starts_with(':')
    }

    /// Returns the label name (without colon) if this entry is a label.
    #[must_use]
    pub fn label_name(&self) -> Option<&str> {
        self.mnemonic.strip_prefix(':')
    }

    /// Checks if one of the operands references the given label.
    #[must_use]
    pub fn references_label(&self, name: &str) -> bool {
        self.operands
            .iter()
            .any(|operand| matches!(operand, Operand::Label(l) if l == name))
    }

    /// Returns the field reference of a field access instruction.
    #[must_use]
    pub fn field_ref(&self) -> Option<&str> {
        self.operands.iter().rev().find_map(|operand| match operand {
            Operand::Field(field) => Some(field.as_str()),
            _ => None,
        })
    }

    /// Returns the callee reference of an invocation instruction.
    #[must_use]
    pub fn method_ref(&self) -> Option<&str> {
        self.operands.iter().rev().find_map(|operand| match operand {
            Operand::Method(method) => Some(method.as_str()),
            _ => None,
        })
    }
}
