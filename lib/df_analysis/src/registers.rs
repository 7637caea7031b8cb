//! Operand decoding into register sets.

use crate::errors::{AnalysisError, AnalysisResult};
use df_facts::{Operand, Reg};
use std::collections::BTreeSet;

/// Returns the ordered list of registers denoted by an operand.
///
/// Ranges (`{v2 .. v5}`) are expanded; both bounds must share the same
/// namespace.
///
/// # Errors
///
/// Returns [`AnalysisError::RegisterDecode`] if the operand is not a
/// register, a register list or a valid register range.
pub fn decode_register_list(operand: &Operand) -> AnalysisResult<Vec<Reg>> {
    match operand {
        Operand::Reg(reg) => Ok(vec![*reg]),
        Operand::RegList(regs) => Ok(regs.clone()),
        Operand::RegRange(first, last)
            if first.kind() == last.kind() && first.index() <= last.index() =>
        {
            Ok((first.index()..=last.index())
                .map(|i| Reg::new(first.kind(), i))
                .collect())
        }
        other => Err(AnalysisError::RegisterDecode(other.to_string())),
    }
}

/// Returns the set of registers denoted by an operand.
///
/// # Errors
///
/// See [`decode_register_list`].
pub fn decode_registers(operand: &Operand) -> AnalysisResult<BTreeSet<Reg>> {
    decode_register_list(operand).map(|regs| regs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_and_lists() {
        let v1 = Reg::local(1);
        assert_eq!(decode_register_list(&Operand::Reg(v1)).unwrap(), vec![v1]);
        let list = Operand::RegList(vec![Reg::param(1), Reg::local(0), Reg::param(1)]);
        assert_eq!(decode_register_list(&list).unwrap().len(), 3);
        assert_eq!(decode_registers(&list).unwrap().len(), 2);
    }

    #[test]
    fn decode_ranges() {
        let range = Operand::RegRange(Reg::param(0), Reg::param(2));
        assert_eq!(
            decode_register_list(&range).unwrap(),
            vec![Reg::param(0), Reg::param(1), Reg::param(2)]
        );
        assert!(decode_register_list(&Operand::RegRange(Reg::local(0), Reg::param(2))).is_err());
        assert!(decode_register_list(&Operand::RegRange(Reg::local(3), Reg::local(2))).is_err());
    }

    #[test]
    fn decode_non_registers() {
        for operand in [
            Operand::Type("Lx;".into()),
            Operand::Field("Lx;->f:I".into()),
            Operand::Str("v0".into()),
        ] {
            assert!(matches!(
                decode_registers(&operand),
                Err(AnalysisError::RegisterDecode(_))
            ));
        }
    }
}
