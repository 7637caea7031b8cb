//! Label-aware backward scanning within a method, and call-site lookup.
//!
//! There is no control flow graph here: methods are flat instruction
//! streams. When walking backward over a label that is not a try-region
//! marker, the scan skips everything up to the instruction that jumps to
//! that label, so that definitions from a fall-through path that may not
//! dominate the use are not picked up. This is a heuristic, not a
//! dominance computation.

use df_facts::{FactStore, Instruction};
use std::sync::Arc;

/// Checks if a label marks a try-region boundary.
fn is_try_label(name: &str) -> bool {
    name.starts_with("try_")
}

/// Lazy backward scan produced by [`looking_behind_from`].
pub struct LookingBehind<'s> {
    inner: Box<dyn Iterator<Item = Arc<Instruction>> + 's>,
    seeking: Option<String>,
}

impl Iterator for LookingBehind<'_> {
    type Item = Arc<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let instr = self.inner.next()?;
            match &self.seeking {
                None => {
                    if let Some(name) = instr.label_name() {
                        if !is_try_label(name) {
                            log::trace!("  seeking jump to :{name}");
                            self.seeking = Some(name.to_string());
                        }
                        continue;
                    }
                    return Some(instr);
                }
                Some(name) => {
                    if !instr.is_label() && instr.references_label(name) {
                        self.seeking = None;
                        return Some(instr);
                    }
                }
            }
        }
    }
}

/// Returns the instructions strictly preceding `from` in its method, in
/// reverse order, skipping over branch-target regions.
///
/// Label entries are never yielded. Each call starts a fresh scan.
pub fn looking_behind_from<'s, S: FactStore + ?Sized>(
    store: &'s S,
    from: &Instruction,
) -> LookingBehind<'s> {
    LookingBehind {
        inner: store.reverse_instructions_before(from.addr()),
        seeking: None,
    }
}

/// Returns the call sites of the method enclosing `instr`, excluding
/// recursive calls made from the method itself.
pub fn callers_of<S: FactStore + ?Sized>(store: &S, instr: &Instruction) -> Vec<Arc<Instruction>> {
    let Some(name) = store.qualified_name_of(instr) else {
        return Vec::new();
    };
    store
        .callers_of(name)
        .into_iter()
        .filter(|caller| caller.method() != instr.method())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use df_facts::{load_str, Addr};

    fn scan(listing: &str, from: usize) -> Vec<String> {
        let store = load_str(listing).unwrap();
        let from = store.lookup(Addr(from)).unwrap();
        looking_behind_from(&store, &from)
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn scan_skips_branch_region() {
        let listing = r#"
.method static m(I)V
    const/4 v0, 0x0
    if-eqz p0, :cond_0
    const/4 v0, 0x1
    :cond_0
    invoke-static {v0}, Lx;->use(I)V
.end method
"#;
        assert_eq!(
            scan(listing, 4),
            vec!["if-eqz p0, :cond_0", "const/4 v0, 0x0"]
        );
    }

    #[test]
    fn scan_keeps_try_regions() {
        let listing = r#"
.method static m()V
    const-string v0, "a"
    :try_start_0
    const-string v1, "b"
    :try_end_0
    .catch Ljava/lang/Exception; {:try_start_0 .. :try_end_0} :catch_0
    invoke-static {v0, v1}, Lx;->use(Ljava/lang/String;Ljava/lang/String;)V
.end method
"#;
        let out = scan(listing, 5);
        assert_eq!(out.len(), 3);
        assert!(out[0].starts_with(".catch"));
        assert_eq!(out[1], "const-string v1, \"b\"");
        assert_eq!(out[2], "const-string v0, \"a\"");
    }

    #[test]
    fn scan_without_jump_source_is_exhausted() {
        let listing = r#"
.method static m()V
    const/4 v0, 0x1
    :goto_0
    invoke-static {v0}, Lx;->use(I)V
.end method
"#;
        assert!(scan(listing, 2).is_empty());
    }

    #[test]
    fn scan_is_restartable() {
        let store = load_str(".method m()V\n const/4 v0, 0x1\n const/4 v1, 0x2\n return-void\n.end method")
            .unwrap();
        let from = store.lookup(Addr(2)).unwrap();
        assert_eq!(looking_behind_from(&store, &from).count(), 2);
        assert_eq!(looking_behind_from(&store, &from).count(), 2);
    }

    #[test]
    fn callers_exclude_recursion() {
        let store = load_str(
            r#"
.class La;
.method static f(I)V
    invoke-static {p0}, La;->f(I)V
    return-void
.end method
.method static g()V
    const/4 v0, 0x1
    invoke-static {v0}, La;->f(I)V
    return-void
.end method
"#,
        )
        .unwrap();
        let ret = store.lookup(Addr(1)).unwrap();
        let callers = callers_of(&store, &ret);
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].addr(), Addr(3));
    }
}
