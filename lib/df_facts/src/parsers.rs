//! Parsers for smali-style disassembly listings.
//!
//! The listing is processed line by line. Class and method directives
//! delimit scopes, everything else inside a method body becomes either a
//! label entry, a kept directive (exception handler ranges) or an
//! instruction whose operands are tokenized with `nom`.

use crate::errors::{FactsError, FactsResult};
use crate::instrs::Operand;
use crate::registers::Reg;
use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag, take_while1};
use nom::character::complete::{anychar, char, digit1, one_of, space0, space1};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, verify};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::{Finish, IResult};

/// One entry of a method body, before address assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedInstr {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
}

/// A method body, identified by its qualified name (`Lcls;->name(desc)ret`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedMethod {
    pub qualified_name: String,
    pub body: Vec<ListedInstr>,
}

/// The parsed content of a listing file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub methods: Vec<ListedMethod>,
}

// Directives that carry no information for instruction facts.
const IGNORED_DIRECTIVES: &[&str] = &[
    ".end",
    ".enum",
    ".epilogue",
    ".field",
    ".implements",
    ".line",
    ".local",
    ".locals",
    ".param",
    ".prologue",
    ".registers",
    ".restart",
    ".source",
    ".super",
];

/// Parses a whole listing.
///
/// # Errors
///
/// Returns a [`FactsError::Parsing`] carrying the faulty line when an
/// instruction cannot be tokenized, or [`FactsError::OutsideMethod`] when
/// a body line appears outside of any `.method` block.
pub fn parse_listing(text: &str) -> FactsResult<Listing> {
    let mut listing = Listing::default();
    let mut class = String::new();
    let mut current: Option<ListedMethod> = None;
    let mut skip_until: Option<&'static str> = None;

    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(end) = skip_until {
            if line.starts_with(end) {
                skip_until = None;
            }
            continue;
        }

        let (mnemonic, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(m, r)| (m, r.trim()));

        match mnemonic {
            ".class" => {
                class = rest.split_whitespace().last().unwrap_or_default().to_string();
            }
            ".method" => {
                let signature = rest.split_whitespace().last().ok_or_else(|| {
                    FactsError::Parsing {
                        line: lineno,
                        text: raw.to_string(),
                    }
                })?;
                current = Some(ListedMethod {
                    qualified_name: format!("{class}->{signature}"),
                    body: Vec::new(),
                });
            }
            ".end" if rest.starts_with("method") => {
                let method = current.take().ok_or(FactsError::OutsideMethod(lineno))?;
                log::trace!(
                    "parsed {} ({} entries)",
                    method.qualified_name,
                    method.body.len()
                );
                listing.methods.push(method);
            }
            ".annotation" => skip_until = Some(".end annotation"),
            ".subannotation" => skip_until = Some(".end subannotation"),
            ".packed-switch" => skip_until = Some(".end packed-switch"),
            ".sparse-switch" => skip_until = Some(".end sparse-switch"),
            ".array-data" => skip_until = Some(".end array-data"),
            ".catch" | ".catchall" => {
                let operands = all_consuming(catch_operands)(rest)
                    .finish()
                    .map(|(_, ops)| ops)
                    .map_err(|_| FactsError::Parsing {
                        line: lineno,
                        text: raw.to_string(),
                    })?;
                push(&mut current, lineno, mnemonic, operands)?;
            }
            m if IGNORED_DIRECTIVES.contains(&m) => (),
            m if m.starts_with('.') => log::trace!("line {lineno}: skipping directive {m}"),
            m if m.starts_with(':') => push(&mut current, lineno, m, Vec::new())?,
            m => {
                let operands = parse_operands(rest).map_err(|_| FactsError::Parsing {
                    line: lineno,
                    text: raw.to_string(),
                })?;
                push(&mut current, lineno, m, operands)?;
            }
        }
    }

    if let Some(method) = current {
        log::warn!("unterminated method {}", method.qualified_name);
        listing.methods.push(method);
    }

    Ok(listing)
}

fn push(
    current: &mut Option<ListedMethod>,
    lineno: usize,
    mnemonic: &str,
    operands: Vec<Operand>,
) -> FactsResult<()> {
    let method = current.as_mut().ok_or(FactsError::OutsideMethod(lineno))?;
    method.body.push(ListedInstr {
        mnemonic: mnemonic.to_string(),
        operands,
    });
    Ok(())
}

/// Tokenizes the operands part of an instruction line.
pub fn parse_operands(input: &str) -> Result<Vec<Operand>, nom::error::Error<&str>> {
    all_consuming(terminated(
        separated_list0(tuple((space0, char(','), space0)), operand),
        space0,
    ))(input)
    .finish()
    .map(|(_, operands)| operands)
}

// Removes a trailing `#` comment, ignoring `#` inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => (),
        }
    }
    line
}

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((register_group, string_literal, bare_token))(input)
}

fn register(input: &str) -> IResult<&str, Reg> {
    map_res(recognize(pair(one_of("vp"), digit1)), str::parse::<Reg>)(input)
}

fn register_group(input: &str) -> IResult<&str, Operand> {
    delimited(
        pair(char('{'), space0),
        alt((
            map(
                separated_pair(register, tuple((space0, tag(".."), space0)), register),
                |(first, last)| Operand::RegRange(first, last),
            ),
            map(
                separated_list0(tuple((space0, char(','), space0)), register),
                Operand::RegList,
            ),
        )),
        pair(space0, char('}')),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, Operand> {
    map(
        delimited(
            char('"'),
            opt(escaped(is_not("\\\""), '\\', anychar)),
            char('"'),
        ),
        |s: Option<&str>| Operand::Str(s.unwrap_or_default().to_string()),
    )(input)
}

fn bare_token(input: &str) -> IResult<&str, Operand> {
    map(
        verify(is_not(","), |raw: &str| {
            let raw = raw.trim();
            !raw.is_empty() && !raw.starts_with(['{', '"'])
        }),
        |raw: &str| Operand::classify(raw.trim()),
    )(input)
}

fn label(input: &str) -> IResult<&str, Operand> {
    map(
        preceded(
            char(':'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ),
        |name: &str| Operand::Label(name.to_string()),
    )(input)
}

// `.catch Lx; {:try_start_0 .. :try_end_0} :catch_0`, type omitted for `.catchall`.
fn catch_operands(input: &str) -> IResult<&str, Vec<Operand>> {
    let (input, exception) = opt(terminated(
        map(is_not(" {"), |t: &str| Operand::Type(t.to_string())),
        space1,
    ))(input)?;
    let (input, (start, end)) = delimited(
        pair(char('{'), space0),
        separated_pair(label, tuple((space0, tag(".."), space0)), label),
        pair(space0, char('}')),
    )(input)?;
    let (input, handler) = preceded(space1, label)(input)?;
    let (input, _) = space0(input)?;

    let mut operands: Vec<Operand> = exception.into_iter().collect();
    operands.extend([start, end, handler]);
    Ok((input, operands))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_parser() {
        assert_eq!(parse_operands("").unwrap(), vec![]);
        assert_eq!(
            parse_operands("v0, \"a, b # c\"").unwrap(),
            vec![Operand::Reg(Reg::local(0)), Operand::Str("a, b # c".into())]
        );
        assert_eq!(
            parse_operands("{v0 .. v3}, Lx;->m(IIII)V").unwrap(),
            vec![
                Operand::RegRange(Reg::local(0), Reg::local(3)),
                Operand::Method("Lx;->m(IIII)V".into())
            ]
        );
        assert_eq!(
            parse_operands("{p0, v1}, Lx;->m(I)V").unwrap(),
            vec![
                Operand::RegList(vec![Reg::param(0), Reg::local(1)]),
                Operand::Method("Lx;->m(I)V".into())
            ]
        );
        assert_eq!(
            parse_operands("{}, Lx;->n()V").unwrap()[0],
            Operand::RegList(vec![])
        );
        assert_eq!(
            parse_operands("v0, \"\"").unwrap()[1],
            Operand::Str(String::new())
        );
        assert_eq!(
            parse_operands("v0, \"say \\\"hi\\\"\"").unwrap()[1],
            Operand::Str("say \\\"hi\\\"".into())
        );
    }

    #[test]
    fn catch_parser() {
        let (_, ops) = catch_operands("Ljava/lang/Exception; {:try_start_0 .. :try_end_0} :catch_0")
            .unwrap();
        assert_eq!(
            ops,
            vec![
                Operand::Type("Ljava/lang/Exception;".into()),
                Operand::Label("try_start_0".into()),
                Operand::Label("try_end_0".into()),
                Operand::Label("catch_0".into()),
            ]
        );
        let (_, ops) = catch_operands("{:try_start_1 .. :try_end_1} :catchall_0").unwrap();
        assert_eq!(ops.len(), 3);
    }

    #[test]
    fn listing_parser() {
        let listing = parse_listing(
            r#"
.class public Lcom/example/Foo;
.super Ljava/lang/Object;

.method public static m(Ljava/lang/String;)V
    .registers 2
    .annotation runtime Ljava/lang/Deprecated;
    .end annotation

    .line 12
    const-string v0, "secret" # a comment
    :cond_0
    invoke-static {v0}, Lx;->m(Ljava/lang/String;)V
    packed-switch p0, :pswitch_data_0
    return-void

    :pswitch_data_0
    .packed-switch 0x0
        :pswitch_0
    .end packed-switch
.end method
"#,
        )
        .unwrap();

        assert_eq!(listing.methods.len(), 1);
        let method = &listing.methods[0];
        assert_eq!(
            method.qualified_name,
            "Lcom/example/Foo;->m(Ljava/lang/String;)V"
        );
        let mnemonics: Vec<&str> = method.body.iter().map(|i| i.mnemonic.as_str()).collect();
        assert_eq!(
            mnemonics,
            vec![
                "const-string",
                ":cond_0",
                "invoke-static",
                "packed-switch",
                "return-void",
                ":pswitch_data_0"
            ]
        );
        assert_eq!(method.body[0].operands[1], Operand::Str("secret".into()));
    }

    #[test]
    fn listing_errors() {
        assert!(matches!(
            parse_listing("const v0, 0x1"),
            Err(FactsError::OutsideMethod(1))
        ));
        assert!(matches!(
            parse_listing(".method m()V\n  invoke-static {v0, Lx;->m()V\n.end method"),
            Err(FactsError::Parsing { line: 2, .. })
        ));
        assert!(matches!(
            parse_listing(".method m()V\n  const-string v0, \"open\n.end method"),
            Err(FactsError::Parsing { line: 2, .. })
        ));
    }
}
