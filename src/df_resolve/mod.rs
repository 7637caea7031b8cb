use crate::prelude::*;
use clap::ArgMatches;
use nu_ansi_term::Color;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resolution outcome for one call site.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Solved { value: String },
    Possible { values: BTreeSet<String> },
    Types { types: BTreeSet<String> },
    Unsolvable { reason: String },
    NoSuchValue { reason: String },
}

#[derive(Debug, Serialize)]
struct Record<'a> {
    addr: Addr,
    method: &'a str,
    instruction: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Constant,
    Possible,
    Typeset,
}

pub fn run(args: &ArgMatches) -> DfResult<()> {
    init_logger(args);

    let store = load_inputs(args)?;
    let flow = DataFlow::new(&store, flow_config(args));

    let callee = args
        .get_one::<String>("invocation")
        .ok_or_else(|| DfError::BadArguments("--invocation needed".to_string()))?;
    let index = *args
        .get_one::<usize>("arg")
        .ok_or_else(|| DfError::BadArguments("--arg needed".to_string()))?;
    let mode = match args.get_one::<String>("mode").map(String::as_str) {
        Some("possible") => Mode::Possible,
        Some("typeset") => Mode::Typeset,
        _ => Mode::Constant,
    };
    let method_pattern = args
        .get_one::<String>("filter-method")
        .map(|r| Regex::new(r))
        .transpose()?;

    let pattern = InstrPattern::new("^invoke-", &["", callee.as_str()])?;
    let calls: Vec<Arc<Instruction>> = store
        .find(&pattern)
        .into_iter()
        .filter(|call| {
            method_pattern.as_ref().map_or(true, |re| {
                store
                    .qualified_name_of(call)
                    .is_some_and(|name| re.is_match(name))
            })
        })
        .collect();
    log::info!("{} call sites match {callee}", calls.len());

    // each query owns its memoization state, call sites are independent
    let records: Vec<Record> = calls
        .par_iter()
        .map(|call| Record {
            addr: call.addr(),
            method: store.qualified_name_of(call).unwrap_or("?"),
            instruction: call.to_string(),
            outcome: resolve(&flow, call, index, mode),
        })
        .collect();

    let mut nb_solved = 0;
    for record in &records {
        if matches!(
            record.outcome,
            Outcome::Solved { .. } | Outcome::Possible { .. } | Outcome::Types { .. }
        ) {
            nb_solved += 1;
        }
        if args.get_flag("json") {
            println!("{}", serde_json::to_string(record)?);
        } else {
            print_record(record);
        }
    }

    log::info!("resolved arguments: {} / {}", nb_solved, records.len());

    Ok(())
}

fn resolve<S: FactStore + ?Sized>(
    flow: &DataFlow<S>,
    call: &Arc<Instruction>,
    index: usize,
    mode: Mode,
) -> Outcome {
    let res = match mode {
        Mode::Constant => flow
            .solved_constant_data_in_invocation(call, index)
            .map(|value| Outcome::Solved { value }),
        Mode::Possible => flow
            .solved_possible_constant_data_in_invocation(call, index)
            .map(|values| Outcome::Possible { values }),
        Mode::Typeset => flow
            .solved_typeset_in_invocation(call, index)
            .map(|types| Outcome::Types { types }),
    };
    match res {
        Ok(outcome) => outcome,
        Err(AnalysisError::UnsolvableValue { reason, graph }) => {
            if let Some(graph) = graph {
                log::debug!("partial graph at {}:\n{graph}", call.addr());
            }
            Outcome::Unsolvable { reason }
        }
        Err(err) => Outcome::NoSuchValue {
            reason: err.to_string(),
        },
    }
}

fn print_record(record: &Record) {
    let status = match &record.outcome {
        Outcome::Solved { value } => Color::Green.paint(format!("\"{value}\"")),
        Outcome::Possible { values } | Outcome::Types { types: values } => {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            Color::Green.paint(format!("{{{}}}", values.join(", ")))
        }
        Outcome::Unsolvable { reason } => Color::Yellow.paint(format!("unsolvable ({reason})")),
        Outcome::NoSuchValue { reason } => Color::Red.paint(format!("no such value ({reason})")),
    };
    println!("{}: {} in {}", record.addr, record.instruction, record.method);
    println!("    => {status}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(mode: Mode) -> Vec<Outcome> {
        let store = df_facts::load_str(include_str!("../../demos/crypto.smali")).unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let pattern = InstrPattern::new("^invoke-", &["", "Cipher;->getInstance"]).unwrap();
        store
            .find(&pattern)
            .iter()
            .map(|call| resolve(&flow, call, 0, mode))
            .collect()
    }

    #[test]
    fn resolve_constants() {
        let outcomes = outcomes(Mode::Constant);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(&outcomes[0], Outcome::Solved { value } if value == "DES"));
        // field reads are internal nodes, not constants
        assert!(matches!(&outcomes[1], Outcome::Unsolvable { .. }));
    }

    #[test]
    fn resolve_possible_constants() {
        let outcomes = outcomes(Mode::Possible);
        assert!(matches!(
            &outcomes[1],
            Outcome::Possible { values } if values.contains("AES/ECB/PKCS5Padding")
        ));
    }

    #[test]
    fn resolve_out_of_range() {
        let store = df_facts::load_str(include_str!("../../demos/crypto.smali")).unwrap();
        let flow = DataFlow::new(&store, FlowConfig::default());
        let call = store.lookup(Addr(7)).unwrap();
        assert!(matches!(
            resolve(&flow, &call, 3, Mode::Typeset),
            Outcome::NoSuchValue { .. }
        ));
    }

    #[test]
    fn record_json() {
        let record = Record {
            addr: Addr(7),
            method: "La;->m()V",
            instruction: "invoke-static {v0}, La;->n(I)V".to_string(),
            outcome: Outcome::Solved {
                value: "x".to_string(),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"addr":7,"method":"La;->m()V","instruction":"invoke-static {v0}, La;->n(I)V","status":"solved","value":"x"}"#
        );
    }
}
