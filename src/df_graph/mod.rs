use crate::prelude::*;
use clap::ArgMatches;
use nu_ansi_term::Color;

pub fn run(args: &ArgMatches) -> DfResult<()> {
    init_logger(args);

    let store = load_inputs(args)?;
    let flow = DataFlow::new(&store, flow_config(args));

    let addr = Addr(
        *args
            .get_one::<usize>("addr")
            .ok_or_else(|| DfError::BadArguments("--addr needed".to_string()))?,
    );
    let instr = store
        .lookup(addr)
        .ok_or(df_facts::errors::FactsError::InstructionNotFound(addr))?;
    log::info!(
        "analyzing {addr}: {instr} in {}",
        store.qualified_name_of(&instr).unwrap_or("?")
    );

    let mut state = QueryState::new();
    match flow.analyze_in(&instr, &mut state) {
        Some(graph) => {
            for line in graph.to_string().lines() {
                if line.ends_with("<- ?") {
                    println!("{}", Color::Yellow.paint(line));
                } else {
                    println!("{line}");
                }
            }
            let leaves = graph.leaves();
            log::info!("{} leaves:", leaves.len());
            for leaf in leaves {
                log::info!("    {}", Color::Green.paint(format!("{}: {leaf}", leaf.addr())));
            }
        }
        None => println!("{}", Color::Red.paint(format!("{addr}: unresolved"))),
    }

    log::info!("{} program points visited", state.nb_visited());
    if state.nb_truncated() > 0 {
        log::warn!(
            "{} sub-graphs dropped (graph size limit {})",
            state.nb_truncated(),
            flow.config().max_graph_size
        );
    }

    Ok(())
}
