use clap::ArgMatches;
use clap_complete::{generate, Shell};
use droidflow::prelude::*;
use droidflow::{cli, df_find, df_graph, df_resolve};
use std::io;

fn main() -> DfResult<()> {
    let args = cli::droidflow().get_matches();

    match &args.subcommand() {
        Some(("find", cmd_args)) => df_find::run(cmd_args),
        Some(("graph", cmd_args)) => df_graph::run(cmd_args),
        Some(("resolve", cmd_args)) => df_resolve::run(cmd_args),
        Some(("gen-completions", sub_args)) => subcommand_gen_completions(sub_args),
        Some((subcommand, _)) => Err(DfError::BadArguments(format!(
            "unknown subcommand '{subcommand}'"
        ))),
        None => Err(DfError::BadArguments("missing subcommand".to_string())),
    }
}

fn subcommand_gen_completions(sub_args: &ArgMatches) -> DfResult<()> {
    let generator = *sub_args
        .get_one::<Shell>("shell")
        .ok_or_else(|| DfError::BadArguments("--shell needed".to_string()))?;
    let mut cmd = cli::droidflow();
    let cmd_name = cmd.get_name().to_string();
    generate(generator, &mut cmd, cmd_name, &mut io::stdout());
    Ok(())
}
