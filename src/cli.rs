//! Main `DroidFlow` binary command line arguments options.
//!
//! This module declares a function to build `clap` command line arguments
//! parser, so that it can be used from other places than the main binary,
//! such as from bash completion file generator.

use clap::{value_parser, Arg, ArgAction, Command};
use clap_complete::Shell;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn arg_debug() -> Arg {
    Arg::new("debug")
        .short('d')
        .long("debug")
        .action(ArgAction::SetTrue)
        .help("Activate debug mode")
}

fn arg_verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Activate verbose mode")
}

fn arg_ecslog() -> Arg {
    Arg::new("ecslog")
        .short('e')
        .long("ecslog")
        .action(ArgAction::SetTrue)
        .help("Output logs in ECS format")
}

fn arg_input() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .action(ArgAction::Append)
        .required(true)
        .help("Input listing file (can be repeated)")
}

fn arg_max_graph_size() -> Arg {
    Arg::new("max-graph-size")
        .long("max-graph-size")
        .action(ArgAction::Set)
        .value_parser(value_parser!(usize))
        .help("Maximum number of nodes of one resolution graph")
}

fn arg_max_stage() -> Arg {
    Arg::new("max-stage")
        .long("max-stage")
        .action(ArgAction::Set)
        .value_parser(value_parser!(u32))
        .help("Maximum recursion depth of one resolution")
}

fn arg_json() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output JSON records, one per line")
}

#[must_use]
pub fn droidflow() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author(AUTHORS)
        .about(DESCRIPTION)
        .subcommand(find())
        .subcommand(graph())
        .subcommand(resolve())
        .subcommand(
            Command::new("gen-completions")
                .about("Generates completions file")
                .arg(
                    Arg::new("shell")
                        .short('s')
                        .long("shell")
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .help("Shell type for completion generation"),
                ),
        )
}

#[must_use]
pub fn find() -> Command {
    Command::new("find")
        .bin_name("df-find")
        .version(VERSION)
        .author(AUTHORS)
        .about("Lists instructions matching a pattern")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(
            Arg::new("mnemonic")
                .short('m')
                .long("mnemonic")
                .action(ArgAction::Set)
                .required(true)
                .help("Mnemonic regex"),
        )
        .arg(
            Arg::new("operand")
                .short('p')
                .long("operand")
                .action(ArgAction::Append)
                .help("Positional operand regex (can be repeated)"),
        )
        .arg(arg_json())
}

#[must_use]
pub fn graph() -> Command {
    Command::new("graph")
        .bin_name("df-graph")
        .version(VERSION)
        .author(AUTHORS)
        .about("Prints the data-flow graph of an instruction")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_max_graph_size())
        .arg(arg_max_stage())
        .arg(
            Arg::new("addr")
                .short('a')
                .long("addr")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .required(true)
                .help("Instruction address"),
        )
}

#[must_use]
pub fn resolve() -> Command {
    Command::new("resolve")
        .bin_name("df-resolve")
        .version(VERSION)
        .author(AUTHORS)
        .about("Resolves invocation arguments to constants or types")
        .after_help(
            "Example:\n $ df-resolve -i app.smali --invocation 'Ljavax/crypto/Cipher;->getInstance' --arg 0",
        )
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_max_graph_size())
        .arg(arg_max_stage())
        .arg(
            Arg::new("invocation")
                .long("invocation")
                .action(ArgAction::Set)
                .required(true)
                .help("Callee regex"),
        )
        .arg(
            Arg::new("filter-method")
                .long("filter-method")
                .action(ArgAction::Set)
                .help("Calling method(s) regex filter"),
        )
        .arg(
            Arg::new("arg")
                .short('a')
                .long("arg")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("Argument index (receiver excluded)"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .action(ArgAction::Set)
                .value_parser(["constant", "possible", "typeset"])
                .default_value("constant")
                .help("What to resolve"),
        )
        .arg(arg_json())
}
