use droidflow::prelude::DfResult;
use droidflow::{cli, df_graph};

fn main() -> DfResult<()> {
    let args = cli::graph().get_matches();
    df_graph::run(&args)
}
