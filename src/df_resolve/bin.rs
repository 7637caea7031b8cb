use droidflow::prelude::DfResult;
use droidflow::{cli, df_resolve};

fn main() -> DfResult<()> {
    let args = cli::resolve().get_matches();
    df_resolve::run(&args)
}
