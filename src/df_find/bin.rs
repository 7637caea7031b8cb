use droidflow::prelude::DfResult;
use droidflow::{cli, df_find};

fn main() -> DfResult<()> {
    let args = cli::find().get_matches();
    df_find::run(&args)
}
