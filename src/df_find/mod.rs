use crate::prelude::*;
use clap::ArgMatches;

pub fn run(args: &ArgMatches) -> DfResult<()> {
    init_logger(args);

    let store = load_inputs(args)?;

    let mnemonic = args
        .get_one::<String>("mnemonic")
        .ok_or_else(|| DfError::BadArguments("--mnemonic needed".to_string()))?;
    let operands: Vec<&String> = args
        .get_many::<String>("operand")
        .map(Iterator::collect)
        .unwrap_or_default();
    let pattern = InstrPattern::new(mnemonic, &operands)?;

    let found = store.find(&pattern);
    for instr in &found {
        let method = store.qualified_name_of(instr).unwrap_or("?");
        if args.get_flag("json") {
            println!(
                "{}",
                serde_json::json!({ "method": method, "instruction": &**instr })
            );
        } else {
            println!("{}: {instr}    # {method}", instr.addr());
        }
    }

    log::info!("{} matching instructions", found.len());

    Ok(())
}
