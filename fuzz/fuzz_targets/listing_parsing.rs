#![no_main]

use df_analysis::{DataFlow, FlowConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(store) = df_facts::load_str(text) else {
        return;
    };
    let flow = DataFlow::new(&store, FlowConfig::default().with_max_graph_size(1 << 10));
    for instr in store.iter_instructions() {
        let _ = flow.analyze(instr);
    }
});
