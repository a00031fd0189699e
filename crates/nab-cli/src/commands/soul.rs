use super::print_json;
use nab_kernel::soul;
use std::process;

pub fn run(raw: String, json: bool) {
    let Some((node_type, params)) = soul::decode(&raw) else {
        eprintln!("error: `{raw}` is not a known soul");
        process::exit(1);
    };

    if json {
        print_json(&serde_json::json!({
            "soul": raw,
            "type": node_type,
            "params": params,
        }));
        return;
    }

    println!("Type: {node_type}");
    for (name, value) in &params {
        println!("  {name} = {value}");
    }
}
