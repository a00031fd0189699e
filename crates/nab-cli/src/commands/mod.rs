pub mod query;
pub mod routes;
pub mod soul;

use nab_oracle::EngineConfig;
use std::path::Path;
use std::process;

/// Engine config from `path`, or defaults; exits on a bad file.
pub fn load_config(path: Option<&str>) -> EngineConfig {
    EngineConfig::load_optional(path.map(Path::new)).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn print_json(value: &impl serde::Serialize) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render json: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}
