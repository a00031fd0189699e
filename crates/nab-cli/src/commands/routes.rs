use super::{load_config, print_json};
use nab_graph::MemoryScope;
use nab_kernel::GraphScope;
use serde::Serialize;
use std::process;
use std::sync::Arc;

pub struct Args {
    pub config: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteRow {
    oracle: String,
    route: String,
    priority: i32,
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_ttl_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concurrent: Option<usize>,
}

pub fn run(args: Args) {
    let config = load_config(args.config.as_deref());

    // The table does not depend on graph contents.
    let scope: Arc<dyn GraphScope> = Arc::new(MemoryScope::new());
    let registry = config.registry(scope, None).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let rows: Vec<RouteRow> = registry
        .oracles()
        .iter()
        .flat_map(|oracle| {
            oracle.routes().iter().map(|route| RouteRow {
                oracle: oracle.name().to_string(),
                route: route.name.clone(),
                priority: route.priority,
                pattern: route.pattern.as_str().to_string(),
                cache_ttl_ms: route.cache_ttl.map(|ttl| ttl.as_millis()),
                concurrent: oracle.available_permits(),
            })
        })
        .collect();

    if args.json {
        print_json(&rows);
        return;
    }

    for row in &rows {
        let ttl = row
            .cache_ttl_ms
            .map(|ms| format!("  ttl={ms}ms"))
            .unwrap_or_default();
        println!(
            "{:<10} {:>4}  {:<14} {}{}",
            row.oracle, row.priority, row.route, row.pattern, ttl
        );
    }
}
