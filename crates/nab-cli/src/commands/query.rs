use super::{load_config, print_json};
use chrono::{DateTime, Utc};
use nab_graph::MemoryScope;
use nab_kernel::{GraphScope, Listing, VoteCounts};
use nab_oracle::OracleOutput;
use std::process;
use std::sync::Arc;

pub struct Args {
    pub path: String,
    pub graph: String,
    pub config: Option<String>,
    pub now: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let config = load_config(args.config.as_deref());

    let now = args.now.as_deref().map(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                eprintln!("error: invalid --now `{raw}`: {e}");
                process::exit(1);
            })
    });

    let scope = MemoryScope::load_json(&args.graph).unwrap_or_else(|e| {
        eprintln!("error: failed to load graph {}: {e}", args.graph);
        process::exit(1);
    });
    let scope: Arc<dyn GraphScope> = Arc::new(scope);

    let registry = config.registry(scope, now).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });

    tracing::debug!(path = %args.path, graph = %args.graph, "dispatching");
    let output = runtime
        .block_on(async { registry.dispatch(&args.path).await })
        .unwrap_or_else(|e| {
            eprintln!("error: {} ({})", e, e.kind());
            process::exit(1);
        });

    if args.json {
        print_json(&output);
        return;
    }

    match output {
        OracleOutput::Listing(listing) => print_listing(&listing),
        OracleOutput::VoteCounts(votes) => print_votes(&votes),
    }
}

fn print_listing(listing: &Listing) {
    let ids = listing.id_list();
    println!("Listing: {} ({} ids)", listing.name, ids.len());
    for id in ids {
        println!("  {id}");
    }
    let tabs = listing.tab_list();
    if !tabs.is_empty() {
        println!("Tabs:");
        for tab in tabs {
            println!("  {tab}");
        }
    }
    if let Some(topic) = &listing.submit_topic {
        println!("Submit topic: {topic}");
    }
    if let Some(op) = &listing.op_id {
        println!("Op: {op}");
    }
    if let Some(user) = &listing.user_id {
        println!("User: {user}");
    }
    if listing.is_chat == Some(true) {
        println!("Chat: yes");
    }
}

fn print_votes(votes: &VoteCounts) {
    println!(
        "Votes: up {} / down {} / comments {} / score {}",
        votes.up, votes.down, votes.comment, votes.score
    );
}
