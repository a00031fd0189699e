use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "nab",
    about = "nab: answer listing and vote-count paths from a graph snapshot",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch one path through the standard oracles
    Query {
        /// Oracle path, e.g. `nab/t/front/hot@~ix.pub.`
        path: String,

        /// Path to a graph snapshot (JSON)
        #[arg(long)]
        graph: String,

        /// Path to an engine config (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Fixed clock for topic-day windows (RFC 3339)
        #[arg(long)]
        now: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the route table of every standard oracle
    Routes {
        /// Path to an engine config (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a soul into its node type and parameters
    Soul {
        /// Soul to decode, e.g. `nab/things/abc/comments`
        soul: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
