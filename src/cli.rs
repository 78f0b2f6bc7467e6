use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start hoard as a service.
    Daemon {
        /// Address to listen on, overrides `listen_addr` from config.yaml
        #[clap(long)]
        listen: Option<String>,
    },

    /// Add snapshots to the search index, replacing what was indexed
    /// for them before.
    Index {
        /// Snapshot archives (.tar or .tar.gz). Relative paths are
        /// resolved against the library root.
        #[clap(required = true)]
        snapshots: Vec<PathBuf>,
    },

    /// Full-text search of indexed snapshots
    Search {
        /// Search expression, e.g. `rust`, `"exact phrase"`, `wel*`
        #[clap(allow_hyphen_values = true)]
        query: String,

        /// Wrap matched terms in <b></b>
        #[clap(long, default_value = "false")]
        highlight: bool,

        /// Maximum number of tokens in a snippet
        #[clap(short, long)]
        snippet_size: Option<u32>,

        /// Maximum number of results
        #[clap(short = 'n', long)]
        max_count: Option<usize>,
    },
}
