use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod archive;
mod cli;
mod config;
mod document;
mod extract;
mod index;
mod lock;
mod search;
#[cfg(test)]
mod tests;
mod web;

use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = cli::Args::parse();

    let config = Config::load()?;
    let mut library = app::Library::new(&config.library_root());
    log::debug!(
        "library {} (index {})",
        library.root().display(),
        library.index_path().display()
    );

    match args.command {
        cli::Command::Daemon { listen } => {
            let listen_addr = listen.unwrap_or_else(|| config.listen_addr.clone());
            library.run_queue();
            web::start_daemon(library, config, &listen_addr)?;
            Ok(())
        }

        cli::Command::Index { snapshots } => {
            library.run_queue();

            let mut rejected = 0;
            for path in &snapshots {
                if let Err(err) = library.update_index(path) {
                    log::warn!("{}: {err}", path.display());
                    rejected += 1;
                }
            }

            // runs everything queued above before returning
            library.close()?;

            if rejected == snapshots.len() {
                bail!("none of the given snapshots could be queued");
            }
            Ok(())
        }

        cli::Command::Search {
            query,
            highlight,
            snippet_size,
            max_count,
        } => {
            let defaults = config.search.options();
            let opts = search::SearchOptions {
                highlight: highlight || defaults.highlight,
                snippet_size: snippet_size.unwrap_or(defaults.snippet_size),
                max_count: max_count.unwrap_or(defaults.max_count),
            };

            let hits = library.search(&query, &opts)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);

            library.close()?;
            Ok(())
        }
    }
}
