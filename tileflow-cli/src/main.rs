//! Tileflow CLI - fetch, decode and composite map tiles from the command line.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tileflow")]
#[command(version, about = "Fetch map tiles and composite them into a single frame", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a grid of tiles and write the composited frame as PNG
    Fetch {
        /// Map identifier substituted for {map} in the URL template
        #[arg(long, default_value = "0")]
        map_id: u32,

        /// Zoom level
        #[arg(long)]
        zoom: u8,

        /// Column of the top-left tile
        #[arg(long)]
        x: u32,

        /// Row of the top-left tile
        #[arg(long)]
        y: u32,

        /// Number of tile columns to fetch (default: cover the configured frame width)
        #[arg(long)]
        cols: Option<u32>,

        /// Number of tile rows to fetch (default: cover the configured frame height)
        #[arg(long)]
        rows: Option<u32>,

        /// Output PNG path
        #[arg(long, short, default_value = "frame.png")]
        output: PathBuf,

        /// Config file (default: ~/.tileflow/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Decode worker threads, overriding the config (0 = inline)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Fetch {
            map_id,
            zoom,
            x,
            y,
            cols,
            rows,
            output,
            config,
            workers,
        } => commands::fetch::run(FetchArgs {
            map_id,
            zoom,
            x,
            y,
            cols,
            rows,
            output,
            config,
            workers,
        }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "tileflow", "fetch", "--zoom", "3", "--x", "2", "--y", "5", "--cols", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch {
                zoom, x, y, cols, rows, map_id, ..
            } => assert_eq!((map_id, zoom, x, y, cols, rows), (0, 3, 2, 5, Some(2), None)),
            Commands::Config { .. } => panic!("parsed the wrong command"),
        }
    }
}
