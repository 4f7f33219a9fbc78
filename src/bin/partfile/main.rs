use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

use partfile::PartConfig;

mod cli;
mod cmd_merge;
mod cmd_split;
mod cmd_verify;

fn init_logger() {
    // Level from RUST_LOG, info by default.
    // Example: RUST_LOG=debug partfile split ./big.iso 4
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();

    let mut cfg = PartConfig::from_env();
    if let Some(dir) = cli.dir {
        cfg = cfg.with_store_dir(dir);
    }

    match cli.cmd {
        cli::Cmd::Split { file, parts, index } => {
            if index.is_some() {
                cfg = cfg.with_index_path(index);
            }
            cmd_split::exec(&cfg, file, parts, cli.json)
        }

        cli::Cmd::Merge {
            index,
            verify,
            output,
        } => cmd_merge::exec(&cfg, index, verify, output, cli.json),

        cli::Cmd::Verify { index } => cmd_verify::exec(&cfg, index, cli.json),
    }
}
