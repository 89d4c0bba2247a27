use anyhow::Result;
use relbench::{
    config::load_hook_config,
    hook::{format_summary, ReleaseHook},
};

use clap::{Parser, Subcommand};
use env_logger::Env;
use std::io::Read;
use std::{path::PathBuf, process};

const DEFAULT_CONFIG: &str = "relbench.yml";

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Release-time benchmark and version hooks driven by a YAML config"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Hook config
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Patch the manifest version ahead of the release version bump
    PreVersion {
        /// Version being released, e.g. 1.2.0
        version: String,
    },
    /// Warm up, measure and record the release binary ahead of tag creation
    PreTag {
        /// Tag being created, e.g. v1.2.0
        tag: String,
    },
    /// Format timing-tool output piped on stdin into one history row
    Format,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // The formatter runs as a child of the hook itself and needs no configuration
    if let Commands::Format = &cli.command {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        let row = format_summary(&input)?;
        println!("{row}");
        process::exit(0);
    }

    let config = load_hook_config(&cli.config)?;
    let hook = ReleaseHook::new(config)?;

    match &cli.command {
        Commands::PreVersion { version } => hook.on_version_bump(version),
        Commands::PreTag { tag } => hook.on_tag_create(tag),
        Commands::Format => unreachable!(),
    }

    Ok(())
}
