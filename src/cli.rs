use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::core::Engine;

#[derive(Parser)]
#[command(name = "simwatch")]
#[command(about = "Runs SimulationCraft and emails you the report when your character's gear changes")]
#[command(version)]
pub struct Cli {
    /// Don't send email, just log what would be sent
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Verbose output; specify twice for debug-level output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration directory
    #[arg(short, long, default_value_os_t = default_confdir())]
    pub confdir: PathBuf,

    /// Ignore overall stats when determining if a character changed
    #[arg(short = 's', long)]
    pub no_stat: bool,

    /// Generate a sample configuration file in the configuration directory and exit
    #[arg(long)]
    pub genconfig: bool,
}

fn default_confdir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".simwatch")
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.genconfig {
            let path = Config::generate_sample(&self.confdir)?;
            println!("Configuration file generated at: {}", path.display());
            return Ok(());
        }

        let mut engine = Engine::new(&self.confdir, self.dry_run, self.no_stat)?;
        engine.run().await?;
        Ok(())
    }
}
