//! CLI definitions and command dispatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::{
    config::RunConfig,
    distribute::{Strategy, run},
    load_sources::{SourceSelection, load_sources},
};

#[derive(Parser)]
#[command(name = "gen-instances")]
#[command(about = "Generate static instances from a designspace, one distribution strategy per subcommand")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GenerateArgs {
    /// Designspace document describing axes, sources and instances
    pub designspace: PathBuf,
    /// Directory receiving `{family}-{style}.ttf` files; created if missing
    pub output_dir: PathBuf,
    /// Number of workers (defaults to the available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

impl GenerateArgs {
    pub fn into_config(self) -> Result<RunConfig> {
        RunConfig::new(self.designspace, self.output_dir, self.jobs)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate every instance on the calling thread
    Serial {
        designspace: PathBuf,
        output_dir: PathBuf,
    },
    /// Thread pool; each task receives its own copy of the instantiator
    Copy {
        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Worker threads sharing one instantiator
    Shared {
        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Thread pool; each task reloads the designspace and rebuilds
    Reread {
        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Async runtime dispatching blocking generation tasks
    Async {
        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Load master fonts eagerly and report the time taken
    LoadSources {
        /// Load the sources of this designspace
        #[arg(long, conflicts_with = "fonts")]
        designspace: Option<PathBuf>,
        /// Font files or glob patterns
        #[arg(required_unless_present = "designspace")]
        fonts: Vec<String>,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Serial { designspace, output_dir } => {
                run(Strategy::Serial, &RunConfig::new(designspace, output_dir, Some(1))?)?;
            }
            Commands::Copy { args } => {
                run(Strategy::Copy, &args.into_config()?)?;
            }
            Commands::Shared { args } => {
                run(Strategy::Shared, &args.into_config()?)?;
            }
            Commands::Reread { args } => {
                run(Strategy::Reread, &args.into_config()?)?;
            }
            Commands::Async { args } => {
                run(Strategy::Async, &args.into_config()?)?;
            }
            Commands::LoadSources { designspace, fonts } => {
                let selection = match designspace {
                    Some(path) => SourceSelection::Designspace(path),
                    None => SourceSelection::Patterns(fonts),
                };
                load_sources(&selection)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_jobs() {
        let cli = Cli::parse_from(["gen-instances", "copy", "A.designspace", "out", "-j", "3"]);
        let Commands::Copy { args } = cli.command else {
            panic!("expected copy");
        };
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.into_config().unwrap().jobs, 3);
    }

    #[test]
    fn load_sources_needs_input() {
        assert!(Cli::try_parse_from(["gen-instances", "load-sources"]).is_err());
        assert!(
            Cli::try_parse_from(["gen-instances", "load-sources", "--designspace", "A.designspace"])
                .is_ok()
        );
    }
}
