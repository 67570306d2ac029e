//! Contains the code used to parse command line parameters for pqc-results.
//!
//! [CliArgs::run] is called by the main function and contains the bulk of the
//! bootstrapping code while the main function just sets up the basic environment

use std::path::PathBuf;

use anyhow::{ensure, Context as _};
use clap::{CommandFactory, Parser, Subcommand};
use log::info;
use pqc_results_util::file::LoadValue;

use crate::algorithms::{
    AlgorithmList, KEM_ALGS_FILE, SIG_ALGS_FILE, TLS_HYBRID_KEM_ALGS_FILE,
    TLS_HYBRID_SIG_ALGS_FILE, TLS_KEM_ALGS_FILE, TLS_SIG_ALGS_FILE,
};
use crate::config::{CollisionPolicy, ResultsConfig};
use crate::layout::{MachineId, ProjectRoot};
use crate::pipeline::{self, Context, Outcome, ToolSelection};

/// Command line arguments to the pqc-results binary.
///
/// Used for parsing with [clap].
#[derive(Parser, Debug)]
#[command(author, version, about, long_about, arg_required_else_help = true)]
pub struct CliArgs {
    /// Lowest log level to show
    #[arg(long = "log-level", value_name = "LOG_LEVEL", group = "log-level")]
    log_level: Option<log::LevelFilter>,

    /// Show verbose log output, sets log level to "debug"
    #[arg(short, long, group = "log-level")]
    verbose: bool,

    /// Show less log output, sets log level to "warn"
    #[arg(short, long, group = "log-level")]
    quiet: bool,

    /// Configuration file, all settings have defaults if left out
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root, overrides the config file and the search for the root marker
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// The subcommand to be invoked
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Generate man pages for the CLI
    ///
    /// This option is used to generate man pages for pqc-results in the specified
    /// directory and exit.
    #[clap(long, value_name = "out_dir")]
    pub generate_manpage: Option<PathBuf>,

    /// Generate completion file for a shell
    ///
    /// This option is used to generate completion files for the specified shell
    #[clap(long, value_name = "shell")]
    pub print_completions: Option<clap_complete::Shell>,
}

/// Machines and run count shared by `parse` and `average`
#[derive(clap::Args, Debug)]
pub struct RunSelection {
    /// Which tool's results to process
    #[arg(value_enum)]
    pub tool: ToolSelection,

    /// Machine to process, may be given more than once
    #[arg(long = "machine-id", value_name = "ID", required = true, num_args = 1..)]
    pub machines: Vec<MachineId>,

    /// Number of benchmarking runs of every machine
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub total_runs: u32,
}

/// represents a command specified via CLI
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Parse raw benchmarking output into per-run tables and averages
    ///
    /// Raw results are read from test-data/up-results, tables are written to
    /// test-data/results. Machines that were parsed before are handled according
    /// to the collision policy.
    Parse {
        #[command(flatten)]
        selection: RunSelection,

        /// What to do if a machine already has parsed results
        #[arg(long, value_enum)]
        on_collision: Option<CollisionPolicy>,
    },

    /// Recompute the averages from run tables parsed earlier
    Average {
        #[command(flatten)]
        selection: RunSelection,
    },

    /// Generate the algorithm list files from the installed libraries
    ///
    /// Runs the liboqs test binaries and/or the OpenSSL binary with the OQS
    /// provider below lib/ and writes test-data/alg-lists. Existing lists are
    /// removed first.
    GenAlgLists {
        #[arg(value_enum)]
        tool: ToolSelection,
    },

    /// Generate a demo config file for pqc-results
    GenConfig {
        config_file: PathBuf,

        /// Forcefully overwrite existing config file
        #[clap(short, long)]
        force: bool,
    },

    /// Validate configuration files and the project layout
    ///
    /// Every given configuration file is parsed and checked. Without files, the
    /// project root and its algorithm lists are checked.
    Validate { config_files: Vec<PathBuf> },
}

impl CliArgs {
    /// Apply the command line parameters to the configuration struct
    pub fn apply_to_config(&self, cfg: &mut ResultsConfig) -> anyhow::Result<()> {
        if let Some(root) = self.root.as_ref() {
            cfg.root = Some(root.clone());
        }
        if let Some(CliCommand::Parse {
            on_collision: Some(policy),
            ..
        }) = self.command.as_ref()
        {
            cfg.collision = *policy;
        }
        Ok(())
    }

    /// returns the log level filter set by CLI args
    /// returns `None` if the user did not specify any log level filter via CLI
    ///
    /// NOTE: the clap feature of ["argument groups"](https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_3/index.html#argument-relations)
    /// ensures that the user can not specify more than one of the possible log level arguments.
    /// Note the `#[arg("group")]` in the [`CliArgs`] struct.
    pub fn get_log_level(&self) -> Option<log::LevelFilter> {
        if self.verbose {
            return Some(log::LevelFilter::Debug);
        }
        if self.quiet {
            return Some(log::LevelFilter::Warn);
        }
        self.log_level
    }

    /// The configuration file merged with the command line
    fn load_config(&self) -> anyhow::Result<ResultsConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => ResultsConfig::load(path)?,
            None => ResultsConfig::default(),
        };
        self.apply_to_config(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn project_root(config: &ResultsConfig) -> anyhow::Result<ProjectRoot> {
        let root = match config.root.as_ref() {
            Some(dir) => ProjectRoot::at(dir)?,
            None => {
                let cwd = std::env::current_dir().context("could not determine current directory")?;
                ProjectRoot::discover(cwd)?
            }
        };
        info!("project root is {:?}", root.path());
        Ok(root)
    }

    /// Run pqc-results with the given command line parameters
    ///
    /// This contains the bulk of our startup logic with
    /// the main function just setting up the basic environment
    /// and then calling this function.
    pub fn run(self) -> anyhow::Result<()> {
        if let Some(dir) = self.generate_manpage.as_ref() {
            std::fs::create_dir_all(dir)?;
            clap_mangen::generate_to(Self::command(), dir)?;
            return Ok(());
        }

        if let Some(shell) = self.print_completions {
            let mut cmd = Self::command();
            clap_complete::generate(shell, &mut cmd, "pqc-results", &mut std::io::stdout());
            return Ok(());
        }

        use CliCommand::*;
        match &self.command {
            Some(Parse { selection, .. }) => {
                let config = self.load_config()?;
                let root = Self::project_root(&config)?;
                let mut ctx = Context::new(root, config, selection.total_runs as usize);
                match pipeline::parse(&mut ctx, selection.tool, &selection.machines)? {
                    Outcome::Completed => info!("parsing complete"),
                    Outcome::Aborted => {
                        info!("parsing stopped, move the old results away and run again")
                    }
                }
            }

            Some(Average { selection }) => {
                let config = self.load_config()?;
                let root = Self::project_root(&config)?;
                let ctx = Context::new(root, config, selection.total_runs as usize);
                pipeline::average_only(&ctx, selection.tool, &selection.machines)?;
                info!("averaging complete");
            }

            Some(GenAlgLists { tool }) => {
                let config = self.load_config()?;
                let root = Self::project_root(&config)?;
                crate::alg_lists::generate(&root, *tool, &config.tls)?;
            }

            Some(GenConfig { config_file, force }) => {
                ensure!(
                    *force || !config_file.exists(),
                    "config file {config_file:?} already exists"
                );

                ResultsConfig::example_config().store(config_file)?;
            }

            Some(Validate { config_files }) if !config_files.is_empty() => {
                for file in config_files {
                    match ResultsConfig::load(file) {
                        Ok(config) => {
                            eprintln!("{file:?} is valid TOML and conforms to the expected schema");
                            match config.validate() {
                                Ok(_) => eprintln!("{file:?} has passed all logical checks"),
                                Err(err) => eprintln!("{file:?} contains logical errors: '{err}'"),
                            }
                        }
                        Err(e) => eprintln!("{file:?} is not valid: {e}"),
                    }
                }
            }

            Some(Validate { .. }) => {
                let config = self.load_config()?;
                let root = Self::project_root(&config)?;
                eprintln!("project root {:?} found", root.path());
                let dir = root.alg_lists_dir();
                for file in [
                    KEM_ALGS_FILE,
                    SIG_ALGS_FILE,
                    TLS_KEM_ALGS_FILE,
                    TLS_SIG_ALGS_FILE,
                    TLS_HYBRID_KEM_ALGS_FILE,
                    TLS_HYBRID_SIG_ALGS_FILE,
                ] {
                    match AlgorithmList::load(dir.join(file)) {
                        Ok(list) => eprintln!("{file} lists {} algorithms", list.len()),
                        Err(_) => eprintln!("{file} is missing"),
                    }
                }
            }

            None => {} // clap prints help if no command is given
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let cli = CliArgs::try_parse_from([
            "pqc-results",
            "-v",
            "--root",
            "/data/pqc",
            "parse",
            "both",
            "--machine-id",
            "1",
            "2",
            "--total-runs",
            "10",
            "--on-collision",
            "overwrite",
        ])
        .unwrap();
        assert_eq!(cli.get_log_level(), Some(log::LevelFilter::Debug));

        let Some(CliCommand::Parse { selection, .. }) = cli.command.as_ref() else {
            panic!("expected the parse command");
        };
        assert_eq!(selection.tool, ToolSelection::Both);
        assert_eq!(selection.machines.len(), 2);
        assert_eq!(selection.total_runs, 10);

        let mut config = ResultsConfig::default();
        cli.apply_to_config(&mut config).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/data/pqc")));
        assert_eq!(config.collision, CollisionPolicy::Overwrite);
    }

    #[test]
    fn test_rejects_zero_runs_and_empty_machine() {
        let parse = |args: &[&str]| {
            let mut full = vec!["pqc-results", "average", "liboqs"];
            full.extend_from_slice(args);
            CliArgs::try_parse_from(full)
        };
        assert!(parse(&["--machine-id", "1", "--total-runs", "0"]).is_err());
        assert!(parse(&["--machine-id", "", "--total-runs", "1"]).is_err());
        assert!(parse(&["--total-runs", "1"]).is_err());
        assert!(parse(&["--machine-id", "1", "--total-runs", "1"]).is_ok());
    }

    #[test]
    fn test_log_level_flags_conflict() {
        assert!(CliArgs::try_parse_from(["pqc-results", "-v", "-q", "validate"]).is_err());
        let cli =
            CliArgs::try_parse_from(["pqc-results", "--log-level", "trace", "validate"]).unwrap();
        assert_eq!(cli.get_log_level(), Some(log::LevelFilter::Trace));
    }
}
