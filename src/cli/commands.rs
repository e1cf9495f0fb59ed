use crate::core::bundle_writer::serialize;
use crate::core::bundler::Bundler;
use crate::core::extractor::Extractor;
use crate::domain::config::Config;
use crate::domain::progress::ProgressReporter;
use crate::infra::config_file::{load_config, write_default_config};
use crate::infra::logger::{print_welcome_message, setup_logger};
use crate::infra::output::{
    create_writer, print_bundle_result, print_extraction_report, print_success, print_warning,
};
use crate::infra::progress::{ConsoleProgress, LogReporter};
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "cpb", version)]
#[command(about = "Bundle a project into a single document and extract it back", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundle a project directory into a single document
    Bundle {
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Output directory, relative to the project directory
        #[arg(short, long)]
        output: Option<String>,

        /// Bundle file name
        #[arg(short, long)]
        filename: Option<String>,

        /// Configuration file instead of the discovered one
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        no_timestamp: bool,

        /// Print the bundle instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Recreate files from a bundle document
    Extract {
        bundle: PathBuf,

        #[arg(short, long, default_value = "./extracted")]
        output: PathBuf,
    },

    /// Write a default cpb.config.json
    Init {
        #[arg(default_value = ".")]
        directory: PathBuf,

        #[arg(long)]
        force: bool,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logger(cli.verbose)?;
    if cli.verbose > 0 {
        print_welcome_message()?;
    }

    match cli.command {
        Commands::Bundle {
            directory,
            output,
            filename,
            config,
            no_timestamp,
            stdout,
        } => {
            info!("Starting bundle command");
            debug!(
                "Command parameters: directory={}, output={:?}, filename={:?}, config={:?}, no_timestamp={}, stdout={}",
                directory.display(),
                output,
                filename,
                config,
                no_timestamp,
                stdout
            );

            let config = load_bundle_config(&directory, config.as_deref())?;
            let config = apply_overrides(config, output, filename, no_timestamp);
            bundle_project(&directory, config, stdout)?;
        }
        Commands::Extract { bundle, output } => {
            info!("Starting extract command");
            extract_bundle(&bundle, output)?;
        }
        Commands::Init { directory, force } => {
            info!("Starting init command");
            let path = write_default_config(&directory, force)?;
            print_success(&format!("Configuration written to {}", path.display()))?;
        }
    }
    Ok(())
}

fn load_bundle_config(directory: &Path, explicit: Option<&Path>) -> anyhow::Result<Config> {
    if !directory.is_dir() {
        anyhow::bail!("Project directory not found: {}", directory.display());
    }
    if let Some(path) = explicit.filter(|p| !p.is_file()) {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let resolution = load_config(directory, explicit);
    if let Some(diagnostic) = &resolution.diagnostic {
        warn!("Using default configuration: {}", diagnostic);
        print_warning(&format!("Using default configuration: {diagnostic}"))?;
    }
    Ok(resolution.config)
}

/// Command-line options win over configuration file values when given.
pub fn apply_overrides(
    mut config: Config,
    output: Option<String>,
    filename: Option<String>,
    no_timestamp: bool,
) -> Config {
    if let Some(output) = output {
        config.output.directory = output;
    }
    if let Some(filename) = filename {
        config.output.filename = filename;
    }
    if no_timestamp {
        config.output.timestamped = false;
    }
    config
}

fn reporter() -> Rc<dyn ProgressReporter> {
    if std::io::stderr().is_terminal() {
        Rc::new(ConsoleProgress::new())
    } else {
        Rc::new(LogReporter)
    }
}

fn bundle_project(directory: &Path, config: Config, to_stdout: bool) -> anyhow::Result<()> {
    let bundler = Bundler::new(directory, config, reporter())
        .with_context(|| format!("Failed to prepare bundle for {}", directory.display()))?;

    if to_stdout {
        let built = bundler.build().context("Failed to build bundle")?;
        let document = serialize(&built.bundle).context("Failed to serialize bundle")?;
        return create_writer(None).write(&document);
    }

    let result = bundler.bundle().context("Failed to create bundle")?;
    print_bundle_result(&result)?;
    Ok(())
}

fn extract_bundle(bundle: &Path, output: PathBuf) -> anyhow::Result<()> {
    let extractor = Extractor::new(output, reporter());
    let report = extractor
        .extract_file(bundle)
        .with_context(|| format!("Failed to extract {}", bundle.display()))?;

    print_extraction_report(&report)?;
    if !report.success() {
        warn!(
            "{} of {} files could not be extracted",
            report.failed, report.total_files
        );
    }
    Ok(())
}
