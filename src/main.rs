//! profilekit - Windows profile tooling.
//!
//! Usage:
//!   profilekit rules <TERM>...        Generate an FSLogix hiding rule set
//!   profilekit cleanup --xml <FILE>   Remove aged files from a profile
//!   profilekit --help                 Show help

use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use profilekit_core::{KnownFolders, ScanWarning, SearchTerm};
use profilekit_ops::{
    DeletionReport, ProfileCleanup, RuleSetConfig, RuleSetGenerator, RuleSetLocation,
    RuleSetReport, XmlTargetFile,
};
use profilekit_scan::{AgeScanConfig, RegistryScanner, SystemRegistry};

#[derive(Parser)]
#[command(
    name = "profilekit",
    version,
    about = "Windows profile tooling",
    long_about = "profilekit generates FSLogix hiding rule sets for installed \
                  applications and removes aged files from user profiles."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a hiding rule set for one or more applications
    Rules {
        /// Search terms (e.g. "Visio"); the first names the rule-set file
        #[arg(required = true)]
        terms: Vec<String>,

        /// Folder to scan for matching files and folders (repeatable;
        /// defaults to the Office install locations)
        #[arg(long = "folder")]
        folders: Vec<PathBuf>,

        /// Where to write the rule set (defaults to Documents\FSLogix Rule Sets)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete files older than each target's threshold
    Cleanup {
        /// XML file declaring the cleanup targets
        #[arg(short, long)]
        xml: PathBuf,

        /// Report what would be removed without deleting anything
        #[arg(short = 'n', long, visible_alias = "what-if")]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Rules {
            terms,
            folders,
            output_dir,
            format,
        } => run_rules(terms, folders, output_dir, format),
        Command::Cleanup {
            xml,
            dry_run,
            format,
        } => run_cleanup(xml, dry_run, format),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "profilekit=debug"
    } else {
        "profilekit=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Generate a rule set and print where it went.
fn run_rules(
    terms: Vec<String>,
    folders: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let terms = terms
        .iter()
        .map(SearchTerm::new)
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid search term")?;

    let output_dir = match output_dir {
        Some(dir) => dir,
        None => RuleSetLocation::default_dir()?,
    };

    let config = RuleSetConfig::builder()
        .terms(terms)
        .folders((!folders.is_empty()).then_some(folders))
        .output_dir(output_dir)
        .known_folders(KnownFolders::from_env())
        .build()
        .context("Invalid rule-set configuration")?;

    let generator = RuleSetGenerator::new(RegistryScanner::new(SystemRegistry::new()));
    let report = generator.run(&config).context("Rule-set generation failed")?;

    match format {
        OutputFormat::Text => print_rules_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_rules_report(report: &RuleSetReport) {
    println!();
    println!("{}", "─".repeat(70));
    println!(" Rule set: {}", report.path.display());
    println!("{}", "─".repeat(70));
    println!("   Registry keys  {:>6}", report.key_rules);
    println!("   Folders        {:>6}", report.folder_rules);
    println!("   Files          {:>6}", report.file_rules);
    println!("   Total          {:>6}", report.total_rules());
    println!();

    print_warnings(&report.warnings);
}

/// Run a cleanup pass from an XML target file.
fn run_cleanup(xml: PathBuf, dry_run: bool, format: OutputFormat) -> Result<()> {
    let source = XmlTargetFile::new(&xml);
    let cleanup = ProfileCleanup::new(AgeScanConfig::default(), dry_run);

    let report = cleanup
        .run(&source)
        .with_context(|| format!("Cleanup from {} failed", xml.display()))?;

    match format {
        OutputFormat::Text => print_cleanup_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn print_cleanup_report(report: &DeletionReport) {
    for record in &report.records {
        let modified: DateTime<Local> = record.modified.into();
        let status = match (&record.error, record.deleted) {
            (Some(_), _) => "FAILED",
            (None, true) => "deleted",
            (None, false) => "",
        };
        println!(
            "{}  {:>10}  {}  {}",
            modified.format("%Y-%m-%d %H:%M"),
            humansize::format_size(record.size, humansize::BINARY),
            record.path.display(),
            status
        );
    }

    println!();
    if report.failed > 0 {
        println!("{} file(s) could not be deleted", report.failed);
    }
    println!("{}", report.summary());

    print_warnings(&report.warnings);
}

fn print_warnings(warnings: &[ScanWarning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("{} warning(s):", warnings.len());
    for warning in warnings {
        eprintln!("  {warning}");
    }
}
