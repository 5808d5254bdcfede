use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use trio_mendelian_check::output::{default_output_prefix, print_summary};
use trio_mendelian_check::{
    group_by_trio, join_pedigree, CallsTableParser, FamParser, MendelianChecker, ReportGenerator,
    RunSummary,
};

/// Mendelian violation checks for STR genotype calls in family trios
#[derive(Parser, Debug)]
#[command(
    name = "trio-mendelian-check",
    version,
    about = "Check STR genotype calls in family trios for Mendelian violations",
    long_about = r#"
Matches every proband in a combined STR calls table with the calls of both
parents (from a PLINK .fam pedigree) and checks each trio-locus for:
- exact allele consistency, with the minimum repeat-count distance
- confidence-interval overlap consistency, with the minimum interval distance

Writes <prefix>.mendelian_violations.tsv and <prefix>.non_trio_rows.tsv.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Combined STR calls table (.tsv or .tsv.gz)
    #[arg(value_name = "CALLS_TSV", value_hint = ValueHint::FilePath)]
    calls_table: Option<PathBuf>,

    /// .fam file describing parent-child relationships of the sample ids in the calls table
    #[arg(short, long, value_name = "FILE", env = "TRIO_FAM_FILE", value_hint = ValueHint::FilePath)]
    fam_file: Option<PathBuf>,

    /// Output path prefix (default: calls table path without .tsv)
    #[arg(short, long, value_name = "PREFIX", value_hint = ValueHint::AnyPath)]
    output_prefix: Option<PathBuf>,

    /// Also write a JSON run summary to this file
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    summary_json: Option<PathBuf>,

    /// Don't print the per-locus violation tables
    #[arg(long)]
    no_summary: bool,

    /// Interactive mode with prompts for the input files
    #[arg(short, long)]
    interactive: bool,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Generate shell completions
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions { shell: Shell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return Ok(());
    }

    if let Some(Commands::Completions { shell }) = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    init_logging(cli.verbose);

    let config = if cli.interactive {
        run_interactive_mode(&cli)?
    } else {
        AppConfig::from_cli(&cli)?
    };

    info!("Starting Mendelian violation check...");
    run_check(config)
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("trio_mendelian_check={}", level))
        .init();
}

fn run_interactive_mode(cli: &Cli) -> Result<AppConfig> {
    println!(
        "{}",
        style("Trio Mendelian Check - Interactive Mode").cyan().bold()
    );
    println!();

    let theme = ColorfulTheme::default();

    let calls_table: String = Input::with_theme(&theme)
        .with_prompt("Combined STR calls table")
        .interact_text()?;
    let calls_table = PathBuf::from(calls_table);

    let fam_file: String = Input::with_theme(&theme)
        .with_prompt("Pedigree .fam file")
        .interact_text()?;

    let output_prefix: String = Input::with_theme(&theme)
        .with_prompt("Output prefix")
        .default(default_output_prefix(&calls_table).display().to_string())
        .interact_text()?;

    let print_summary = Confirm::with_theme(&theme)
        .with_prompt("Print per-locus violation tables?")
        .default(true)
        .interact()?;

    let config = AppConfig {
        calls_table,
        fam_file: PathBuf::from(fam_file),
        output_prefix: PathBuf::from(output_prefix),
        summary_json: cli.summary_json.clone(),
        print_summary,
    };
    config.validate()?;

    Ok(config)
}

fn run_check(config: AppConfig) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    // Step 1: Load inputs
    pb.set_message("Parsing STR calls table...");
    let calls = CallsTableParser::new()
        .parse(&config.calls_table)
        .with_context(|| format!("Failed to parse {}", config.calls_table.display()))?;

    pb.set_message("Parsing pedigree...");
    let pedigree = FamParser::new()
        .parse(&config.fam_file)
        .with_context(|| format!("Failed to parse {}", config.fam_file.display()))?;

    let mut records = calls.records;
    join_pedigree(&mut records, &pedigree);

    // Step 2: Group into trios
    pb.set_message("Grouping calls by trio...");
    let grouping = group_by_trio(&records);

    // Step 3: Score
    pb.set_message("Checking trios for Mendelian violations...");
    let report = MendelianChecker::new().check(&grouping.trios)?;

    // Step 4: Write outputs
    pb.set_message("Writing results...");
    let generator = ReportGenerator::new(&config.output_prefix, calls.has_read_support);
    let violation_rows = generator.write_violations(&report.results)?;
    let non_trio_rows = generator.write_non_trio(&grouping.non_trio)?;

    if let Some(path) = &config.summary_json {
        let summary = RunSummary::new(
            &config.calls_table,
            &config.fam_file,
            records.len(),
            grouping.trio_count,
            non_trio_rows,
            &report,
        );
        generator.write_json_summary(path, &summary)?;
    }

    pb.finish_and_clear();

    if config.print_summary {
        print_summary(&report);
        println!();
    }

    println!(
        "{} Processed {} calls in {} trios",
        style("✓").green().bold(),
        report.trio_rows(),
        grouping.trio_count
    );
    print_written(violation_rows, &generator.violations_path());
    print_written(non_trio_rows, &generator.non_trio_path());
    if let Some(path) = &config.summary_json {
        println!("Wrote summary to {}", style(path.display()).cyan());
    }

    Ok(())
}

fn print_written(rows: usize, path: &Path) {
    println!("Wrote {} rows to {}", rows, style(path.display()).cyan());
}

#[derive(Debug)]
struct AppConfig {
    calls_table: PathBuf,
    fam_file: PathBuf,
    output_prefix: PathBuf,
    summary_json: Option<PathBuf>,
    print_summary: bool,
}

impl AppConfig {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let Some(calls_table) = cli.calls_table.clone() else {
            bail!("No calls table given (pass CALLS_TSV or use --interactive)");
        };
        let Some(fam_file) = cli.fam_file.clone() else {
            bail!("No pedigree given (pass --fam-file or set TRIO_FAM_FILE)");
        };

        let output_prefix = cli
            .output_prefix
            .clone()
            .unwrap_or_else(|| default_output_prefix(&calls_table));

        let config = Self {
            calls_table,
            fam_file,
            output_prefix,
            summary_json: cli.summary_json.clone(),
            print_summary: !cli.no_summary,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for path in [&self.calls_table, &self.fam_file] {
            if !path.is_file() {
                bail!("{} not found", path.display());
            }
        }
        Ok(())
    }
}
