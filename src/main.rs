//! cms-reconcile - compare content between two CMS exports
//!
//! Usage:
//!   cms-reconcile compare --left a.csv --right b.csv      Write report + summary
//!   cms-reconcile extract-export --input export.json     JSON export → CSV
//!   cms-reconcile extract-api --input pages.json         API dump → CSV
//!   cms-reconcile view --left a.csv --right b.csv         Browse the report

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cms_reconcile::{
    load_csv, load_json_file, records_from_api, records_from_export, write_csv, write_report_csv,
    write_summary, ComparisonConfig, ExportOptions, Reconciler, ReconciliationReport, RecordSet,
    Side,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cms-reconcile", version, about = "Reconcile content between two CMS exports")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two sources and write the CSV report and text summary
    Compare {
        #[command(flatten)]
        inputs: CompareArgs,

        /// CSV report path
        #[arg(short, long, default_value = "comparison_report.csv")]
        output: PathBuf,

        /// Text summary path
        #[arg(short, long, default_value = "comparison_summary.txt")]
        summary: PathBuf,
    },
    /// Flatten a JSON export into CSV
    ExtractExport {
        #[command(flatten)]
        extract: ExtractArgs,
    },
    /// Flatten saved API responses into CSV
    ExtractApi {
        #[command(flatten)]
        extract: ExtractArgs,
    },
    /// Compare two sources and browse the result in the terminal
    View {
        #[command(flatten)]
        inputs: CompareArgs,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// CSV with a header row
    Csv,
    /// JSON export with localized fields and a rich-text body
    Export,
    /// Saved API responses with HTML body blocks
    Api,
}

#[derive(Args)]
struct ConfigArgs {
    /// Built-in comparison preset
    #[arg(long, default_value = "articles", value_parser = ["articles", "faq", "legal"])]
    preset: String,

    /// TOML comparison config (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<ComparisonConfig> {
        match &self.config {
            Some(path) => ComparisonConfig::load(path),
            None => ComparisonConfig::preset(&self.preset),
        }
    }
}

#[derive(Args)]
struct CompareArgs {
    /// Left source file
    #[arg(long)]
    left: PathBuf,

    /// Right source file
    #[arg(long)]
    right: PathBuf,

    #[arg(long, value_enum, default_value_t = InputFormat::Csv)]
    left_format: InputFormat,

    #[arg(long, value_enum, default_value_t = InputFormat::Csv)]
    right_format: InputFormat,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct ExtractArgs {
    /// JSON file to read
    #[arg(short, long)]
    input: PathBuf,

    /// CSV file to write
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compare { inputs, output, summary } => run_compare(&inputs, &output, &summary),
        Commands::ExtractExport { extract } => run_extract(&extract, InputFormat::Export),
        Commands::ExtractApi { extract } => run_extract(&extract, InputFormat::Api),
        Commands::View { inputs } => run_view(&inputs),
    }
}

fn load_side(path: &Path, format: InputFormat, side: Side, config: &ComparisonConfig) -> Result<RecordSet> {
    let set = match format {
        InputFormat::Csv => load_csv(path, side, config)?,
        InputFormat::Export => {
            let document = load_json_file(path)?;
            records_from_export(&document, side, config, &ExportOptions::json_export())
        }
        InputFormat::Api => {
            let document = load_json_file(path)?;
            records_from_api(&document, side, config, &ExportOptions::api())
        }
    };

    println!("✓ Loaded {} {} records from {}", set.len(), side.name(), path.display());
    if !set.diagnostics.is_empty() {
        println!("  ⚠️  {} entries skipped (run with -v for details)", set.diagnostics.len());
    }
    Ok(set)
}

fn reconcile(inputs: &CompareArgs) -> Result<ReconciliationReport> {
    let config = inputs.config.load()?;

    println!("\n📂 Loading sources...");
    let left = load_side(&inputs.left, inputs.left_format, Side::Left, &config)?;
    let right = load_side(&inputs.right, inputs.right_format, Side::Right, &config)?;

    println!("\n⚖️  Comparing {} fields...", config.fields.len());
    let report = Reconciler::new(config).reconcile(&left, &right);
    println!("✓ {}", report.summary_line());

    Ok(report)
}

fn run_compare(inputs: &CompareArgs, output: &Path, summary: &Path) -> Result<()> {
    println!("🔍 Content Comparison");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = reconcile(inputs)?;

    println!("\n💾 Writing results...");
    write_report_csv(output, &report)?;
    println!("✓ Report written to {}", output.display());
    write_summary(summary, &report)?;
    println!("✓ Summary written to {}", summary.display());

    let stats = report.summary();
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Match rate: {:.2}%", stats.match_rate());
    for (key, count) in &stats.top_keys {
        println!("   {} - {} mismatching fields", key, count);
    }

    Ok(())
}

fn run_extract(extract: &ExtractArgs, format: InputFormat) -> Result<()> {
    let config = extract.config.load()?;
    let set = load_side(&extract.input, format, side_for(format), &config)?;

    if set.is_empty() {
        bail!("No entries found in {}", extract.input.display());
    }

    let key_column = match side_for(format) {
        Side::Left => config.left_key.as_str(),
        Side::Right => config.right_key.as_str(),
    };
    let mut columns = vec![key_column];
    let others: BTreeSet<&str> = set
        .records()
        .flat_map(|record| record.field_names())
        .filter(|name| *name != key_column)
        .collect();
    columns.extend(others);

    write_csv(&extract.output, &columns, &set)?;
    println!("✓ Wrote {} rows to {}", set.len(), extract.output.display());

    Ok(())
}

/// JSON exports feed the left side, API dumps the right
fn side_for(format: InputFormat) -> Side {
    match format {
        InputFormat::Api => Side::Right,
        InputFormat::Csv | InputFormat::Export => Side::Left,
    }
}

#[cfg(feature = "tui")]
fn run_view(inputs: &CompareArgs) -> Result<()> {
    let report = reconcile(inputs)?;

    println!("\nStarting UI... (Press 'q' to quit)\n");
    let mut app = cms_reconcile::ui::App::new(report);
    cms_reconcile::ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_view(_inputs: &CompareArgs) -> Result<()> {
    bail!("TUI mode not available, rebuild with: cargo build --features tui")
}
