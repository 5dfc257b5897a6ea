use adjusted_balance_builder::{AdjustmentReporter, ReportFilters, SourceConfig};
use clap::Parser;
use log::info;
use std::fs::{self, File};
use std::path::PathBuf;

/// Builds the adjusted report for one filter set and writes it to disk.
#[derive(Parser, Debug)]
#[command(name = "generate_report", version, about)]
struct Cli {
    /// Source configuration (JSON)
    config: PathBuf,

    /// Report filters (JSON with entidad, balhistDesde, balhistHasta)
    filters: PathBuf,

    /// Directory for bundle.json and the per-entity CSVs
    #[arg(short, long, default_value = "report_output")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = SourceConfig::from_json_file(&cli.config)?;
    let filters: ReportFilters = serde_json::from_str(&fs::read_to_string(&cli.filters)?)?;

    let reporter = AdjustmentReporter::new(config);
    info!(
        "Reading ledger {} and index {}",
        reporter.config().ledger_path.display(),
        reporter.config().index_path.display()
    );
    let bundle = reporter.generate_report(&filters)?;

    println!("📘 {}", bundle.file_name);
    for entry in &bundle.toc {
        println!(
            "   {:<16} {:>5}  {}",
            entry.sheet_name, entry.num_entidad, entry.nombre_entidad
        );
    }

    fs::create_dir_all(&cli.output_dir)?;
    fs::write(cli.output_dir.join("bundle.json"), bundle.to_json()?)?;
    for (entry, table) in bundle.toc.iter().zip(&bundle.tables) {
        let file = File::create(cli.output_dir.join(format!("{}.csv", entry.sheet_name)))?;
        table.write_csv(file)?;
    }

    println!("✅ Wrote {} tables to {}", bundle.tables.len(), cli.output_dir.display());
    Ok(())
}
