use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rusty_enrich::ConfigSelector;
use rusty_enrich::ConfigSource;
use rusty_enrich::EnrichmentJob;
use rusty_enrich::JsonRecordStore;
use rusty_enrich::Outcome;
use rusty_enrich::Schema;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Enrich a record tree with values from an Excel workbook.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Workbook (.xlsx) path or file:// URL
    input: String,

    /// Mapping configuration XML
    #[arg(long, env = "RUSTY_ENRICH_CONFIG", value_name = "PATH")]
    config: PathBuf,

    /// Project name used to select a <config> block
    #[arg(long, env = "RUSTY_ENRICH_PROJECT")]
    project: Option<String>,

    /// Workflow step name used to select a <config> block
    #[arg(long, env = "RUSTY_ENRICH_STEP")]
    step: Option<String>,

    /// Record tree JSON, rewritten in place on success
    #[arg(long, env = "RUSTY_ENRICH_RECORDS", value_name = "PATH")]
    records: PathBuf,

    /// Type rules JSON; every type is accepted when omitted
    #[arg(long, env = "RUSTY_ENRICH_RULESET", value_name = "PATH")]
    ruleset: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rusty_enrich=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting rusty-enrich v{}", env!("CARGO_PKG_VERSION"));

    let schema = match &args.ruleset {
        Some(path) => Schema::load(path).with_context(|| format!("Failed to load ruleset '{}'", path.display()))?,
        None => Schema::permissive(),
    };
    let store = JsonRecordStore::new(&args.records);
    info!("Enriching '{}' from '{}'", store.path().display(), args.input);
    let mut job = EnrichmentJob::new(ConfigSource::File(args.config), store, &args.input)
        .with_selector(ConfigSelector::new(args.project, args.step))
        .with_schema(schema);

    match job.run() {
        Outcome::Done(report) => {
            info!("{:?}", report);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed { .. } => Ok(ExitCode::FAILURE),
    }
}
