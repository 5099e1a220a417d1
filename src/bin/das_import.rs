use std::process::ExitCode;

use clap::{ArgAction, Parser};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use das_import::app::{ImportReport, ImportRequest, Importer};
use das_import::config::{ConfigLoader, Overrides};
use das_import::das::{DasClient, HttpTransport, SystemClock};
use das_import::error::DasError;
use das_import::output::{JsonOutput, OutputMode};
use das_import::prompt::{AcceptDefaults, ConsolePrompt, FixedAnswer};
use das_import::store::JsonFileStore;
use das_import::sync::{Confirm, SyncOutcome};

#[derive(Parser)]
#[command(name = "das-import")]
#[command(about = "Import a sample from the CMS Data Aggregation System into the dataset store")]
#[command(version, author)]
struct Cli {
    /// Sample (dataset path) to import.
    #[arg(long)]
    sample: String,

    /// Process name; TLatex syntax may be used. Defaults to the primary dataset name.
    #[arg(long)]
    process: Option<String>,

    /// Cross-section.
    #[arg(long, default_value_t = 0.0)]
    xsection: f64,

    /// Centre of mass energy.
    #[arg(long, default_value_t = 0.0)]
    energy: f64,

    /// Comment about the dataset.
    #[arg(long, default_value = "")]
    comment: String,

    /// Host name of the DAS cache server [default: https://cmsweb.cern.ch].
    #[arg(long)]
    host: Option<String>,

    /// Index for returned result.
    #[arg(long)]
    idx: Option<u32>,

    /// Query waiting threshold in seconds [default: 300].
    #[arg(long)]
    threshold: Option<u64>,

    /// Private key file name.
    #[arg(long)]
    key: Option<String>,

    /// Certificate file name.
    #[arg(long)]
    cert: Option<String>,

    /// Keep DAS headers in query results.
    #[arg(long)]
    das_headers: bool,

    /// Dataset store file.
    #[arg(long)]
    store: Option<String>,

    /// JSON config file [default: ./das-import.json when present].
    #[arg(long)]
    config: Option<String>,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Take default answers and print a JSON report.
    #[arg(long)]
    non_interactive: bool,

    /// Answer yes to every question.
    #[arg(long, short = 'y')]
    yes: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DasError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DasError) -> u8 {
    match error {
        DasError::InvalidHost(_)
        | DasError::InvalidDatatype(_)
        | DasError::InvalidDatasetName(_)
        | DasError::ShapeMismatch(_)
        | DasError::MissingField(_)
        | DasError::FieldType { .. }
        | DasError::TimestampParse(_)
        | DasError::ProcessName(_)
        | DasError::ConfigRead(_)
        | DasError::ConfigParse(_) => 2,
        DasError::Http(_)
        | DasError::Status { .. }
        | DasError::MalformedResponse(_)
        | DasError::QueryFailed(_)
        | DasError::Credentials(_) => 3,
        DasError::Store(_) | DasError::DuplicateDataset(_) | DasError::DatasetNotFound(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose > 0 { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let settings = ConfigLoader::resolve(cli.config.as_deref())?.resolve_settings(Overrides {
        host: cli.host,
        threshold: cli.threshold,
        key: cli.key,
        cert: cli.cert,
        idx: cli.idx,
        das_headers: cli.das_headers,
        store: cli.store,
        verbose: cli.verbose,
    })?;

    let transport = HttpTransport::new(&settings.transport)?;
    let client = DasClient::new(settings.client, transport, SystemClock)?;
    let importer = Importer::new(client);

    let request = ImportRequest {
        sample: cli.sample,
        process: cli.process,
        xsection: cli.xsection,
        energy: cli.energy,
        comment: cli.comment,
        idx: settings.idx,
    };

    let mut store = JsonFileStore::open(settings.store_path)?;
    let prompt: Box<dyn Confirm> = if cli.yes {
        Box::new(FixedAnswer(true))
    } else if matches!(output_mode, OutputMode::NonInteractive) {
        Box::new(AcceptDefaults)
    } else {
        Box::new(ConsolePrompt)
    };

    let report = importer.import(&request, &mut store, prompt.as_ref())?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_import(&report).into_diagnostic()?,
        OutputMode::Interactive => print_summary(&report),
    }
    Ok(())
}

fn print_summary(report: &ImportReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";

    let color = match report.outcome {
        SyncOutcome::Skipped => yellow,
        _ => green,
    };
    println!("{color}{} {}{reset}", report.outcome, report.name);
}
