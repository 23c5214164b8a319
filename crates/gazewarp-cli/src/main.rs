//! gazewarp CLI — edit and apply thin-plate-spline gaze drift corrections.

use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use gazewarp::{
    corrected_path_for, record_path_for, BatchCorrector, CorrectionSession, CorrespondenceStore,
    GazeTable, ScriptFrontend, SessionConfig, StimulusAssets, StoredPairs,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gazewarp")]
#[command(about = "Correct vertical/horizontal drift in gaze recordings with thin-plate splines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the stored corrections to a gaze table.
    Apply(CliApplyArgs),

    /// Edit correspondences stimulus by stimulus from an event script.
    Edit(CliEditArgs),

    /// Print the correction state of every stimulus.
    RecordInfo {
        /// Path to the gaze CSV.
        gaze: PathBuf,

        /// Session config (JSON); only the column names are used.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CliApplyArgs {
    /// Path to the gaze CSV.
    gaze: PathBuf,

    /// Output CSV (default: <gaze>.corrected.csv).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write a per-stimulus summary (JSON).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Session config (JSON); only the column names are used.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliEditArgs {
    /// Path to the gaze CSV.
    gaze: PathBuf,

    /// Restrict drags to vertical displacement.
    #[arg(long)]
    vertical: bool,

    /// Event script (default: stdin).
    #[arg(long)]
    events: Option<PathBuf>,

    /// Directory to write a PNG for every rendered frame.
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Session config (JSON). Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stimulus image directory (default: <gaze dir>/../stimuli).
    #[arg(long)]
    stimuli_dir: Option<PathBuf>,

    /// Window pixels per image pixel.
    #[arg(long)]
    scale: Option<f64>,

    /// Blank border around the image in window pixels.
    #[arg(long)]
    margin: Option<f64>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(args) => run_apply(&args),
        Commands::Edit(args) => run_edit(&args),
        Commands::RecordInfo { gaze, config } => run_record_info(&gaze, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<SessionConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config from {}", p.display());
            SessionConfig::from_json_file(p)
        }
        None => Ok(SessionConfig::default()),
    }
}

fn load_record(gaze: &Path, table: &GazeTable) -> CorrespondenceStore {
    let stimuli = table.stimuli();
    CorrespondenceStore::load_or_default(record_path_for(gaze), stimuli.iter().map(String::as_str))
}

// ── apply ──────────────────────────────────────────────────────────────

fn run_apply(args: &CliApplyArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let mut table = GazeTable::from_path(&args.gaze, &config.columns)?;
    tracing::info!("Loaded {} rows from {}", table.len(), args.gaze.display());

    let store = load_record(&args.gaze, &table);
    let report = BatchCorrector::new(&store).correct(&mut table)?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| corrected_path_for(&args.gaze));
    table.write_path(&out)?;
    tracing::info!(
        "Corrected {} rows across {} stimuli; wrote {}",
        report.corrected_rows(),
        report.corrected_stimuli(),
        out.display()
    );

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

// ── edit ───────────────────────────────────────────────────────────────

fn build_session_config(args: &CliEditArgs) -> CliResult<SessionConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if args.vertical {
        config.vertical_only = true;
    }
    if let Some(dir) = &args.stimuli_dir {
        config.stimuli_dir = Some(dir.clone());
    }
    if let Some(scale) = args.scale {
        config.view.scale = scale;
    }
    if let Some(margin) = args.margin {
        config.view.margin_px = margin;
    }
    config.validate()?;
    Ok(config)
}

fn run_edit(args: &CliEditArgs) -> CliResult<()> {
    let config = build_session_config(args)?;
    let table = GazeTable::from_path(&args.gaze, &config.columns)?;
    let mut store = load_record(&args.gaze, &table);
    let assets = StimulusAssets::new(
        config.stimuli_dir_for(&args.gaze),
        config.image_suffix.clone(),
    );
    tracing::info!(
        "Editing {} stimuli; images from {}",
        table.stimuli().len(),
        assets.dir().display()
    );

    let input: Box<dyn BufRead> = match &args.events {
        Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(std::io::stdin().lock()),
    };
    let mut frontend = ScriptFrontend::new(input);
    if let Some(dir) = &args.preview_dir {
        std::fs::create_dir_all(dir)?;
        frontend = frontend.with_preview_dir(dir);
    }

    let summary = CorrectionSession::new(&table, &mut store, &assets, &config).run(&mut frontend)?;
    tracing::info!(
        "Visited {} stimuli ({} frames); record at {}",
        summary.visited,
        frontend.frames(),
        store.path().display()
    );
    Ok(())
}

// ── record-info ────────────────────────────────────────────────────────

fn run_record_info(gaze: &Path, config: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let table = GazeTable::from_path(gaze, &config.columns)?;
    let store = load_record(gaze, &table);

    println!("record: {}", store.path().display());
    if store.is_empty() {
        println!("  no stimuli in {}", gaze.display());
        return Ok(());
    }
    println!(
        "  corrected: {}/{} stimuli",
        store.corrected_count(),
        store.len()
    );
    for (stimulus, rows) in table.rows_by_stimulus() {
        let rows = rows.len();
        match store.get(&stimulus) {
            StoredPairs::Defined(pairs) => {
                println!("  {:<24} {:>6} rows  {} pairs", stimulus, rows, pairs.len())
            }
            StoredPairs::Uncorrected => {
                println!("  {:<24} {:>6} rows  uncorrected", stimulus, rows)
            }
        }
    }
    Ok(())
}
