use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use wavclass::batch;
use wavclass::report::{self, ResultLog, Summary};
use wavclass::{ChunkPipeline, PipelineConfig, PredictionEngine, RandomForest};

#[derive(Parser, Debug)]
#[command(name = "wavclass")]
#[command(author, version, about = "Classify fixed-size chunks of WAV recordings by their spectrum")]
struct Args {
    /// WAV file or directory of WAV files
    path: PathBuf,

    /// Append per-file results here (default: <dir>/result.txt)
    #[arg(long)]
    result_file: Option<PathBuf>,

    /// Write feature logs here instead of next to each WAV
    #[arg(long)]
    features_dir: Option<PathBuf>,

    /// Random-forest model as JSON (default: built-in model)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Summary report for the whole run (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and the result lines
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "wavclass=debug"
    } else if args.quiet {
        "wavclass=warn"
    } else {
        "wavclass=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut engine = PredictionEngine::new();
    match &args.model {
        Some(path) => {
            let model = RandomForest::from_file(path)
                .with_context(|| format!("loading model {}", path.display()))?;
            engine.install(model);
        }
        None => engine.initialize().context("loading built-in model")?,
    }

    let config = PipelineConfig::default();
    if engine.n_features() != Some(config.feature_size) {
        bail!(
            "model expects {:?} features, pipeline produces {}",
            engine.n_features(),
            config.feature_size
        );
    }

    let mut pipeline = ChunkPipeline::new(config);
    if !pipeline.is_ready() {
        bail!("pipeline failed to initialize");
    }

    let files = batch::collect_wav_files(&args.path, args.recursive)
        .with_context(|| format!("reading {}", args.path.display()))?;
    info!("found {} WAV file(s) in {}", files.len(), args.path.display());

    if let Some(dir) = &args.features_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let result_path = args
        .result_file
        .clone()
        .unwrap_or_else(|| default_result_path(&args.path));
    let mut result_log = ResultLog::append_to(&result_path)
        .with_context(|| format!("opening {}", result_path.display()))?;

    let pb = if !args.quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let reports = batch::run_batch(
        &mut pipeline,
        &engine,
        &files,
        args.features_dir.as_deref(),
        &mut result_log,
        |r| {
            let print = || println!("{}", report::result_line(r));
            match &pb {
                Some(pb) => {
                    pb.suspend(print);
                    pb.inc(1);
                    pb.set_message(r.file_name.clone());
                }
                None => print(),
            }
        },
    );

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let Some(output) = &args.output {
        report::generate(output, &reports)
            .with_context(|| format!("writing report {}", output.display()))?;
        info!("report saved: {}", output.display());
    }

    if !args.quiet {
        let summary = Summary::from_reports(&reports);
        eprintln!("\n{}", "─".repeat(60));
        eprintln!("Files:     {}", summary.total);
        eprintln!("Completed: {}", summary.completed);
        if summary.aborted > 0 {
            eprintln!("Aborted:   {}", summary.aborted);
        }
        if summary.skipped > 0 {
            eprintln!("Skipped:   {}", summary.skipped);
        }
        eprintln!(
            "Chunks:    {} ({} positive, {:.4})",
            summary.chunks,
            summary.positive,
            summary.overall_ratio()
        );
        eprintln!("Results:   {}", result_path.display());
    }

    Ok(())
}

/// `result.txt` inside the corpus directory, or beside a single file
fn default_result_path(path: &Path) -> PathBuf {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or_else(|| Path::new("."))
    };
    dir.join("result.txt")
}
