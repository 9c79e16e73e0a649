//! colorview: apply a mod pipeline to a gnuplot block file from the command line.

use clap::Parser;
use std::path::{Path, PathBuf};

use colorview::session::{self, SessionConfig};
use colorview::{BlockColumns, GridDataset, Pipeline};

#[derive(Parser)]
#[command(
    name = "colorview",
    version,
    about = "Load colorplot block data, apply a mod pipeline, and save the result"
)]
struct Cli {
    /// Input block file, or a .cv2d session file
    input: PathBuf,

    /// Zero-based x,y,z column indices (block files only)
    #[arg(short, long, default_value = "0,1,2")]
    columns: BlockColumns,

    /// Pipeline text, e.g. "[('Crop', (0.0, 10.0, -5.0, 5.0)), ('Log', ())]"
    #[arg(short, long)]
    pipeline: Option<String>,

    /// Write the processed grid as a block file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write a .cv2d session file for the input and the final pipeline
    #[arg(long)]
    save_session: Option<PathBuf>,

    /// Write the processing history as JSON
    #[arg(long)]
    history: Option<PathBuf>,

    /// Print the final pipeline text and exit without printing a summary
    #[arg(long, default_value_t = false)]
    dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let is_session = cli.input.extension().is_some_and(|e| e == "cv2d");
    let (mut pipeline, datafile, mut config) = if is_session {
        let s = session::open(&cli.input)?;
        (s.pipeline, s.datafile, s.config)
    } else {
        let dataset = GridDataset::load_block_file(&cli.input, cli.columns)?;
        let mut pipeline = Pipeline::new();
        pipeline
            .history_mut()
            .set_source(&cli.input.display().to_string());
        pipeline.set_dataset(dataset);
        let config = SessionConfig {
            datafilecolumns: cli.columns,
            ..Default::default()
        };
        (pipeline, cli.input.clone(), config)
    };

    if let Some(text) = &cli.pipeline {
        pipeline.load(text)?;
    }

    if cli.dump {
        println!("{}", pipeline.dump());
    } else {
        print_summary(&pipeline);
    }

    if let Some(out) = &cli.out {
        let current = pipeline.apply_all()?.clone();
        let comment = format!("# colorview pipeline: {}", pipeline.dump());
        current.save_block_file(out, &comment)?;
    }

    if let Some(path) = &cli.save_session {
        config.datafilename = Some(relative_to(&datafile, path));
        config.pipeline = Some(pipeline.dump());
        config.save(path)?;
    }

    if let Some(path) = &cli.history {
        pipeline.history().save_json(path)?;
        log::info!("Saved processing history to {}", path.display());
    }

    Ok(())
}

fn print_summary(pipeline: &Pipeline) {
    let Some(current) = pipeline.current() else {
        return;
    };
    println!("Pipeline: {}", pipeline.dump());
    println!("  Grid:   {} rows x {} columns", current.ny(), current.nx());
    println!("  x:      {} .. {} (dx {})", current.xleft(), current.xright(), current.dx());
    println!("  y:      {} .. {} (dy {})", current.ybottom(), current.ytop(), current.dy());
    println!("  z:      {} .. {}", current.zmin(), current.zmax());

    let report = pipeline.last_report();
    for failure in &report.failed {
        eprintln!("  skipped: {}", failure);
    }
}

/// Path of `datafile` as stored in a session written to `session_path`:
/// relative to the session's directory when possible.
fn relative_to(datafile: &Path, session_path: &Path) -> PathBuf {
    let base = session_path.parent().unwrap_or_else(|| Path::new(""));
    match datafile.strip_prefix(base) {
        Ok(rel) if !base.as_os_str().is_empty() => rel.to_path_buf(),
        _ => std::fs::canonicalize(datafile).unwrap_or_else(|_| datafile.to_path_buf()),
    }
}
