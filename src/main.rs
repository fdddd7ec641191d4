use clap::{Parser, Subcommand};
use sigmf_archive::archive::{ArchiveReader, RecordingSet};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "sigmf-archive", about = "Inspect SigMF archives without extracting them")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the recordings in an archive
    List {
        /// Archive path, or `-` for stdin
        input: PathBuf,
    },
    /// Print recording metadata as JSON
    Info {
        input: PathBuf,
        /// Only this recording
        #[arg(short, long)]
        recording: Option<String>,
    },
    /// Check metadata and dataset checksums of one or more archives
    Validate {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Skip reading datasets to verify checksums
        #[arg(long)]
        skip_checksum: bool,
    },
    /// Write a recording's raw dataset bytes to stdout
    Cat {
        input: PathBuf,
        recording: String,
        #[arg(long)]
        skip_checksum: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(io::stderr).init();

    match cli.command {

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let set = open_archive(&input, true)?;
            println!("Archive: {}", input.display());
            println!("{:<26} {:>9} {:>14} {:>12} {:>12}",
                     "Name", "Datatype", "Sample rate", "Bytes", "Samples");
            for rec in &set {
                let md = rec.metadata();
                let datatype = md.datatype().map(|d| d.to_string()).unwrap_or_else(|_| "?".into());
                let rate = md.sample_rate().map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                let bytes = rec.dataset().map(|d| d.size().to_string()).unwrap_or_else(|| "-".into());
                let samples = rec.sample_count().map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<26} {:>9} {:>14} {:>12} {:>12}",
                    rec.name(), datatype, rate, bytes, samples);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, recording } => {
            let set = open_archive(&input, true)?;
            let selected: Vec<_> = match &recording {
                Some(name) => vec![set.get_by_name(name)
                    .ok_or_else(|| format!("no recording named `{name}`"))?],
                None => set.iter().collect(),
            };
            for rec in selected {
                println!("── {} ({})", rec.name(), rec.metadata_path());
                println!("{}", rec.metadata().to_json_pretty()?);
            }
        }

        // ── Validate ─────────────────────────────────────────────────────────
        Commands::Validate { input, skip_checksum } => {
            let mut failed = 0usize;
            for path in &input {
                match validate_archive(path, skip_checksum) {
                    Ok(n)    => info!("file `{}`: {} recording(s) ok", path.display(), n),
                    Err(err) => {
                        error!("file `{}`: {}", path.display(), err);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} archive(s) failed validation", input.len()).into());
            }
        }

        // ── Cat ──────────────────────────────────────────────────────────────
        Commands::Cat { input, recording, skip_checksum } => {
            let set = open_archive(&input, skip_checksum)?;
            let rec = set.get_by_name(&recording)
                .ok_or_else(|| format!("no recording named `{recording}`"))?;
            let data = rec.data()?
                .ok_or_else(|| format!("recording `{recording}` has no dataset"))?;
            let mut out = io::stdout().lock();
            out.write_all(data)?;
            out.flush()?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_archive(path: &Path, skip_checksum: bool) -> sigmf_archive::Result<RecordingSet> {
    let reader = ArchiveReader::new().skip_checksum(skip_checksum);
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        reader.buffer(buf).open()
    } else {
        reader.path(path).open()
    }
}

/// Open and realize every dataset so checksums are exercised.
fn validate_archive(path: &Path, skip_checksum: bool) -> sigmf_archive::Result<usize> {
    let set = open_archive(path, skip_checksum)?;
    for rec in &set {
        rec.data()?;
    }
    Ok(set.len())
}
