use clap::{Parser, Subcommand};
use evidence_intake::config::{self, DEFAULT_CONFIG_FILE, IntakeConfig};
use evidence_intake::gallery::EvidenceGallery;
use evidence_intake::imaging::{
    EncodedImage, ImageInput, RenderSettings, RustBackend, supported_input_extensions,
};
use evidence_intake::intake::{IntakeError, IntakeQueue, OrderedBatch};
use evidence_intake::output;
use evidence_intake::store::JsonFileStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "evidence-intake")]
#[command(about = "Bounded, crash-resistant intake of high-resolution audit photos")]
#[command(long_about = "\
Bounded, crash-resistant intake of high-resolution audit photos

Photos are processed strictly one at a time. Each becomes a JPEG data URL
no larger than the first resolution tier for its size:

  byte size        tiers            quality
  > 25 MiB         640              0.3
  > 12 MiB         1024, 800        0.5
  smaller          1280, 960        0.6

If a decode ever fails, the process switches to degraded mode: every later
photo goes straight to a single 480px tier on the conservative decode path.
A last attempt at 320px / quality 0.2 runs before a photo is reported as
failed.

Processed photos are stored per evidence slot in <store>/<key>.json.

Run 'evidence-intake gen-config' to generate a documented intake.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Snapshot directory (overrides store.dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Snapshot key (overrides store.key)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process photos or directories of photos into an evidence slot
    Process {
        /// Image files or directories to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Evidence slot (checklist item) the photos belong to
        #[arg(long)]
        slot: String,
    },
    /// List stored photos by slot
    List,
    /// Remove one photo from a slot
    Remove {
        #[arg(long)]
        slot: String,
        /// Position within the slot, as shown by `list`
        #[arg(long)]
        index: usize,
    },
    /// Print a stock intake.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config)?;
    if let Some(dir) = cli.store {
        config.store.dir = dir;
    }
    if let Some(key) = cli.key {
        config.store.key = key;
    }
    config.validate()?;

    let store = JsonFileStore::new(&config.store.dir);
    let mut gallery: EvidenceGallery = store.load(&config.store.key)?.unwrap_or_default();

    match cli.command {
        Command::Process { paths, slot } => {
            let files = collect_photos(&paths);
            let added = process_files(&config, &files, &slot, &mut gallery).await;
            if added > 0 {
                store.save(&config.store.key, &gallery)?;
            }
        }
        Command::List => {
            output::print_gallery(&gallery);
        }
        Command::Remove { slot, index } => {
            gallery.remove(&slot, index)?;
            store.save(&config.store.key, &gallery)?;
            println!(
                "{}",
                output::format_removed(&slot, index, gallery.photos(&slot).len())
            );
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Inputs held in memory at once: one rendering, one waiting.
const IN_FLIGHT: usize = 2;

/// Feed files through one queue, reading each just before it is submitted,
/// and report results in file order.
///
/// Returns the number of photos added to `slot`.
async fn process_files(
    config: &IntakeConfig,
    files: &[PathBuf],
    slot: &str,
    gallery: &mut EvidenceGallery,
) -> usize {
    let queue = IntakeQueue::new(
        Arc::new(RustBackend::new()),
        RenderSettings::from_config(&config.pipeline),
    );
    println!("{}", output::format_batch_header(slot, files.len()));

    let mut batch = OrderedBatch::new(&queue, IN_FLIGHT);
    let mut added = 0;
    for (i, path) in files.iter().enumerate() {
        if let Some(done) = batch.make_room().await {
            added += report(done, slot, gallery);
        }
        match ImageInput::from_path(path) {
            Ok(input) => {
                let len = input.len();
                batch.push((i + 1, path, len), input);
            }
            Err(err) => {
                // Keep output in file order
                while let Some(done) = batch.next().await {
                    added += report(done, slot, gallery);
                }
                print_lines(output::format_unreadable(i + 1, path, &err));
            }
        }
    }
    while let Some(done) = batch.next().await {
        added += report(done, slot, gallery);
    }
    drop(batch);

    let degraded = queue.degradation().is_unstable();
    queue.shutdown().await;
    println!(
        "{}",
        output::format_process_summary(slot, added, files.len(), degraded)
    );
    added
}

/// Print one finished file and add it to the gallery on success.
fn report(
    ((index, path, len), result): ((usize, &PathBuf, u64), Result<EncodedImage, IntakeError>),
    slot: &str,
    gallery: &mut EvidenceGallery,
) -> usize {
    print_lines(output::format_process_result(index, path, Some(len), &result));
    match result {
        Ok(encoded) => {
            gallery.add(slot, encoded);
            1
        }
        Err(_) => 0,
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// Expand directories into the photos they contain, sorted; files pass through.
fn collect_photos(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::warn!("Skipping unreadable entry: {err}");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()))
}
