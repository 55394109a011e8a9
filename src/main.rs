use clap::{Parser, Subcommand};
use longstitch::exif::{ExifCodec, MetadataCodec};
use longstitch::export::DirectoryStore;
use longstitch::live::{HttpLiveCapture, LiveCaptureService};
use longstitch::{config, inputs, output, stitch};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "longstitch")]
#[command(about = "Stitch images into one tall JPEG")]
#[command(long_about = "\
Stitch images into one tall JPEG

Images are stacked top to bottom in the order given. The first image sets
the output width; every other image is scaled to that width, keeping its
aspect ratio. The result is a JPEG at maximum quality carrying the EXIF
metadata of the first image.

Inputs may be files or directories. A directory contributes its images in
natural filename order (shot-2.jpg before shot-10.jpg):

  longstitch stitch cover.jpg pages/ footer.png

Settings are read from ./longstitch.toml when present, or from --config.
Run 'longstitch gen-config' to print a documented default config.

Logging goes to stderr; set RUST_LOG=debug for per-stage detail.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./longstitch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stitch images vertically into one JPEG
    Stitch {
        /// Image files or directories, top to bottom
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory (overrides output.dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Show the EXIF metadata of an image
    Inspect {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload images to the live-capture service
    Live {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Service URL (overrides live.endpoint)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Print a stock longstitch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Stitch { inputs, out_dir } => {
            let cwd = std::env::current_dir()?;
            let config = config::load_config(cli.config.as_deref(), &cwd)?;
            init_thread_pool(&config.processing);

            let files = inputs::collect_inputs(&inputs)?;
            let dir = out_dir.unwrap_or_else(|| config.output.dir.clone());
            let store = DirectoryStore::new(dir);
            let options = stitch::StitchOptions::from_config(&config);

            let result = stitch::stitch(&files, &store, &options)?;
            output::print_stitch_summary(&files, &result);
        }
        Command::Inspect { file, json } => {
            let bytes = std::fs::read(&file)?;
            let dict = ExifCodec.parse(&bytes)?.unwrap_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&dict)?);
            } else {
                output::print_metadata(&dict);
            }
        }
        Command::Live { inputs, endpoint } => {
            let cwd = std::env::current_dir()?;
            let config = config::load_config(cli.config.as_deref(), &cwd)?;
            let endpoint = endpoint
                .or_else(|| config.live.endpoint().map(str::to_string))
                .ok_or("no live-capture endpoint: pass --endpoint or set live.endpoint")?;

            let files = inputs::collect_inputs(&inputs)?;
            let client = HttpLiveCapture::new(endpoint)?;
            log::info!("uploading {} images to {}", files.len(), client.endpoint());
            let response = client.capture(&files)?;
            output::print_live_response(&response);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
