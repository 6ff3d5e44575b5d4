use clap::{Parser, Subcommand};
use image_alter::imaging::{ImageCodec, RustCodec};
use image_alter::pipeline::{self, PipelineRequest};
use image_alter::request::{self, RequestError};
use image_alter::{config, engine, logging, output};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::error;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once; called exactly once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-alter")]
#[command(about = "Apply an ordered pipeline of named transformations to an image")]
#[command(long_about = "\
Apply an ordered pipeline of named transformations to an image

Each transformation is picked by name (case-insensitive) and takes an
optional argument. Steps run in order; the first failing step aborts the
request and nothing is written.

Actions on the command line:

  -a grayscale                      # bare name
  -a rotate=45                      # name=ARG, ARG parsed as JSON
  -a crop=[0.1,0.1,0.9,0.9]         # relative [x1, y1, x2, y2]
  -a '{\"scale\":{\"maxwidth\":800}}'   # one-key JSON object

Request files for 'run':

  {
    \"file\": \"dawn.jpg\",            # relative to the request file
    \"format\": \"png\",               # optional; default from file extension
    \"quality\": 80,                 # optional; clamped to 0-100
    \"actions\": [\"grayscale\", {\"rotate\": 45}]
  }

Output is written as img.<ext> when converting, or under the source's own
name when the format is kept.

Run 'image-alter list' for every transformation and 'image-alter gen-config'
to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Output directory (overrides output.dir from config)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform a single image
    Transform {
        /// Image to read
        file: PathBuf,
        /// Output format (jpeg, png, gif, webp, tiff, bmp, avif); default from extension
        #[arg(long)]
        format: Option<String>,
        /// Encode quality, clamped to 0-100; default from config
        #[arg(long, allow_hyphen_values = true)]
        quality: Option<i64>,
        /// Transformation step, repeatable; applied in order
        #[arg(short = 'a', long = "action")]
        actions: Vec<String>,
    },
    /// Run JSON request files, in parallel when more than one is given
    Run {
        #[arg(required = true)]
        requests: Vec<PathBuf>,
    },
    /// List transformations and supported formats
    List {
        /// Print the catalog as a single `name -- doc | …` line
        #[arg(long)]
        oneline: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config_dir)?;
    logging::init(&config.logging.level, config.logging.format)?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let default_quality = config.output.quality as i64;

    let codec = RustCodec::new();
    let registry = engine::init_engine(&codec);

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Command::Transform {
            file,
            format,
            quality,
            actions,
        } => {
            let steps = actions
                .iter()
                .map(|spec| request::parse_action_spec(spec))
                .collect::<Result<Vec<_>, _>>()?;
            let request = PipelineRequest {
                source: file,
                format,
                quality: quality.or(Some(default_quality)),
                steps,
            };
            let result = pipeline::run_pipeline_with_codec(&codec, &request, &output_dir);
            output::print_result(&request, &result);
            result.map(|_| ()).map_err(Into::into)
        }
        Command::Run { requests } => {
            init_thread_pool(&config.processing);
            run_requests(&codec, &requests, &output_dir, default_quality)
        }
        Command::List { oneline } => {
            if oneline {
                println!("{}", output::actions_doc(registry.list()));
            } else {
                output::print_list(registry.list(), &codec.formats());
            }
            Ok(())
        }
        Command::GenConfig => Ok(()),
    };

    engine::shutdown_engine();
    result
}

/// Run every request file, each in its own output subdirectory.
fn run_requests<C: ImageCodec>(
    codec: &C,
    paths: &[PathBuf],
    output_dir: &Path,
    default_quality: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let dirs = request::request_output_dirs(paths, output_dir);

    let outcomes: Vec<(PathBuf, Result<_, RequestError>)> = paths
        .par_iter()
        .zip(dirs.par_iter())
        .map(|(path, dir)| {
            let outcome = request::load_request(path).map(|mut request| {
                request.quality = request.quality.or(Some(default_quality));
                let result = pipeline::run_pipeline_with_codec(codec, &request, dir);
                (request, result)
            });
            (path.clone(), outcome)
        })
        .collect();

    let mut failed = 0;
    for (path, outcome) in &outcomes {
        match outcome {
            Ok((request, result)) => {
                output::print_result(request, result);
                if result.is_err() {
                    failed += 1;
                }
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                println!("{}: invalid request", path.display());
                println!("    Error: {}", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("{}", output::format_summary(outcomes.len(), failed));
    if failed > 0 {
        return Err(format!("{failed} of {} requests failed", outcomes.len()).into());
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
