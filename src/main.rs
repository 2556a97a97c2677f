use clap::{Args, Parser, Subcommand};
use filterbox::gif_search::GifSearchClient;
use filterbox::intake::{Intake, IntakeError, IntakeOutcome, IntakeRequest, UploadedImage};
use filterbox::naming::StoragePaths;
use filterbox::{config, output, store};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug};

fn version_string() -> &'static str {
    let on_tag = env!("FILTERBOX_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FILTERBOX_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "filterbox")]
#[command(about = "Apply a named filter to an image and store the result")]
#[command(long_about = "\
Apply a named filter to an image and store the result

Each filtered image is shrunk so neither side exceeds 500px, convolved with
the chosen kernel and written to the images directory as
{filter}-{file name}. Re-filtering the same file with the same filter
replaces the earlier result.

Layout under --root:

  ./
  ├── config.toml          # Optional, see 'filterbox gen-config'
  ├── .env                 # Optional, API_KEY=... for gif-search
  └── static/images/
      ├── blur-cat.png
      └── edge-enhance-cat.png

Filters: blur, contour, detail, edge-enhance, emboss, sharpen, smooth.
Run 'filterbox filter' with no arguments to list them.")]
#[command(version = version_string())]
struct Cli {
    /// Application root: config.toml, .env and the images directory live here
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter one or more images; with no image or filter, list the filters
    Filter(FilterArgs),
    /// List stored artifacts
    Artifacts(JsonArgs),
    /// Search for GIFs
    GifSearch(GifSearchArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Args, Clone)]
struct JsonArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FilterArgs {
    /// Images to filter
    images: Vec<PathBuf>,

    /// Filter identifier
    #[arg(short, long)]
    filter: Option<String>,

    /// Declared name for the upload (defaults to the file name; single image only)
    #[arg(long)]
    name: Option<String>,

    #[command(flatten)]
    output: JsonArgs,
}

#[derive(Args)]
struct GifSearchArgs {
    /// Search terms
    query: String,

    /// Number of results (1-50)
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u32,

    #[command(flatten)]
    output: JsonArgs,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Filter(args) => {
            let app_config = load_app_config(&cli.root)?;
            init_thread_pool(&app_config.processing);
            let intake = Intake::from_config(&cli.root, &app_config);
            run_filter(&intake, args)
        }
        Command::Artifacts(args) => {
            let app_config = load_app_config(&cli.root)?;
            let paths = StoragePaths::from_config(&cli.root, &app_config.storage);
            let artifacts = store::list_artifacts(&paths.images_dir)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else {
                output::print_artifacts(&artifacts);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::GifSearch(args) => {
            let app_config = load_app_config(&cli.root)?;
            let client = GifSearchClient::new(&app_config.gif_search)?;
            let gifs = client.search(&args.query, args.count)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&gifs)?);
            } else {
                output::print_gif_results(&args.query, &gifs);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_filter(intake: &Intake, args: FilterArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if args.name.is_some() && args.images.len() > 1 {
        return Err("--name can only be used with a single image".into());
    }
    let requests = build_requests(&args)?;
    let json = args.output.json;

    // A lone request is reported directly, without progress events.
    if requests.len() == 1 {
        let result = requests
            .into_iter()
            .map(|request| intake.handle(request))
            .collect::<Vec<_>>();
        return report(&result, json);
    }

    let printer = (!json).then(|| {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            for event in rx {
                for line in output::format_intake_event(&event) {
                    println!("{}", line);
                }
            }
        });
        (tx, handle)
    });
    let (tx, handle) = match printer {
        Some((tx, handle)) => (Some(tx), Some(handle)),
        None => (None, None),
    };
    let results = intake.handle_batch(requests, tx);
    if let Some(handle) = handle {
        handle.join().map_err(|_| "output thread panicked")?;
    }

    if json {
        report(&results, true)
    } else {
        let failed = results.iter().filter(|r| r.is_err()).count();
        println!("Filtered {} of {} images", results.len() - failed, results.len());
        Ok(exit_code(failed))
    }
}

/// One request per image. With no images, a single request without an
/// upload so intake can report what is missing.
fn build_requests(args: &FilterArgs) -> std::io::Result<Vec<IntakeRequest>> {
    if args.images.is_empty() {
        return Ok(vec![IntakeRequest {
            upload: None,
            filter: args.filter.clone(),
        }]);
    }
    args.images
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)?;
            let declared_name = args.name.clone().unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            debug!(path = %path.display(), %declared_name, bytes = bytes.len(), "read upload");
            Ok(IntakeRequest {
                upload: Some(UploadedImage::new(bytes, declared_name)),
                filter: args.filter.clone(),
            })
        })
        .collect()
}

fn report(
    results: &[Result<IntakeOutcome, IntakeError>],
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if json {
        let mut values = results
            .iter()
            .map(result_json)
            .collect::<Result<Vec<_>, _>>()?;
        let doc = if values.len() == 1 {
            values.swap_remove(0)
        } else {
            serde_json::Value::Array(values)
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for result in results {
            match result {
                Ok(outcome) => output::print_intake_outcome(outcome),
                Err(e) => eprintln!("error: {e}"),
            }
        }
    }
    Ok(exit_code(results.iter().filter(|r| r.is_err()).count()))
}

fn result_json(
    result: &Result<IntakeOutcome, IntakeError>,
) -> Result<serde_json::Value, serde_json::Error> {
    match result {
        Ok(outcome) => serde_json::to_value(outcome),
        Err(e) => Ok(serde_json::json!({
            "status": "failed",
            "error": e.kind(),
            "message": e.to_string(),
        })),
    }
}

fn exit_code(failed: usize) -> ExitCode {
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Stock defaults, then `config.toml`, then `.env` and the environment.
fn load_app_config(root: &Path) -> Result<config::AppConfig, config::ConfigError> {
    if dotenvy::from_path(root.join(".env")).is_ok() {
        debug!("loaded .env from {}", root.display());
    }
    let mut app_config = config::load_config(root)?;
    app_config.apply_env(|name| std::env::var(name).ok());
    debug!(?app_config, "configuration resolved");
    Ok(app_config)
}

/// Log to stderr so stdout stays clean for `--json`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
