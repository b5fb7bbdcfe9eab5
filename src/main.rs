use clap::{Parser, Subcommand};
use simple_wand::config::{self, DefaultsConfig};
use simple_wand::{Align, Dispatcher, Image, Recipe, WandError, output};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Crop, resize, and format flags shared by commands that plan directives.
#[derive(clap::Args, Clone, Default)]
struct TransformArgs {
    /// TOML recipe file; flags below override its values
    #[arg(long)]
    recipe: Option<PathBuf>,

    /// Crop to this aspect ratio (width / height), e.g. 1.5
    #[arg(long)]
    aspect: Option<f64>,

    /// Crop alignment: left|center|right, top|middle|bottom, none, or 0-3
    #[arg(long)]
    align: Option<Align>,

    /// Scale to this percentage of the cropped size
    #[arg(long)]
    scale: Option<f64>,

    /// Resize to exact dimensions, e.g. 800x600
    #[arg(long, value_parser = parse_size)]
    resize: Option<[u32; 2]>,

    /// Resize to this width, keeping the aspect ratio
    #[arg(long)]
    width: Option<u32>,

    /// Resize to this height, keeping the aspect ratio
    #[arg(long)]
    height: Option<u32>,

    /// Encoder quality (0-100, larger values are clamped)
    #[arg(long)]
    quality: Option<u32>,

    /// Output format, e.g. png, jpeg, webp
    #[arg(long)]
    format: Option<String>,
}

impl TransformArgs {
    /// Recipe from the `--recipe` file (if any) with explicit flags on top.
    fn to_recipe(&self) -> Result<Recipe, Box<dyn std::error::Error>> {
        let base = match &self.recipe {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => Recipe::default(),
        };
        Ok(Recipe {
            aspect: self.aspect.or(base.aspect),
            align: self.align.or(base.align),
            scale: self.scale.or(base.scale),
            resize: self.resize.or(base.resize),
            width: self.width.or(base.width),
            height: self.height.or(base.height),
            quality: self.quality.or(base.quality),
            format: self.format.clone().or(base.format),
        })
    }
}

fn parse_size(value: &str) -> Result<[u32; 2], String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width = width.trim().parse().map_err(|e| format!("width: {e}"))?;
    let height = height.trim().parse().map_err(|e| format!("height: {e}"))?;
    Ok([width, height])
}

#[derive(Parser)]
#[command(name = "simple-wand")]
#[command(about = "Crop, resize, and convert images with planned geometry")]
#[command(long_about = "\
Crop, resize, and convert images with planned geometry

Directives are planned first and applied once, at save, in a fixed order:
crop, resample, quality, format, strip metadata, encode. Crop is computed
against the natural size; scale and resize are computed against the crop.

Examples:

  simple-wand convert photo.jpg square.png --aspect 1 --width 800
  simple-wand convert wide.jpg banner.jpg --aspect 3 --align top --quality 85
  simple-wand batch out/ *.jpg --scale 50 --format webp
  simple-wand info photo.jpg --aspect 1.5 --json

Run 'simple-wand gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log at debug level regardless of RUST_LOG
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a single image
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        transform: TransformArgs,
        /// Save on the worker pool instead of the calling thread
        #[arg(long)]
        deferred: bool,
    },
    /// Convert many images into a directory using deferred saves
    Batch {
        out_dir: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Show an image's size and the directives a recipe would plan
    Info {
        input: PathBuf,
        #[command(flatten)]
        transform: TransformArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Convert {
            input,
            output,
            transform,
            deferred,
        } => {
            let wand_config = config::load_config(&cli.config)?;
            init_thread_pool(&wand_config.processing);
            let recipe = transform.to_recipe()?;
            let image = prepare(&input, &recipe, &wand_config.defaults)?;
            if deferred {
                save_deferred(&image, &output)?;
            } else {
                image.save(&output)?;
            }
            output::print_convert(&input, &output, &image.info());
        }
        Command::Batch {
            out_dir,
            inputs,
            transform,
        } => {
            let wand_config = config::load_config(&cli.config)?;
            init_thread_pool(&wand_config.processing);
            let recipe = transform.to_recipe()?;
            let (saved, failed) = batch(&out_dir, &inputs, &recipe, &wand_config.defaults)?;
            output::print_batch_summary(saved, failed);
            if failed > 0 {
                return Err(format!("{failed} of {} images failed", inputs.len()).into());
            }
        }
        Command::Info {
            input,
            transform,
            json,
        } => {
            let wand_config = config::load_config(&cli.config)?;
            let recipe = transform.to_recipe()?;
            let image = prepare(&input, &recipe, &wand_config.defaults)?;
            output::print_info(&image.info(), json)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    tracing::debug!(threads, "initializing worker pool");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Load `input` inline and plan `recipe` on top of the configured defaults.
fn prepare(input: &Path, recipe: &Recipe, defaults: &DefaultsConfig) -> Result<Image, WandError> {
    let image = Image::new();
    defaults.apply_to(&image);
    image.load(input)?;
    recipe.apply(&image)?;
    Ok(image)
}

/// Save through the global dispatcher and wait for the handler.
fn save_deferred(image: &Image, output: &Path) -> Result<(), WandError> {
    let outcome = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&outcome);
    image.save_deferred(output, move |result| {
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(result);
    });
    Dispatcher::global().run_until_idle();

    let result = outcome.lock().unwrap_or_else(|e| e.into_inner()).take();
    result.unwrap_or_else(|| Err(WandError::Resource("save handler never ran".into())))
}

/// Output path inside `out_dir`, with the extension switched to `format` if set.
fn batch_output_path(out_dir: &Path, input: &Path, format: Option<&str>) -> PathBuf {
    let name = input
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("image"));
    let name = match format {
        Some(format) => name.with_extension(format.to_ascii_lowercase()),
        None => name,
    };
    out_dir.join(name)
}

#[derive(Default)]
struct Tally {
    saved: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    fn report(&self, index: usize, input: &Path, output: &Path, result: Result<(), WandError>) {
        output::print_batch_result(index, input, output, &result);
        let counter = if result.is_ok() {
            &self.saved
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Load, plan, and save every input on the worker pool. Each load's handler
/// plans the recipe and submits the save; results print as handlers run.
fn batch(
    out_dir: &Path,
    inputs: &[PathBuf],
    recipe: &Recipe,
    defaults: &DefaultsConfig,
) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out_dir)?;
    let format = recipe.format.as_deref().or(defaults.format.as_deref());
    let tally = Arc::new(Tally::default());

    for (pos, input) in inputs.iter().enumerate() {
        let index = pos + 1;
        let output = batch_output_path(out_dir, input, format);
        let image = Image::new();
        defaults.apply_to(&image);

        let planned = image.clone();
        let recipe = recipe.clone();
        let tally = Arc::clone(&tally);
        let source = input.clone();
        image.load_deferred(input.clone(), move |result| {
            match result.and_then(|()| recipe.apply(&planned)) {
                Ok(()) => {
                    let target = output.clone();
                    planned.save_deferred(target, move |result| {
                        tally.report(index, &source, &output, result)
                    });
                }
                Err(err) => tally.report(index, &source, &output, Err(err)),
            }
        });
    }
    Dispatcher::global().run_until_idle();

    Ok((
        tally.saved.load(Ordering::SeqCst),
        tally.failed.load(Ordering::SeqCst),
    ))
}
