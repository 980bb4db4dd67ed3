use breakpoint_planner::batch::{self, BatchEvent};
use breakpoint_planner::config::{self, PlannerConfig};
use breakpoint_planner::css::{ResolutionStrategy, render_css};
use breakpoint_planner::device::Device;
use breakpoint_planner::output;
use breakpoint_planner::planning::DeviceSizes;
use breakpoint_planner::resize::{DryRunResizer, ResponsiveImage};
use breakpoint_planner::sizes::Sizes;
use breakpoint_planner::types::Dimensions;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Which image the sizing applies to.
#[derive(clap::Args, Clone)]
struct ImageArgs {
    /// Sizing expression (overrides the config's `sizes`)
    #[arg(long)]
    sizes: Option<String>,

    /// Source image; its dimensions cap the planned widths
    #[arg(long)]
    source: Option<PathBuf>,

    /// Source dimensions as WIDTHxHEIGHT, instead of reading --source
    #[arg(long, value_name = "WxH")]
    source_size: Option<Dimensions>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    MediaQueries,
    ImageSet,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::MediaQueries => ResolutionStrategy::MediaQueries,
            StrategyArg::ImageSet => ResolutionStrategy::ImageSet,
        }
    }
}

#[derive(Parser)]
#[command(name = "breakpoint-planner")]
#[command(about = "Plan responsive image widths and media queries for a device list")]
#[command(long_about = "\
Plan responsive image widths and media queries for a device list

Evaluates a `sizes` expression against every configured device, proposes the
image widths worth producing, and synthesizes the media queries (or CSS
rules) that pick the right image on each device.

  breakpoint-planner plan --sizes \"(min-width: 1200px) 50vw, 100vw\" --source-size 4000x3000
  breakpoint-planner queries --source hero.jpg --css .hero
  breakpoint-planner batch images.json

Set RUST_LOG=debug to see per-device decisions.

Run 'breakpoint-planner gen-config' to generate a documented breakpoints.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults are used when it does not exist)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the expanded devices in canonical order
    Devices,
    /// Show per-device targets and the widths to produce
    Plan(ImageArgs),
    /// Synthesize media queries for a source image
    Queries {
        #[command(flatten)]
        image: ImageArgs,

        /// Render consolidated CSS rules for this element selector
        #[arg(long, value_name = "SELECTOR")]
        css: Option<String>,

        /// How density variants are expressed in CSS (overrides the config)
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan every image listed in a JSON manifest
    Batch {
        /// Manifest path
        manifest: PathBuf,
    },
    /// Print a stock breakpoints.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let load = || config::load_config(&cli.config);

    match cli.command {
        Command::Devices => {
            let config = load()?;
            let mut devices = Device::from_definitions(&config.devices);
            Device::sort(&mut devices);
            devices.dedup();
            output::print_devices(&devices);
        }
        Command::Plan(args) => {
            let config = load()?;
            let sizes = resolve_sizes(&args, &config)?;
            let device_sizes = DeviceSizes::new(sizes, &config.devices)?;
            let dimensions = match (args.source_size, &args.source) {
                (Some(dims), _) => Some(dims),
                (None, Some(path)) => {
                    let (w, h) = image::image_dimensions(path)?;
                    Some(Dimensions::new(w, h))
                }
                (None, None) => None,
            };
            let widths = device_sizes.widths(dimensions, config.scaling_factor)?;
            let source_path = args
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from("(source)"));
            output::print_plan(
                &device_sizes,
                dimensions.map(|d| (source_path.as_path(), d)),
                &widths,
            );
        }
        Command::Queries {
            image,
            css,
            strategy,
            json,
        } => {
            if image.source.is_none() && image.source_size.is_none() {
                return Err("queries needs --source or --source-size".into());
            }
            let config = load()?;
            let resizer = DryRunResizer::new(config.url_prefix.clone());
            let source = image
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from("image"));
            let mut builder = ResponsiveImage::from_config(&resizer, source, &config)?
                .sizes(resolve_sizes(&image, &config)?);
            if let Some(dims) = image.source_size {
                builder = builder.dimensions(dims);
            }
            let resized = builder.plan()?.resize()?;
            let orientations = config.parsed_orientations();
            let queries = resized.media_queries(&orientations);

            if let Some(selector) = css {
                let strategy = strategy
                    .map(ResolutionStrategy::from)
                    .unwrap_or(config.css.resolution);
                let rules = resized.css_rules(&orientations, strategy);
                print!("{}", render_css(&rules, &selector));
            } else if json {
                println!("{}", serde_json::to_string_pretty(&queries)?);
            } else {
                output::print_media_queries(&queries);
            }
        }
        Command::Batch { manifest } => {
            let config = load()?;
            init_thread_pool(&config.processing);
            let resizer = DryRunResizer::new(config.url_prefix.clone());
            let (tx, rx) = std::sync::mpsc::channel::<BatchEvent>();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        eprintln!("{}", line);
                    }
                }
            });
            let plans = batch::run_batch(&resizer, &manifest, &config, Some(tx))?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            println!("{}", serde_json::to_string_pretty(&plans)?);
            let failed = plans.iter().filter(|p| p.error.is_some()).count();
            if failed > 0 {
                log::warn!("{failed} of {} images failed", plans.len());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `--sizes` when given, otherwise the configured expression.
fn resolve_sizes(args: &ImageArgs, config: &PlannerConfig) -> Result<Sizes, Box<dyn std::error::Error>> {
    let raw = args.sizes.as_deref().unwrap_or(&config.sizes);
    Ok(Sizes::parse(raw)?)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
