use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vitrine::cache::Cache;
use vitrine::imaging::RustBackend;
use vitrine::root::Tree;
use vitrine::sources::{SourceContext, SourceRegistry};
use vitrine::{config, logging, output, warm};

/// Preview images listed by `show`.
const PREVIEW_LIMIT: usize = 4;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "Photo gallery tree and derivative cache")]
#[command(long_about = "\
Photo gallery tree and derivative cache

Sources configured in config.toml are assembled into one virtual tree:

  [sources.photos]        a folder on disk
  type = \"folder\"
  path = \"/srv/photos\"
  tags = \"By tag\"         optional tag view over the folder

  [sources.best]          other tree paths merged under one node
  type = \"combine\"
  internal_paths = [\"/photos/2019\", \"/photos/2020\"]

Every photo gets a cached reduced JPEG, a nano thumbnail and its embedded
title, rating and tags, keyed by path and modification time.

Run 'vitrine gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config/config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the tree below a path
    Tree {
        /// Tree path, e.g. /photos/2019 (default: root)
        #[arg(default_value = "")]
        path: String,
        /// Maximum depth to list
        #[arg(long)]
        depth: Option<usize>,
        /// Include hidden elements
        #[arg(long)]
        all: bool,
    },
    /// Show details of one element
    Show {
        /// Tree path of the element
        path: String,
    },
    /// Build cache entries for every image below a path
    Warm {
        /// Tree path (default: root)
        #[arg(default_value = "")]
        path: String,
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

    let app_config = config::load_config(&cli.config)?;
    let _log_guard = logging::init_logging(&app_config.logging)?;
    let cache = open_cache(&app_config.cache)?;
    let tree = Tree::new(
        SourceRegistry::with_defaults(),
        SourceContext {
            cache: Arc::clone(&cache),
        },
        &app_config.sources,
    );

    match cli.command {
        Command::Tree { path, depth, all } => {
            let origin = tree.traverse(&path)?;
            for line in output::format_tree(&origin, depth, all) {
                println!("{}", line);
            }
        }
        Command::Show { path } => {
            let element = tree.traverse(&path)?;
            for line in output::format_details(&element, PREVIEW_LIMIT) {
                println!("{}", line);
            }
        }
        Command::Warm { path } => {
            let origin = tree.traverse(&path)?;
            let images = warm::collect_images(&origin)?;
            init_thread_pool(&app_config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_warm_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let stats = warm::warm(&cache, &images, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            println!("Cache: {}", stats);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn open_cache(cache_config: &config::CacheConfig) -> Result<Arc<Cache>, vitrine::cache::CacheError> {
    let dir: &Path = &cache_config.path;
    let cache = Cache::open(
        dir,
        cache_config.derivative_settings(),
        Arc::new(RustBackend::new()),
    )?;
    Ok(Arc::new(cache))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores; config can only constrain it down.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
