use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use pqview::batch::{convert_file, export_file, export_target};
use pqview::engine::EngineBinding;
use pqview::{AppConfig, Args, CacheManager, ConfigManager, OpenOptions, APP_NAME};
use std::fs::{self, OpenOptions as FileOptions};
use std::sync::Mutex;

/// Handle flags that do their work and exit without opening a file.
fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Configuration written to {}", path.display());
        return Ok(Some(()));
    }

    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                if let Err(e) = cache.clear_all() {
                    eprintln!("Error clearing cache: {}", e);
                    std::process::exit(1);
                }
                println!("Cache cleared successfully");
            }
            Err(_e) => println!("No cache to clear"),
        }
        return Ok(Some(()));
    }

    Ok(None)
}

/// Send tracing output to `<cache_dir>/pqview.log`; the terminal belongs to the interface.
fn init_logging(config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let Ok(cache) = CacheManager::new(APP_NAME) else {
        return;
    };
    if cache.ensure_cache_dir().is_err() {
        return;
    }
    let Ok(file) = FileOptions::new()
        .create(true)
        .append(true)
        .open(cache.cache_file("pqview.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env("PQVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("pqview={}", config.debug.log_level)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// `--export-to` / `--convert-to`: one job, no interface.
fn run_headless(args: &Args, opts: &OpenOptions) -> Result<Option<()>> {
    if args.export_to.is_none() && args.convert_to.is_none() {
        return Ok(None);
    }
    color_eyre::install()?;
    let source = args
        .path
        .as_deref()
        .ok_or_else(|| eyre!("A source PATH is required with --export-to and --convert-to"))?;
    let engine = EngineBinding::new(opts.streaming)
        .get()
        .map_err(|e| eyre!(e.user_message()))?;

    let written = if let Some(target) = &args.export_to {
        let (dir, config) = export_target(
            target,
            args.export_format,
            opts.export_format,
            opts.table_name.clone(),
        );
        export_file(
            &engine,
            source,
            opts.csv.clone(),
            args.query.clone(),
            &dir,
            &config,
        )
    } else {
        let dir = args.convert_to.clone().unwrap_or_else(|| opts.output_dir.clone());
        fs::create_dir_all(&dir)?;
        convert_file(&engine, source, opts.csv.clone(), &dir, opts.compression)
    };

    let path = written.map_err(|e| eyre!(e.user_message()))?;
    println!("{}", path.display());
    Ok(Some(()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    if handle_early_exit_flags(&args)?.is_some() {
        return Ok(());
    }

    let config = AppConfig::load(APP_NAME)?;
    let opts = OpenOptions::from_args_and_config(&args, &config)?;
    init_logging(&config);

    if run_headless(&args, &opts)?.is_some() {
        return Ok(());
    }

    pqview::run(args.path.clone(), opts, config)
}
