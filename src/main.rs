//! # Image Minifier - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Merge tra file di configurazione e flag CLI
//! - Avvio del batch e gestione di Ctrl-C
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG con `-D/--mdebug`)
//! 3. Carica la configurazione JSON (se presente) e applica i flag
//! 4. Sceglie il sink: JSON line-delimited su stdout o `tracing`
//! 5. Istanzia ImageMinifier e avvia il batch
//!
//! ## Esempio di utilizzo:
//! ```bash
//! minimage assets public --ext png --ext jpg -w 8 --overwrite
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use image_minifier::{
    optimizer::ConcurrencyScheduler, tool_resolver::CODEC_TOOLS, Config, EventSink, ImageMinifier,
    JsonSink, ToolPathResolver, TracingSink,
};

#[derive(Parser)]
#[command(name = "minimage")]
#[command(about = "Losslessly minify JPEG, GIF and PNG images into a mirrored output tree")]
struct Args {
    /// Directory scanned for images
    source_dir: Option<PathBuf>,

    /// Directory receiving the minified copies
    compiled_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write improved output back over the source files
    #[arg(long)]
    overwrite: bool,

    /// Debug logging
    #[arg(short = 'D', long)]
    mdebug: bool,

    /// Maximum number of files processed at once
    #[arg(short, long)]
    workers: Option<usize>,

    /// Extension to process (repeatable, without the leading dot)
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Interlace GIF output
    #[arg(long)]
    interlaced: bool,

    /// Progressive JPEG output
    #[arg(long)]
    progressive: bool,

    /// PNG optimization level (0-7)
    #[arg(long)]
    optimization_level: Option<u8>,

    /// Emit one JSON object per event on stdout
    #[arg(long)]
    json: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Report which codec tools are available and exit
    #[arg(long)]
    check_tools: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: Option<PathBuf>,
}

impl Args {
    /// Applica i flag CLI sopra la configurazione caricata
    fn apply_to(&self, config: &mut Config) {
        if let Some(ref source_dir) = self.source_dir {
            config.source_dir = source_dir.clone();
        }
        if let Some(ref compiled_dir) = self.compiled_dir {
            config.compiled_dir = compiled_dir.clone();
        }
        if let Some(workers) = self.workers {
            config.concurrency_limit = workers;
        }
        if !self.extensions.is_empty() {
            config.extensions = self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect();
        }
        if self.interlaced {
            config.options.interlaced = true;
        }
        if self.progressive {
            config.options.progressive = true;
        }
        if let Some(level) = self.optimization_level {
            config.options.optimization_level = level;
        }
        config.overwrite = self.overwrite;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.mdebug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let resolver = ToolPathResolver::new();
    debug!("Bundled tools directory: {:?}", resolver.tools_dir());

    if args.check_tools {
        println!("{}", resolver.get_tools_report());
        return Ok(());
    }

    if let Some(ref path) = args.init_config {
        Config::default().save_to_file(path).await?;
        info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    args.apply_to(&mut config);

    for tool in CODEC_TOOLS {
        if let Err(hint) = resolver.check_tool_with_instructions(tool) {
            warn!("{}", hint);
        }
    }

    let sink: Arc<dyn EventSink> = if args.json {
        Arc::new(JsonSink::stdout(args.mdebug))
    } else {
        Arc::new(TracingSink)
    };

    let (stop_sender, stop_receiver) = ConcurrencyScheduler::create_cancellation_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing files already in progress");
            let _ = stop_sender.send(());
        }
    });

    debug!("Effective configuration: {:?}", config);

    let report = ImageMinifier::new(config, sink)
        .with_progress(args.progress && !args.json)
        .with_cancellation(stop_receiver)
        .run()
        .await?;

    if report.has_failures() {
        return Err(anyhow::anyhow!(
            "{} of {} files could not be minified",
            report.stats.failed,
            report.stats.total
        ));
    }

    Ok(())
}
