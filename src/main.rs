use anyhow::Result;
use clap::{Parser, Subcommand};
use gamescan::{
    config::Config,
    logging,
    model::SourceKind,
    output::{format_result_to_string, print_result, OutputFormat},
    registry::system_registry,
    scan::run_scan_with_progress,
    scanner::{all_scanners, scanners_for, ScanContext, Scanner},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit codes for scripting
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const INTERRUPTED: u8 = 130;
}

#[derive(Parser)]
#[command(name = "gamescan")]
#[command(
    author,
    version,
    about = "Discover installed games from Steam, store packages and game folders"
)]
struct Cli {
    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for installed games
    Scan {
        /// Only run strategies for one source (steam, store, folders)
        #[arg(short, long)]
        source: Option<String>,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Run strategies one after another
        #[arg(long)]
        no_parallel: bool,
    },

    /// List available game sources
    ListSources,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using default configuration");
        Config::default()
    });

    match cli.command {
        Commands::Scan {
            source,
            format,
            output,
            no_parallel,
        } => {
            let format_str = format.unwrap_or(config.default_format.clone());
            config.parallel = config.parallel && !no_parallel;
            scan_games(config, source, format_str, output).await
        }
        Commands::ListSources => {
            list_sources();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn scan_games(
    config: Config,
    source_filter: Option<String>,
    format: String,
    output_file: Option<String>,
) -> Result<u8> {
    let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let scanners: Vec<Box<dyn Scanner>> = if let Some(source_name) = source_filter {
        let source = SourceKind::from_str(&source_name).map_err(|e| anyhow::anyhow!(e))?;
        scanners_for(source)
    } else {
        all_scanners()
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let ctx = ScanContext::new(config, system_registry()).with_cancel(cancel.clone());

    let progress = if is_interactive {
        let supported = scanners.iter().filter(|s| s.is_supported()).count();
        Some(progress_bar(supported as u64)?)
    } else {
        None
    };

    let mut result = run_scan_with_progress(&ctx, &scanners, |report| {
        if let Some(ref pb) = progress {
            pb.set_message(format!("{} done", report.name));
            pb.inc(1);
        }
    })
    .await;

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Found {} games", result.games.len()));
    }

    result.sort_by_name();

    let interrupted = cancel.is_cancelled();
    if interrupted {
        eprintln!("Scan interrupted; results are partial.");
    }

    // Handle output
    if let Some(path) = output_file {
        let text = format_result_to_string(&result, format)?;
        std::fs::write(&path, text)?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&result, format)?;
    }

    Ok(if interrupted {
        exit_codes::INTERRUPTED
    } else {
        exit_codes::SUCCESS
    })
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Scanning...");
    Ok(pb)
}

fn list_sources() {
    println!("Available sources:");
    println!();

    for source in SourceKind::all() {
        println!("  {:<10} {}", source.as_str(), source.display_name());
        for scanner in scanners_for(*source) {
            let supported = if scanner.is_supported() { "yes" } else { "no" };
            println!("  {:<10} - {:<25} [supported: {}]", "", scanner.name(), supported);
        }
        println!();
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'gamescan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
