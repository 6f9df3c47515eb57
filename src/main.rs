use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lakedown::CollisionStrategy;
use lakedown::cli::commands;
use lakedown::cli::{ConvertOptions, Output};

#[derive(Parser)]
#[command(name = "lakedown")]
#[command(
    version,
    about = "Convert a Yuque lakebook export into a tree of Markdown files"
)]
struct Cli {
    #[arg(
        required_unless_present = "print_config",
        help = "Path to the .lakebook file"
    )]
    archive: Option<PathBuf>,

    #[arg(
        required_unless_present = "print_config",
        help = "Output directory (created if missing)"
    )]
    output: Option<PathBuf>,

    #[arg(long, help = "Download remote images into attachments/ directories")]
    download_image: bool,

    #[arg(
        long,
        value_name = "STRATEGY",
        help = "Sibling name collision strategy: counter, url-hash"
    )]
    collision: Option<CollisionStrategy>,

    #[arg(long, short, help = "Additional config file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Print the effective configuration and exit")]
    print_config: bool,

    #[arg(long, short)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mlakedown encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::default().error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if cli.print_config {
        commands::config::show(cli.config.as_deref())?;
        return Ok(());
    }

    let (Some(archive), Some(output)) = (cli.archive, cli.output) else {
        anyhow::bail!("both <ARCHIVE> and <OUTPUT> are required");
    };

    commands::convert::run(ConvertOptions {
        archive,
        output,
        download_image: cli.download_image,
        collision: cli.collision,
        config: cli.config,
        quiet: cli.quiet,
    })?;

    Ok(())
}
