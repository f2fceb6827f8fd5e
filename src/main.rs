//! gridwm
//!
//! A tiling window manager for X11 driven entirely from a command socket.
//! Windows are placed on a grid by external tools; gridwm keeps focus,
//! stacking and the EWMH/ICCCM conventions consistent in between.

mod config;
mod event_loop;
mod shared;
mod wm;

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::wm::status::StatusSink;
use crate::wm::x11::X11Display;
use crate::wm::{Exit, WindowManager};

/// Bootstrap flags; everything else comes from the config file
#[derive(Debug, Default)]
struct Options {
    status: Option<PathBuf>,
    config: Option<PathBuf>,
}

enum Invocation {
    Run(Options),
    Version,
    Help,
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-v" => return Ok(Invocation::Version),
            "--help" | "-h" => return Ok(Invocation::Help),
            "--status" | "-s" => {
                let path = iter.next().context("--status requires a path argument")?;
                options.status = Some(PathBuf::from(path));
            }
            "--config" | "-c" => {
                let path = iter.next().context("--config requires a path argument")?;
                options.config = Some(PathBuf::from(path));
            }
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(Invocation::Run(options))
}

fn print_help() {
    println!("gridwm {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    gridwm [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -s, --status <PATH>    Write status lines to this FIFO (or $STATUS_FIFO)");
    println!("    -c, --config <PATH>    Use a custom config file");
    println!("    -v, --version          Print version information");
    println!("    -h, --help             Print this help message");
}

fn run(options: Options) -> Result<Exit> {
    let config = Config::load(options.config.as_deref())?;

    let status_path = options
        .status
        .or_else(|| std::env::var_os("STATUS_FIFO").map(PathBuf::from))
        .or_else(|| config.status.path.clone());
    let status = match status_path {
        Some(path) => StatusSink::open(&path),
        None => StatusSink::disabled(),
    };

    let (display, screen) = X11Display::connect()?;
    let wm = WindowManager::new(display, &config, screen, status);
    event_loop::run(wm)
}

/// The running binary with the arguments it was started with
fn restart_command(args: &[String]) -> Result<std::process::Command> {
    let exe = std::env::current_exe().context("Failed to locate the gridwm binary")?;
    let mut command = std::process::Command::new(exe);
    command.args(args.get(1..).unwrap_or_default());
    Ok(command)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gridwm=info,warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(args.get(1..).unwrap_or_default())? {
        Invocation::Version => {
            println!("gridwm {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Invocation::Help => {
            print_help();
            return Ok(());
        }
        Invocation::Run(options) => options,
    };

    info!("Starting gridwm");
    match run(options)? {
        Exit::Quit => {
            info!("Exiting");
            Ok(())
        }
        Exit::Restart => {
            info!("Restarting");
            use std::os::unix::process::CommandExt;
            let err = restart_command(&args)?.exec();
            error!("Failed to restart: {}", err);
            Err(err).context("Failed to re-execute gridwm")
        }
    }
}
