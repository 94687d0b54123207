//! Tethered Capture CLI
//!
//! Interactive barcode capture: for each prefix entered, captures one
//! exposure (JPEG + RAW), files it under the prefix, opens the JPEG
//! preview, and records the prefix in the ledger.

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tether_capture::{
    camera::{CameraControl, CancelToken, ScriptedCamera},
    capture::{Backend, DriverConfig, FileConfig},
    CaptureMetrics, Interrupt, Workflow, WorkflowError,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Simulated,
    Gphoto,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Simulated => Backend::Simulated,
            BackendArg::Gphoto => Backend::Gphoto,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tether-capture", version, about = "Barcode-prefixed tethered capture")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides the config file).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Camera backend (overrides the config file).
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Capture once with this prefix instead of prompting.
    #[arg(long)]
    prefix: Option<String>,

    /// Do not open JPEG previews.
    #[arg(long)]
    no_preview: bool,

    /// Write Prometheus metrics to this file on exit.
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    println!("Barcode - Tethered Capture\n==========================\n");
    info!("tether-capture v{}", tether_capture::VERSION);

    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FileConfig::default(),
    };
    if let Some(dir) = &cli.output {
        config.output.directory = dir.clone();
    }
    if let Some(backend) = cli.backend {
        config.driver.backend = backend.into();
    }
    if cli.no_preview {
        config.output.preview = false;
    }

    let metrics = CaptureMetrics::new()?;
    let mut interrupt = Interrupt::new();
    if let Some(path) = cli.metrics_file.clone() {
        let metrics = metrics.clone();
        // Ctrl-C at the prompt terminates the process without returning here.
        interrupt = interrupt.on_exit(move || {
            if let Err(err) = metrics.write_to(&path) {
                eprintln!("Error: {err}");
            }
        });
    }
    let interrupt = interrupt.install().context("installing Ctrl-C handler")?;
    let workflow = Workflow::new(config.capture.clone(), &config.output)
        .with_cancel(interrupt.token())
        .with_metrics(metrics.clone());
    workflow.prepare()?;

    let mut camera = camera_for(&config.driver, interrupt.token())?;
    let outcome = capture_loop(&workflow, camera.as_mut(), &interrupt, cli.prefix.as_deref());

    if let Some(path) = &cli.metrics_file {
        metrics.write_to(path)?;
    }
    outcome
}

fn camera_for(driver: &DriverConfig, cancel: CancelToken) -> anyhow::Result<Box<dyn CameraControl>> {
    match driver.backend {
        Backend::Simulated => {
            warn!("using the simulated camera; pass --backend gphoto for real hardware");
            Ok(Box::new(
                ScriptedCamera::simulated(driver.options()).with_cancel(cancel),
            ))
        }
        #[cfg(feature = "gphoto")]
        Backend::Gphoto => Ok(Box::new(
            tether_capture::camera::GphotoCamera::new(driver.options()).with_cancel(cancel),
        )),
        #[cfg(not(feature = "gphoto"))]
        Backend::Gphoto => anyhow::bail!("this build does not include the `gphoto` feature"),
    }
}

fn capture_loop(
    workflow: &Workflow,
    camera: &mut dyn CameraControl,
    interrupt: &Interrupt,
    fixed_prefix: Option<&str>,
) -> anyhow::Result<()> {
    let stdin = io::stdin();

    loop {
        let prefix = match fixed_prefix {
            Some(prefix) => prefix.to_owned(),
            None => match prompt(&stdin)? {
                Some(prefix) => prefix,
                None => break,
            },
        };

        let busy = interrupt.begin();
        match workflow.run_once(&mut *camera, &prefix) {
            Ok(report) => {
                for (file, path) in report.capture.files.iter().zip(&report.renamed) {
                    println!("Renamed {} to {}", file.name, path.display());
                }
                if report.capture.is_empty() {
                    println!("No files received from the camera.");
                }
                if !report.new_prefix {
                    println!("Prefix {} was already in the ledger.", report.prefix);
                }
            }
            Err(err) if err.is_device() => {
                return Err(err).context("camera unavailable, stopping");
            }
            Err(WorkflowError::InvalidPrefix(raw)) => {
                eprintln!("Invalid prefix {raw:?}; it must be non-empty and contain no path separators.");
            }
            Err(err) => {
                eprintln!("Capture failed: {:#}", anyhow::Error::new(err));
            }
        }
        drop(busy);

        if interrupt.requested() {
            println!("\nExiting...");
            break;
        }
        if fixed_prefix.is_some() {
            break;
        }
    }
    Ok(())
}

/// Reads one prefix from stdin. Returns `None` at end of input.
fn prompt(stdin: &io::Stdin) -> io::Result<Option<String>> {
    print!("Enter prefix for the photo: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}
