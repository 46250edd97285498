//! bambu-snap - Bambu Lab printer camera snapshots
//!
//! Connects to a printer's camera port, grabs one JPEG frame and saves it.

use anyhow::{bail, Context, Result};
use bambu_camera::{
    auth_record, CameraConfig, CaptureError, CaptureSession, TlsCameraConnector, DEFAULT_PORT,
    DEFAULT_USERNAME,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::filter::{Directive, EnvFilter};

mod settings;
mod store;

use settings::Settings;
use store::SnapshotStore;

#[derive(Parser)]
#[command(name = "bambu-snap")]
#[command(about = "Camera snapshots from Bambu Lab printers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture one frame and save it as JPEG
    Snapshot(SnapshotArgs),
    /// Print the camera auth record as hex
    AuthRecord {
        /// Printer access code
        #[arg(long, env = "BAMBU_ACCESS_CODE")]
        access_code: String,
        /// Username placed in the record
        #[arg(long, default_value = DEFAULT_USERNAME)]
        username: String,
    },
}

#[derive(Args, Default)]
struct SnapshotArgs {
    /// Settings file (TOML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Printer host name or IP address
    #[arg(long)]
    host: Option<String>,
    /// Printer access code (LAN mode)
    #[arg(long, env = "BAMBU_ACCESS_CODE", hide_env_values = true)]
    access_code: Option<String>,
    /// Camera stream port [default: 6000]
    #[arg(long)]
    port: Option<u16>,
    /// Username for the auth record [default: bblp]
    #[arg(long)]
    username: Option<String>,
    /// Overall capture timeout in milliseconds [default: 10000]
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Directory to write the snapshot into [default: .]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// File name prefix [default: printer host]
    #[arg(short, long)]
    name: Option<String>,
}

/// Everything a snapshot run needs, after merging flags and settings.
#[derive(Debug, PartialEq, Eq)]
struct SnapshotPlan {
    config: CameraConfig,
    output_dir: PathBuf,
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Snapshot(args) => {
            let settings = match &args.config {
                Some(path) => Settings::load(path)?,
                None => Settings::default(),
            };
            let plan = plan_snapshot(args, settings)?;
            snapshot(plan).await?;
        }
        Commands::AuthRecord {
            access_code,
            username,
        } => {
            print_auth_record(&username, &access_code);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("bambu_camera={}", level).parse::<Directive>()?)
            .add_directive(format!("bambu_snap={}", level).parse::<Directive>()?),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn plan_snapshot(args: SnapshotArgs, settings: Settings) -> Result<SnapshotPlan> {
    let Settings { printer, capture } = settings;

    let Some(host) = args.host.or(printer.host) else {
        bail!("no printer host given (use --host or [printer].host)");
    };
    let access_code = args
        .access_code
        .or(printer.access_code)
        .unwrap_or_default();

    let mut config = CameraConfig::new(host.clone(), access_code)
        .with_port(args.port.or(printer.port).unwrap_or(DEFAULT_PORT));
    if let Some(username) = args.username.or(printer.username) {
        config = config.with_username(username);
    }
    if let Some(ms) = args.timeout_ms.or(capture.timeout_ms) {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    Ok(SnapshotPlan {
        config,
        output_dir: args
            .output_dir
            .or(capture.output_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        name: args.name.or(capture.name).unwrap_or(host),
    })
}

async fn snapshot(plan: SnapshotPlan) -> Result<()> {
    let SnapshotPlan {
        config,
        output_dir,
        name,
    } = plan;

    info!("Capturing from {}", config.addr());
    let connector = TlsCameraConnector::new().context("setting up TLS")?;
    let session = CaptureSession::new(config, connector);
    let handle = session.handle();

    let run = session.run();
    tokio::pin!(run);
    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            handle.stop();
            run.await
        }
    };

    let jpeg = match outcome.unwrap_or(Err(CaptureError::Stopped)) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            error!(kind = %e.kind(), "capture failed: {}", e);
            return Err(e.into());
        }
    };

    let path = SnapshotStore::new(output_dir).save(&name, &jpeg)?;
    println!("Saved {} ({} bytes)", path.display(), jpeg.len());
    Ok(())
}

fn print_auth_record(username: &str, access_code: &str) {
    let record = auth_record(username, access_code);
    for row in record.chunks(16) {
        let hex: Vec<String> = row.iter().map(|b| format!("{:02x}", b)).collect();
        println!("{}", hex.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_snapshot() {
        let cli = Cli::try_parse_from([
            "bambu-snap",
            "snapshot",
            "--host",
            "192.168.1.50",
            "--access-code",
            "12345678",
            "--timeout-ms",
            "2500",
        ])
        .unwrap();
        let Commands::Snapshot(args) = cli.command else {
            panic!("expected snapshot command");
        };
        assert_eq!(args.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(args.timeout_ms, Some(2500));
    }

    #[test]
    fn test_plan_defaults() {
        let args = SnapshotArgs {
            host: Some("printer.local".into()),
            access_code: Some("code".into()),
            ..Default::default()
        };
        let plan = plan_snapshot(args, Settings::default()).unwrap();

        assert_eq!(plan.config, CameraConfig::new("printer.local", "code"));
        assert_eq!(plan.output_dir, PathBuf::from("."));
        assert_eq!(plan.name, "printer.local");
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings::parse(
            "[printer]\nhost = \"from-file\"\naccess_code = \"file-code\"\nport = 7000\n\
             [capture]\ntimeout_ms = 5000\nname = \"x1c\"\n",
        )
        .unwrap();
        let args = SnapshotArgs {
            host: Some("from-flag".into()),
            timeout_ms: Some(1000),
            ..Default::default()
        };
        let plan = plan_snapshot(args, settings).unwrap();

        assert_eq!(plan.config.host, "from-flag");
        assert_eq!(plan.config.access_code, "file-code");
        assert_eq!(plan.config.port, 7000);
        assert_eq!(plan.config.timeout, Duration::from_millis(1000));
        assert_eq!(plan.name, "x1c");
    }

    #[test]
    fn test_plan_requires_host() {
        assert!(plan_snapshot(SnapshotArgs::default(), Settings::default()).is_err());
    }
}
