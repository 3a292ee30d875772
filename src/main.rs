use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use manifest_launcher::{
    default_settings_path, init_tracing, launch, load_manifest, load_settings,
    verify_and_install, HttpContentSource, LauncherError, LauncherResult, LineSink, OutputLine,
    RouteSpec, SyncProgress,
};

/// Install and launch manifest-described game builds
#[derive(Parser)]
#[command(
    name = "manifest-launcher",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify an instance against its manifest, fetching what is missing
    Verify(TargetArgs),

    /// Verify, then launch the client against a server
    Launch(LaunchArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Manifest file path or http(s) URL
    #[arg(long)]
    manifest: String,

    /// Instance directory
    #[arg(long)]
    instance: PathBuf,

    /// Base URL that content locators resolve against
    #[arg(long, env = "MANIFEST_LAUNCHER_BASE_URL")]
    base_url: String,

    /// Separate base URL for runtime artifacts
    #[arg(long)]
    runtime_base_url: Option<String>,
}

#[derive(Args)]
struct LaunchArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Server address
    #[arg(long)]
    address: String,

    /// Server port
    #[arg(long, default_value_t = 25565)]
    port: u16,

    /// Archive to prefer, relative to the instance
    #[arg(long)]
    preferred_archive: Option<String>,

    /// Version override for compatibility handling
    #[arg(long)]
    version: Option<String>,

    /// Settings file (JSON)
    #[arg(long, env = "MANIFEST_LAUNCHER_SETTINGS")]
    settings: Option<PathBuf>,
}

impl TargetArgs {
    fn source(&self) -> LauncherResult<HttpContentSource> {
        let source = HttpContentSource::new(self.base_url.clone())?;
        Ok(match &self.runtime_base_url {
            Some(base) => source.with_runtime_base(base.clone()),
            None => source,
        })
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling");
            trigger.cancel();
        }
    });

    match run(cli, &cancel).await {
        Ok(code) => std::process::exit(code),
        Err(LauncherError::Cancelled) => {
            eprintln!("Cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> LauncherResult<i32> {
    match cli.command {
        Command::Verify(args) => {
            let manifest = load_manifest(&args.manifest).await?;
            let source = args.source()?;
            let progress = |p: SyncProgress| {
                println!("[{}/{}] {:?} {}", p.index, p.total, p.action, p.path);
            };
            let outcome =
                verify_and_install(&manifest, &args.instance, &source, &progress, cancel).await?;
            println!(
                "{} downloaded, {} verified",
                outcome.downloaded, outcome.verified
            );
            Ok(0)
        }
        Command::Launch(args) => {
            let manifest = load_manifest(&args.target.manifest).await?;
            let source = args.target.source()?;
            let progress = |_: SyncProgress| {};
            verify_and_install(&manifest, &args.target.instance, &source, &progress, cancel)
                .await?;

            let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
            let settings = load_settings(&settings_path)?;

            let mut route = RouteSpec::new(args.address.clone(), args.port)?;
            if let Some(archive) = &args.preferred_archive {
                route = route.with_preferred_archive(archive.clone());
            }
            if let Some(version) = &args.version {
                route = route.with_version(version.clone());
            }

            let on_line: LineSink = Arc::new(|line: OutputLine| {
                println!("[{}] {}", line.stream.tag(), line.text);
            });
            let outcome = launch(
                &manifest,
                &settings,
                &route,
                &args.target.instance,
                &source,
                on_line,
                cancel,
            )
            .await?;
            info!(
                "Client exited with code {} after {}s",
                outcome.exit_code,
                (outcome.exited_at - outcome.started_at).num_seconds()
            );
            Ok(outcome.exit_code)
        }
    }
}
