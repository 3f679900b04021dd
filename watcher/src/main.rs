//! deploywatch - Entry Point
//!
//! Follows notebook builds, deployments and pipelines from the terminal.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use secrecy::SecretString;
use tracing::{error, info};

use deploywatch::app::commands;
use deploywatch::app::options::AppOptions;
use deploywatch::app::state::AppState;
use deploywatch::app::watch::{watch, WatchOutcome};
use deploywatch::logs::{init_logging, LogLevel, LogOptions};
use deploywatch::models::build::Build;
use deploywatch::models::deployment::Deployment;
use deploywatch::models::pipeline::Pipeline;
use deploywatch::models::{ResourceId, ResourceKind};
use deploywatch::storage::layout::StorageLayout;
use deploywatch::storage::settings::Settings;
use deploywatch::utils::version_info;

#[derive(Parser, Debug)]
#[command(name = "deploywatch")]
#[command(about = "Track notebook builds, deployments and pipelines")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print build version information and exit
    #[arg(long)]
    version: bool,

    /// Backend API base URL (overrides the settings file)
    #[arg(long, env = "DEPLOYWATCH_BASE_URL", global = true)]
    base_url: Option<String>,

    /// API token (overrides the settings file)
    #[arg(long, env = "DEPLOYWATCH_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a resource until it finishes
    Watch {
        kind: ResourceKind,
        id: ResourceId,

        /// Only track status, skip the log stream
        #[arg(long)]
        no_logs: bool,

        /// Polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// List resources of a kind
    List {
        kind: ResourceKind,

        /// Only resources belonging to this parent
        #[arg(long)]
        parent: Option<ResourceId>,
    },

    /// Create a resource from a JSON body
    Create {
        kind: ResourceKind,

        #[arg(long)]
        body: String,

        /// Follow the new resource after creating it
        #[arg(long)]
        watch: bool,
    },

    /// Delete a resource
    Delete { kind: ResourceKind, id: ResourceId },

    /// Run an action such as reload-model, rollback or traffic
    Action {
        kind: ResourceKind,
        id: ResourceId,
        action: String,

        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Print version and exit
    if cli.version {
        let version = version_info();
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        eprintln!("{} no command given, see --help", "error:".red().bold());
        return ExitCode::FAILURE;
    };

    // Retrieve the settings file
    let layout = StorageLayout::default();
    let settings = match layout.settings_file().read_json_or_default::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.clone().unwrap_or(settings.log_level.clone()),
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        json_format: cli.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let mut options = AppOptions::from_settings(&settings);
    if let Some(base_url) = cli.base_url {
        options.api_base_url = base_url;
    }
    if let Some(token) = cli.token {
        options.token = Some(SecretString::from(token));
    }

    info!("Running deploywatch {}", version_info().version);
    match run(command, options).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, mut options: AppOptions) -> anyhow::Result<ExitCode> {
    if let Command::Watch {
        no_logs,
        interval_ms,
        ..
    } = &command
    {
        options.watch.follow_logs = !no_logs;
        if let Some(interval_ms) = interval_ms {
            options.poller.interval = Duration::from_millis(*interval_ms);
        }
    }

    let state = AppState::init(&options).context("failed to initialize client")?;

    match command {
        Command::Watch { kind, id, .. } => watch_kind(&state, kind, id).await,
        Command::List { kind, parent } => {
            let parent = parent.as_ref();
            let count = match kind {
                ResourceKind::Build => commands::list::<Build>(&state, parent).await?,
                ResourceKind::Deployment => commands::list::<Deployment>(&state, parent).await?,
                ResourceKind::Pipeline => commands::list::<Pipeline>(&state, parent).await?,
            };
            info!("Listed {} {}", count, kind.collection());
            Ok(ExitCode::SUCCESS)
        }
        Command::Create { kind, body, watch } => {
            let body = commands::parse_body(Some(&body)).context("invalid --body")?;
            let id = match kind {
                ResourceKind::Build => commands::create::<Build>(&state, &body).await?.id,
                ResourceKind::Deployment => commands::create::<Deployment>(&state, &body).await?.id,
                ResourceKind::Pipeline => commands::create_pipeline(&state, &body).await?.id,
            };
            if watch {
                return watch_kind(&state, kind, id).await;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { kind, id } => {
            match kind {
                ResourceKind::Build => commands::delete::<Build>(&state, &id).await?,
                ResourceKind::Deployment => commands::delete::<Deployment>(&state, &id).await?,
                ResourceKind::Pipeline => commands::delete::<Pipeline>(&state, &id).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Action {
            kind,
            id,
            action,
            body,
        } => {
            let body = commands::parse_body(body.as_deref()).context("invalid --body")?;
            match kind {
                ResourceKind::Build => {
                    commands::action::<Build>(&state, &id, &action, &body).await?;
                }
                ResourceKind::Deployment => match commands::DeploymentAction::parse(&action, &body)? {
                    Some(typed) => {
                        commands::deployment_action(&state, &id, &typed).await?;
                    }
                    None => {
                        commands::action::<Deployment>(&state, &id, &action, &body).await?;
                    }
                },
                ResourceKind::Pipeline => {
                    commands::action::<Pipeline>(&state, &id, &action, &body).await?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn watch_kind(state: &AppState, kind: ResourceKind, id: ResourceId) -> anyhow::Result<ExitCode> {
    let options = state.options().watch.clone();
    let shutdown = Box::pin(await_shutdown_signal());

    let outcome = match kind {
        ResourceKind::Build => watch(state, &state.builds, id, &options, shutdown).await?,
        ResourceKind::Deployment => watch(state, &state.deployments, id, &options, shutdown).await?,
        ResourceKind::Pipeline => watch(state, &state.pipelines, id, &options, shutdown).await?,
    };
    state.shutdown();

    Ok(match outcome {
        WatchOutcome::Finished { failed: false } => ExitCode::SUCCESS,
        WatchOutcome::Finished { failed: true } => ExitCode::FAILURE,
        WatchOutcome::Interrupted => ExitCode::from(130),
    })
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
