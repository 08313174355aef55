mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::process::ExitCode;
use std::time::Duration;
use tether_rpc::{RpcBridge, RpcBridgeConfig};
use tether_sdk::{Client, Notice, NoticeLevel, Outcome, ProfileEntry, ProfileView, Signal};

#[derive(Parser, Debug)]
#[command(name = "tether", about = "Operator CLI for the tether proxy daemon", version)]
struct Cli {
    /// RPC address of the daemon; defaults to the configured value.
    #[arg(long)]
    rpc: Option<String>,

    /// Print machine-readable JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Suppress success notices.
    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List profiles with the chain ordering applied.
    List,
    /// Register a new profile from a URL or file path.
    Import { locator: String },
    /// Remove a profile, disabling it first if it is chained.
    Delete { uid: String },
    /// Re-fetch one remote profile's content.
    Update { uid: String },
    /// Re-fetch every remote profile concurrently.
    UpdateAll,
    /// Make a profile the current base configuration.
    Select {
        uid: String,
        /// Re-apply even when the profile is already current.
        #[arg(long)]
        force: bool,
    },
    /// Append an enhancement profile to the chain.
    Enable { uid: String },
    /// Remove an enhancement profile from the chain.
    Disable { uid: String },
    /// Move a chained enhancement to the front.
    MoveFront { uid: String },
    /// Move a chained enhancement to the end.
    MoveEnd { uid: String },
    /// Ask the daemon to re-compose the chain over the current selection.
    Enhance,
    /// Print per-entry composition diagnostics.
    Logs,
    /// Drop every live connection held by the daemon.
    Disconnect,
    /// Stream daemon notices and signals until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = config::load_settings()?;
    let rpc = cli.rpc.clone().unwrap_or(settings.rpc);
    let bridge = RpcBridge::connect(&RpcBridgeConfig {
        addr: rpc.clone(),
        connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
    })
    .await
    .with_context(|| format!("failed to reach the daemon at {rpc}"))?;

    let client = Client::new(bridge);
    let mut notices = client.notices();

    let outcome = match &cli.command {
        Command::List => {
            let set = client.store().profiles().await?;
            print_view(cli, set.current.as_deref(), &set.view());
            Outcome::Applied
        }
        Command::Import { locator } => client.coordinator().import(locator).await,
        Command::Delete { uid } => client.coordinator().delete_entry(uid).await,
        Command::Update { uid } => {
            client.store().update_profile(uid).await?;
            client.store().refresh_profiles().await?;
            if !cli.quiet {
                println!("updated {uid}");
            }
            Outcome::Applied
        }
        Command::UpdateAll => match client.updater().update_all().await {
            Some(report) => {
                if cli.json {
                    println!(
                        "{}",
                        json!({ "attempted": report.attempted, "failed": report.failed })
                    );
                } else if !cli.quiet {
                    println!(
                        "updated {} of {} profiles",
                        report.attempted.len() - report.failed.len(),
                        report.attempted.len()
                    );
                }
                if report.failed.is_empty() {
                    Outcome::Applied
                } else {
                    Outcome::Failed
                }
            }
            None => Outcome::Dropped,
        },
        Command::Select { uid, force } => client.coordinator().select_current(uid, *force).await,
        Command::Enable { uid } => client.coordinator().enable_chain(uid).await,
        Command::Disable { uid } => client.coordinator().disable_chain(uid).await,
        Command::MoveFront { uid } => client.coordinator().move_to_front(uid).await,
        Command::MoveEnd { uid } => client.coordinator().move_to_end(uid).await,
        Command::Enhance => client.coordinator().enhance().await,
        Command::Logs => {
            let logs = client.store().runtime_logs().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                for (uid, lines) in &logs {
                    for line in lines {
                        println!("{uid}: [{}] {}", line.level, line.message);
                    }
                }
            }
            Outcome::Applied
        }
        Command::Disconnect => {
            client.close_connections().await?;
            if !cli.quiet {
                println!("closed all connections");
            }
            Outcome::Applied
        }
        Command::Watch => {
            watch(&client, &mut notices).await?;
            Outcome::Applied
        }
    };

    drain_notices(cli, &mut notices);
    Ok(exit_code(outcome))
}

fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Applied | Outcome::Noop | Outcome::Dropped => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::from(1),
    }
}

fn drain_notices(cli: &Cli, notices: &mut tokio::sync::broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        print_notice(cli, &notice);
    }
}

fn print_notice(cli: &Cli, notice: &Notice) {
    match notice.level {
        NoticeLevel::Success if !cli.quiet => println!("{}", notice.message),
        NoticeLevel::Success => {}
        NoticeLevel::Error => eprintln!("error: {}", notice.message),
    }
}

fn print_view(cli: &Cli, current: Option<&str>, view: &ProfileView) {
    if cli.json {
        println!(
            "{}",
            json!({ "current": current, "regular": view.regular, "enhance": view.enhance })
        );
        return;
    }
    for entry in &view.regular {
        let marker = if current == Some(entry.uid.as_str()) { "*" } else { " " };
        println!("{marker} {}", format_entry(entry));
    }
    if !view.enhance.is_empty() {
        println!("enhancements:");
        for entry in &view.enhance {
            println!("    {}", format_entry(entry));
        }
    }
}

fn format_entry(entry: &ProfileEntry) -> String {
    let mut line = format!("{} [{}] {}", entry.uid, entry.kind.as_str(), entry.name);
    if !entry.locator.is_empty() {
        line.push_str(&format!(" ({})", entry.locator));
    }
    line
}

async fn watch(
    client: &Client<RpcBridge>,
    notices: &mut tokio::sync::broadcast::Receiver<Notice>,
) -> Result<()> {
    let _router = client.run_events().await.context("failed to subscribe to daemon events")?;
    let mut signals = client.signals();
    println!("watching daemon events, ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notice = notices.recv() => match notice {
                Ok(notice) => println!(
                    "notice[{}]: {}",
                    match notice.level {
                        NoticeLevel::Success => "ok",
                        NoticeLevel::Error => "error",
                    },
                    notice.message
                ),
                Err(_) => break,
            },
            signal = signals.recv() => match signal {
                Ok(Signal::SettingsChanged) => println!("settings changed"),
                Err(_) => break,
            },
        }
    }
    Ok(())
}
