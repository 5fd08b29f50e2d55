//! `mindclaw-cli` – mindclaw Command Line Interface
//!
//! The `mindclaw` binary hosts and exercises the claw skill:
//!
//! 1. `serve` runs the webhook until **Ctrl-C**, then drains in-flight
//!    requests.
//! 2. `invoke` and `simulate` dispatch a single request locally and print the
//!    response envelope.
//! 3. `state` inspects or seeds a user's persistent attributes.
//! 4. `schema` and `config` print the directive payload schema and the
//!    effective configuration.

mod config;
mod simulate;

use std::io::Read;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mindclaw_runtime::{HttpEndpointDiscovery, Skill, init_tracing};
use mindclaw_server::{ServerError, SkillServer};
use mindclaw_store::{AttributeStore, StoreError, open_bucket};
use mindclaw_types::{ControlPayload, PersistentAttributes, RequestEnvelope, SkillError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mindclaw", version, about = "Voice-controlled EV3 claw skill")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the skill webhook until Ctrl-C.
    Serve {
        /// Listening port (overrides the config file).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Dispatch one request envelope (`-` reads stdin) and print the reply.
    Invoke { path: String },
    /// Build a synthetic request for an intent and dispatch it.
    Simulate {
        /// Intent name (e.g. `ClawOpen`) or `LaunchRequest`.
        intent: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value = "mindclaw-local-user")]
        user: String,
        /// Gadget endpoint id to pre-cache; skips discovery.
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, default_value = simulate::DEFAULT_API_ENDPOINT)]
        api_endpoint: String,
        #[arg(long)]
        token: Option<String>,
    },
    /// Inspect or seed persistent attributes.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Print the JSON Schema of the claw control payload.
    Schema,
    /// Print the effective configuration.
    Config {
        /// Write the effective configuration to the config file.
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand, Debug)]
enum StateAction {
    Get { user_id: String },
    Set { user_id: String, state: String },
    Clear { user_id: String },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Skill(#[from] SkillError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> std::process::ExitCode {
    // Tracing first: the span exporter must exist before the runtime does.
    let _guard = init_tracing("mindclaw");
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start runtime".red(), e);
            return std::process::ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    let cfg = config::effective()?;

    match command {
        Command::Serve { port } => serve(&cfg, port.unwrap_or(cfg.port)).await,
        Command::Invoke { path } => {
            let raw = read_input(&path)?;
            let envelope: RequestEnvelope = serde_json::from_str(&raw)?;
            let reply = build_skill(&cfg)?.invoke(envelope).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Command::Simulate {
            intent,
            location,
            user,
            endpoint,
            api_endpoint,
            token,
        } => {
            let envelope = simulate::envelope(&simulate::Utterance {
                intent,
                location,
                user_id: user,
                endpoint,
                api_endpoint,
                access_token: token,
                skill_id: cfg.skill_id.clone(),
            });
            let reply = build_skill(&cfg)?.invoke(envelope).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Command::State { action } => {
            let store = open_bucket(&cfg.persistence_bucket)?;
            state(store.as_ref(), action, &cfg).await
        }
        Command::Schema => {
            let schema = schemars::schema_for!(ControlPayload);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Config { init } => {
            println!("{cfg:#?}");
            if init {
                config::save(&cfg)?;
                println!(
                    "  {} Config saved to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                );
            }
            Ok(())
        }
    }
}

fn build_skill(cfg: &config::Config) -> Result<Skill, CliError> {
    let store = open_bucket(&cfg.persistence_bucket)?;
    Ok(Skill::standard(
        Arc::new(HttpEndpointDiscovery::new()),
        store,
        cfg.skill_settings(),
    ))
}

async fn serve(cfg: &config::Config, port: u16) -> Result<(), CliError> {
    print_banner();
    println!(
        "  Attribute bucket: {}",
        cfg.persistence_bucket.as_str().bold()
    );
    if cfg.skill_id.is_none() {
        warn!("no skill_id configured; requests from any skill will be accepted");
    }
    println!("  Listening on port {}\n", port.to_string().bold().cyan());

    let skill = Arc::new(build_skill(cfg)?);
    SkillServer::new(skill)
        .with_port(port)
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C; serving until killed");
                std::future::pending::<()>().await;
            }
            println!();
            println!(
                "{}",
                "⚠  Ctrl-C received – initiating graceful shutdown …".yellow().bold()
            );
            info!("shutdown requested");
        })
        .await?;

    println!("{}", "  ✓ Exiting mindclaw.".green());
    Ok(())
}

async fn state(
    store: &dyn AttributeStore,
    action: StateAction,
    cfg: &config::Config,
) -> Result<(), CliError> {
    match action {
        StateAction::Get { user_id } => match store.get(&user_id).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!(
                "  {} (default state: {})",
                "no stored attributes".dimmed(),
                cfg.default_robot_state.as_str().bold()
            ),
        },
        StateAction::Set { user_id, state } => {
            let record = set_state(store.get(&user_id).await?, &state)?;
            store.put(&user_id, &record).await?;
            println!("  {} robot.state = {}", "✓".green().bold(), state.bold());
        }
        StateAction::Clear { user_id } => {
            store.delete(&user_id).await?;
            println!("  {} attributes cleared", "✓".green().bold());
        }
    }
    Ok(())
}

/// Replace `robot.state` in `existing`, keeping every other field.
fn set_state(existing: Option<serde_json::Value>, state: &str) -> Result<serde_json::Value, CliError> {
    let mut attrs = match existing {
        Some(value) => serde_json::from_value::<PersistentAttributes>(value)?,
        None => PersistentAttributes::default(),
    };
    attrs.robot.state = state.to_string();
    Ok(serde_json::to_value(attrs)?)
}

fn read_input(path: &str) -> Result<String, std::io::Error> {
    if path == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    __  ____           __________           "#.bold().cyan());
    println!("{}", r#"   /  |/  (_)__  ___/ / ___/ /__ __    __   "#.bold().cyan());
    println!("{}", r#"  / /|_/ / / _ \/ _  / /__/ / _ `/ |/|/ /   "#.bold().cyan());
    println!("{}", r#" /_/  /_/_/_//_/\_,_/\___/_/\_,_/|__,__/    "#.bold().cyan());
    println!();
    println!("  {}", "Voice-controlled EV3 claw skill".dimmed());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mindclaw_store::MemoryAttributeStore;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_port_override() {
        let cli = Cli::try_parse_from(["mindclaw", "serve", "--port", "9443"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: Some(9443) }));
    }

    #[test]
    fn state_set_parses_user_and_state() {
        let cli = Cli::try_parse_from(["mindclaw", "state", "set", "u-1", "open"]).unwrap();
        match cli.command {
            Command::State {
                action: StateAction::Set { user_id, state },
            } => {
                assert_eq!(user_id, "u-1");
                assert_eq!(state, "open");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn set_state_keeps_other_fields() {
        let existing = json!({ "robot": { "state": "closed", "battery": 80 }, "owner": "ada" });
        let updated = set_state(Some(existing), "open").unwrap();
        assert_eq!(updated["robot"]["state"], "open");
        assert_eq!(updated["robot"]["battery"], 80);
        assert_eq!(updated["owner"], "ada");
    }

    #[test]
    fn set_state_without_record_starts_from_default() {
        let updated = set_state(None, "up").unwrap();
        assert_eq!(updated, json!({ "robot": { "state": "up" } }));
    }

    #[tokio::test]
    async fn state_set_then_clear() {
        let store = MemoryAttributeStore::new();
        let cfg = config::Config::default();

        state(
            &store,
            StateAction::Set {
                user_id: "u-1".to_string(),
                state: "open".to_string(),
            },
            &cfg,
        )
        .await
        .unwrap();
        assert_eq!(
            store.get("u-1").await.unwrap().unwrap()["robot"]["state"],
            "open"
        );

        state(&store, StateAction::Clear { user_id: "u-1".to_string() }, &cfg)
            .await
            .unwrap();
        assert!(store.get("u-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn simulated_claw_command_dispatches_directive() {
        let cfg = config::Config {
            persistence_bucket: mindclaw_store::MEMORY_BUCKET.to_string(),
            ..config::Config::default()
        };
        let envelope = simulate::envelope(&simulate::Utterance {
            intent: "ClawDance".to_string(),
            location: None,
            user_id: "u-1".to_string(),
            endpoint: Some("dev-1".to_string()),
            api_endpoint: simulate::DEFAULT_API_ENDPOINT.to_string(),
            access_token: None,
            skill_id: None,
        });
        let reply = build_skill(&cfg).unwrap().invoke(envelope).await.unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            value["response"]["directives"][0]["payload"],
            json!({ "type": "dance", "state": "closed", "location": null })
        );
    }
}
