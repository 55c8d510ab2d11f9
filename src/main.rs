// slackflow — Slack workflow step client in Rust
// License: Apache-2.0

use anyhow::Context;
use clap::{Parser, Subcommand};
use slackflow::config::Config;
use slackflow::slack::{SlackClient, WorkflowStepUpdate};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "slackflow",
    about = "slackflow — Slack workflow step client",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the configuration of a workflow step (workflows.updateStep)
    UpdateStep {
        /// workflow_step_edit_id from the workflow_step_edit interaction
        #[arg(short, long)]
        edit_id: Option<String>,
        /// Step name shown in Workflow Builder
        #[arg(long)]
        step_name: Option<String>,
        /// Step image URL shown in Workflow Builder
        #[arg(long)]
        step_image_url: Option<String>,
        /// JSON file holding a full request (inputs, outputs, ...)
        #[arg(short, long)]
        request: Option<PathBuf>,
        /// Send as application/x-www-form-urlencoded instead of JSON
        #[arg(long)]
        form: bool,
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show resolved configuration
    Status {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    slackflow::logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::UpdateStep {
            edit_id,
            step_name,
            step_image_url,
            request,
            form,
            config,
        } => {
            let cfg = load_config(config.as_deref());
            if let Err(e) = cfg.validate() {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }

            let update = match build_update(edit_id, step_name, step_image_url, request) {
                Ok(u) => u,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = update_step_cmd(&cfg, update, form).await {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status { config } => {
            status_cmd(config.as_deref());
        }
        Commands::Version => {
            println!("slackflow v{}", slackflow::VERSION);
        }
    }
}

// ---------------------------------------------------------------------------
// update-step
// ---------------------------------------------------------------------------

fn build_update(
    edit_id: Option<String>,
    step_name: Option<String>,
    step_image_url: Option<String>,
    request: Option<PathBuf>,
) -> anyhow::Result<WorkflowStepUpdate> {
    let mut update = match request {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<WorkflowStepUpdate>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => {
            let id = edit_id
                .clone()
                .context("either --edit-id or --request is required")?;
            WorkflowStepUpdate::new(id)
        }
    };

    if let Some(id) = edit_id {
        update.workflow_step_edit_id = id;
    }
    if let Some(name) = step_name {
        update = update.with_step_name(name);
    }
    if let Some(url) = step_image_url {
        update = update.with_step_image_url(url);
    }

    Ok(update)
}

async fn update_step_cmd(cfg: &Config, update: WorkflowStepUpdate, form: bool) -> anyhow::Result<()> {
    let client = SlackClient::from_config(&cfg.slack)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if form {
        client
            .update_workflow_step_form_with_cancel(&update, &cancel)
            .await?;
    } else {
        client
            .update_workflow_step_with_cancel(&update, &cancel)
            .await?;
    }

    tracing::info!(edit_id = %update.workflow_step_edit_id, "Workflow step saved");
    println!("ok");
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn status_cmd(config_path: Option<&str>) {
    let path = resolve_config_path(config_path);
    let cfg = load_config(config_path);

    println!("slackflow status\n");
    if path.exists() {
        println!("  Config:   {}", path.display());
    } else {
        println!("  Config:   {} (not found, using defaults)", path.display());
    }
    println!("  API base: {}", cfg.slack.api_base);
    println!("  Token:    {}", cfg.slack.masked_token());
    match cfg.slack.timeout_secs {
        Some(t) => println!("  Timeout:  {}s", t),
        None => println!("  Timeout:  none"),
    }

    if let Err(e) = cfg.validate() {
        println!("\n  Not ready: {}", e);
    }
}

fn resolve_config_path(path: Option<&str>) -> PathBuf {
    if let Some(p) = path {
        PathBuf::from(p)
    } else {
        Config::default_path().unwrap_or_else(|_| PathBuf::from("config.json"))
    }
}

fn load_config(path: Option<&str>) -> Config {
    let config_path = resolve_config_path(path);

    Config::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    })
}
