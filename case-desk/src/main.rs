use anyhow::Context;
use case_core::config::get_configuration;
use case_core::observability::{init_tracing, shutdown_tracing};
use case_core::config::SessionSettings;
use case_core::{build_store, ApiClient, Session};
use case_desk::{InvestigationDetails, Resource, ResourceClient, ResourceScreen};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "case-desk")]
#[command(about = "GST investigation case desk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session issued by the sign-in page.
    Login {
        #[arg(long)]
        access: String,
        #[arg(long)]
        refresh: String,
    },
    Logout,
    /// List the records of a resource, optionally for one investigation file.
    List {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        #[arg(long)]
        file_number: Option<String>,
    },
    Show {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: String,
    },
    /// Delete a record. Refuses to run without --yes.
    Delete {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Show one sidebar panel of an investigation file.
    Panel {
        file_number: String,
        #[arg(value_parser = parse_resource)]
        panel: Resource,
    },
}

fn parse_resource(raw: &str) -> Result<Resource, String> {
    Resource::from_segment(raw).ok_or_else(|| {
        let known: Vec<&str> = Resource::ALL.iter().map(|r| r.segment()).collect();
        format!("unknown resource `{}` (expected one of: {})", raw, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(&configuration.telemetry)?;

    let store = build_store(&configuration.session);
    let api = Arc::new(
        ApiClient::new(&configuration.api, store).context("Failed to build API client")?,
    );

    info!(base_url = %api.base_url(), "Starting case-desk");
    let outcome = run(cli.command, api, &configuration.session).await;

    shutdown_tracing();
    outcome
}

async fn run(
    command: Commands,
    api: Arc<ApiClient>,
    session: &SessionSettings,
) -> anyhow::Result<()> {
    match command {
        Commands::Login { access, refresh } => {
            // Each command is its own process; a memory-only login would be lost on exit.
            if session.in_memory {
                anyhow::bail!(
                    "Refusing to log in: session.in_memory is set and the session would end with this command"
                );
            }
            api.establish_session(Session::new(access, refresh)).await?;
            println!("Session stored in {}", session.path.display());
        }
        Commands::Logout => {
            api.logout().await?;
            println!("Signed out");
        }
        Commands::List {
            resource,
            file_number,
        } => {
            let client = ResourceClient::new(api, resource);
            let mut screen = match file_number {
                Some(file_number) => ResourceScreen::scoped(client, file_number),
                None => ResourceScreen::new(client),
            };
            screen.load().await?;
            print_json(&Value::Array(screen.rows().to_vec()))?;
        }
        Commands::Show { resource, id } => {
            let mut screen = ResourceScreen::new(ResourceClient::new(api, resource));
            screen.select(&id).await?;
            if let Some(record) = screen.selected() {
                print_json(record)?;
            }
        }
        Commands::Delete { resource, id, yes } => {
            let mut screen = ResourceScreen::new(ResourceClient::new(api, resource));
            screen.select(&id).await?;
            screen.request_delete()?;
            if !yes {
                screen.cancel();
                anyhow::bail!("Not deleting {} {} without --yes", resource, id);
            }
            screen.confirm_delete().await?;
            println!("Deleted {} {}", resource, id);
        }
        Commands::Panel { file_number, panel } => {
            let mut details = InvestigationDetails::new(api, file_number);
            details.show(panel).await?;
            print_json(&Value::Array(details.screen().rows().to_vec()))?;
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
