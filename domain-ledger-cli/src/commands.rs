//! Command-line definition and dispatch.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use domain_ledger_app::AppState;
use domain_ledger_core::error::{CoreError, CoreResult};
use domain_ledger_core::types::{ApiResponse, DomainView, ListScope};

#[derive(Parser)]
#[command(name = "domain-ledger")]
#[command(version, about = "Track domain ownership verification and billing lifecycle.")]
pub struct CommandLine {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Override the database path from the config
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a domain and print the TXT token to publish
    Add { name: String },
    /// List domains
    #[command(alias = "ls")]
    List {
        /// `admin` (all domains) or `public` (verified/expired public domains)
        #[arg(long, default_value = "admin")]
        scope: String,
    },
    /// Show a single domain
    Get { id: String },
    /// Check the domain's TXT records against its token
    Verify { id: String },
    /// Replace the visibility flag and billing data
    Update(UpdateArgs),
    /// Remove a domain
    #[command(alias = "rm")]
    Delete { id: String },
    /// Run one reconciliation pass now
    Reconcile,
    /// Run the reconciliation scheduler until interrupted
    Serve,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("billing_source")
        .required(true)
        .args(["billing", "billing_file", "clear_billing"])
))]
pub struct UpdateArgs {
    pub id: String,

    /// List the domain publicly
    #[arg(long, action = ArgAction::Set)]
    pub public: bool,

    /// Billing data as inline JSON
    #[arg(long)]
    pub billing: Option<String>,

    /// Read billing data JSON from a file
    #[arg(long)]
    pub billing_file: Option<PathBuf>,

    /// Remove the billing data
    #[arg(long)]
    pub clear_billing: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl UpdateArgs {
    fn billing_value(&self) -> CoreResult<Option<Value>> {
        let raw = match (&self.billing, &self.billing_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
                CoreError::ValidationError(format!(
                    "Failed to read billing file {}: {e}",
                    path.display()
                ))
            })?,
            (None, None) => return Ok(None),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::ValidationError(format!("Invalid billing JSON: {e}")))
    }
}

/// Pretty-printed `ApiResponse` for stdout
pub fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        serde_json::json!({
            "success": false,
            "error": { "code": "SerializationError", "details": e.to_string() },
        })
        .to_string()
    })
}

fn ok<T: Serialize>(data: T) -> String {
    render(&ApiResponse::success(data))
}

/// Execute a one-shot command and return its JSON output.
///
/// `Serve` is handled by the caller.
pub async fn execute(state: &AppState, command: Commands) -> CoreResult<String> {
    let service = &state.domain_service;
    match command {
        Commands::Add { name } => {
            let record = service.create_domain(&name).await?;
            Ok(ok(DomainView::from_record(record, ListScope::Admin, Utc::now())))
        }
        Commands::List { scope } => {
            let scope: ListScope = scope.parse()?;
            Ok(ok(service.list_domain_views(scope, Utc::now()).await?))
        }
        Commands::Get { id } => {
            let record = service.get_domain(&id).await?;
            Ok(ok(DomainView::from_record(record, ListScope::Admin, Utc::now())))
        }
        Commands::Verify { id } => Ok(ok(service.verify_domain(&id).await?)),
        Commands::Update(args) => {
            let billing = args.billing_value()?;
            let record = service.update_domain(&args.id, args.public, billing).await?;
            Ok(ok(DomainView::from_record(record, ListScope::Admin, Utc::now())))
        }
        Commands::Delete { id } => {
            service.delete_domain(&id).await?;
            Ok(render(&ApiResponse::<()>::empty()))
        }
        Commands::Reconcile => Ok(ok(state.reconciliation_service.run_once(Utc::now()).await?)),
        Commands::Serve => Err(CoreError::ValidationError(
            "serve is not a one-shot command".to_string(),
        )),
    }
}
