//! # wms-edi-cli
//!
//! Command-line interface for the warehouse EDI integration: build outbound
//! interchanges from warehouse data, decode and ingest inbound ones, and
//! apply inbox records as warehouse lists.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use wms_edi_apply::{ApplyOptions, ApplyService, InboxService};
use wms_edi_model::{Flow, MessageType, PayloadRows};
use wms_edi_store::{DbConfig, NewItemMapping, Store};
use wms_edi_x12::Encoder;

#[derive(Parser)]
#[command(name = "wms-edi")]
#[command(about = "Warehouse EDI X12 integration CLI")]
#[command(version)]
struct Cli {
    /// Path to the warehouse database file
    #[arg(long, default_value = "wms.db", global = true)]
    database: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Build an outbound interchange from warehouse data
    Export {
        /// Data flow to export (items, stock, orders)
        #[arg(short, long)]
        flow: String,

        /// Message type; defaults to the flow's natural type
        #[arg(short, long)]
        message_type: Option<String>,

        /// Maximum number of payload rows
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Write the interchange here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode an interchange file and print the structured preview
    Decode {
        /// Input interchange file
        input: PathBuf,
    },

    /// Ingest an interchange file into the EDI inbox
    Import {
        /// Integration key the content belongs to
        #[arg(short, long)]
        integration: String,

        /// Data flow of the content (items, stock, orders)
        #[arg(short, long, default_value = "orders")]
        flow: String,

        /// Input interchange file
        input: PathBuf,
    },

    /// List inbox records for an integration
    Inbox {
        #[arg(short, long)]
        integration: String,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Set manual per-record overrides honored by the next apply
    InboxConfig {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        inbox_id: i64,

        /// Override the resolved list type
        #[arg(long)]
        tipo_lista: Option<i64>,

        /// Attach the created lists to this area
        #[arg(long)]
        area_id: Option<i64>,

        /// Attach the created lists to this machine
        #[arg(long)]
        machine_id: Option<i64>,
    },

    /// Apply a decoded inbox record as warehouse lists
    Apply {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        inbox_id: i64,

        /// Actor recorded in the audit trail
        #[arg(long, default_value = "system")]
        applied_by: String,

        /// Re-apply a record that was already applied
        #[arg(long)]
        reprocess: bool,
    },

    /// Manage external-code to item mappings
    #[command(subcommand)]
    Map(MapCommands),
}

#[derive(Subcommand)]
enum MapCommands {
    /// Create or update a mapping
    Set {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        external_code: String,

        #[arg(long)]
        item_id: Option<i64>,

        #[arg(long)]
        item_code: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List mappings, optionally filtered by substring
    List {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Delete a mapping by id
    Delete {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        id: i64,
    },

    /// Suggest mapping candidates for an external code
    Suggest {
        #[arg(short, long)]
        integration: String,

        #[arg(long)]
        external_code: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let store = open_store(&cli.database, false).await?;
            let applied = store.migrate().await?;
            println!("{applied} migration(s) applied");
        }
        Commands::Export {
            flow,
            message_type,
            limit,
            output,
        } => {
            let store = open_store(&cli.database, true).await?;
            let flow: Flow = flow.parse()?;
            let message_type: MessageType = match message_type {
                Some(code) => code.parse()?,
                None => flow.default_message_type(),
            };

            let payload = match flow {
                Flow::Items => PayloadRows::Items(store.load_items_payload(limit).await?),
                Flow::Stock => PayloadRows::Stock(store.load_stock_payload(limit).await?),
                Flow::Orders => PayloadRows::Orders(store.load_orders_payload(limit).await?),
            };
            tracing::info!(%flow, %message_type, rows = payload.len(), "building interchange");

            let text = Encoder::new().encode(message_type, &payload)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &text)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("{} rows -> {}", payload.len(), path.display());
                }
                None => println!("{text}"),
            }
        }
        Commands::Decode { input } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let decoded = wms_edi_x12::decode(&content);
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Commands::Import {
            integration,
            flow,
            input,
        } => {
            let store = open_store(&cli.database, true).await?;
            let flow: Flow = flow.parse()?;
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            let outcome = InboxService::new(store).ingest(&integration, flow, &content).await?;
            println!(
                "inbox {} ({}, {} order(s), {} warning(s))",
                outcome.inbox_id,
                outcome.decoded.message_type.as_deref().unwrap_or("UNKNOWN"),
                outcome.decoded.orders.len(),
                outcome.decoded.errors.len()
            );
        }
        Commands::Inbox {
            integration,
            limit,
            offset,
        } => {
            let store = open_store(&cli.database, true).await?;
            let summaries = store.list_inbox(&integration, limit, offset).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::InboxConfig {
            integration,
            inbox_id,
            tipo_lista,
            area_id,
            machine_id,
        } => {
            let store = open_store(&cli.database, true).await?;
            let updated = store
                .set_inbox_overrides(&integration, inbox_id, tipo_lista, area_id, machine_id)
                .await?;
            if updated {
                println!("inbox {inbox_id} overrides updated");
            } else {
                anyhow::bail!("inbox record {inbox_id} not found for '{integration}'");
            }
        }
        Commands::Apply {
            integration,
            inbox_id,
            applied_by,
            reprocess,
        } => {
            let store = open_store(&cli.database, true).await?;
            let outcome = ApplyService::new(store)
                .apply(&integration, inbox_id, &applied_by, ApplyOptions { reprocess })
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Map(command) => {
            let store = open_store(&cli.database, true).await?;
            run_map_command(&store, command).await?;
        }
    }

    Ok(())
}

async fn run_map_command(store: &Store, command: MapCommands) -> anyhow::Result<()> {
    match command {
        MapCommands::Set {
            integration,
            external_code,
            item_id,
            item_code,
            description,
        } => {
            store
                .upsert_item_mapping(&NewItemMapping {
                    integration_key: integration.clone(),
                    external_code: external_code.clone(),
                    item_id,
                    item_code,
                    description,
                })
                .await?;
            println!("mapping saved for {integration}/{external_code}");
        }
        MapCommands::List {
            integration,
            search,
            limit,
            offset,
        } => {
            let mappings = store
                .list_item_mappings(&integration, search.as_deref(), limit, offset)
                .await?;
            println!("{}", serde_json::to_string_pretty(&mappings)?);
        }
        MapCommands::Delete { integration, id } => {
            if store.delete_item_mapping(&integration, id).await? {
                println!("mapping {id} deleted");
            } else {
                println!("mapping {id} not found");
            }
        }
        MapCommands::Suggest {
            integration,
            external_code,
            limit,
        } => {
            let service = ApplyService::new(store.clone());
            let suggestions = service
                .resolver()
                .suggest(&integration, &external_code, limit)
                .await?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
    }
    Ok(())
}

async fn open_store(database: &str, migrate: bool) -> anyhow::Result<Store> {
    let store = Store::open(&DbConfig::local(database)).await?;
    if migrate {
        // Schema is applied once per process startup, never per request.
        store.migrate().await?;
    }
    Ok(store)
}
