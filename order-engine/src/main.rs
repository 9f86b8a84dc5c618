use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use order_engine::core::Resource;
use order_engine::export::DirectoryDestination;
use order_engine::{Config, EngineError, EngineState, ValidationIssue, init_logger_with_file};
use serde::Serialize;
use serde_json::{Value, json};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{Customer, DEFAULT_FILENAME_PATTERN, OrderSummary, TemplateConfig};
use shared::util::{new_id, now_millis};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quicksales")]
#[command(about = "QuickSales order numbering and Excel export", long_about = None)]
struct Cli {
    /// Working directory (overrides WORK_DIR)
    #[arg(long)]
    work_dir: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the next order number without consuming it
    NextNumber {
        /// Order date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List saved orders, newest first
    Orders {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Export one order through its template
    Export {
        /// Order number
        number: String,

        /// Template id (defaults to the order's or the default template)
        #[arg(long)]
        template: Option<String>,

        /// Output directory (defaults to the configured output directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export several orders into one workbook with a summary sheet
    ExportBatch {
        /// Order numbers
        #[arg(required = true)]
        numbers: Vec<String>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Template management
    Templates {
        #[command(subcommand)]
        cmd: TemplateCmd,
    },

    /// Customer records
    Customers {
        #[command(subcommand)]
        cmd: CustomerCmd,
    },
}

#[derive(Subcommand)]
enum TemplateCmd {
    List,

    /// Import a template definition (JSON) and optionally its workbook
    Import {
        /// Template JSON (camelCase or snake_case keys)
        config: PathBuf,

        /// xlsx file stored as the template payload
        #[arg(long)]
        workbook: Option<PathBuf>,

        /// Make this the default template
        #[arg(long, default_value_t = false)]
        default: bool,
    },

    Delete {
        id: String,
    },

    /// Set every template's filename pattern
    ResetPatterns {
        #[arg(default_value = DEFAULT_FILENAME_PATTERN)]
        pattern: String,
    },
}

#[derive(Subcommand)]
enum CustomerCmd {
    /// List customers, or find the one matching a phone or license plate
    List {
        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        plate: Option<String>,
    },

    /// Import a customer record (JSON)
    Import { file: PathBuf },
}

impl Commands {
    fn out_dir(&self) -> Option<PathBuf> {
        match self {
            Commands::Export { out, .. } | Commands::ExportBatch { out, .. } => out.clone(),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );

    let (response, failed) = execute(cli.cmd, &config).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Run one command; the database is closed again before this returns
async fn execute(cmd: Commands, config: &Config) -> Result<(ApiResponse<Value>, bool)> {
    let prompt = Arc::new(DirectoryDestination::new(cmd.out_dir()));
    let state = EngineState::initialize(config, prompt)
        .with_context(|| format!("failed to open {}", config.db_path().display()))?;

    let result = run(cmd, &state).await;
    drop(state);

    Ok(match result {
        Ok(data) => (ApiResponse::success(data), false),
        Err(err) => (ApiResponse::from(err), true),
    })
}

async fn run(cmd: Commands, state: &EngineState) -> Result<Value, AppError> {
    match cmd {
        Commands::NextNumber { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let number = state.service.preview_number(date)?;
            Ok(json!({ "date": date, "orderNumber": number }))
        }
        Commands::Orders { limit } => {
            let orders = state.storage.list_orders().map_err(EngineError::from)?;
            let rows: Vec<OrderSummary> = orders
                .iter()
                .take(limit)
                .map(OrderSummary::from)
                .collect();
            to_json(&rows)
        }
        Commands::Export {
            number, template, ..
        } => {
            let order = find_order(state, &number)?;
            let outcome = state
                .service
                .export_order(&order, template.as_deref())
                .await?;
            to_json(&outcome)
        }
        Commands::ExportBatch { numbers, .. } => {
            let orders = numbers
                .iter()
                .map(|n| find_order(state, n))
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = state.service.export_orders_batch(&orders).await?;
            to_json(&outcome)
        }
        Commands::Templates { cmd } => run_templates(cmd, state),
        Commands::Customers { cmd } => run_customers(cmd, state),
    }
}

fn run_customers(cmd: CustomerCmd, state: &EngineState) -> Result<Value, AppError> {
    match cmd {
        CustomerCmd::List {
            phone: None,
            plate: None,
        } => {
            let mut customers = state.storage.list_customers().map_err(EngineError::from)?;
            customers.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            to_json(&customers)
        }
        CustomerCmd::List { phone, plate } => {
            let found = state
                .storage
                .find_customer_by_identity(
                    phone.as_deref().unwrap_or_default(),
                    plate.as_deref().unwrap_or_default(),
                )
                .map_err(EngineError::from)?;
            to_json(&found)
        }
        CustomerCmd::Import { file } => {
            let raw = std::fs::read(&file).map_err(EngineError::from)?;
            let mut customer: Customer = serde_json::from_slice(&raw)
                .map_err(|e| AppError::validation(format!("{}: {e}", file.display())))?;
            if customer.name.trim().is_empty() {
                return Err(EngineError::from(ValidationIssue::MissingCustomer).into());
            }
            if customer.id.is_empty() {
                customer.id = new_id();
            }
            let now = now_millis();
            if customer.created_at == 0 {
                customer.created_at = now;
            }
            customer.updated_at = now;

            state
                .storage
                .upsert_customer(&customer)
                .map_err(EngineError::from)?;
            tracing::info!(customer_id = %customer.id, name = %customer.name, "Customer imported");
            Ok(json!({ "id": customer.id }))
        }
    }
}

fn run_templates(cmd: TemplateCmd, state: &EngineState) -> Result<Value, AppError> {
    match cmd {
        TemplateCmd::List => {
            let templates = state.storage.list_templates().map_err(EngineError::from)?;
            let rows: Vec<Value> = templates
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "name": t.name,
                        "fileName": t.file_name,
                        "filenamePattern": t.filename_pattern,
                        "isDefault": t.is_default,
                        "hasWorkbook": !t.template_base64.is_empty(),
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        }
        TemplateCmd::Import {
            config,
            workbook,
            default,
        } => {
            let raw = std::fs::read(&config).map_err(EngineError::from)?;
            let mut template: TemplateConfig = serde_json::from_slice(&raw)
                .map_err(|e| AppError::validation(format!("{}: {e}", config.display())))?;

            if let Some(path) = workbook {
                let bytes = std::fs::read(&path).map_err(EngineError::from)?;
                template.set_payload(&bytes);
                if template.file_name.is_empty() {
                    template.file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                }
            }
            if template.id.is_empty() {
                template.id = new_id();
            }
            let now = now_millis();
            if template.created_at == 0 {
                template.created_at = now;
            }
            template.updated_at = now;
            template.is_default |= default;

            state
                .storage
                .save_template(&template)
                .map_err(EngineError::from)?;
            tracing::info!(template_id = %template.id, name = %template.name, "Template imported");
            Ok(json!({ "id": template.id, "isDefault": template.is_default }))
        }
        TemplateCmd::Delete { id } => {
            if !state.storage.delete_template(&id).map_err(EngineError::from)? {
                return Err(EngineError::not_found(Resource::Template, id).into());
            }
            Ok(json!({ "deleted": id }))
        }
        TemplateCmd::ResetPatterns { pattern } => {
            let changed = state
                .storage
                .reset_filename_patterns(&pattern)
                .map_err(EngineError::from)?;
            Ok(json!({ "pattern": pattern, "changed": changed }))
        }
    }
}

fn find_order(
    state: &EngineState,
    number: &str,
) -> Result<shared::models::FinalizedOrder, AppError> {
    state
        .storage
        .find_order_by_number(number)
        .map_err(EngineError::from)?
        .ok_or_else(|| EngineError::not_found(Resource::Order, number).into())
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::new(ErrorCode::InternalError).with_detail("cause", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_engine::OrderStorage;

    #[tokio::test]
    async fn test_failed_command_closes_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_overrides(dir.path().to_string_lossy(), "orders.redb");

        let cmd = Commands::Export {
            number: "NO.404".to_string(),
            template: None,
            out: None,
        };
        let (response, failed) = execute(cmd, &config).await.unwrap();
        assert!(failed);
        assert!(!response.is_success());

        // reopening only works once the previous handle was dropped
        OrderStorage::open(config.db_path()).unwrap();
    }

    #[tokio::test]
    async fn test_customers_import_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_overrides(dir.path().to_string_lossy(), "orders.redb");
        let file = dir.path().join("customer.json");
        std::fs::write(
            &file,
            r#"{"name":"老王","phone":"13800000000","licensePlate":"粤B12345"}"#,
        )
        .unwrap();

        let (imported, failed) = execute(
            Commands::Customers {
                cmd: CustomerCmd::Import { file },
            },
            &config,
        )
        .await
        .unwrap();
        assert!(!failed);
        let id = imported.data.unwrap()["id"].as_str().unwrap().to_string();

        let lookup = Commands::Customers {
            cmd: CustomerCmd::List {
                phone: None,
                plate: Some("粤b12345".to_string()),
            },
        };
        let (found, _) = execute(lookup, &config).await.unwrap();
        let found = found.data.unwrap();
        assert_eq!(found["id"], id.as_str());
        assert_eq!(found["name"], "老王");

        let list = Commands::Customers {
            cmd: CustomerCmd::List {
                phone: None,
                plate: None,
            },
        };
        let (all, _) = execute(list, &config).await.unwrap();
        assert_eq!(all.data.unwrap().as_array().unwrap().len(), 1);
    }
}
