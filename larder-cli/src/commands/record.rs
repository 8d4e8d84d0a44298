//! Local record commands: put, delete, list.

use clap::{Args, ValueEnum};
use larder_core::{FileStore, LocalRepository, Payload, StorageError, SystemClock};

use super::format_millis;
use crate::config::Config;

/// Field names owned by the record envelope.
const RESERVED_FIELDS: [&str; 3] = ["id", "updatedAt", "deleted"];

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Create or update a record
#[derive(Debug, Args)]
pub struct PutCommand {
    /// Collection name
    pub collection: String,

    /// Record id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Record fields as a JSON object
    #[arg(long)]
    pub json: String,
}

/// Delete a record
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Collection name
    pub collection: String,

    /// Record id
    pub id: String,
}

/// List records in a collection
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Collection name
    pub collection: String,

    /// Include deleted records
    #[arg(long)]
    pub all: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

fn repository(config: &Config) -> LocalRepository<FileStore, SystemClock> {
    LocalRepository::new(config.collection_store(), SystemClock)
}

impl PutCommand {
    pub fn run(&self, config: &Config) -> Result<(), RecordCommandError> {
        let payload = parse_payload(&self.json)?;
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let record = repository(config).put(&self.collection, &id, payload)?;
        println!("Saved {}/{}", self.collection, record.id);
        Ok(())
    }
}

impl DeleteCommand {
    pub fn run(&self, config: &Config) -> Result<(), RecordCommandError> {
        if repository(config).delete(&self.collection, &self.id)? {
            println!("Deleted {}/{}", self.collection, self.id);
            Ok(())
        } else {
            Err(RecordCommandError::NotFound {
                collection: self.collection.clone(),
                id: self.id.clone(),
            })
        }
    }
}

impl ListCommand {
    pub fn run(&self, config: &Config) -> Result<(), RecordCommandError> {
        let repo = repository(config);
        let records = if self.all {
            repo.list_all(&self.collection)
        } else {
            repo.list(&self.collection)
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            OutputFormat::Text => {
                if records.is_empty() {
                    println!("No records in '{}'.", self.collection);
                    return Ok(());
                }
                for record in &records {
                    let marker = if record.deleted { " (deleted)" } else { "" };
                    println!(
                        "{}  {}{}",
                        record.id,
                        format_millis(record.updated_at),
                        marker
                    );
                    if !record.payload.is_empty() {
                        println!("    {}", serde_json::Value::Object(record.payload.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parses `--json` into record fields.
fn parse_payload(input: &str) -> Result<Payload, RecordCommandError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    let serde_json::Value::Object(payload) = value else {
        return Err(RecordCommandError::NotAnObject);
    };
    if let Some(field) = RESERVED_FIELDS.iter().find(|f| payload.contains_key(**f)) {
        return Err(RecordCommandError::ReservedField(field.to_string()));
    }
    Ok(payload)
}

/// Errors from record commands
#[derive(Debug, thiserror::Error)]
pub enum RecordCommandError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record fields must be a JSON object")]
    NotAnObject,
    #[error("Field '{0}' is managed by larder and cannot be set")]
    ReservedField(String),
    #[error("No record '{id}' in '{collection}'")]
    NotFound { collection: String, id: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
