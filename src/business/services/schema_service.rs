//! JSON schema validation of request payloads
//!
//! The schemas are compiled into the binary and built once at startup.

use serde_json::{json, Value};
use tracing::debug;

use crate::shared::{AppError, AppResult};

const AR_FILING: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/ar-filing.json"));
const NEW_ACCOUNT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/new-account.json"));
const USER_TOS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/user-tos.json"));

/// Named request schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaName {
    ArFiling,
    NewAccount,
    UserTos,
}

impl SchemaName {
    pub fn file_name(&self) -> &'static str {
        match self {
            SchemaName::ArFiling => "ar-filing.json",
            SchemaName::NewAccount => "new-account.json",
            SchemaName::UserTos => "user-tos.json",
        }
    }
}

#[derive(Debug)]
pub struct SchemaService {
    ar_filing: jsonschema::Validator,
    new_account: jsonschema::Validator,
    user_tos: jsonschema::Validator,
}

impl SchemaService {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            ar_filing: compile(SchemaName::ArFiling, AR_FILING)?,
            new_account: compile(SchemaName::NewAccount, NEW_ACCOUNT)?,
            user_tos: compile(SchemaName::UserTos, USER_TOS)?,
        })
    }

    fn validator(&self, name: SchemaName) -> &jsonschema::Validator {
        match name {
            SchemaName::ArFiling => &self.ar_filing,
            SchemaName::NewAccount => &self.new_account,
            SchemaName::UserTos => &self.user_tos,
        }
    }

    /// Fails with "Invalid request" and one detail per violation
    pub fn validate(&self, name: SchemaName, instance: &Value) -> AppResult<()> {
        let details: Vec<Value> = self
            .validator(name)
            .iter_errors(instance)
            .map(|error| {
                let path = error.instance_path.to_string();
                json!({
                    "message": error.to_string(),
                    "json_path": if path.is_empty() { "$".to_string() } else { format!("${}", path) },
                })
            })
            .collect();

        if details.is_empty() {
            return Ok(());
        }

        debug!(schema = name.file_name(), violations = details.len(), "request rejected by schema");
        Err(AppError::Validation { message: "Invalid request".to_string(), details })
    }
}

fn compile(name: SchemaName, source: &str) -> AppResult<jsonschema::Validator> {
    let schema: Value = serde_json::from_str(source)
        .map_err(|e| AppError::Configuration(format!("{} is not valid JSON: {}", name.file_name(), e)))?;
    jsonschema::validator_for(&schema)
        .map_err(|e| AppError::Configuration(format!("{} is not a valid schema: {}", name.file_name(), e)))
}
