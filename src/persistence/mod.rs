//! Rule payload persistence.
use crate::error::PersistenceError;
use crate::model::RuleRow;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What the backend returns when a decision table is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    #[serde(default)]
    pub rules: Vec<RuleRow>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
    #[serde(default, alias = "rule_policy", skip_serializing_if = "Option::is_none")]
    pub rule_policy: Option<serde_json::Value>,
}

impl RulePayload {
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        serde_json::from_str(json).map_err(|e| PersistenceError::Json(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Json(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub decision_id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
    pub rules: Vec<RuleRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}

/// The persistence backend a grid is loaded from and saved to.
pub trait RuleStore {
    fn load(&self, decision_id: &str) -> Result<RulePayload, PersistenceError>;
    fn save(&self, request: &SaveRequest) -> Result<SaveResponse, PersistenceError>;
}

/// Stores one `<decision id>.json` payload per decision table under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, decision_id: &str) -> PathBuf {
        let file_name: String = decision_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", file_name))
    }

    fn read(&self, path: &Path) -> Result<RulePayload, PersistenceError> {
        let content = fs::read_to_string(path).map_err(|e| PersistenceError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        RulePayload::from_json(&content)
    }
}

impl RuleStore for JsonFileStore {
    fn load(&self, decision_id: &str) -> Result<RulePayload, PersistenceError> {
        let path = self.path_for(decision_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(decision_id.to_string()));
        }
        self.read(&path)
    }

    /// Replaces the stored rules, keeping any actions and rule policy already on disk.
    fn save(&self, request: &SaveRequest) -> Result<SaveResponse, PersistenceError> {
        if request.decision_id.trim().is_empty() {
            return Err(PersistenceError::Rejected(
                "a decision id is required to save rules".to_string(),
            ));
        }
        let path = self.path_for(&request.decision_id);
        let mut payload = if path.exists() {
            self.read(&path)?
        } else {
            RulePayload::default()
        };
        payload.rules = request.rules.clone();

        let write_error = |e: std::io::Error| PersistenceError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        fs::create_dir_all(&self.root).map_err(write_error)?;
        fs::write(&path, payload.to_json()?).map_err(write_error)?;

        Ok(SaveResponse {
            success: true,
            message: format!("Saved {} rules", payload.rules.len()),
        })
    }
}
