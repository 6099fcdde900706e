use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gate::ActionKind;

const BUILTIN_CATALOG: &str = include_str!("../catalog/agents.json");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Idle,
    Busy,
}

/// A callable entity from the static catalog.
///
/// Only `id`, `session_provider_id` and `telephone_number` drive behaviour; the rest is
/// display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: AgentStatus,
    /// Opaque id handed to the voice-session provider. Absent: no session calls.
    #[serde(default)]
    pub session_provider_id: Option<String>,
    /// Absent: no direct dial.
    #[serde(default)]
    pub telephone_number: Option<String>,
    #[serde(default)]
    pub calls_today: u32,
    #[serde(default)]
    pub success_rate: u8,
    #[serde(default)]
    pub avg_duration: String,
}

impl Agent {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category: String::new(),
            status: AgentStatus::Active,
            session_provider_id: None,
            telephone_number: None,
            calls_today: 0,
            success_rate: 0,
            avg_duration: String::new(),
        }
    }

    pub fn with_session_provider_id(mut self, session_provider_id: &str) -> Self {
        self.session_provider_id = Some(session_provider_id.to_string());
        self
    }

    pub fn with_telephone_number(mut self, telephone_number: &str) -> Self {
        self.telephone_number = Some(telephone_number.to_string());
        self
    }

    pub fn can_start_session(&self) -> bool {
        self.session_provider_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    pub fn can_dial(&self) -> bool {
        self.telephone_number
            .as_deref()
            .is_some_and(|number| !number.trim().is_empty())
    }

    pub fn supports(&self, action: ActionKind) -> bool {
        match action {
            ActionKind::StartSession => self.can_start_session(),
            ActionKind::DialDirect => self.can_dial(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read agent catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse agent catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("agent with an empty id in catalog")]
    EmptyId,
    #[error("duplicate agent id in catalog: {0}")]
    DuplicateId(String),
}

/// The static list of agents, with unique non-empty ids.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: Vec<Agent>,
}

impl AgentCatalog {
    pub fn new(agents: Vec<Agent>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for agent in &agents {
            if agent.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(CatalogError::DuplicateId(agent.id.clone()));
            }
        }
        Ok(Self { agents })
    }

    /// The demo agents shipped with the console.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let agents: Vec<Agent> = serde_json::from_str(json)?;
        Self::new(agents)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::info!("loaded {} agents from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
