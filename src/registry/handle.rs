//! Database handles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last observed reachability of the store behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Unavailable,
}

/// Identifies an allocated logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHandle {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub state: ConnectionState,
}

impl DatabaseHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            state: ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
