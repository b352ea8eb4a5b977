//! Store directory entry

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;
use crate::ingest::normalize::normalize_store_token;
use crate::domain::Cell;

/// Whether a store is still trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Active,
    Inactive,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Active => "active",
            StoreStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "ativa" | "ativo" | "" => Ok(StoreStatus::Active),
            "inactive" | "inativa" | "inativo" => Ok(StoreStatus::Inactive),
            other => Err(Error::validation(format!("Unknown store status: {}", other))),
        }
    }
}

/// A store known to the directory
///
/// `number` is always held in normalized form (digits only, no leading
/// zeros) so that resolution is a plain equality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub number: String,
    pub name: String,
    pub city: Option<String>,
    pub status: StoreStatus,
}

impl Store {
    /// Create an active store, normalizing its number
    pub fn new(id: Uuid, number: &str, name: impl Into<String>) -> Self {
        Self {
            id,
            number: normalize_store_token(&Cell::text(number)),
            name: name.into(),
            city: None,
            status: StoreStatus::Active,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_status(mut self, status: StoreStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == StoreStatus::Active
    }
}
