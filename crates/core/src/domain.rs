//! Outreach records shared between capabilities and the planning loop.

use serde::{Deserialize, Serialize};

/// Ideal Customer Profile: targeting criteria derived from a free-text request.
///
/// Every field stays `None` until extraction or the user fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icp {
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
}

impl Icp {
    pub const FIELDS: [&'static str; 5] = ["goal", "industry", "location", "role", "product"];

    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "goal" => self.goal.as_deref(),
            "industry" => self.industry.as_deref(),
            "location" => self.location.as_deref(),
            "role" => self.role.as_deref(),
            "product" => self.product.as_deref(),
            _ => None,
        }
    }

    /// Set a field by name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            "goal" => self.goal = value,
            "industry" => self.industry = value,
            "location" => self.location = value,
            "role" => self.role = value,
            "product" => self.product = value,
            _ => {}
        }
    }

    /// Names of fields that are still unset or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        Self::FIELDS
            .into_iter()
            .filter(|f| self.get(f).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    /// Fill unset fields from `other`, keeping values already present.
    pub fn merge_missing(&mut self, other: &Icp) {
        for field in Self::FIELDS {
            if self.get(field).is_none_or(|v| v.trim().is_empty()) {
                if let Some(value) = other.get(field) {
                    self.set(field, value);
                }
            }
        }
    }
}

/// A prospective contact returned by a lead source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub website: String,
}
