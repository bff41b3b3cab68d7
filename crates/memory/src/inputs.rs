//! Recall-or-ask for a set of named inputs.
//!
//! Each input is recalled from memory; missing ones are asked of the user,
//! coerced to the declared type, and remembered for the rest of the run.

use prospector_core::error::{Error, MemoryError};
use prospector_core::interaction::Interaction;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::MemoryStore;

/// Declared type of a required input. Unrecognized names mean text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum InputKind {
    #[default]
    Text,
    Int,
    Float,
    Bool,
}

impl From<String> for InputKind {
    fn from(name: String) -> Self {
        match name.to_lowercase().as_str() {
            "int" | "integer" => Self::Int,
            "float" | "number" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            _ => Self::Text,
        }
    }
}

/// How to obtain one input when memory doesn't have it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: InputKind,
}

impl InputSpec {
    fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Convert a raw answer to the declared type, keeping the string when it doesn't parse.
pub fn coerce(kind: InputKind, raw: &str) -> Value {
    let trimmed = raw.trim();
    let parsed = match kind {
        InputKind::Text => return Value::String(raw.to_string()),
        InputKind::Bool => Some(Value::Bool(matches!(
            trimmed.to_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ))),
        InputKind::Int => trimmed.parse::<i64>().ok().map(Value::from),
        InputKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
    };

    parsed.unwrap_or_else(|| {
        warn!(?kind, value = raw, "Could not convert input, keeping it as text");
        Value::String(raw.to_string())
    })
}

impl MemoryStore {
    /// Recall every input in `required`, asking the user for the missing ones.
    pub async fn ensure_required_inputs(
        &self,
        interaction: &dyn Interaction,
        required: &[(String, InputSpec)],
    ) -> Result<Map<String, Value>, Error> {
        let mut inputs = Map::new();

        for (key, spec) in required {
            match self.recall(key, None).await {
                Ok(recalled) => {
                    debug!(key, source = recalled.source.as_str(), "Input already known");
                    inputs.insert(key.clone(), recalled.value);
                    continue;
                }
                Err(MemoryError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }

            let prompt = spec
                .prompt
                .clone()
                .unwrap_or_else(|| format!("Please provide {}", key.replace('_', " ")));
            let default = spec.default_text();
            let raw = interaction
                .get_user_input(&prompt, default.as_deref(), &spec.options)
                .await?;

            let value = coerce(spec.kind, &raw);
            if let Err(e) = self.remember(key, value.clone()).await {
                warn!(key, error = %e, "Input kept for this run only, snapshot write failed");
            }
            inputs.insert(key.clone(), value);
        }

        Ok(inputs)
    }
}

/// Parse the `required_inputs` object of an `ensure_required_inputs` call.
///
/// Keys come back in the object's iteration order.
pub fn parse_required_inputs(value: &Value) -> Result<Vec<(String, InputSpec)>, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "required_inputs must be an object".to_string())?;

    object
        .iter()
        .map(|(key, spec)| {
            let spec = match spec {
                Value::Null => InputSpec::default(),
                Value::String(prompt) => InputSpec {
                    prompt: Some(prompt.clone()),
                    ..Default::default()
                },
                other => serde_json::from_value(other.clone())
                    .map_err(|e| format!("input '{key}': {e}"))?,
            };
            Ok((key.clone(), spec))
        })
        .collect()
}
