//! Actions — the typed catalog a dispatch loop may invoke.
//!
//! Each action is described by an [`ActionSpec`] (sent to the oracle) and
//! bound to a [`Capability`] (executed by the loop). Registries are built once
//! per loop instance through [`RegistryBuilder`] and never mutated afterwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ActionError, RegistryError};

/// Keyword-style arguments passed to a capability.
pub type Args = Map<String, Value>;

/// The closed set of parameter type tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    List,
    Mapping,
}

impl ParamType {
    /// Parse a type tag. Short aliases (`str`, `int`, `bool`, `dict`) are
    /// accepted; anything unrecognized is treated as `String`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Self::Integer,
            "float" | "number" => Self::Float,
            "bool" | "boolean" => Self::Boolean,
            "list" | "array" => Self::List,
            "dict" | "mapping" | "object" => Self::Mapping,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Mapping => "mapping",
        }
    }
}

/// Specification of a single action parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: ParamType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    /// An optional parameter with a default value.
    pub fn optional(
        name: impl Into<String>,
        kind: ParamType,
        default: Value,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: Some(default),
            description: description.into(),
        }
    }
}

/// Describes one action: its name, purpose, ordered parameters and return shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub returns: String,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            returns: String::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    /// Look up a declared parameter by name.
    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Catalog entry shown to the oracle. Parameters keep declaration order.
    pub fn to_catalog_entry(&self) -> Value {
        let mut params = Map::new();
        for p in &self.params {
            let mut entry = Map::new();
            entry.insert("type".into(), json!(p.kind.as_str()));
            entry.insert("required".into(), json!(p.required));
            if let Some(default) = &p.default {
                entry.insert("default".into(), default.clone());
            }
            entry.insert("description".into(), json!(p.description));
            params.insert(p.name.clone(), Value::Object(entry));
        }

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": params,
            "returns": self.returns,
        })
    }
}

/// A callable action bound into a registry.
///
/// Capabilities return any JSON value on success. Returning `Err` is an
/// action-level failure: the loop records it and keeps going.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The static descriptor for this action.
    fn spec(&self) -> &ActionSpec;

    /// Execute the action with already-coerced arguments.
    async fn invoke(&self, args: Args) -> std::result::Result<Value, ActionError>;
}

/// An immutable catalog of actions for one loop instance.
///
/// Listing order is registration order.
pub struct ActionRegistry {
    order: Vec<String>,
    actions: HashMap<String, Arc<dyn Capability>>,
}

impl ActionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// All action specs, in registration order.
    pub fn list(&self) -> Vec<&ActionSpec> {
        self.order
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|c| c.spec())
            .collect()
    }

    /// Resolve an action name to its bound capability.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.actions.get(name).cloned()
    }

    /// The catalog as a JSON array, suitable for prompt rendering.
    pub fn catalog(&self) -> Value {
        Value::Array(self.list().into_iter().map(ActionSpec::to_catalog_entry).collect())
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Collects capabilities and validates them into an [`ActionRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Arc<dyn Capability>>,
}

impl RegistryBuilder {
    pub fn register(mut self, capability: Arc<dyn Capability>) -> Self {
        self.entries.push(capability);
        self
    }

    pub fn register_all(mut self, capabilities: impl IntoIterator<Item = Arc<dyn Capability>>) -> Self {
        self.entries.extend(capabilities);
        self
    }

    /// Build the registry. Duplicate action names are rejected.
    pub fn build(self) -> std::result::Result<ActionRegistry, RegistryError> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut actions = HashMap::with_capacity(self.entries.len());

        for capability in self.entries {
            let name = capability.spec().name.clone();
            if actions.contains_key(&name) {
                return Err(RegistryError::DuplicateAction(name));
            }
            order.push(name.clone());
            actions.insert(name, capability);
        }

        Ok(ActionRegistry { order, actions })
    }
}
