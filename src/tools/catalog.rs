//! Tool catalog: every descriptor the provider enumerated, keyed by name.
//!
//! Built once at startup and immutable afterwards. Owns descriptors, not
//! enablement; see [`crate::kernel::EnablementState`] for that.

use crate::tools::{ReleaseState, ToolDescriptor, ToolProvider};
use crate::types::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A tool's input schema, compiled once at registration.
pub struct InputValidator {
    validator: jsonschema::Validator,
}

impl fmt::Debug for InputValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputValidator").finish_non_exhaustive()
    }
}

impl InputValidator {
    pub fn compile(tool: &str, schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| {
            Error::validation(format!("Tool {tool} has an invalid input schema: {e}"))
        })?;
        Ok(Self { validator })
    }

    /// Check `arguments`, collecting every violation.
    pub fn validate(&self, arguments: &Value) -> Result<()> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(errors.join("; ")))
        }
    }
}

/// In-memory tool catalog in enumeration order.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, Arc<ToolDescriptor>>,
    validators: HashMap<String, InputValidator>,
    order: Vec<String>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate a provider into a catalog.
    ///
    /// NON_GA tools are skipped unless `allow_non_ga` is set.
    pub fn from_provider(provider: &dyn ToolProvider, allow_non_ga: bool) -> Result<Self> {
        Self::from_descriptors(provider.enumerate()?, allow_non_ga)
    }

    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
        allow_non_ga: bool,
    ) -> Result<Self> {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            if descriptor.release_state() == ReleaseState::NonGa && !allow_non_ga {
                tracing::debug!(tool = descriptor.name(), "skipping NON_GA tool");
                continue;
            }
            catalog.register(descriptor)?;
        }
        Ok(catalog)
    }

    /// Register a descriptor. Names must be unique and the input schema
    /// must compile.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.entries.contains_key(descriptor.name()) {
            return Err(Error::validation(format!(
                "Tool already registered: {}",
                descriptor.name()
            )));
        }
        let validator =
            InputValidator::compile(descriptor.name(), &descriptor.config().input_schema)?;
        let name = descriptor.name().to_string();
        self.order.push(name.clone());
        self.validators.insert(name.clone(), validator);
        self.entries.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Check arguments against a tool's compiled input schema.
    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<()> {
        self.validators
            .get(name)
            .ok_or_else(|| Error::unknown_tool(name))?
            .validate(arguments)
    }

    /// Get a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.entries.get(name)
    }

    /// Get a descriptor by name or fail with `UnknownTool`.
    pub fn require(&self, name: &str) -> Result<&Arc<ToolDescriptor>> {
        self.get(name).ok_or_else(|| Error::unknown_tool(name))
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All descriptors in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDescriptor>> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// List all tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names = self.order.clone();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
