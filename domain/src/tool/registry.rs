//! Tool registry: logical name → [`ToolSpec`].
//!
//! The registry is the single source of truth for where a tool lives and
//! what request it accepts. It is built once at start-up and only read
//! afterwards, so it can be shared behind an `Arc` by concurrent runs.
//!
//! Name resolution is case-insensitive and goes through an alias table
//! (`SYSTEM_SQLITE` → `sql`, `bash` → `shell`, ...), because models rarely
//! use the canonical name verbatim.

use super::builtin::builtin_spec;
use super::entities::{ToolKind, ToolSpec};
use crate::core::error::DomainError;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
    /// Alias → canonical name (both lowercase)
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in tools with their default aliases.
    pub fn canonical() -> Self {
        ToolKind::ALL
            .into_iter()
            .fold(Self::new(), |registry, kind| {
                registry
                    .register(builtin_spec(kind))
                    .register_aliases(kind.default_aliases().iter().map(|a| (*a, kind.as_str())))
            })
    }

    pub fn register(mut self, tool: ToolSpec) -> Self {
        self.tools.insert(tool.name.to_ascii_lowercase(), tool);
        self
    }

    pub fn register_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(
            alias.into().to_ascii_lowercase(),
            canonical.into().to_ascii_lowercase(),
        );
        self
    }

    pub fn register_aliases(
        mut self,
        mappings: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        for (alias, canonical) in mappings {
            self = self.register_alias(alias, canonical);
        }
        self
    }

    /// Resolve a name or alias to the canonical tool name.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        let key = name.trim().to_ascii_lowercase();
        if let Some((canonical, _)) = self.tools.get_key_value(&key) {
            return Some(canonical.as_str());
        }
        self.aliases
            .get(&key)
            .filter(|canonical| self.tools.contains_key(*canonical))
            .map(|s| s.as_str())
    }

    /// Look up a tool by name or alias.
    ///
    /// This is the only failing operation of the registry.
    pub fn resolve(&self, name: &str) -> Result<&ToolSpec, DomainError> {
        self.resolve_name(name)
            .and_then(|canonical| self.tools.get(canonical))
            .ok_or_else(|| DomainError::ToolNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(&name.to_ascii_lowercase())
    }

    /// First tool whose fence labels include `label`.
    pub fn resolve_fence_label(&self, label: &str) -> Option<&ToolSpec> {
        let label = label.trim().to_ascii_lowercase();
        self.tools
            .values()
            .find(|spec| spec.kind.fence_labels().contains(&label.as_str()))
            .or_else(|| self.resolve(&label).ok())
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    /// Aliases registered for a canonical name, sorted
    pub fn aliases_of(&self, canonical: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
