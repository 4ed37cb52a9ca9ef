use std::collections::BTreeMap;

use serde_json::Value;

/// Component schemas collected from `OperationBuilder` registrations.
#[derive(Debug, Default, Clone)]
pub struct ComponentsRegistry {
    /// Schema name -> JSON schema (serialized to components.schemas)
    pub schemas: BTreeMap<String, Value>,
}

impl ComponentsRegistry {
    /// Insert a schema unless an identical one is present; the first registration
    /// wins on conflicting content.
    /// Returns: true if inserted, false if identical or conflicting.
    pub fn register_schema(&mut self, name: impl Into<String>, schema: Value) -> bool {
        let name = name.into();
        match self.schemas.get(&name) {
            Some(existing) if *existing == schema => {
                tracing::trace!(schema_name = %name, "Identical schema re-registered, ignoring");
                false
            }
            Some(_) => {
                tracing::error!(
                    schema_name = %name,
                    "Conflicting schema content under the same component key; keeping the first"
                );
                false
            }
            None => {
                self.schemas.insert(name, schema);
                true
            }
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }
}
