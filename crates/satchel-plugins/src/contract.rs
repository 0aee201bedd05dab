//! Capability contracts and the validator that enforces them.
//!
//! A capability type is a named set of operations. A plugin claiming that
//! type in its metadata is only registered if its instance provides every
//! one of them.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::instance::PluginInstance;

/// A named set of required operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityContract {
    /// Capability type name, matched against `type` in plugin metadata.
    pub name: String,
    /// Operations every implementation must provide.
    pub required: BTreeSet<String>,
}

impl CapabilityContract {
    /// Create a contract from a name and its operation names.
    pub fn new<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required: operations.into_iter().map(Into::into).collect(),
        }
    }

    /// Required operations `instance` does not provide, in sorted order.
    #[must_use]
    pub fn missing(&self, instance: &dyn PluginInstance) -> Vec<String> {
        let provided: BTreeSet<String> = instance.operations().into_iter().collect();
        self.required.difference(&provided).cloned().collect()
    }
}

/// Registry of capability contracts.
#[derive(Debug, Default)]
pub struct CapabilityValidator {
    contracts: HashMap<String, CapabilityContract>,
}

impl CapabilityValidator {
    /// Create an empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract. A contract with the same name is replaced.
    pub fn register(&mut self, contract: CapabilityContract) {
        debug!(
            capability = %contract.name,
            operations = contract.required.len(),
            "Registered capability contract"
        );
        self.contracts.insert(contract.name.clone(), contract);
    }

    /// Look up a contract by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CapabilityContract> {
        self.contracts.get(name)
    }

    /// Whether a contract with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Registered capability type names, sorted.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.contracts.keys().cloned().collect()
    }

    /// Check that `instance` satisfies the contract named `capability`.
    ///
    /// # Errors
    ///
    /// - [`PluginError::UnknownCapabilityType`] if no contract is registered
    ///   under `capability`.
    /// - [`PluginError::CapabilityNotImplemented`] listing the missing
    ///   operations otherwise.
    pub fn validate(
        &self,
        plugin: &str,
        instance: &dyn PluginInstance,
        capability: &str,
    ) -> PluginResult<()> {
        let contract = self
            .contracts
            .get(capability)
            .ok_or_else(|| PluginError::UnknownCapabilityType(capability.to_string()))?;

        let missing = contract.missing(instance);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PluginError::CapabilityNotImplemented {
                plugin: plugin.to_string(),
                capability: capability.to_string(),
                missing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Partial;

    impl PluginInstance for Partial {
        fn operations(&self) -> Vec<String> {
            vec!["serve".into()]
        }
    }

    struct Full;

    impl PluginInstance for Full {
        fn operations(&self) -> Vec<String> {
            vec!["serve".into(), "wrap".into(), "extra".into()]
        }
    }

    fn validator() -> CapabilityValidator {
        let mut v = CapabilityValidator::new();
        v.register(CapabilityContract::new("middleware", ["wrap", "serve"]));
        v
    }

    #[test]
    fn test_validate_ok() {
        assert!(validator().validate("full", &Full, "middleware").is_ok());
    }

    #[test]
    fn test_validate_unknown_type() {
        let err = validator().validate("full", &Full, "codec").unwrap_err();
        assert!(matches!(err, PluginError::UnknownCapabilityType(t) if t == "codec"));
    }

    #[test]
    fn test_validate_missing_operations() {
        let err = validator()
            .validate("partial", &Partial, "middleware")
            .unwrap_err();
        match err {
            PluginError::CapabilityNotImplemented {
                plugin,
                capability,
                missing,
            } => {
                assert_eq!(plugin, "partial");
                assert_eq!(capability, "middleware");
                assert_eq!(missing, vec!["wrap".to_string()]);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut v = validator();
        v.register(CapabilityContract::new("middleware", ["serve"]));
        assert!(v.validate("partial", &Partial, "middleware").is_ok());
        assert_eq!(v.names().len(), 1);
    }

    #[test]
    fn test_empty_contract_accepts_anything() {
        let mut v = CapabilityValidator::new();
        v.register(CapabilityContract::new("marker", Vec::<String>::new()));
        assert!(v.validate("p", &Partial, "marker").is_ok());
        assert!(v.contains("marker"));
    }
}
