//! Process-wide plugin registry
//!
//! Plugins register once, typically from a crate-level `register` function
//! called during embedder setup. The registry is the only process-wide
//! mutable state in the crate; everything else lives behind per-run context
//! values.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::plugin::Plugin;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

#[derive(Default)]
struct Registry {
    // Keyed by lowercased plugin name; BTreeMap keeps listing order
    // deterministic.
    entries: RwLock<BTreeMap<String, Arc<dyn Plugin>>>,
}

/// Register a plugin with the process-wide set of known plugins.
///
/// Idempotent: registering a plugin whose name is already taken is a
/// no-op. Names are compared case-insensitively.
pub fn register(plugin: Arc<dyn Plugin>) {
    let name = plugin.info().name.to_lowercase();
    let mut entries = REGISTRY.entries.write();
    entries.entry(name).or_insert(plugin);
}

/// Delist the plugin with the given name. Only really useful for testing.
pub fn remove(name: &str) {
    let mut entries = REGISTRY.entries.write();
    entries.remove(&name.to_lowercase());
}

/// The registered plugins, in deterministic (name-sorted) order.
pub fn registered() -> Vec<Arc<dyn Plugin>> {
    let entries = REGISTRY.entries.read();
    entries.values().cloned().collect()
}

#[cfg(test)]
mod tests {
    use serde_yaml::Mapping;

    use super::*;
    use crate::errors::ParseError;
    use crate::plugin::{PluginDefaults, PluginInfo, SpecParser};

    struct StubPlugin {
        name: &'static str,
    }

    impl Plugin for StubPlugin {
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: self.name.to_string(),
                ..PluginInfo::default()
            }
        }

        fn parse_defaults(&self, _doc: &Mapping) -> Result<PluginDefaults, ParseError> {
            Ok(Arc::new(()))
        }

        fn specs(&self) -> Vec<Box<dyn SpecParser>> {
            Vec::new()
        }
    }

    #[test]
    fn test_register_is_idempotent_and_case_insensitive() {
        register(Arc::new(StubPlugin { name: "regstub" }));
        register(Arc::new(StubPlugin { name: "RegStub" }));

        let names: Vec<String> = registered()
            .iter()
            .map(|p| p.info().name.to_lowercase())
            .filter(|n| n == "regstub")
            .collect();
        assert_eq!(names.len(), 1);

        remove("REGSTUB");
        assert!(!registered()
            .iter()
            .any(|p| p.info().name.to_lowercase() == "regstub"));
    }

    #[test]
    fn test_concurrent_register_and_list() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    register(Arc::new(StubPlugin {
                        name: if i % 2 == 0 { "raceplug-a" } else { "raceplug-b" },
                    }));
                    registered().len()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let count = registered()
            .iter()
            .filter(|p| p.info().name.starts_with("raceplug-"))
            .count();
        assert_eq!(count, 2);
        remove("raceplug-a");
        remove("raceplug-b");
    }
}
