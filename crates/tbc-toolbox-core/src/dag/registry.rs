use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use super::stage::Stage;

/// Creates a fresh stage instance.
pub type StageFactory = fn() -> Arc<dyn Stage>;

/// Table of stage types available to pipelines.
///
/// A process-wide instance (see [`global_registry`]) is populated with the built-in stages on
/// first use; applications embedding extra stages register them once at startup.  The registry
/// is never mutated during a DAG run.
#[derive(Debug, Default)]
pub struct StageRegistry {
    factories: BTreeMap<&'static str, StageFactory>,
}

impl StageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in stages.
    pub fn with_builtin_stages() -> Self {
        let mut registry = Self::new();
        super::stages::register_builtin_stages(&mut registry);
        registry
    }

    /// Registers a stage type.  The name is taken from the factory's
    /// [`super::NodeTypeInfo::name`]; a later registration under the same name replaces the
    /// earlier one.
    pub fn register(&mut self, factory: StageFactory) {
        let name = factory().type_info().name;
        self.factories.insert(name, factory);
    }

    /// Instantiates a stage by type name.
    pub fn create(&self, name: &str) -> Option<Arc<dyn Stage>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Whether a stage type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The registered stage type names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

static GLOBAL: LazyLock<RwLock<StageRegistry>> =
    LazyLock::new(|| RwLock::new(StageRegistry::with_builtin_stages()));

/// The process-wide stage registry, populated with the built-in stages on first use.
pub fn global_registry() -> &'static RwLock<StageRegistry> {
    &GLOBAL
}
