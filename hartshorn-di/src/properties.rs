//! Simple scalar configuration values, e.g. feature flags consulted by constructors or registration
//! conditions. Values are fed by [PropertySource]s - loading and parsing configuration files is the
//! responsibility of the source implementation.

use crate::exceptional::Exceptional;
use crate::instance_provider::ErrorPtr;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use tracing::debug;

/// Source of property values.
#[cfg_attr(test, automock)]
pub trait PropertySource {
    /// Returns all properties known to this source.
    fn properties(&self) -> Result<Vec<(String, String)>, ErrorPtr>;
}

/// In-memory [PropertySource].
#[derive(Clone, Debug, Default)]
pub struct MapPropertySource {
    properties: FxHashMap<String, String>,
}

impl MapPropertySource {
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapPropertySource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl PropertySource for MapPropertySource {
    fn properties(&self) -> Result<Vec<(String, String)>, ErrorPtr> {
        Ok(self
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }
}

/// Thread-safe property map. Later values for the same name replace earlier ones.
#[derive(Default, Debug)]
pub struct PropertyStore {
    properties: RwLock<FxHashMap<String, String>>,
}

impl PropertyStore {
    /// Returns the value of given property, or absence if it's not set.
    pub fn property(&self, name: &str) -> Exceptional<String> {
        Exceptional::of(self.properties.read().get(name).cloned())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.properties.write().remove(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.read().contains_key(name)
    }

    /// Copies all properties from the source. Returns the number of loaded properties.
    pub fn load(&self, source: &dyn PropertySource) -> Result<usize, ErrorPtr> {
        let properties = source.properties()?;
        let count = properties.len();

        debug!(count, "Loading properties.");

        self.properties.write().extend(properties);
        Ok(count)
    }

    pub(crate) fn clear(&self) {
        self.properties.write().clear();
    }
}
