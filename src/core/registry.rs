//! Built objects and the registry of a finished orchestration run

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::key::TypeKey;
use crate::core::lifecycle::Lifecycle;

/// A type-erased built object
///
/// Cloning is cheap and shares the underlying value. Objects created with
/// [`Built::managed`] also expose their [`Lifecycle`] implementation.
#[derive(Clone)]
pub struct Built {
    key: TypeKey,
    value: Arc<dyn Any + Send + Sync>,
    lifecycle: Option<Arc<dyn Lifecycle>>,
}

impl Built {
    /// Wrap a value without lifecycle
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without lifecycle
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            value,
            lifecycle: None,
        }
    }

    /// Wrap a value that takes part in init/start/stop
    pub fn managed<T: Lifecycle + Any>(value: T) -> Self {
        Self::managed_arc(Arc::new(value))
    }

    /// Wrap an already shared value that takes part in init/start/stop
    pub fn managed_arc<T: Lifecycle + Any>(value: Arc<T>) -> Self {
        let lifecycle: Arc<dyn Lifecycle> = value.clone();
        Self {
            key: TypeKey::of::<T>(),
            value,
            lifecycle: Some(lifecycle),
        }
    }

    /// Register this object under `key` instead of its Rust type
    #[must_use]
    pub fn keyed(mut self, key: TypeKey) -> Self {
        self.key = key;
        self
    }

    /// Registry key of this object
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Lifecycle handle, if the object is managed
    pub fn lifecycle(&self) -> Option<&Arc<dyn Lifecycle>> {
        self.lifecycle.as_ref()
    }

    /// Whether the object takes part in init/start/stop
    pub fn is_managed(&self) -> bool {
        self.lifecycle.is_some()
    }

    /// Typed view of the value
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Whether two handles share the same allocation
    pub fn same_object(&self, other: &Built) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Built {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Built")
            .field("key", &self.key)
            .field("managed", &self.is_managed())
            .finish()
    }
}

/// Immutable, type-keyed snapshot of the objects built by one run
///
/// Entries are kept in build order; when two builders produce objects with
/// the same key the later one wins and keeps the first one's position.
#[derive(Debug, Clone, Default)]
pub struct BuiltRegistry {
    objects: Arc<IndexMap<TypeKey, Built>>,
}

impl BuiltRegistry {
    pub(crate) fn from_objects<'a>(objects: impl IntoIterator<Item = &'a Built>) -> Self {
        let mut map = IndexMap::new();
        for built in objects {
            map.insert(built.key().clone(), built.clone());
        }
        Self {
            objects: Arc::new(map),
        }
    }

    /// Object of Rust type `T`
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.objects
            .get(&TypeKey::of::<T>())
            .and_then(Built::downcast::<T>)
    }

    /// Object registered under `key`
    pub fn get_key(&self, key: &TypeKey) -> Option<&Built> {
        self.objects.get(key)
    }

    /// Whether an object is registered under `key`
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of registered objects
    pub fn size(&self) -> usize {
        self.objects.len()
    }

    /// Whether the registry holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All registered objects in build order
    pub fn all(&self) -> impl Iterator<Item = &Built> {
        self.objects.values()
    }

    /// All registry keys in build order
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.objects.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;

    #[derive(Debug, PartialEq)]
    struct Config {
        port: u16,
    }

    struct Server;

    impl Lifecycle for Server {
        fn init(&self) -> Result<(), LifecycleError> {
            Ok(())
        }
        fn start(&self) -> Result<(), LifecycleError> {
            Ok(())
        }
        fn stop(&self) -> Result<(), LifecycleError> {
            Ok(())
        }
    }

    #[test]
    fn test_downcast() {
        let built = Built::new(Config { port: 8080 });
        assert_eq!(built.downcast::<Config>().unwrap().port, 8080);
        assert!(built.downcast::<String>().is_none());
        assert!(!built.is_managed());
    }

    #[test]
    fn test_managed_shares_allocation() {
        let built = Built::managed(Server);
        assert!(built.is_managed());
        assert!(built.key().is::<Server>());
        assert!(built.same_object(&built.clone()));
    }

    #[test]
    fn test_registry_last_writer_wins() {
        let first = Built::new(Config { port: 1 });
        let second = Built::new(Config { port: 2 });
        let other = Built::new("text".to_string());

        let registry = BuiltRegistry::from_objects([&first, &other, &second]);

        assert_eq!(registry.size(), 2);
        assert_eq!(registry.get::<Config>().unwrap().port, 2);
        assert_eq!(registry.get::<String>().unwrap().as_str(), "text");
        let keys: Vec<_> = registry.keys().cloned().collect();
        assert_eq!(keys, vec![TypeKey::of::<Config>(), TypeKey::of::<String>()]);
    }

    #[test]
    fn test_registry_keyed_objects() {
        let built = Built::new(42u32).keyed(TypeKey::named("answer"));
        let registry = BuiltRegistry::from_objects([&built]);

        assert!(registry.get::<u32>().is_none());
        let found = registry.get_key(&TypeKey::named("answer")).unwrap();
        assert_eq!(*found.downcast::<u32>().unwrap(), 42);
    }
}
