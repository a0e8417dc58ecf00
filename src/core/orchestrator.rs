//! Build orchestration
//!
//! The [`Orchestrator`] owns the registered builders and runs them through
//! four phases:
//!
//! 1. **Resolve**: match every declared dependency to the first observable
//!    builder (registration order) satisfying it. A required dependency
//!    without a match aborts the run before anything is built.
//! 2. **Sort**: order builders so dependencies precede their dependents.
//! 3. **Build**: in that order, hand each builder its matched dependencies
//!    and build it.
//! 4. **Lifecycle**: `init` then `start` every managed object in build order.
//!
//! [`Orchestrator::rebuild`] stops the objects of the last successful run in
//! reverse order, then runs the phases again. A registry is only published
//! when a run succeeds.

use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::core::builder::{Builder, Capabilities};
use crate::core::config::OrchestratorConfig;
use crate::core::discovery::Discovery;
use crate::core::key::TypeKey;
use crate::core::lifecycle::LifecyclePhase;
use crate::core::registry::{Built, BuiltRegistry};
use crate::core::resolver::DependencyGraph;
use crate::error::{BootError, ResolverError};

/// A registered builder and what was learned about it at registration
struct Entry {
    builder: Box<dyn Builder>,
    key: TypeKey,
    satisfies: Vec<TypeKey>,
    caps: Capabilities,
}

/// State mutated by registration
#[derive(Default)]
struct Registration {
    entries: Vec<Entry>,
    packages: IndexSet<String>,
}

impl Registration {
    fn push(&mut self, mut builder: Box<dyn Builder>) {
        let caps = Capabilities::probe(builder.as_mut());
        self.insert(builder, caps);
    }

    fn insert(&mut self, mut builder: Box<dyn Builder>, caps: Capabilities) {
        if caps.contains(Capabilities::PACKAGEABLE) && !self.packages.is_empty() {
            if let Some(packageable) = builder.as_packageable() {
                for package in &self.packages {
                    packageable.with_package(package);
                }
                tracing::debug!(
                    "Propagated {} packages to builder: {}",
                    self.packages.len(),
                    builder.key()
                );
            }
        }

        let key = builder.key();
        let satisfies = builder.satisfies();
        tracing::debug!("Builder added: {} ({:?})", key, caps);

        self.entries.push(Entry {
            builder,
            key,
            satisfies,
            caps,
        });
    }

    fn add_package(&mut self, package: String) {
        if self.packages.contains(&package) {
            tracing::trace!("Package already registered: {}", package);
            return;
        }

        for entry in &mut self.entries {
            if !entry.caps.contains(Capabilities::PACKAGEABLE) {
                continue;
            }
            if let Some(packageable) = entry.builder.as_packageable() {
                packageable.with_package(&package);
                tracing::debug!("Package '{}' propagated to builder: {}", package, entry.key);
            }
        }

        tracing::debug!("Package added: {}", package);
        self.packages.insert(package);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Build,
    Rebuild,
}

/// Dependency matches of one builder: (declared key, index of matched builder)
type Matches = Vec<(TypeKey, usize)>;

/// Dependency-aware builder orchestrator
///
/// Registration goes through `&self` and may happen from several threads.
/// Running takes `&mut self`.
pub struct Orchestrator {
    registration: Mutex<Registration>,
    config: OrchestratorConfig,
    discovery: Option<Box<dyn Discovery>>,
    registry: Option<BuiltRegistry>,
    /// Objects of the last successful run, in build order
    objects: Vec<Built>,
    /// Builder keys of the last successful run, in build order
    order: Vec<TypeKey>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default configuration
    pub fn new() -> Self {
        Self {
            registration: Mutex::new(Registration::default()),
            config: OrchestratorConfig::default(),
            discovery: None,
            registry: None,
            objects: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Apply a configuration; its packages are registered
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.register_packages(config.packages.iter().cloned());
        self.config = config;
        self
    }

    /// Set the discovery collaborator used when auto-detection is enabled
    #[must_use]
    pub fn with_discovery(mut self, discovery: impl Discovery + 'static) -> Self {
        self.discovery = Some(Box::new(discovery));
        self
    }

    pub fn set_auto_detect(&mut self, enabled: bool) {
        self.config.auto_detect = enabled;
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Register a builder
    pub fn register<B: Builder>(&self, builder: B) -> &Self {
        self.register_boxed(Box::new(builder))
    }

    /// Register an already boxed builder
    pub fn register_boxed(&self, builder: Box<dyn Builder>) -> &Self {
        self.registration.lock().push(builder);
        self
    }

    /// Add a scan package and propagate it to packageable builders
    pub fn register_package(&self, package: impl Into<String>) -> &Self {
        self.registration.lock().add_package(package.into());
        self
    }

    /// Add several scan packages
    pub fn register_packages<I, S>(&self, packages: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registration = self.registration.lock();
        for package in packages {
            registration.add_package(package.into());
        }
        self
    }

    /// Registered scan packages, in insertion order
    pub fn packages(&self) -> Vec<String> {
        self.registration.lock().packages.iter().cloned().collect()
    }

    /// Keys of the registered builders, in registration order
    pub fn builders(&self) -> Vec<TypeKey> {
        self.registration
            .lock()
            .entries
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Number of registered builders
    pub fn len(&self) -> usize {
        self.registration.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registration.lock().entries.is_empty()
    }

    /// Registry of the last successful run
    pub fn registry(&self) -> Option<&BuiltRegistry> {
        self.registry.as_ref()
    }

    /// Builder keys of the last successful run, in build order
    pub fn build_order(&self) -> &[TypeKey] {
        &self.order
    }

    /// Compute the build order without building anything
    ///
    /// Runs discovery when enabled, so discovered builders stay registered.
    pub fn plan(&mut self) -> Result<Vec<TypeKey>, BootError> {
        tracing::trace!("Entering plan()");
        self.discover()?;

        let registration = self.registration.get_mut();
        let matches = resolve(&mut registration.entries)?;
        let order = sort(&registration.entries, &matches)?;

        let keys = order
            .iter()
            .map(|&i| registration.entries[i].key.clone())
            .collect();
        tracing::trace!("Exiting plan()");
        Ok(keys)
    }

    /// Build every registered builder and start the built objects
    ///
    /// Once a build has succeeded, later calls return its registry without
    /// building or starting anything; use [`Self::rebuild`] to run again.
    pub fn build(&mut self) -> Result<BuiltRegistry, BootError> {
        tracing::trace!("Entering build()");
        if let Some(registry) = &self.registry {
            tracing::debug!("Already built, returning the current registry");
            return Ok(registry.clone());
        }
        let started = Instant::now();

        self.discover()?;
        let (order, objects) = self.run(Mode::Build)?;
        start_all(&objects)?;
        let registry = self.publish(order, objects);

        tracing::info!(
            "Built {} objects in {:.2?}",
            registry.size(),
            started.elapsed()
        );
        tracing::trace!("Exiting build()");
        Ok(registry)
    }

    /// Stop the current objects, then build and start everything again
    ///
    /// Rebuildable builders produce fresh objects, others return their
    /// cached one. On failure the previous registry stays current.
    pub fn rebuild(&mut self) -> Result<BuiltRegistry, BootError> {
        tracing::trace!("Entering rebuild()");
        if self.registry.is_none() {
            tracing::error!("Cannot rebuild before initial build()");
            return Err(BootError::NotBuilt);
        }
        let started = Instant::now();

        stop_all(&self.objects);
        self.discover()?;
        let (order, objects) = self.run(Mode::Rebuild)?;
        start_all(&objects)?;
        let registry = self.publish(order, objects);

        tracing::info!(
            "Rebuilt {} objects in {:.2?}",
            registry.size(),
            started.elapsed()
        );
        tracing::trace!("Exiting rebuild()");
        Ok(registry)
    }

    fn discover(&mut self) -> Result<(), BootError> {
        if !self.config.auto_detect {
            return Ok(());
        }
        let Some(discovery) = &self.discovery else {
            tracing::debug!("Auto-detection enabled but no discovery configured");
            return Ok(());
        };

        let registration = self.registration.get_mut();
        let packages: Vec<String> = registration.packages.iter().cloned().collect();
        tracing::debug!("Discovering builders in {} packages", packages.len());

        let found = match discovery.discover(&packages) {
            Ok(found) => found,
            Err(e) if self.config.strict_discovery => {
                tracing::error!("Discovery failed: {}", e);
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!("Discovery failed, continuing without discovered builders: {}", e);
                return Ok(());
            }
        };

        for mut builder in found {
            let key = builder.key();
            if registration.entries.iter().any(|entry| entry.key == key) {
                tracing::debug!("Discovered builder {} already registered, skipping", key);
                continue;
            }
            let caps = Capabilities::probe(builder.as_mut());
            match builder.as_automatic() {
                Some(automatic) if caps.contains(Capabilities::AUTOMATIC) => {
                    automatic.set_auto_detect(true);
                    tracing::debug!("Discovered builder {} with auto-detection enabled", key);
                }
                _ => tracing::debug!("Discovered builder {}", key),
            }
            registration.insert(builder, caps);
        }
        Ok(())
    }

    /// Phases 1 to 3
    fn run(&mut self, mode: Mode) -> Result<(Vec<TypeKey>, Vec<Built>), BootError> {
        let entries = &mut self.registration.get_mut().entries;
        if entries.is_empty() {
            tracing::warn!("No builders registered, building an empty registry");
            return Ok((Vec::new(), Vec::new()));
        }

        let matches = resolve(entries)?;
        let order = sort(entries, &matches)?;
        let objects = build_in_order(entries, &order, &matches, mode)?;

        let keys = order.iter().map(|&i| entries[i].key.clone()).collect();
        Ok((keys, objects))
    }

    fn publish(&mut self, order: Vec<TypeKey>, objects: Vec<Built>) -> BuiltRegistry {
        let registry = BuiltRegistry::from_objects(&objects);
        self.registry = Some(registry.clone());
        self.objects = objects;
        self.order = order;
        registry
    }
}

/// Phase 1: match declared dependencies to registered builders
fn resolve(entries: &mut [Entry]) -> Result<Vec<Matches>, ResolverError> {
    tracing::trace!("Resolving dependencies of {} builders", entries.len());

    let mut index: HashMap<TypeKey, Vec<usize>> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if !entry.caps.contains(Capabilities::OBSERVABLE) {
            continue;
        }
        for key in &entry.satisfies {
            let candidates = index.entry(key.clone()).or_default();
            if !candidates.contains(&i) {
                candidates.push(i);
            }
        }
    }

    let mut all = Vec::with_capacity(entries.len());
    for entry in entries.iter_mut() {
        let mut matches = Matches::new();
        if !entry.caps.contains(Capabilities::DEPENDENT) {
            all.push(matches);
            continue;
        }
        let Some(dependent) = entry.builder.as_dependent() else {
            all.push(matches);
            continue;
        };

        for key in dependent.requires() {
            let candidates = index.get(&key).map(Vec::as_slice).unwrap_or_default();
            let Some(&first) = candidates.first() else {
                tracing::error!(
                    "Missing required dependency {} for builder {}",
                    key,
                    entry.key
                );
                return Err(ResolverError::MissingRequiredDependency {
                    dependent: entry.key.to_string(),
                    dependency: key.to_string(),
                });
            };
            warn_if_ambiguous(&entry.key, &key, candidates);
            matches.push((key, first));
        }

        for key in dependent.uses() {
            let candidates = index.get(&key).map(Vec::as_slice).unwrap_or_default();
            match candidates.first() {
                Some(&first) => {
                    warn_if_ambiguous(&entry.key, &key, candidates);
                    matches.push((key, first));
                }
                None => tracing::debug!("Optional dependency {} of {} not registered", key, entry.key),
            }
        }

        all.push(matches);
    }
    Ok(all)
}

fn warn_if_ambiguous(dependent: &TypeKey, key: &TypeKey, candidates: &[usize]) {
    if candidates.len() > 1 {
        tracing::warn!(
            "Dependency {} of {} matches {} builders, using the first registered",
            key,
            dependent,
            candidates.len()
        );
    }
}

/// Phase 2: order builders so dependencies come first
fn sort(entries: &[Entry], matches: &[Matches]) -> Result<Vec<usize>, ResolverError> {
    let mut graph = DependencyGraph::new();
    for entry in entries {
        graph.add_node(entry.key.to_string());
    }
    for (dependent, found) in matches.iter().enumerate() {
        for &(_, dependency) in found {
            graph.add_edge(dependency, dependent);
        }
    }

    let order = graph.topological_sort().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    tracing::debug!(
        "Build order: {}",
        order
            .iter()
            .map(|&i| entries[i].key.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(order)
}

/// Phase 3: hand over dependencies and build in order
fn build_in_order(
    entries: &mut [Entry],
    order: &[usize],
    matches: &[Matches],
    mode: Mode,
) -> Result<Vec<Built>, BootError> {
    let mut objects = Vec::with_capacity(order.len());

    for &i in order {
        for (key, dependency) in &matches[i] {
            let Some((dependent, provider)) = pair_mut(entries, i, *dependency) else {
                continue;
            };
            if !dependent.caps.contains(Capabilities::DEPENDENT) {
                continue;
            }
            if let Some(dependent) = dependent.builder.as_dependent() {
                dependent.provide_for(key, provider.builder.as_mut());
            }
        }

        let entry = &mut entries[i];
        let rebuilt = if mode == Mode::Rebuild && entry.caps.contains(Capabilities::REBUILDABLE) {
            entry.builder.as_rebuildable().map(|r| r.rebuild())
        } else {
            None
        };
        if mode == Mode::Rebuild && rebuilt.is_none() {
            tracing::debug!("{} is not rebuildable, reusing its cached object", entry.key);
        }
        let result = match rebuilt {
            Some(result) => result,
            None => entry.builder.build(),
        };

        match result {
            Ok(Some(built)) => {
                tracing::debug!("Built {} -> {}", entry.key, built.key());
                objects.push(built);
            }
            Ok(None) => tracing::debug!("Builder {} produced no object", entry.key),
            Err(e) => {
                tracing::error!("Build failed for {}: {}", entry.key, e);
                return Err(e.into());
            }
        }
    }
    Ok(objects)
}

/// Phase 4: init then start every managed object in build order
fn start_all(objects: &[Built]) -> Result<(), BootError> {
    for built in objects {
        let Some(lifecycle) = built.lifecycle() else {
            continue;
        };
        let fail = |phase: LifecyclePhase, source| {
            tracing::error!("Failed to {} lifecycle object {}: {}", phase, built.key(), source);
            BootError::Lifecycle {
                object: built.key().to_string(),
                phase,
                source,
            }
        };

        lifecycle.init().map_err(|e| fail(LifecyclePhase::Init, e))?;
        lifecycle.start().map_err(|e| fail(LifecyclePhase::Start, e))?;
        tracing::debug!("Started lifecycle object {}", built.key());
    }
    Ok(())
}

/// Stop every managed object in reverse build order; failures are logged
fn stop_all(objects: &[Built]) {
    for built in objects.iter().rev() {
        let Some(lifecycle) = built.lifecycle() else {
            continue;
        };
        match lifecycle.stop() {
            Ok(()) => tracing::debug!("Stopped lifecycle object {}", built.key()),
            Err(e) => tracing::warn!(
                "Failed to stop lifecycle object {}: {} - continuing with rebuild",
                built.key(),
                e
            ),
        }
    }
}

/// Two distinct mutable elements of a slice
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a >= items.len() || b >= items.len() {
        return None;
    }
    if a < b {
        let (left, right) = items.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}
