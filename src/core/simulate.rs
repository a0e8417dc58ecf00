//! Graph simulation
//!
//! Turns a [`GraphManifest`] into real builders whose objects only record
//! what happens to them. Used by the CLI to check and dry-run a builder
//! graph without writing any Rust.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::builder::Builder;
use crate::core::dependency::DependencySpec;
use crate::core::dependent::{Blueprint, DependentBuilder};
use crate::core::discovery::Discovery;
use crate::core::key::TypeKey;
use crate::core::lifecycle::{Lifecycle, LifecyclePhase, LifecycleState};
use crate::core::manifest::{BuilderSpec, FailAt, GraphManifest};
use crate::core::orchestrator::Orchestrator;
use crate::core::registry::{Built, BuiltRegistry};
use crate::error::{BoxError, BootError, DiscoveryError, LifecycleError};

/// Something that happened during a simulated run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    Build { builder: String },
    PreBuild { builder: String, dependency: String },
    PostBuild { builder: String, dependency: String },
    Init { object: String },
    Start { object: String },
    Stop { object: String },
    Flush { object: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build { builder } => write!(f, "build {builder}"),
            Self::PreBuild {
                builder,
                dependency,
            } => write!(f, "pre-build {builder} <- {dependency}"),
            Self::PostBuild {
                builder,
                dependency,
            } => write!(f, "post-build {builder} <- {dependency}"),
            Self::Init { object } => write!(f, "init {object}"),
            Self::Start { object } => write!(f, "start {object}"),
            Self::Stop { object } => write!(f, "stop {object}"),
            Self::Flush { object } => write!(f, "flush {object}"),
        }
    }
}

/// Shared, ordered record of simulation events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        tracing::trace!("Simulation event: {}", event);
        self.events.lock().push(event);
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Remove and return all events so far
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

/// Object built by a [`SimulatedBlueprint`]
#[derive(Debug)]
pub struct SimulatedObject {
    name: String,
    generation: usize,
    fail: Option<LifecyclePhase>,
    state: LifecycleState,
    log: EventLog,
}

impl SimulatedObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times the builder had built before this object, starting at 0
    pub fn generation(&self) -> usize {
        self.generation
    }

    fn step(&self, phase: LifecyclePhase) -> Result<(), LifecycleError> {
        let object = self.name.clone();
        self.log.record(match phase {
            LifecyclePhase::Init => Event::Init { object },
            LifecyclePhase::Start => Event::Start { object },
            LifecyclePhase::Stop => Event::Stop { object },
            LifecyclePhase::Flush => Event::Flush { object },
        });
        if self.fail == Some(phase) {
            return Err(LifecycleError::failed(format!(
                "simulated {phase} failure in '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

impl Lifecycle for SimulatedObject {
    fn init(&self) -> Result<(), LifecycleError> {
        self.state.init(|| self.step(LifecyclePhase::Init))
    }

    fn start(&self) -> Result<(), LifecycleError> {
        self.state.start(|| self.step(LifecyclePhase::Start))
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.state.stop(|| self.step(LifecyclePhase::Stop))
    }

    fn flush(&self) -> Result<(), LifecycleError> {
        self.state.flush(|| self.step(LifecyclePhase::Flush))
    }

    fn reload(&self) -> Result<(), LifecycleError> {
        self.state.reload(|phase| self.step(phase))
    }
}

/// Blueprint driven by a manifest entry
pub struct SimulatedBlueprint {
    spec: BuilderSpec,
    log: EventLog,
    builds: usize,
}

impl SimulatedBlueprint {
    pub fn new(spec: BuilderSpec, log: EventLog) -> Self {
        Self {
            spec,
            log,
            builds: 0,
        }
    }

    /// Wrap into a registrable builder
    pub fn into_builder(self) -> DependentBuilder<Self> {
        DependentBuilder::new(self)
    }

    pub fn spec(&self) -> &BuilderSpec {
        &self.spec
    }
}

impl Blueprint for SimulatedBlueprint {
    fn key(&self) -> TypeKey {
        TypeKey::named(&self.spec.name)
    }

    fn satisfies(&self) -> Vec<TypeKey> {
        std::iter::once(&self.spec.name)
            .chain(&self.spec.provides)
            .map(TypeKey::named)
            .collect()
    }

    fn dependencies(&self) -> Vec<DependencySpec> {
        let required = self
            .spec
            .requires
            .iter()
            .map(|name| DependencySpec::requires(TypeKey::named(name)));
        let optional = self
            .spec
            .uses
            .iter()
            .map(|name| DependencySpec::uses(TypeKey::named(name)));
        required.chain(optional).collect()
    }

    fn do_build(&mut self) -> Result<Option<Built>, BoxError> {
        let name = self.spec.name.clone();
        self.log.record(Event::Build {
            builder: name.clone(),
        });

        let fail = self.spec.fail_at();
        if fail == Some(FailAt::Build) {
            return Err(format!("simulated build failure in '{name}'").into());
        }

        let object = SimulatedObject {
            name: name.clone(),
            generation: self.builds,
            fail: fail.and_then(FailAt::lifecycle_phase),
            state: LifecycleState::new(),
            log: self.log.clone(),
        };
        self.builds += 1;

        let built = if self.spec.lifecycle {
            Built::managed(object)
        } else {
            Built::new(object)
        };
        Ok(Some(built.keyed(TypeKey::named(name))))
    }

    fn pre_build(&mut self, dependency: &TypeKey, _value: &Built) -> Result<(), BoxError> {
        self.log.record(Event::PreBuild {
            builder: self.spec.name.clone(),
            dependency: dependency.to_string(),
        });
        Ok(())
    }

    fn post_build(&mut self, dependency: &TypeKey, _value: &Built) -> Result<(), BoxError> {
        self.log.record(Event::PostBuild {
            builder: self.spec.name.clone(),
            dependency: dependency.to_string(),
        });
        Ok(())
    }

    fn is_automatic(&self) -> bool {
        true
    }

    fn is_rebuildable(&self) -> bool {
        self.spec.rebuildable
    }
}

/// Discovery over the packaged builders of a manifest
pub struct ManifestDiscovery {
    builders: Vec<BuilderSpec>,
    log: EventLog,
}

impl ManifestDiscovery {
    pub fn new(builders: Vec<BuilderSpec>, log: EventLog) -> Self {
        Self { builders, log }
    }
}

impl Discovery for ManifestDiscovery {
    fn discover(&self, packages: &[String]) -> Result<Vec<Box<dyn Builder>>, DiscoveryError> {
        let found: Vec<Box<dyn Builder>> = self
            .builders
            .iter()
            .filter(|spec| {
                spec.package
                    .as_ref()
                    .is_some_and(|package| packages.contains(package))
            })
            .map(|spec| {
                let blueprint = SimulatedBlueprint::new(spec.clone(), self.log.clone());
                Box::new(blueprint.into_builder()) as Box<dyn Builder>
            })
            .collect();
        tracing::debug!("Found {} builders in {} packages", found.len(), packages.len());
        Ok(found)
    }
}

/// An orchestrator wired from a graph manifest
pub struct Simulation {
    orchestrator: Orchestrator,
    log: EventLog,
}

impl Simulation {
    /// Register the manifest's unpackaged builders directly and make the
    /// packaged ones available through discovery
    pub fn from_manifest(manifest: &GraphManifest) -> Self {
        let log = EventLog::new();
        let (packaged, direct): (Vec<_>, Vec<_>) = manifest
            .builders
            .iter()
            .cloned()
            .partition(|spec| spec.package.is_some());

        let orchestrator = Orchestrator::new()
            .with_config(manifest.orchestrator.clone())
            .with_discovery(ManifestDiscovery::new(packaged, log.clone()));
        for spec in direct {
            orchestrator.register(SimulatedBlueprint::new(spec, log.clone()).into_builder());
        }

        Self { orchestrator, log }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn plan(&mut self) -> Result<Vec<TypeKey>, BootError> {
        self.orchestrator.plan()
    }

    pub fn build(&mut self) -> Result<BuiltRegistry, BootError> {
        self.orchestrator.build()
    }

    pub fn rebuild(&mut self) -> Result<BuiltRegistry, BootError> {
        self.orchestrator.rebuild()
    }
}
