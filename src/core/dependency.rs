//! Dependency declarations and slots
//!
//! A [`DependencySpec`] declares what a dependent builder needs. Each spec
//! gets a [`BuilderDependency`] slot which tracks whether a builder has been
//! matched to it and whether that builder produced its object.

use std::fmt;

use crate::core::builder::Builder;
use crate::core::key::TypeKey;
use crate::core::registry::Built;
use crate::error::DependencyError;

/// Build phases a dependency takes part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DependencyPhase {
    /// Only during auto-detection
    AutoDetect,
    /// Only around the build itself
    Build,
    /// Both
    #[default]
    Both,
}

impl DependencyPhase {
    pub fn includes_auto_detect(self) -> bool {
        matches!(self, Self::AutoDetect | Self::Both)
    }

    pub fn includes_build(self) -> bool {
        matches!(self, Self::Build | Self::Both)
    }
}

/// How strongly a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Requirement {
    #[default]
    Optional,
    /// Required in every phase the dependency takes part in
    Required,
    /// Required during auto-detection, optional around the build
    RequiredForAutoDetect,
    /// Required around the build, optional during auto-detection
    RequiredForBuild,
}

/// A phase in which a dependent builder sweeps its slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    AutoDetect,
    PreBuild,
    PostBuild,
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoDetect => write!(f, "auto-detect"),
            Self::PreBuild => write!(f, "pre-build"),
            Self::PostBuild => write!(f, "post-build"),
        }
    }
}

/// Declaration of one dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySpec {
    pub key: TypeKey,
    pub phase: DependencyPhase,
    pub requirement: Requirement,
}

impl DependencySpec {
    pub fn new(key: TypeKey, phase: DependencyPhase, requirement: Requirement) -> Self {
        Self {
            key,
            phase,
            requirement,
        }
    }

    /// Optional dependency on `key` in every phase
    pub fn uses(key: TypeKey) -> Self {
        Self::new(key, DependencyPhase::Both, Requirement::Optional)
    }

    /// Mandatory dependency on `key` in every phase
    pub fn requires(key: TypeKey) -> Self {
        Self::new(key, DependencyPhase::Both, Requirement::Required)
    }

    /// Optional dependency on builder type `B`
    pub fn uses_builder<B: Builder>() -> Self {
        Self::uses(TypeKey::of::<B>())
    }

    /// Mandatory dependency on builder type `B`
    pub fn requires_builder<B: Builder>() -> Self {
        Self::requires(TypeKey::of::<B>())
    }

    /// Restrict the phases this dependency takes part in
    #[must_use]
    pub fn in_phase(mut self, phase: DependencyPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Whether the slot is swept in `sweep`
    pub fn is_needed_in(&self, sweep: SweepPhase) -> bool {
        match sweep {
            SweepPhase::AutoDetect => self.phase.includes_auto_detect(),
            SweepPhase::PreBuild | SweepPhase::PostBuild => self.phase.includes_build(),
        }
    }

    /// Whether the dependency is mandatory in `sweep`
    pub fn is_required_in(&self, sweep: SweepPhase) -> bool {
        if !self.is_needed_in(sweep) {
            return false;
        }
        match (self.requirement, sweep) {
            (Requirement::Required, _)
            | (Requirement::RequiredForAutoDetect, SweepPhase::AutoDetect)
            | (Requirement::RequiredForBuild, SweepPhase::PreBuild | SweepPhase::PostBuild) => true,
            _ => false,
        }
    }

    /// Whether the dependency is mandatory in any phase
    pub fn is_required(&self) -> bool {
        [SweepPhase::AutoDetect, SweepPhase::PreBuild]
            .into_iter()
            .any(|sweep| self.is_required_in(sweep))
    }
}

/// State of a dependency slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No builder matched
    Empty,
    /// A builder matched but no object is available
    Provided,
    /// A builder matched and its object is available
    Ready,
}

/// Slot tracking one declared dependency
///
/// The matched builder is referenced by key only; the orchestrator owns it.
/// The built object is held by the slot.
#[derive(Debug, Clone)]
pub struct BuilderDependency {
    spec: DependencySpec,
    matched: Option<TypeKey>,
    built: Option<Built>,
}

impl BuilderDependency {
    pub fn new(spec: DependencySpec) -> Self {
        tracing::trace!("Creating dependency slot for {}", spec.key);
        Self {
            spec,
            matched: None,
            built: None,
        }
    }

    pub fn spec(&self) -> &DependencySpec {
        &self.spec
    }

    /// Declared key of the dependency
    pub fn key(&self) -> &TypeKey {
        &self.spec.key
    }

    /// Offer a builder to this slot
    ///
    /// A builder that does not satisfy the declared key is ignored. A
    /// matching builder is recorded and built immediately; if that build
    /// fails or yields nothing the slot stays [`SlotState::Provided`].
    pub fn handle(&mut self, candidate: &mut dyn Builder) {
        let candidate_key = candidate.key();
        if !candidate.satisfies().contains(&self.spec.key) {
            tracing::warn!(
                "Dependency type mismatch: expected {}, got {}",
                self.spec.key,
                candidate_key
            );
            return;
        }

        self.matched = Some(candidate_key);
        self.built = match candidate.build() {
            Ok(Some(built)) => {
                tracing::debug!("Dependency ready: {}", self.spec.key);
                Some(built)
            }
            Ok(None) => {
                tracing::warn!("Dependency {} produced no object", self.spec.key);
                None
            }
            Err(e) => {
                tracing::error!("Failed to build dependency {}: {}", self.spec.key, e);
                None
            }
        };
    }

    pub fn state(&self) -> SlotState {
        match (&self.matched, &self.built) {
            (None, _) => SlotState::Empty,
            (Some(_), None) => SlotState::Provided,
            (Some(_), Some(_)) => SlotState::Ready,
        }
    }

    /// True iff no builder was ever matched
    pub fn is_empty(&self) -> bool {
        self.state() == SlotState::Empty
    }

    /// True iff a builder was matched and its object is present
    pub fn is_ready(&self) -> bool {
        self.state() == SlotState::Ready
    }

    /// The built object
    pub fn get(&self) -> Result<&Built, DependencyError> {
        match (&self.matched, &self.built) {
            (Some(_), Some(built)) => Ok(built),
            _ => Err(self.not_ready()),
        }
    }

    /// Key of the matched builder
    pub fn builder(&self) -> Result<&TypeKey, DependencyError> {
        self.matched
            .as_ref()
            .ok_or_else(|| DependencyError::NotProvided {
                dependency: self.spec.key.to_string(),
            })
    }

    /// Run `f` with the object if the slot is ready
    pub fn if_ready<F>(&self, f: F)
    where
        F: FnOnce(&Built),
    {
        if let Ok(built) = self.get() {
            f(built);
        }
    }

    /// Run `f` with the object if the slot is ready, `fallback` otherwise
    pub fn if_ready_or_else<R, F, G>(&self, f: F, fallback: G) -> R
    where
        F: FnOnce(&Built) -> R,
        G: FnOnce() -> R,
    {
        match self.get() {
            Ok(built) => f(built),
            Err(_) => fallback(),
        }
    }

    /// Run `f` with the object, or fail with [`DependencyError::NotReady`]
    pub fn if_ready_or_else_throw<R, F>(&self, f: F) -> Result<R, DependencyError>
    where
        F: FnOnce(&Built) -> R,
    {
        self.get().map(f)
    }

    /// Run `f` with the object, or fail with the error built by `error`
    pub fn if_ready_or_else_throw_with<R, E, F, G>(&self, f: F, error: G) -> Result<R, E>
    where
        F: FnOnce(&Built) -> R,
        G: FnOnce() -> E,
    {
        match self.get() {
            Ok(built) => Ok(f(built)),
            Err(_) => Err(error()),
        }
    }

    fn not_ready(&self) -> DependencyError {
        DependencyError::NotReady {
            dependency: self.spec.key.to_string(),
        }
    }
}
