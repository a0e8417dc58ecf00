//! Dependent builder base
//!
//! [`DependentBuilder`] turns a [`Blueprint`] into a [`Builder`] that owns
//! dependency slots. Its `build` runs the blueprint in phases:
//!
//! 1. auto-detection (only when enabled), with an auto-detect slot sweep
//! 2. pre-build slot sweep
//! 3. [`Blueprint::do_build`], result cached
//! 4. post-build slot sweep
//!
//! A sweep hands every ready slot's object to the matching hook. A slot that
//! is required in the phase must be either empty or ready: a required slot
//! whose builder matched but failed to produce an object aborts the build.

use crate::core::builder::{Automatic, Builder, Dependent, Packageable, Rebuildable};
use crate::core::dependency::{BuilderDependency, DependencySpec, SlotState, SweepPhase};
use crate::core::key::TypeKey;
use crate::core::registry::Built;
use crate::error::{BoxError, BuildError};

/// What a dependent builder builds and how it consumes its dependencies
pub trait Blueprint: Send + 'static {
    /// Identity of the resulting builder
    fn key(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Keys the resulting builder can stand in for, its own key first
    fn satisfies(&self) -> Vec<TypeKey> {
        vec![self.key()]
    }

    /// Declared dependencies, read once when the builder is created
    fn dependencies(&self) -> Vec<DependencySpec>;

    /// Construct the object
    fn do_build(&mut self) -> Result<Option<Built>, BoxError>;

    /// Receives each ready dependency before `do_build`
    fn pre_build(&mut self, _dependency: &TypeKey, _value: &Built) -> Result<(), BoxError> {
        Ok(())
    }

    /// Receives each ready dependency after `do_build`
    fn post_build(&mut self, _dependency: &TypeKey, _value: &Built) -> Result<(), BoxError> {
        Ok(())
    }

    /// Blueprint-specific auto-detection
    fn auto_detect(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Receives each ready dependency during auto-detection
    fn auto_detect_with(&mut self, _dependency: &TypeKey, _value: &Built) -> Result<(), BoxError> {
        Ok(())
    }

    /// Scan-package hint
    fn with_package(&mut self, _package: &str) {}

    /// Opt in to [`Packageable`]
    fn is_packageable(&self) -> bool {
        false
    }

    /// Opt in to [`Automatic`]
    fn is_automatic(&self) -> bool {
        false
    }

    /// Opt in to [`Rebuildable`]
    fn is_rebuildable(&self) -> bool {
        false
    }
}

/// A [`Builder`] driving a [`Blueprint`] through its dependency phases
pub struct DependentBuilder<B: Blueprint> {
    blueprint: B,
    uses: Vec<BuilderDependency>,
    requires: Vec<BuilderDependency>,
    built: Option<Built>,
    packages: Vec<String>,
    auto_detect: bool,
    invalidated: bool,
}

impl<B: Blueprint> DependentBuilder<B> {
    pub fn new(blueprint: B) -> Self {
        let mut uses: Vec<BuilderDependency> = Vec::new();
        let mut requires: Vec<BuilderDependency> = Vec::new();

        for spec in blueprint.dependencies() {
            if uses.iter().chain(&requires).any(|slot| slot.key() == &spec.key) {
                tracing::warn!(
                    "{} declares dependency {} more than once, keeping the first",
                    blueprint.key(),
                    spec.key
                );
                continue;
            }
            if spec.is_required() {
                requires.push(BuilderDependency::new(spec));
            } else {
                uses.push(BuilderDependency::new(spec));
            }
        }

        tracing::debug!(
            "{} created with {} use and {} require dependencies",
            blueprint.key(),
            uses.len(),
            requires.len()
        );

        Self {
            blueprint,
            uses,
            requires,
            built: None,
            packages: Vec::new(),
            auto_detect: false,
            invalidated: false,
        }
    }

    pub fn blueprint(&self) -> &B {
        &self.blueprint
    }

    pub fn blueprint_mut(&mut self) -> &mut B {
        &mut self.blueprint
    }

    /// Slot declared for `key`
    pub fn slot(&self, key: &TypeKey) -> Option<&BuilderDependency> {
        self.slots().find(|slot| slot.key() == key)
    }

    /// All slots, optional ones first
    pub fn slots(&self) -> impl Iterator<Item = &BuilderDependency> {
        self.uses.iter().chain(&self.requires)
    }

    /// Enable or disable auto-detection
    #[must_use]
    pub fn with_auto_detect(mut self, enabled: bool) -> Self {
        self.auto_detect = enabled;
        self
    }

    fn sweep(&mut self, phase: SweepPhase) -> Result<(), BuildError> {
        let dependent = self.blueprint.key();
        tracing::trace!("{}: {} dependency sweep", dependent, phase);

        for slot in self.uses.iter().chain(&self.requires) {
            let spec = slot.spec();
            if !spec.is_needed_in(phase) {
                continue;
            }

            if spec.is_required_in(phase) && slot.state() == SlotState::Provided {
                tracing::error!(
                    "Required dependency {} of {} not ready during {} phase",
                    spec.key,
                    dependent,
                    phase
                );
                return Err(BuildError::DependencyNotReady {
                    dependent: dependent.to_string(),
                    dependency: spec.key.to_string(),
                    phase,
                });
            }

            if let Ok(value) = slot.get() {
                let result = match phase {
                    SweepPhase::AutoDetect => self.blueprint.auto_detect_with(&spec.key, value),
                    SweepPhase::PreBuild => self.blueprint.pre_build(&spec.key, value),
                    SweepPhase::PostBuild => self.blueprint.post_build(&spec.key, value),
                };
                result.map_err(|e| BuildError::failed(dependent.to_string(), e))?;
            }
        }
        Ok(())
    }
}

impl<B: Blueprint> Builder for DependentBuilder<B> {
    fn key(&self) -> TypeKey {
        self.blueprint.key()
    }

    fn satisfies(&self) -> Vec<TypeKey> {
        self.blueprint.satisfies()
    }

    fn build(&mut self) -> Result<Option<Built>, BuildError> {
        if let Some(built) = &self.built {
            tracing::trace!("{}: returning previously built object", self.blueprint.key());
            return Ok(Some(built.clone()));
        }

        let name = self.blueprint.key().to_string();

        if self.auto_detect {
            tracing::debug!("{}: running auto-detection", name);
            self.blueprint
                .auto_detect()
                .map_err(|e| BuildError::failed(name.clone(), e))?;
            self.sweep(SweepPhase::AutoDetect)?;
        }

        self.sweep(SweepPhase::PreBuild)?;

        tracing::debug!("{}: building", name);
        let built = self
            .blueprint
            .do_build()
            .map_err(|e| BuildError::failed(name.clone(), e))?;
        self.built.clone_from(&built);
        self.invalidated = false;

        self.sweep(SweepPhase::PostBuild)?;
        Ok(built)
    }

    fn as_dependent(&mut self) -> Option<&mut dyn Dependent> {
        Some(self)
    }

    fn as_packageable(&mut self) -> Option<&mut dyn Packageable> {
        if self.blueprint.is_packageable() {
            Some(self)
        } else {
            None
        }
    }

    fn as_automatic(&mut self) -> Option<&mut dyn Automatic> {
        if self.blueprint.is_automatic() {
            Some(self)
        } else {
            None
        }
    }

    fn as_rebuildable(&mut self) -> Option<&mut dyn Rebuildable> {
        if self.blueprint.is_rebuildable() {
            Some(self)
        } else {
            None
        }
    }
}

impl<B: Blueprint> Dependent for DependentBuilder<B> {
    fn uses(&self) -> Vec<TypeKey> {
        self.uses.iter().map(|slot| slot.key().clone()).collect()
    }

    fn requires(&self) -> Vec<TypeKey> {
        self.requires.iter().map(|slot| slot.key().clone()).collect()
    }

    fn provide(&mut self, candidate: &mut dyn Builder) {
        let satisfies = candidate.satisfies();
        let slot = self
            .uses
            .iter_mut()
            .chain(self.requires.iter_mut())
            .find(|slot| satisfies.contains(slot.key()));

        match slot {
            Some(slot) => slot.handle(candidate),
            None => tracing::debug!(
                "{} does not match any dependency of {}",
                candidate.key(),
                self.blueprint.key()
            ),
        }
    }

    fn provide_for(&mut self, dependency: &TypeKey, candidate: &mut dyn Builder) {
        let slot = self
            .uses
            .iter_mut()
            .chain(self.requires.iter_mut())
            .find(|slot| slot.key() == dependency);

        match slot {
            Some(slot) => slot.handle(candidate),
            None => tracing::debug!(
                "{} declares no dependency {}",
                self.blueprint.key(),
                dependency
            ),
        }
    }
}

impl<B: Blueprint> Packageable for DependentBuilder<B> {
    fn with_package(&mut self, package: &str) {
        if !self.packages.iter().any(|p| p == package) {
            self.packages.push(package.to_string());
            self.blueprint.with_package(package);
        }
    }

    fn packages(&self) -> Vec<String> {
        self.packages.clone()
    }
}

impl<B: Blueprint> Automatic for DependentBuilder<B> {
    fn set_auto_detect(&mut self, enabled: bool) {
        self.auto_detect = enabled;
    }

    fn is_auto_detect(&self) -> bool {
        self.auto_detect
    }
}

impl<B: Blueprint> Rebuildable for DependentBuilder<B> {
    fn invalidate(&mut self) {
        self.built = None;
        self.invalidated = true;
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    fn rebuild(&mut self) -> Result<Option<Built>, BuildError> {
        tracing::debug!("{}: rebuilding", self.blueprint.key());
        self.invalidate();
        self.build()
    }
}
