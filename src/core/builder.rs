//! Builder contract
//!
//! A [`Builder`] produces one object. Everything else a builder can do is
//! an optional capability exposed through the `as_*` accessors and summarised
//! by [`Capabilities`], which the orchestrator computes once when the
//! builder is registered.

use bitflags::bitflags;

use crate::core::key::TypeKey;
use crate::core::registry::Built;
use crate::error::BuildError;

bitflags! {
    /// Capabilities a registered builder was found to have
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Other builders may depend on it
        const OBSERVABLE = 1 << 0;
        /// Declares dependencies and accepts `provide`
        const DEPENDENT = 1 << 1;
        /// Accepts scan-package hints
        const PACKAGEABLE = 1 << 2;
        /// Supports the auto-detection toggle
        const AUTOMATIC = 1 << 3;
        /// Produces a fresh object on rebuild
        const REBUILDABLE = 1 << 4;
    }
}

impl Capabilities {
    /// Probe a builder's capabilities
    pub fn probe(builder: &mut dyn Builder) -> Self {
        let mut caps = Self::empty();
        caps.set(Self::OBSERVABLE, builder.is_observable());
        caps.set(Self::DEPENDENT, builder.as_dependent().is_some());
        caps.set(Self::PACKAGEABLE, builder.as_packageable().is_some());
        caps.set(Self::AUTOMATIC, builder.as_automatic().is_some());
        caps.set(Self::REBUILDABLE, builder.as_rebuildable().is_some());
        caps
    }
}

/// A construction unit
///
/// `build` must be idempotent: the first successful call constructs the
/// object, later calls return the same object. Dependency slots and the
/// orchestrator both call it, and the object must be constructed once.
pub trait Builder: Send + 'static {
    /// Identity of the builder
    fn key(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Keys this builder can stand in for, its own key first
    ///
    /// A dependency declared on any of these keys matches this builder.
    fn satisfies(&self) -> Vec<TypeKey> {
        vec![self.key()]
    }

    /// Whether other builders may depend on this one
    fn is_observable(&self) -> bool {
        true
    }

    /// Build (or return the already built) object
    ///
    /// `Ok(None)` means the builder has nothing to contribute.
    fn build(&mut self) -> Result<Option<Built>, BuildError>;

    /// Dependency capability
    fn as_dependent(&mut self) -> Option<&mut dyn Dependent> {
        None
    }

    /// Scan-package capability
    fn as_packageable(&mut self) -> Option<&mut dyn Packageable> {
        None
    }

    /// Auto-detection capability
    fn as_automatic(&mut self) -> Option<&mut dyn Automatic> {
        None
    }

    /// Rebuild capability
    fn as_rebuildable(&mut self) -> Option<&mut dyn Rebuildable> {
        None
    }
}

/// Builders that declare dependencies on other builders
pub trait Dependent {
    /// Optional dependency keys
    fn uses(&self) -> Vec<TypeKey>;

    /// Mandatory dependency keys
    fn requires(&self) -> Vec<TypeKey>;

    /// Offer a builder that may satisfy one of the declared dependencies
    ///
    /// Offers matching no declared dependency are ignored.
    fn provide(&mut self, candidate: &mut dyn Builder);

    /// Offer a builder for the dependency declared on `dependency`
    ///
    /// The orchestrator uses this form so that a candidate satisfying
    /// several declared keys lands in the slot it was matched for.
    fn provide_for(&mut self, dependency: &TypeKey, candidate: &mut dyn Builder) {
        let _ = dependency;
        self.provide(candidate);
    }
}

/// Builders that accept scan-package hints
pub trait Packageable {
    fn with_package(&mut self, package: &str);

    fn packages(&self) -> Vec<String>;
}

/// Builders with an auto-detection toggle
pub trait Automatic {
    fn set_auto_detect(&mut self, enabled: bool);

    fn is_auto_detect(&self) -> bool;
}

/// Builders that can produce a fresh object on demand
pub trait Rebuildable {
    /// Drop the cached object; the next `build` constructs a new one
    fn invalidate(&mut self);

    fn is_invalidated(&self) -> bool;

    /// Invalidate and build again
    fn rebuild(&mut self) -> Result<Option<Built>, BuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        built: Option<Built>,
    }

    impl Builder for Plain {
        fn build(&mut self) -> Result<Option<Built>, BuildError> {
            Ok(Some(self.built.get_or_insert_with(|| Built::new(1u8)).clone()))
        }
    }

    struct Scanned {
        packages: Vec<String>,
    }

    impl Builder for Scanned {
        fn build(&mut self) -> Result<Option<Built>, BuildError> {
            Ok(None)
        }

        fn is_observable(&self) -> bool {
            false
        }

        fn as_packageable(&mut self) -> Option<&mut dyn Packageable> {
            Some(self)
        }
    }

    impl Packageable for Scanned {
        fn with_package(&mut self, package: &str) {
            self.packages.push(package.to_string());
        }

        fn packages(&self) -> Vec<String> {
            self.packages.clone()
        }
    }

    #[test]
    fn test_default_identity() {
        let plain = Plain { built: None };
        assert!(plain.key().is::<Plain>());
        assert_eq!(plain.satisfies(), vec![TypeKey::of::<Plain>()]);
    }

    #[test]
    fn test_probe_plain_builder() {
        let mut plain = Plain { built: None };
        assert_eq!(Capabilities::probe(&mut plain), Capabilities::OBSERVABLE);
    }

    #[test]
    fn test_probe_packageable_builder() {
        let mut scanned = Scanned { packages: vec![] };
        assert_eq!(
            Capabilities::probe(&mut scanned),
            Capabilities::PACKAGEABLE
        );
    }
}
