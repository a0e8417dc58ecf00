//! Builder discovery
//!
//! The orchestrator does not scan anything itself. When auto-detection is
//! enabled it asks a [`Discovery`] collaborator for additional builders,
//! passing the registered scan packages.

use crate::core::builder::Builder;
use crate::error::DiscoveryError;

/// Source of builders found at run time
pub trait Discovery: Send + Sync {
    /// Builders found in `packages`
    fn discover(&self, packages: &[String]) -> Result<Vec<Box<dyn Builder>>, DiscoveryError>;
}

impl<F> Discovery for F
where
    F: Fn(&[String]) -> Result<Vec<Box<dyn Builder>>, DiscoveryError> + Send + Sync,
{
    fn discover(&self, packages: &[String]) -> Result<Vec<Box<dyn Builder>>, DiscoveryError> {
        self(packages)
    }
}
