//! Type keys
//!
//! Builders and built objects are identified by a [`TypeKey`]. A key is
//! either derived from a Rust type or given a runtime name, so data-driven
//! builders can take part in the same graph as statically typed ones.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    Type(TypeId),
    Named(Arc<str>),
}

/// Identity of a builder or of a built object's type
///
/// Equality and hashing only consider the identity, never the display name.
#[derive(Clone)]
pub struct TypeKey {
    identity: Identity,
    name: Arc<str>,
}

impl TypeKey {
    /// Key of the Rust type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            identity: Identity::Type(TypeId::of::<T>()),
            name: Arc::from(type_name::<T>()),
        }
    }

    /// Key identified by a runtime name
    pub fn named(name: impl AsRef<str>) -> Self {
        let name: Arc<str> = Arc::from(name.as_ref());
        Self {
            identity: Identity::Named(Arc::clone(&name)),
            name,
        }
    }

    /// Full name (module path included for Rust types)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without module path or generic arguments' paths
    ///
    /// `my_app::services::Database` becomes `Database`,
    /// `bootgraph::core::dependent::DependentBuilder<app::Api>` becomes
    /// `DependentBuilder<Api>`.
    pub fn short_name(&self) -> String {
        match &self.identity {
            Identity::Named(name) => name.to_string(),
            Identity::Type(_) => shorten(&self.name),
        }
    }

    /// Whether this key was derived from the Rust type `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.identity == Identity::Type(TypeId::of::<T>())
    }
}

fn shorten(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}
