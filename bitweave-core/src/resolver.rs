use indexmap::{IndexMap, IndexSet};

use crate::error::SchemaError;
use crate::expr::Expr;
use crate::value::Value;

/// Decode-time lookup of previously decoded values and external parameters.
///
/// Resolvers form a chain: a child scope borrows its parent immutably and
/// owns its own bindings, so nothing bound in a child is visible once the
/// child is dropped. Lookups walk the chain innermost first.
#[derive(Debug, Default)]
pub struct Resolver<'p> {
    parent: Option<&'p Resolver<'p>>,
    bindings: IndexMap<String, Value>,
}

impl<'p> Resolver<'p> {
    /// Creates an empty root resolver.
    pub fn new() -> Self {
        Resolver {
            parent: None,
            bindings: IndexMap::new(),
        }
    }

    /// Creates a root resolver seeded with externally supplied values.
    pub fn with_params<K: Into<String>>(params: impl IntoIterator<Item = (K, Value)>) -> Self {
        Resolver {
            parent: None,
            bindings: params.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Opens a child scope on top of this resolver.
    pub fn scope(&self) -> Resolver<'_> {
        Resolver {
            parent: Some(self),
            bindings: IndexMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&Resolver<'p>> {
        self.parent
    }

    /// Binds `name` in this frame, returning any value it shadowed here.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.bindings.insert(name.into(), value)
    }

    /// Looks up a plain name through the scope chain.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(value) = current.bindings.get(name) {
                return Some(value);
            }
            frame = current.parent;
        }
        None
    }

    /// Looks up a dotted path: the first segment through the scope chain, the
    /// remaining segments as record fields.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.get(segments.next()?)?;
        for segment in segments {
            value = value.as_record()?.get(segment)?;
        }
        Some(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bindings of this frame only, in binding order.
    pub fn local_bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Consumes the frame and hands back its own bindings.
    pub fn into_bindings(self) -> IndexMap<String, Value> {
        self.bindings
    }
}

/// Schema-construction counterpart of [`Resolver`].
///
/// Tracks which names will have been bound by the time a codec runs, so that
/// references to fields that come later (or never) are caught while the
/// codec tree is built instead of halfway through a decode.
#[derive(Debug, Default)]
pub struct ResolverContext<'p> {
    parent: Option<&'p ResolverContext<'p>>,
    names: IndexSet<String>,
}

impl<'p> ResolverContext<'p> {
    pub fn new() -> Self {
        ResolverContext {
            parent: None,
            names: IndexSet::new(),
        }
    }

    /// Creates a root context declaring the given external parameters.
    pub fn with_params<K: Into<String>>(names: impl IntoIterator<Item = K>) -> Self {
        ResolverContext {
            parent: None,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn scope(&self) -> ResolverContext<'_> {
        ResolverContext {
            parent: Some(self),
            names: IndexSet::new(),
        }
    }

    /// Declares a name in this frame. Returns false if it was already
    /// declared in this frame.
    pub fn declare(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn declares_locally(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of frames a lookup of `path` walks before it finds the name:
    /// 0 for this frame, 1 for the parent, and so on.
    pub fn depth_of(&self, path: &str) -> Option<usize> {
        let head = path.split('.').next()?;
        let mut frame = Some(self);
        let mut depth = 0;
        while let Some(current) = frame {
            if current.names.contains(head) {
                return Some(depth);
            }
            frame = current.parent;
            depth += 1;
        }
        None
    }

    pub fn is_available(&self, path: &str) -> bool {
        self.depth_of(path).is_some()
    }

    /// Verifies every reference in `expr` will be bound.
    pub fn check(&self, expr: &Expr) -> Result<(), SchemaError> {
        match expr.references().into_iter().find(|r| !self.is_available(r)) {
            Some(missing) => Err(SchemaError::UnknownReference(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
