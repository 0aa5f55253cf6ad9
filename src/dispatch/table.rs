//! Binding table mapping target paths to the methods currently installed there.

use super::{Invocation, Reply, TargetPath};
use crate::error::{MongodogError, Result};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// A bound operation: the built-in method or a wrapped replacement
pub type Method = Arc<dyn Fn(&Invocation) -> Result<Reply> + Send + Sync>;

static GLOBAL: LazyLock<Arc<DispatchTable>> = LazyLock::new(|| Arc::new(DispatchTable::new()));

/// Table of method bindings
///
/// Each path is bound to exactly one method at a time. Lookups clone the bound
/// method out of the table before running it, so a method may itself dispatch
/// through the same table (a reporter writing to the store it observes does).
///
/// The table does not order `bind` against concurrent `invoke`: a call racing a
/// rebind sees either the old or the new method.
#[derive(Default)]
pub struct DispatchTable {
    bindings: RwLock<HashMap<TargetPath, Method>>,
}

impl DispatchTable {
    /// Create an isolated table
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table used by clients created with `Client::new`
    pub fn global() -> Arc<DispatchTable> {
        Arc::clone(&GLOBAL)
    }

    /// Bind `method` at `path`, returning the previous binding
    pub fn bind(&self, path: TargetPath, method: Method) -> Option<Method> {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        bindings.insert(path, method)
    }

    /// Bind the method produced by `make` only if nothing is bound at `path` yet
    ///
    /// Returns true if a binding was made.
    pub fn bind_if_absent(&self, path: TargetPath, make: impl FnOnce() -> Method) -> bool {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if bindings.contains_key(&path) {
            return false;
        }
        bindings.insert(path, make());
        true
    }

    /// The method currently bound at `path`
    pub fn lookup(&self, path: &TargetPath) -> Option<Method> {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        bindings.get(path).cloned()
    }

    /// Whether `path` is bound to exactly this method (pointer identity)
    pub fn is_bound_to(&self, path: &TargetPath, method: &Method) -> bool {
        self.lookup(path).is_some_and(|bound| Arc::ptr_eq(&bound, method))
    }

    /// Run the method bound at `path`
    pub fn invoke(&self, path: &TargetPath, invocation: &Invocation) -> Result<Reply> {
        let method = self
            .lookup(path)
            .ok_or_else(|| MongodogError::MethodNotBound(path.to_string()))?;
        method(invocation)
    }

    pub fn len(&self) -> usize {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
