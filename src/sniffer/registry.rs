//! Operations the sniffer intercepts

use crate::client::operations::*;
use crate::dispatch::TargetPath;
use crate::error::{MongodogError, Result};
use std::collections::HashSet;

/// One interceptable method and the name its calls are reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub path: TargetPath,
}

impl OperationDescriptor {
    pub const fn new(name: &'static str, path: TargetPath) -> Self {
        Self { name, path }
    }
}

/// Ordered set of operations, unique by path
///
/// Names may repeat: two target types can report under the same operation name when
/// one overrides the other's method.
#[derive(Debug, Clone)]
pub struct Registry {
    operations: Vec<OperationDescriptor>,
}

impl Registry {
    pub fn new(operations: Vec<OperationDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for operation in &operations {
            if !seen.insert(operation.path) {
                return Err(MongodogError::ConfigError(format!(
                    "{} is registered more than once",
                    operation.path
                )));
            }
        }
        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter()
    }
}

const CLIENT_OPERATIONS: &[OperationDescriptor] = &[
    OperationDescriptor::new("database_command", DATABASE_COMMAND.path),
    OperationDescriptor::new("collection_aggregate", COLLECTION_AGGREGATE.path),
    OperationDescriptor::new("collection_count", COLLECTION_COUNT.path),
    OperationDescriptor::new("collection_distinct", COLLECTION_DISTINCT.path),
    OperationDescriptor::new("collection_find", COLLECTION_FIND.path),
    OperationDescriptor::new("collection_find_and_modify", COLLECTION_FIND_AND_MODIFY.path),
    OperationDescriptor::new("collection_find_one", COLLECTION_FIND_ONE.path),
    OperationDescriptor::new("collection_group", COLLECTION_GROUP.path),
    OperationDescriptor::new("collection_inline_map_reduce", COLLECTION_INLINE_MAP_REDUCE.path),
    OperationDescriptor::new("collection_insert", COLLECTION_INSERT.path),
    OperationDescriptor::new("collection_map_reduce", COLLECTION_MAP_REDUCE.path),
    OperationDescriptor::new("collection_remove", COLLECTION_REMOVE.path),
    OperationDescriptor::new("collection_save", COLLECTION_SAVE.path),
    OperationDescriptor::new("collection_update", COLLECTION_UPDATE.path),
    OperationDescriptor::new("cursor_iter", CURSOR_ITER.path),
];

/// Every interceptable client operation, plus the document layer's `find` when the
/// `odm` feature is enabled
pub fn default_registry() -> Registry {
    #[allow(unused_mut)]
    let mut operations = CLIENT_OPERATIONS.to_vec();

    #[cfg(feature = "odm")]
    operations.push(OperationDescriptor::new(
        "collection_find",
        crate::odm::DOCUMENT_COLLECTION_FIND.path,
    ));

    Registry { operations }
}

impl Default for Registry {
    fn default() -> Self {
        default_registry()
    }
}
