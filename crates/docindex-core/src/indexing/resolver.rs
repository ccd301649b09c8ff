//! Find-or-create of index instances.

use crate::error::Result;
use crate::models::{IndexDefinition, IndexInstance, InstanceId};
use crate::store::IndexStore;
use tracing::info;

/// Resolve the instance of `definition` for `value` under `parent`,
/// creating it on first use.
///
/// Atomicity with respect to the `(definition, value, parent)` key is the
/// store's responsibility; calling this repeatedly never duplicates instances.
pub fn resolve_instance(
    store: &dyn IndexStore,
    definition: &IndexDefinition,
    value: &str,
    parent: Option<InstanceId>,
) -> Result<IndexInstance> {
    let (instance, created) = store.resolve_or_create(definition.id, value, parent)?;
    if created {
        info!(
            "New index instance {} for definition {} ('{}')",
            instance.id, definition.id, instance.value
        );
    }
    Ok(instance)
}
