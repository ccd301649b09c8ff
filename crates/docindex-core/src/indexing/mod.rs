//! Index maintenance: the updater, the pruner and the shared resolver.
//!
//! Both entry points collect failures as [`IndexWarning`]s instead of
//! returning errors, so one broken definition or one stale instance never
//! stops the rest of the tree from being processed.

mod pruner;
mod resolver;
#[cfg(test)]
pub(crate) mod testing;
mod updater;
mod warnings;

pub use pruner::IndexPruner;
pub use resolver::resolve_instance;
pub use updater::IndexUpdater;
pub use warnings::IndexWarning;
