//! Pure planning layer of the sync: snapshot indexes, the bidirectional
//! set difference, and bootstrap plans for one-sided groups. All writes
//! and network calls stay with the orchestrator.

mod bootstrap;
mod diff;
mod snapshot;

pub use bootstrap::{match_groups, plan_inventory_group, scope_seed, GroupMatch, InventoryGroupPlan};
pub use diff::{diff_group, new_scope_ips, plan_new_sites, GroupDiff, SYNC_NOTE};
pub use snapshot::{GroupView, RootRef, SnapshotIndex, SubRef};
