// ── Observable garage state ──
//
// Single-writer store: the reconcile task mutates, everyone else watches.

mod apply;
mod garage_store;

pub use garage_store::{GarageState, GarageStore};
