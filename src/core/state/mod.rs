//! Lifecycle state inference from dataset snapshots

pub mod infer;
pub mod snapshot;

pub use infer::infer_state;
pub use snapshot::DatasetSnapshot;
