mod buffer;
mod snapshot;

pub use buffer::{Bracket, Clamp, HistoryBuffer, RecordOutcome};
pub use snapshot::{Bounds, Snapshot, Transform};
