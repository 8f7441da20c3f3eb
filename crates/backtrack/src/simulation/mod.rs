mod recorder;
mod tick;
mod time;

pub use recorder::{RecordStats, SnapshotRecorder};
pub use tick::{FixedTimestep, SimulationLoop};
pub use time::{ServerClock, ServerTime};
