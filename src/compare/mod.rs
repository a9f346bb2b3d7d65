mod comparator;
mod noise;
mod record;

pub use comparator::{CompareStats, Comparator};
pub use noise::NoiseFilter;
pub use record::{DiffRecord, DiffStatus, NodeKind, SideInfo};
