pub mod schedule;

pub use schedule::SlotPlanner;
