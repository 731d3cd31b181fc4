pub mod config;
pub mod dose;

pub use dose::{DosageUnit, DoseInterval, DoseRecord, IntervalInput};
