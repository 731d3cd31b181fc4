pub mod dashboard;
pub mod dose;
pub mod report;
pub mod scheduler;
pub mod validate;
