pub mod config;
pub mod dashboard;
pub mod dose;
pub mod init;
pub mod report;
