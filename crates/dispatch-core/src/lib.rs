pub mod config;
pub mod exempt;
pub mod manifest;
pub mod prompt;
pub mod report;
pub mod score;
pub mod skills;
pub mod types;

pub use config::Config;
pub use report::{report_record, SelectionReport};
pub use types::*;
