pub mod capture;
pub mod config;
pub mod daily;
pub mod ledger;
pub mod project;
pub mod task;

pub use capture::*;
pub use config::*;
pub use daily::*;
pub use ledger::*;
pub use project::*;
pub use task::*;
