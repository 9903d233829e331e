pub mod capture_ops;
pub mod daily_ops;
pub mod dashboard;
pub mod inbox_ops;
pub mod ledger_ops;
pub mod project_ops;
pub mod search;
pub mod summary;
