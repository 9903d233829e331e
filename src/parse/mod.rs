pub mod capture_parser;
pub mod daily_parser;
pub mod ledger_parser;
pub mod ledger_serializer;
pub mod project_parser;
pub mod span;
pub mod task_parser;
pub mod task_serializer;

pub use capture_parser::{parse_capture_entries, parse_inbox_sections};
pub use daily_parser::parse_daily;
pub use ledger_parser::parse_ledger;
pub use ledger_serializer::{empty_ledger, serialize_ledger};
pub use project_parser::parse_project_summary;
