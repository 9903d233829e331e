pub mod atomic;
pub mod config_io;
pub mod file_store;
pub mod layout;
pub mod ledger_io;
