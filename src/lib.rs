pub mod cli;
pub mod io;
pub mod llm;
pub mod model;
pub mod ops;
pub mod parse;
pub mod server;
pub mod sync;
