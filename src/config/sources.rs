//! Configuration sources, lowest precedence first.

pub mod environment;
pub mod global_file;
pub mod properties_file;
pub mod workspace_file;
