//! CLI domain: parse, route, replay, output, and presentation only.
//! Single route table dispatches to the replay driver and formatters.

mod output;
mod parse;
mod presentation;
pub mod replay;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_config_json, format_config_text, format_replay_json, format_replay_text,
};
pub use replay::{load_script, parse_script, ReplayReport, Replayer, ScriptLine, ScriptStep};
pub use route::RunContext;
