//! Integration tests for adscope lifecycle tracing, metrics and the replay CLI

mod impression_timeout;
mod lifecycle_termination;
mod metrics_session;
mod replay_cli;
mod test_utils;
