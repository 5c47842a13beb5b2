//! whisplay-im client library — bridge configuration and the poll/send channel
//! used by the `whisplay-im-channel` CLI.

pub mod channels;
pub mod config;
