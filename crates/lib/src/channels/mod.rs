//! Bridge channels.
//!
//! [`WhisplayImChannel`] talks to a whisplay-im bridge: one poll or one send per call,
//! no retries. Response bodies are decoded leniently (see [`safe_json`]).

mod payload;
mod whisplay;

pub use payload::{extract_message, poll_result, safe_json, Payload, PollResult};
pub use whisplay::{ChannelError, WhisplayImChannel, POLL_PATH, SEND_PATH};
