//! Logging infrastructure - structured trip event logging.
//!
//! Events are written as JSONL (one JSON object per line) with a `type`
//! field for the event kind and an RFC 3339 `timestamp`.

mod event_log;

pub use event_log::JsonlEventLog;
