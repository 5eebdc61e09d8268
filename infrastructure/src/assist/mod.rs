//! Assistive routing adapters

#[cfg(feature = "assist-http")]
mod http;

#[cfg(feature = "assist-http")]
pub use http::HttpRoutingStrategy;
