//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`string`] - normalization helpers for member-submitted choices

pub mod error;
pub mod string;
