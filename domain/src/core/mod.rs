//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — small text helpers used for display and logging

pub mod error;
pub mod string;
