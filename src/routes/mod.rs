//! Router Module Index
//!
//! Splits the API by access requirement. Protection is enforced by the `AuthUser`
//! extractor each authenticated handler takes.

/// Routes accessible without a token: health check, signup and signin.
pub mod public;

/// Movie and review routes. Every handler requires a valid `JWT` token.
pub mod authenticated;
