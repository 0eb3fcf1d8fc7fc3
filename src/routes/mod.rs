//! Router Module Index
//!
//! Routing is split by access level. The identity middleware runs over both
//! modules and attaches an identity without ever rejecting; the difference is
//! that handlers in `authenticated` take the `AuthUser` extractor, so the
//! authentication check fires before their bodies run, while `public`
//! handlers serve anonymous traffic too.

/// Routes open to anonymous callers: health, signup, login and the GraphQL
/// endpoint (whose per-operation auth rules live in the resolvers).
pub mod public;

/// Routes whose handlers demand a resolved identity via `AuthUser`.
pub mod authenticated;
