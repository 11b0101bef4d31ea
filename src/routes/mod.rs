/// Router Module Index
///
/// Splits the HTTP surface by access level. Access control is applied at the module
/// level (via Axum layers) so a protected endpoint cannot be exposed by accident.

/// Routes accessible to every client, with or without a session.
/// The navigation endpoint evaluates the session itself.
pub mod public;

/// Routes protected by the `AuthSession` middleware.
/// Requires a session the Auth Oracle accepts.
pub mod authenticated;
