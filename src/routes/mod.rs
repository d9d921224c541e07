/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level via Axum layers,
/// so a route's authorization requirements are visible at wiring time and a
/// protected endpoint cannot be exposed by accident.
///
/// The three modules map directly to the route allow-lists.

/// Routes accessible to all callers, anonymous included. The identity
/// resolver still runs on these (a signed-in caller keeps their identity),
/// but nothing here requires one.
pub mod public;

/// Routes gated on the member allow-list (user, moderator, admin).
/// Payload-dependent ownership checks happen inside the handlers.
pub mod authenticated;

/// Routes restricted exclusively to the admin role.
pub mod admin;
