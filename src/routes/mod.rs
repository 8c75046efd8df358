/// Router Module Index
///
/// Routes are split by access level so that the authentication layer is applied
/// once, at the module boundary, instead of per handler.

/// Pages anyone may read. A signed-in viewer is resolved when present.
pub mod public;

/// Mutations. Every route here sits behind the authentication middleware.
pub mod authenticated;
