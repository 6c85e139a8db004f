// # Payload Renderer Trait
//
// Renders the bootstrap payload (instance user data) for one user.

use crate::identity::UserSpec;

/// Trait for bootstrap payload renderers
pub trait PayloadRenderer: Send + Sync {
    /// Render the payload for `user`
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The payload, passed verbatim as instance user data
    /// - `Err(Error)`: If rendering failed; the user is skipped
    fn render(&self, user: &UserSpec) -> Result<String, crate::Error>;
}
