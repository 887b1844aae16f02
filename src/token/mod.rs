//! Access tokens and the bundle produced by a successful login.

mod access_token;
mod bundle;

pub use access_token::AccessToken;
pub use bundle::TokenBundle;
