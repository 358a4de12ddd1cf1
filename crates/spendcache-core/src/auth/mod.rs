//! Authentication boundary.
//!
//! Sign-in itself happens elsewhere; this module only tracks who is signed
//! in and clears cached expenses when they sign out.

pub mod session;

pub use session::{AuthStatus, Session};
