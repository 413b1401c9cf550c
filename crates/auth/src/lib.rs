//! Bearer-credential verification for the gateway.
//!
//! Riverboat consumes verified identities; it does not issue them.
//! [`Verifier`] validates tokens signed by the external issuance
//! service and yields [`Claims`] carrying the authenticated player id,
//! display name, and role grants.

mod claims;
mod crypto;

pub use claims::*;
pub use crypto::*;
