//! JWT verification for externally-minted identities.

pub mod jwt;
