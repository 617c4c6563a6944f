//! Client-side state: collections, identity, and what persists between runs.
//!
//! SYSTEM CONTEXT
//! ==============
//! `resource` backs every list/create view, `identity` gates admin-only
//! commands, and `store` keeps the identity and session cookies on disk.

pub mod identity;
pub mod resource;
pub mod store;
