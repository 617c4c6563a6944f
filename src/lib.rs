//! Client core for the registrar portal backend.
//!
//! This crate owns the credentialed API client (session cookie plus
//! anti-forgery token), the generic list/create state every collection view
//! shares, and the post-sign-in role routing. The `registrar` binary is a
//! thin command-line surface over these pieces.

pub mod auth;
pub mod config;
pub mod messages;
pub mod net;
pub mod state;
