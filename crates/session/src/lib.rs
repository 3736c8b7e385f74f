//! # Overview
//!
//! `session` implements the two halves of the protocol conversation: the
//! server state machine (spec §4.6, component `C6`) and its client
//! counterpart (spec §4.7, component `C7`). Both drive a [`wire::Channel`]
//! and are otherwise independent of how that channel was obtained -- the
//! `transport` collaborator supplies it.
//!
//! # Design
//!
//! Neither side retries or recovers mid-session (spec §7); every fallible
//! step propagates through `?` up to [`server::run_server`] or
//! [`client::run_client`], which are the only functions that catch errors
//! to report them to the peer or the local log.

pub mod client;
pub mod server;

pub use client::run_client;
pub use server::run_server;
