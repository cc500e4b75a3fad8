//! Built-in IP resolution strategies
//!
//! Strategies that need a network client of their own live in separate
//! crates (`dnsync-ip-http`); this module holds the ones whose logic is
//! provider-independent.

pub mod cloud;

pub use cloud::{CloudInstanceResolver, parse_instance_id};
