//! Core types and identity-resolution logic for Linkage.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::ContactRepo`] and [`store::IdentityStore`]; the
//! resolution algorithm in [`resolve`] runs against any of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod error;
pub mod identify;
pub mod memory;
pub mod resolve;
pub mod store;

pub use error::{Error, Result};
