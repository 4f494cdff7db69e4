//! Blockchain network access.
//!
//! `base` defines the client trait and the signing/transaction types, `rest`
//! implements it against a fullnode-style JSON API, and `mock` provides a
//! scripted client for tests.
pub mod base;
pub mod mock;
pub mod rest;
