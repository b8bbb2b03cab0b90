//! Relay that forwards image uploads to a background-removal API, plus a
//! client that drives it.

pub mod client;
pub mod headers;
pub mod provider;
pub mod shutdown_signal;
pub mod upload;
pub mod web;
