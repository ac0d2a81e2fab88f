//! The operon reconciliation engine.
//!
//! This crate contains the building blocks of a custom-resource operator:
//! a per-type [`Controller`] that serializes and coalesces watch events per
//! object, retries failed reconciliations with bounded backoff, and drives
//! the finalizer lifecycle; a watch session per (type, namespace, selector);
//! and the root [`Operator`] that owns registration, fan-out and shutdown.
//!
//! The Kubernetes API itself is reached through the injected [`Client`]
//! trait, so the engine can be exercised entirely in-process.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod controller;
pub mod operator;
pub mod queue;
pub mod retry;
pub mod tracker;
pub mod watcher;

pub use client::Client;
pub use controller::{Context, Controller, Reconciler};
pub use operator::{Operator, OperatorConfig};
pub use queue::Event;
pub use retry::RetryPolicy;

#[cfg(test)]
mod testing;
