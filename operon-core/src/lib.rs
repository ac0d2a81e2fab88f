//! Core types for building Kubernetes operators with operon.
//!
//! This crate contains the wire-facing building blocks shared by the runtime:
//! object metadata, the generic [`Object`] custom resource shape (typed and
//! dynamic), the [`Descriptor`] that ties a resource type to its API group,
//! and the watch event vocabulary.
//!
//! Nothing in here performs I/O; the reconciliation engine lives in
//! `operon-runtime`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod descriptor;
pub use descriptor::{Descriptor, InvalidFinalizerError, DEFAULT_FINALIZER};

mod error;
pub use error::ErrorResponse;

pub mod metadata;
pub use metadata::{ObjectMeta, TypeMeta};

pub mod object;
pub use object::{DynamicObject, NotUsed, Object};

mod resource;
pub use resource::{Resource, ResourceExt};

pub mod watch;
pub use watch::EventType;
