//! The injected Kubernetes API seam.
//!
//! The engine never talks HTTP itself; a host application supplies an
//! implementation of [`Client`] backed by its API machinery of choice. The
//! split between cluster and namespaced operations mirrors the two endpoint
//! families of the apiserver.
use async_trait::async_trait;
use futures::stream::BoxStream;
use operon_core::{Descriptor, ErrorResponse, EventType};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
/// Errors surfaced by a [`Client`] implementation.
pub enum Error {
    /// The apiserver answered with a structured error status
    #[error("error returned by apiserver: {0}")]
    Api(#[source] ErrorResponse),
    /// The request never produced an answer
    #[error("failed to reach apiserver: {0}")]
    Connection(String),
    /// An established watch stream broke mid-flight
    #[error("watch stream failed: {0}")]
    Stream(String),
}

impl Error {
    /// True when the error is a `409 Conflict` from optimistic concurrency.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_conflict())
    }
}

/// Convenient alias for client results
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single decoded line from a watch response: the event discriminant and
/// the raw object payload.
pub type RawEvent = (EventType, Value);

/// The stream handed back by a watch call.
pub type WatchStream = BoxStream<'static, Result<RawEvent>>;

/// Operations the engine requires from the Kubernetes API.
///
/// Implementations must surface HTTP status codes through
/// [`Error::Api`] so the controller can classify conflicts. All calls
/// observe the passed cancellation token; a cancelled call may return any
/// error.
#[async_trait]
pub trait Client: Send + Sync {
    /// Open a combined list+watch session against the cluster-wide endpoint.
    async fn watch_cluster(
        &self,
        dr: &Descriptor,
        label_selector: Option<&str>,
        timeout_secs: u32,
        cancel: &CancellationToken,
    ) -> Result<WatchStream>;

    /// Open a combined list+watch session against a single namespace.
    async fn watch_namespaced(
        &self,
        dr: &Descriptor,
        namespace: &str,
        label_selector: Option<&str>,
        timeout_secs: u32,
        cancel: &CancellationToken,
    ) -> Result<WatchStream>;

    /// Replace a cluster-scoped object in full, relying on its
    /// `resourceVersion` for optimistic concurrency.
    async fn replace_cluster(
        &self,
        dr: &Descriptor,
        name: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value>;

    /// Replace a namespaced object in full.
    async fn replace_namespaced(
        &self,
        dr: &Descriptor,
        namespace: &str,
        name: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value>;

    /// Apply an RFC 7396 merge patch to the `status` subresource of a
    /// cluster-scoped object.
    async fn patch_status_cluster(
        &self,
        dr: &Descriptor,
        name: &str,
        merge_patch: Value,
        field_manager: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value>;

    /// Apply an RFC 7396 merge patch to the `status` subresource of a
    /// namespaced object.
    async fn patch_status_namespaced(
        &self,
        dr: &Descriptor,
        namespace: &str,
        name: &str,
        merge_patch: Value,
        field_manager: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value>;
}
