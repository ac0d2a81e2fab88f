//! A single long-lived watch session feeding one controller.
//!
//! The session deliberately does not reconnect: the operator exits non-zero
//! when a watch dies unexpectedly and the orchestrator restarts the process.
//! That keeps the engine simple and avoids split-brain behaviour on
//! persistent connectivity failures.
use crate::{
    client::{self, Client},
    controller::Controller,
    queue::Event,
};
use futures::StreamExt;
use operon_core::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Server-side watch session timeout. Sessions are reconnect-friendly on the
/// server, but restarting them is the orchestrator's job, not ours.
pub(crate) const WATCH_TIMEOUT_SECS: u32 = 3600;

#[derive(Debug, Error)]
/// Terminal failures of a watch session.
pub enum Error {
    /// The list+watch call could not be established
    #[error("failed to start watching {plural}: {source}")]
    WatchStartFailed {
        /// Plural name of the watched resource
        plural: String,
        /// Underlying client failure
        #[source]
        source: client::Error,
    },
    /// The established stream yielded an error
    #[error("watch stream for {plural} failed: {source}")]
    WatchFailed {
        /// Plural name of the watched resource
        plural: String,
        /// Underlying client failure
        #[source]
        source: client::Error,
    },
    /// The remote closed the stream while the operator was still running
    #[error("watch stream for {plural} closed unexpectedly")]
    StreamClosed {
        /// Plural name of the watched resource
        plural: String,
    },
}

/// One watch session per (resource type, namespace scope, label selector).
pub(crate) struct Watcher<K>
where
    K: Send + Sync,
{
    controller: Arc<Controller<K>>,
    namespace: Option<String>,
    label_selector: Option<String>,
    cancel: CancellationToken,
}

impl<K> Watcher<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(
        controller: Arc<Controller<K>>,
        namespace: Option<String>,
        label_selector: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            controller,
            namespace,
            label_selector,
            cancel,
        }
    }

    /// Drive the session until cancellation or stream death.
    ///
    /// Events are decoded and handed to the controller in arrival order; a
    /// payload that fails to decode is skipped, since the next event for the
    /// object re-delivers its full state.
    pub(crate) async fn run(self, client: Arc<dyn Client>) -> Result<(), Error> {
        let dr = self.controller.descriptor().clone();
        let selector = self.label_selector.as_deref();
        let mut stream = match &self.namespace {
            Some(ns) => {
                client
                    .watch_namespaced(&dr, ns, selector, WATCH_TIMEOUT_SECS, &self.cancel)
                    .await
            }
            None => {
                client
                    .watch_cluster(&dr, selector, WATCH_TIMEOUT_SECS, &self.cancel)
                    .await
            }
        }
        .map_err(|source| Error::WatchStartFailed {
            plural: dr.plural.clone(),
            source,
        })?;
        debug!(
            "watching {} in {}",
            dr.plural,
            self.namespace.as_deref().unwrap_or("all namespaces")
        );
        loop {
            let item = tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                item = stream.next() => item,
            };
            match item {
                None => {
                    if self.cancel.is_cancelled() {
                        return Ok(());
                    }
                    return Err(Error::StreamClosed {
                        plural: dr.plural.clone(),
                    });
                }
                Some(Err(source)) => {
                    if self.cancel.is_cancelled() {
                        return Ok(());
                    }
                    return Err(Error::WatchFailed {
                        plural: dr.plural.clone(),
                        source,
                    });
                }
                Some(Ok((event_type, raw))) => match serde_json::from_value::<K>(raw) {
                    Ok(object) => {
                        self.controller
                            .process_event(Event::new(event_type, object))
                            .await;
                    }
                    Err(err) => {
                        warn!("failed to decode {} watch payload: {err}", dr.plural);
                    }
                },
            }
        }
    }
}
