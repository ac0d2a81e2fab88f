//! Runs user-supplied reconciliation hooks on objects when they change.
//!
//! One [`Controller`] owns the event flow for a single resource type: it
//! coalesces bursts through its [`EventQueue`], serializes work per object
//! uid, retries failed attempts under the configured [`RetryPolicy`] until a
//! newer event supersedes them, and drives the finalizer lifecycle so that
//! user cleanup always runs before Kubernetes garbage-collects an object.
use crate::{
    client::{self, Client},
    operator::OperatorConfig,
    queue::{Event, EventQueue},
    retry::RetryPolicy,
    tracker::ChangeTracker,
};
use async_trait::async_trait;
use operon_core::{Descriptor, EventType, Resource, ResourceExt};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::{marker::PhantomData, sync::Arc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

#[derive(Debug, Error)]
/// Failures surfaced while reconciling a single object.
pub enum Error {
    /// An API request issued by the engine or a hook failed
    #[error("api request failed: {0}")]
    Client(#[from] client::Error),
    /// User reconciliation logic failed
    #[error("reconcile hook failed: {0}")]
    Hook(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// An object could not be encoded or decoded
    #[error("failed to encode or decode object: {0}")]
    Serde(#[from] serde_json::Error),
    /// The object is missing a metadata field the engine relies on
    #[error("object is missing metadata.{0}")]
    MissingMetadata(&'static str),
    /// Cancellation was observed mid-reconcile
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap an arbitrary failure from user reconciliation logic.
    pub fn hook(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Hook(err.into())
    }

    fn is_conflict(&self) -> bool {
        matches!(self, Error::Client(e) if e.is_conflict())
    }
}

/// Convenient alias for reconciliation results
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// User-supplied reconciliation hooks for one resource type.
///
/// Both hooks default to no-ops, so a controller only interested in one side
/// of the lifecycle implements the other for free. Hooks must be idempotent:
/// they are re-invoked on retries, re-lists and controller restarts. They may
/// assume serial execution per object uid, but never across distinct uids,
/// and should honour `ctx.cancellation()` promptly.
#[async_trait]
pub trait Reconciler<K>: Send + Sync
where
    K: Send + Sync,
{
    /// Drive the actual state towards the desired state of `obj`.
    ///
    /// Only invoked on objects that already carry this controller's
    /// finalizer and whose generation has not been reconciled yet.
    async fn apply(&self, obj: &K, ctx: &Context<K>) -> Result<()> {
        let _ = (obj, ctx);
        Ok(())
    }

    /// Release everything owned on behalf of `obj`.
    ///
    /// Invoked when deletion is pending and this controller's finalizer is
    /// still present; the finalizer is removed only after this returns
    /// successfully.
    async fn cleanup(&self, obj: &K, ctx: &Context<K>) -> Result<()> {
        let _ = (obj, ctx);
        Ok(())
    }
}

#[async_trait]
impl<K, R> Reconciler<K> for Arc<R>
where
    K: Send + Sync,
    R: Reconciler<K> + ?Sized,
{
    async fn apply(&self, obj: &K, ctx: &Context<K>) -> Result<()> {
        self.as_ref().apply(obj, ctx).await
    }

    async fn cleanup(&self, obj: &K, ctx: &Context<K>) -> Result<()> {
        self.as_ref().cleanup(obj, ctx).await
    }
}

/// Capabilities handed to reconciliation hooks.
///
/// Status updates go through a merge patch of the `status` subresource so
/// they never race spec writes; spec or metadata changes go through a full
/// replace gated by the object's `resourceVersion`. The engine never mixes
/// the two.
pub struct Context<K> {
    client: Arc<dyn Client>,
    descriptor: Descriptor,
    cancel: CancellationToken,
    _resource: PhantomData<fn() -> K>,
}

impl<K> Context<K>
where
    K: Resource + Serialize + DeserializeOwned,
{
    fn new(client: Arc<dyn Client>, descriptor: Descriptor, cancel: CancellationToken) -> Self {
        Self {
            client,
            descriptor,
            cancel,
            _resource: PhantomData,
        }
    }

    /// The descriptor of the resource type this controller owns.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// The shutdown signal; hooks should return early once it fires.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Publish the status of `obj` via a merge patch of the `status`
    /// subresource, returning the updated object.
    pub async fn update_status(&self, obj: &K) -> Result<K> {
        let name = name_of(obj)?;
        let status = serde_json::to_value(obj)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);
        let patch = json!({ "status": status });
        let returned = match obj.namespace() {
            Some(ns) => {
                self.client
                    .patch_status_namespaced(&self.descriptor, &ns, &name, patch, None, &self.cancel)
                    .await?
            }
            None => {
                self.client
                    .patch_status_cluster(&self.descriptor, &name, patch, None, &self.cancel)
                    .await?
            }
        };
        Ok(serde_json::from_value(returned)?)
    }

    /// Replace `obj` in full, returning the object as persisted.
    ///
    /// The server rejects the write with a conflict if the object changed
    /// since `obj.metadata.resourceVersion` was observed.
    pub async fn replace(&self, obj: &K) -> Result<K> {
        let name = name_of(obj)?;
        let body = serde_json::to_value(obj)?;
        let returned = match obj.namespace() {
            Some(ns) => {
                self.client
                    .replace_namespaced(&self.descriptor, &ns, &name, body, &self.cancel)
                    .await?
            }
            None => {
                self.client
                    .replace_cluster(&self.descriptor, &name, body, &self.cancel)
                    .await?
            }
        };
        Ok(serde_json::from_value(returned)?)
    }
}

fn name_of<K: Resource>(obj: &K) -> Result<String> {
    obj.meta().name.clone().ok_or(Error::MissingMetadata("name"))
}

struct State<K> {
    queue: EventQueue<K>,
    tracker: ChangeTracker,
}

/// The reconciliation engine for one resource type.
///
/// Fed by a watch session through [`Controller::process_event`]; shared
/// state is confined to one mutex covering the event queue and the change
/// tracker, so every queue transition is atomic with respect to concurrent
/// deliveries.
pub struct Controller<K>
where
    K: Send + Sync,
{
    reconciler: Box<dyn Reconciler<K>>,
    context: Context<K>,
    retry_policy: RetryPolicy,
    state: Mutex<State<K>>,
    cancel: CancellationToken,
}

impl<K> Controller<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Build a controller around a reconciler and the shared operator config.
    pub fn new(
        client: Arc<dyn Client>,
        descriptor: Descriptor,
        reconciler: impl Reconciler<K> + 'static,
        config: &OperatorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context: Context::new(client, descriptor, cancel.clone()),
            reconciler: Box::new(reconciler),
            retry_policy: config.retry_policy.clone(),
            state: Mutex::new(State {
                queue: EventQueue::default(),
                tracker: ChangeTracker::new(config.discard_duplicate_generations),
            }),
            cancel,
        }
    }

    /// The descriptor of the resource type this controller owns.
    pub fn descriptor(&self) -> &Descriptor {
        self.context.descriptor()
    }

    /// Top-level entry invoked by the watch session for every delivered
    /// event. Never fails; errors are classified and logged internally.
    pub async fn process_event(&self, event: Event<K>) {
        match event.event_type {
            EventType::Error => {
                warn!(
                    "error event received on {} watch stream",
                    self.descriptor().plural
                );
                return;
            }
            // Deletion is driven by the deletionTimestamp observed on
            // Modified events; Deleted only confirms the object is gone, and
            // bookmarks carry no payload.
            EventType::Deleted | EventType::Bookmark => return,
            EventType::Added | EventType::Modified => {}
        }
        let Some(uid) = event.uid() else {
            warn!(
                "discarding {} event without object uid",
                self.descriptor().plural
            );
            return;
        };
        self.state.lock().queue.insert(&uid, event);
        // Drain until the slot is empty: an event arriving mid-reconcile is
        // picked up by whichever caller finishes the current one.
        while !self.cancel.is_cancelled() {
            let next = {
                let mut state = self.state.lock();
                // claiming the slot and marking it in-flight must be one
                // atomic step, or two deliveries could reconcile the same
                // uid concurrently
                match state.queue.take(&uid) {
                    Some(event) => {
                        state.queue.begin_handling(&uid);
                        Some(event)
                    }
                    None => None,
                }
            };
            let Some(next) = next else { break };
            self.handle_event(&uid, &next).await;
            self.state.lock().queue.end_handling(&uid);
        }
    }

    /// Reconcile one event, retrying under the policy until it is handled,
    /// superseded, cancelled or out of attempts.
    async fn handle_event(&self, uid: &str, event: &Event<K>) {
        let span = info_span!(
            "reconciling object",
            object.uid = %uid,
            object.event = %event.event_type,
        );
        async {
            let mut attempt = 1;
            loop {
                if self.try_handle(event).await {
                    break;
                }
                if !self.can_retry(uid, attempt) {
                    break;
                }
                let delay = self.retry_policy.delay_for(attempt);
                tokio::select! {
                    () = self.cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
                // an event that arrived during the backoff supersedes this one
                if self.state.lock().queue.peek(uid).is_some() {
                    debug!("newer event arrived during backoff, dropping retry");
                    break;
                }
                attempt += 1;
            }
        }
        .instrument(span)
        .await;
    }

    fn can_retry(&self, uid: &str, attempt: u32) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.state.lock().queue.peek(uid).is_some() {
            debug!("newer event pending, retrying the old one is wasted work");
            return false;
        }
        attempt < self.retry_policy.max_attempts
    }

    /// One reconciliation attempt. True when the event counts as handled,
    /// which includes the outcomes that must not be retried.
    async fn try_handle(&self, event: &Event<K>) -> bool {
        match self.reconcile(&event.object).await {
            Ok(()) => true,
            Err(Error::Cancelled) => true,
            Err(err) if err.is_conflict() => {
                // the next watch event carries the winning object and
                // reconciling it converges without a retry here
                debug!("conflict during reconciliation: {err}");
                true
            }
            Err(err) => {
                error!("reconciliation attempt failed: {err}");
                false
            }
        }
    }

    async fn reconcile(&self, obj: &K) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let uid = obj.uid().ok_or(Error::MissingMetadata("uid"))?;
        let finalizer = self.descriptor().finalizer.clone();
        if obj.is_being_deleted() {
            if !obj.has_finalizer(&finalizer) {
                // deletion is gated by someone else's finalizer, or by none
                return Ok(());
            }
            self.reconciler.cleanup(obj, &self.context).await?;
            self.state.lock().tracker.track_deleted(&uid);
            let mut released = obj.clone();
            released.finalizers_mut().retain(|f| f != &finalizer);
            self.context.replace(&released).await?;
            debug!("released finalizer after cleanup");
            Ok(())
        } else {
            if !obj.has_finalizer(&finalizer) {
                // Install the finalizer before any user logic runs, so that
                // deletion can never outrun cleanup. The write comes back as
                // a Modified event which re-enters with the finalizer set.
                let mut claimed = obj.clone();
                claimed.finalizers_mut().push(finalizer);
                self.context.replace(&claimed).await?;
                return Ok(());
            }
            if self
                .state
                .lock()
                .tracker
                .is_already_handled(&uid, obj.generation())
            {
                debug!("generation already reconciled, skipping");
                return Ok(());
            }
            self.reconciler.apply(obj, &self.context).await?;
            self.state.lock().tracker.track_handled(&uid, obj.generation());
            Ok(())
        }
    }

    #[cfg(test)]
    fn is_tracked(&self, uid: &str) -> bool {
        self.state.lock().tracker.is_tracked(uid)
    }

    #[cfg(test)]
    fn is_idle(&self, uid: &str) -> bool {
        let state = self.state.lock();
        !state.queue.is_handling(uid) && state.queue.peek(uid).is_none()
    }
}
