//! Root registration and lifecycle for a set of controllers.
//!
//! An [`Operator`] is constructed once, has controllers registered against
//! it, and is then started exactly once. Every watch session runs as its own
//! task and all of them are joined explicitly, so no failure can disappear
//! into a detached future. The operator owns the only cancellation source;
//! watchers, controllers and user hooks observe it read-only.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use operon_core::{Descriptor, DynamicObject};
//! use operon_runtime::{controller, Context, Operator, OperatorConfig, Reconciler};
//! use std::sync::Arc;
//!
//! struct DocumentReconciler;
//!
//! #[async_trait]
//! impl Reconciler<DynamicObject> for DocumentReconciler {
//!     async fn apply(
//!         &self,
//!         _obj: &DynamicObject,
//!         _ctx: &Context<DynamicObject>,
//!     ) -> controller::Result<()> {
//!         // converge external state here, then publish status via _ctx
//!         Ok(())
//!     }
//! }
//!
//! # async fn run(client: Arc<dyn operon_runtime::Client>) -> Result<(), Box<dyn std::error::Error>> {
//! let operator = Operator::new(client, OperatorConfig::default().within("library"));
//! operator.add_controller::<DynamicObject, _>(
//!     Descriptor::new("example.dev", "v1", "documents"),
//!     DocumentReconciler,
//! )?;
//! let code = operator.start().await?;
//! std::process::exit(code);
//! # }
//! ```
use crate::{
    client::Client,
    controller::{Controller, Reconciler},
    retry::RetryPolicy,
    watcher::Watcher,
};
use futures::{future::BoxFuture, FutureExt};
use operon_core::{Descriptor, Resource};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Exit code for a clean shutdown.
pub const EXIT_CLEAN: i32 = 0;
/// Exit code signalling that a watch session died unexpectedly.
pub const EXIT_WATCH_FAILURE: i32 = 1;

#[derive(Debug, Error)]
/// Registration and lifecycle misuse, surfaced to the caller instead of
/// crashing the process.
pub enum Error {
    /// A controller was registered after the operator left its initial state
    #[error("controllers can only be registered before the operator starts")]
    RegistrationAfterStart,
    /// The operator was started more than once, or after being stopped
    #[error("the operator can only be started once")]
    AlreadyStarted,
    /// The registered descriptor is unusable
    #[error("descriptor is missing its {0}")]
    InvalidDescriptor(&'static str),
}

/// Options shared by every watcher and controller of an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// Restrict all watches to one namespace; `None` watches cluster-wide
    pub namespace: Option<String>,
    /// Label selector passed through verbatim to every watch
    pub label_selector: Option<String>,
    /// Retry policy applied to every reconciliation
    pub retry_policy: RetryPolicy,
    /// Skip `Modified` events whose generation was already reconciled
    pub discard_duplicate_generations: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            label_selector: None,
            retry_policy: RetryPolicy::default(),
            discard_duplicate_generations: true,
        }
    }
}

impl OperatorConfig {
    /// Watch a single namespace instead of the whole cluster.
    #[must_use]
    pub fn within(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Restrict watches by a label selector, passed through verbatim.
    ///
    /// Supports `=`, `==`, `!=`, and can be comma separated: `key1=value1,key2=value2`.
    #[must_use]
    pub fn labels(mut self, selector: &str) -> Self {
        self.label_selector = Some(selector.to_string());
        self
    }

    /// Replace the default single-attempt retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Reconcile every event even when its generation was already processed.
    ///
    /// Controllers that update status on their own objects will see their
    /// writes echoed back as `Modified` events with this enabled.
    #[must_use]
    pub fn keep_duplicate_generations(mut self) -> Self {
        self.discard_duplicate_generations = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    New,
    Running,
    Stopping,
    Stopped,
}

struct Registration {
    group: String,
    version: String,
    plural: String,
    task: BoxFuture<'static, Result<(), crate::watcher::Error>>,
}

/// Owns a set of controllers and the watch sessions that feed them.
pub struct Operator {
    client: Arc<dyn Client>,
    config: OperatorConfig,
    cancel: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
    registrations: Mutex<Vec<Registration>>,
}

impl Operator {
    /// An operator around an injected API client.
    pub fn new(client: Arc<dyn Client>, config: OperatorConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::New),
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Register a controller for one resource type.
    ///
    /// Allowed only before [`Operator::start`]. Registering the same
    /// (group, version, plural) again is a no-op, so hosts can call this
    /// from idempotent setup paths.
    pub fn add_controller<K, R>(&self, descriptor: Descriptor, reconciler: R) -> Result<(), Error>
    where
        K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
        R: Reconciler<K> + 'static,
    {
        if descriptor.version.is_empty() {
            return Err(Error::InvalidDescriptor("version"));
        }
        if descriptor.plural.is_empty() {
            return Err(Error::InvalidDescriptor("plural"));
        }
        if descriptor.finalizer.is_empty() {
            return Err(Error::InvalidDescriptor("finalizer"));
        }
        if *self.lifecycle.lock() != Lifecycle::New {
            return Err(Error::RegistrationAfterStart);
        }
        let mut registrations = self.registrations.lock();
        if registrations.iter().any(|r| {
            r.group == descriptor.group
                && r.version == descriptor.version
                && r.plural == descriptor.plural
        }) {
            debug!("controller for {} already registered", descriptor.plural);
            return Ok(());
        }
        let controller = Arc::new(Controller::new(
            self.client.clone(),
            descriptor.clone(),
            reconciler,
            &self.config,
            self.cancel.clone(),
        ));
        let watcher = Watcher::new(
            controller,
            self.config.namespace.clone(),
            self.config.label_selector.clone(),
            self.cancel.clone(),
        );
        let task = watcher.run(self.client.clone()).boxed();
        registrations.push(Registration {
            group: descriptor.group,
            version: descriptor.version,
            plural: descriptor.plural,
            task,
        });
        Ok(())
    }

    /// Run every registered watcher to completion.
    ///
    /// Returns [`EXIT_CLEAN`] after a clean shutdown (or immediately when
    /// nothing was registered), and [`EXIT_WATCH_FAILURE`] iff any watch
    /// session terminated unexpectedly while the operator was running. A
    /// failed watcher triggers shutdown of all the others.
    pub async fn start(&self) -> Result<i32, Error> {
        {
            let mut lifecycle = self.lifecycle.lock();
            match *lifecycle {
                Lifecycle::New => *lifecycle = Lifecycle::Running,
                _ => return Err(Error::AlreadyStarted),
            }
        }
        let registrations = std::mem::take(&mut *self.registrations.lock());
        if registrations.is_empty() {
            *self.lifecycle.lock() = Lifecycle::Stopped;
            return Ok(EXIT_CLEAN);
        }
        info!("starting {} watcher(s)", registrations.len());
        let mut tasks = JoinSet::new();
        for registration in registrations {
            let name = format!(
                "{}/{}/{}",
                registration.group, registration.version, registration.plural
            );
            let task = registration.task;
            tasks.spawn(async move { (name, task.await) });
        }
        let mut unexpected = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(err))) => {
                    if *self.lifecycle.lock() == Lifecycle::Running {
                        error!("watcher for {name} terminated unexpectedly: {err}");
                        unexpected = true;
                        self.stop();
                    } else {
                        debug!("watcher for {name} terminated during shutdown: {err}");
                    }
                }
                Err(err) => {
                    error!("watcher task failed: {err}");
                    unexpected = true;
                    self.stop();
                }
            }
        }
        // in-flight reconciliations must not outlive the watchers
        self.cancel.cancel();
        *self.lifecycle.lock() = Lifecycle::Stopped;
        Ok(if unexpected {
            EXIT_WATCH_FAILURE
        } else {
            EXIT_CLEAN
        })
    }

    /// Request shutdown: cancels every watch session, backoff sleep and
    /// in-flight user hook. Idempotent; the operator cannot be restarted.
    pub fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            match *lifecycle {
                Lifecycle::New => *lifecycle = Lifecycle::Stopped,
                Lifecycle::Running => *lifecycle = Lifecycle::Stopping,
                Lifecycle::Stopping | Lifecycle::Stopped => return,
            }
        }
        info!("operator stopping");
        self.cancel.cancel();
    }
}

impl Drop for Operator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
