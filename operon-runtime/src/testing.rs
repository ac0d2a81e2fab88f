//! In-process fixtures shared by the engine tests: a recording mock client
//! and a scriptable reconciler.
use crate::{
    client::{self, Client, WatchStream},
    controller::{Context, Error, Reconciler, Result},
    queue::Event,
};
use async_trait::async_trait;
use operon_core::{Descriptor, DynamicObject, EventType, ResourceExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

pub(crate) fn descriptor() -> Descriptor {
    Descriptor::new("example.dev", "v1", "documents")
}

pub(crate) fn doc(uid: &str, generation: i64, finalizers: &[&str]) -> DynamicObject {
    serde_json::from_value(serde_json::json!({
        "apiVersion": "example.dev/v1",
        "kind": "Document",
        "metadata": {
            "name": format!("doc-{uid}"),
            "namespace": "library",
            "uid": uid,
            "generation": generation,
            "resourceVersion": "1",
            "finalizers": finalizers,
        },
        "spec": { "title": "hello" },
    }))
    .unwrap()
}

pub(crate) fn deleted_doc(uid: &str, generation: i64, finalizers: &[&str]) -> DynamicObject {
    let mut obj = doc(uid, generation, finalizers);
    obj.metadata.deletion_timestamp = Some("2026-01-01T00:00:00Z".to_string());
    obj
}

pub(crate) fn added(obj: DynamicObject) -> Event<DynamicObject> {
    Event::new(EventType::Added, obj)
}

pub(crate) fn modified(obj: DynamicObject) -> Event<DynamicObject> {
    Event::new(EventType::Modified, obj)
}

/// A [`Client`] that records every mutation and hands out scripted watch
/// streams. Replace calls echo their body back, like a server accepting the
/// write verbatim.
#[derive(Default)]
pub(crate) struct MockClient {
    pub replaced: Mutex<Vec<(Option<String>, String, Value)>>,
    pub patched: Mutex<Vec<(Option<String>, String, Value)>>,
    pub replace_errors: Mutex<VecDeque<client::Error>>,
    streams: Mutex<VecDeque<WatchStream>>,
}

impl MockClient {
    pub fn push_stream(&self, stream: WatchStream) {
        self.streams.lock().push_back(stream);
    }

    pub fn fail_next_replace(&self, err: client::Error) {
        self.replace_errors.lock().push_back(err);
    }

    fn next_stream(&self) -> client::Result<WatchStream> {
        self.streams
            .lock()
            .pop_front()
            .ok_or_else(|| client::Error::Connection("no watch stream queued".to_string()))
    }

    fn record_replace(
        &self,
        namespace: Option<String>,
        name: &str,
        body: Value,
    ) -> client::Result<Value> {
        if let Some(err) = self.replace_errors.lock().pop_front() {
            return Err(err);
        }
        self.replaced
            .lock()
            .push((namespace, name.to_string(), body.clone()));
        Ok(body)
    }
}

#[async_trait]
impl Client for MockClient {
    async fn watch_cluster(
        &self,
        _dr: &Descriptor,
        _label_selector: Option<&str>,
        _timeout_secs: u32,
        _cancel: &CancellationToken,
    ) -> client::Result<WatchStream> {
        self.next_stream()
    }

    async fn watch_namespaced(
        &self,
        _dr: &Descriptor,
        _namespace: &str,
        _label_selector: Option<&str>,
        _timeout_secs: u32,
        _cancel: &CancellationToken,
    ) -> client::Result<WatchStream> {
        self.next_stream()
    }

    async fn replace_cluster(
        &self,
        _dr: &Descriptor,
        name: &str,
        body: Value,
        _cancel: &CancellationToken,
    ) -> client::Result<Value> {
        self.record_replace(None, name, body)
    }

    async fn replace_namespaced(
        &self,
        _dr: &Descriptor,
        namespace: &str,
        name: &str,
        body: Value,
        _cancel: &CancellationToken,
    ) -> client::Result<Value> {
        self.record_replace(Some(namespace.to_string()), name, body)
    }

    async fn patch_status_cluster(
        &self,
        _dr: &Descriptor,
        name: &str,
        merge_patch: Value,
        _field_manager: Option<&str>,
        _cancel: &CancellationToken,
    ) -> client::Result<Value> {
        self.patched
            .lock()
            .push((None, name.to_string(), merge_patch.clone()));
        Ok(merge_patch)
    }

    async fn patch_status_namespaced(
        &self,
        _dr: &Descriptor,
        namespace: &str,
        name: &str,
        merge_patch: Value,
        _field_manager: Option<&str>,
        _cancel: &CancellationToken,
    ) -> client::Result<Value> {
        self.patched
            .lock()
            .push((Some(namespace.to_string()), name.to_string(), merge_patch.clone()));
        Ok(merge_patch)
    }
}

/// A [`Reconciler`] that records invocations and fails or stalls on cue.
#[derive(Default)]
pub(crate) struct RecordingReconciler {
    pub applied: Mutex<Vec<(String, Option<i64>)>>,
    pub cleaned: Mutex<Vec<String>>,
    pub apply_errors: Mutex<VecDeque<Error>>,
    pub cleanup_errors: Mutex<VecDeque<Error>>,
    pub apply_delay: Mutex<Option<Duration>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

#[async_trait]
impl Reconciler<DynamicObject> for RecordingReconciler {
    async fn apply(&self, obj: &DynamicObject, _ctx: &Context<DynamicObject>) -> Result<()> {
        let live = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(live, Ordering::SeqCst);
        self.applied
            .lock()
            .push((obj.uid().unwrap_or_default(), obj.generation()));
        let delay = *self.apply_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(err) = self.apply_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(())
    }

    async fn cleanup(&self, obj: &DynamicObject, _ctx: &Context<DynamicObject>) -> Result<()> {
        self.cleaned.lock().push(obj.uid().unwrap_or_default());
        if let Some(err) = self.cleanup_errors.lock().pop_front() {
            return Err(err);
        }
        Ok(())
    }
}
