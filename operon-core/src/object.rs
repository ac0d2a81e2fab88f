//! Generic custom resource wrappers.
use crate::{
    metadata::{ObjectMeta, TypeMeta},
    resource::Resource,
};
use serde::{Deserialize, Serialize};

/// A standard custom resource with `.spec` and `.status`.
///
/// `P` and `U` are the user-declared spec and status shapes. Both are
/// optional on the wire: freshly created objects may carry no status, and
/// some resource kinds have no spec at all.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Object<P, U> {
    /// The type fields, not always present
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,

    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// The desired state of the resource as specified by the user
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub spec: Option<P>,

    /// The state of the resource as observed by the controller
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub status: Option<U>,
}

impl<P, U> Object<P, U> {
    /// A named object around a spec, with empty metadata otherwise
    pub fn new(name: &str, spec: P) -> Self {
        Self {
            types: None,
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            spec: Some(spec),
            status: None,
        }
    }

    /// Attach a namespace to an Object
    #[must_use]
    pub fn within(mut self, ns: &str) -> Self {
        self.metadata.namespace = Some(ns.to_string());
        self
    }
}

impl<P, U> Resource for Object<P, U> {
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// A custom resource whose spec and status are arbitrary JSON trees.
///
/// This is the registration variant for types not known at compile time; the
/// typed path never sees it.
pub type DynamicObject = Object<serde_json::Value, serde_json::Value>;

/// Empty struct for when data should be discarded
///
/// Not using [`()`](https://doc.rust-lang.org/stable/std/primitive.unit.html), because serde's
/// [`Deserialize`](serde::Deserialize) `impl` is too strict.
#[derive(Clone, Deserialize, Serialize, Default, Debug)]
pub struct NotUsed {}

#[cfg(test)]
mod test {
    use super::{DynamicObject, NotUsed, Object};
    use crate::resource::ResourceExt;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Deserialize, Serialize)]
    struct DocumentSpec {
        title: String,
    }

    type Document = Object<DocumentSpec, NotUsed>;

    #[test]
    fn typed_object_round_trip() {
        let raw = serde_json::json!({
            "apiVersion": "example.dev/v1",
            "kind": "Document",
            "metadata": {
                "name": "readme",
                "namespace": "library",
                "uid": "u-1",
                "generation": 4,
                "finalizers": ["operon.dev/reconcile"],
            },
            "spec": { "title": "hello" },
        });
        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.spec.as_ref().unwrap().title, "hello");
        assert_eq!(doc.uid().as_deref(), Some("u-1"));
        assert!(doc.has_finalizer("operon.dev/reconcile"));
        assert!(!doc.is_being_deleted());
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn dynamic_object_keeps_arbitrary_payload() {
        let obj: DynamicObject = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "anything", "uid": "u-2" },
            "spec": { "nested": { "values": [1, 2, 3] } },
            "status": "free-form",
        }))
        .unwrap();
        assert_eq!(obj.spec.as_ref().unwrap()["nested"]["values"][2], 3);
        assert_eq!(obj.status.as_ref().unwrap(), "free-form");
    }

    #[test]
    fn constructor_sets_namespace() {
        let doc = Document::new(
            "readme",
            DocumentSpec {
                title: "t".to_string(),
            },
        )
        .within("library");
        assert_eq!(doc.namespace().as_deref(), Some("library"));
    }
}
