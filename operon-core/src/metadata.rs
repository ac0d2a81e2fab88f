//! Metadata structs flattened into every custom resource.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type information that is flattened into every kubernetes object
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// The version of the API
    pub api_version: String,

    /// The name of the API
    pub kind: String,
}

/// The subset of standard object metadata the runtime relies on.
///
/// Every field is optional on the wire; objects handed out by the apiserver
/// will in practice always carry `name`, `uid` and `resourceVersion`.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// The unique name of this object within its namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The namespace the object lives in, absent for cluster-scoped objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Server-assigned identifier, stable for the lifetime of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Opaque version token used for optimistic concurrency on writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    /// Monotonically non-decreasing counter, bumped by the apiserver on every
    /// spec change (status writes leave it untouched)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,

    /// Set by the apiserver when deletion has been requested; the object is
    /// preserved until all finalizers are removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,

    /// Tokens that gate garbage collection of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalizers: Option<Vec<String>>,

    /// Object labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Object annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod test {
    use super::ObjectMeta;

    #[test]
    fn deserializes_sparse_metadata() {
        let meta: ObjectMeta = serde_json::from_value(serde_json::json!({
            "name": "doc",
            "uid": "6d2f9446",
            "generation": 3,
        }))
        .unwrap();
        assert_eq!(meta.name.as_deref(), Some("doc"));
        assert_eq!(meta.generation, Some(3));
        assert!(meta.namespace.is_none());
        assert!(meta.finalizers.is_none());
    }

    #[test]
    fn serializes_without_absent_fields() {
        let meta = ObjectMeta {
            name: Some("doc".into()),
            ..ObjectMeta::default()
        };
        let val = serde_json::to_value(&meta).unwrap();
        assert_eq!(val, serde_json::json!({"name": "doc"}));
    }

    #[test]
    fn camel_case_round_trip() {
        let meta: ObjectMeta = serde_json::from_value(serde_json::json!({
            "name": "doc",
            "resourceVersion": "12",
            "deletionTimestamp": "2026-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(meta.resource_version.as_deref(), Some("12"));
        let val = serde_json::to_value(&meta).unwrap();
        assert!(val.get("deletionTimestamp").is_some());
        assert!(val.get("deletion_timestamp").is_none());
    }
}
