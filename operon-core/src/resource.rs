use crate::metadata::ObjectMeta;

/// An accessor trait for a custom resource.
///
/// Implemented by [`Object`](crate::Object) and by any user struct that
/// exposes standard `metadata`. The runtime only ever touches resources
/// through this seam.
pub trait Resource {
    /// Metadata that all persisted resources must have
    fn meta(&self) -> &ObjectMeta;
    /// Metadata that all persisted resources must have
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

/// Helper methods for resources.
pub trait ResourceExt: Resource {
    /// The name of the resource, or an empty string when unset
    fn name_any(&self) -> String;
    /// The namespace the resource is in
    fn namespace(&self) -> Option<String>;
    /// Unique server-assigned ID, stable for the object's lifetime
    fn uid(&self) -> Option<String>;
    /// The spec generation assigned by the apiserver
    fn generation(&self) -> Option<i64>;
    /// The resource version
    fn resource_version(&self) -> Option<String>;
    /// Returns resource finalizers
    fn finalizers(&self) -> &[String];
    /// Provides mutable access to the finalizers
    fn finalizers_mut(&mut self) -> &mut Vec<String>;
    /// True when `name` is present in the finalizer list
    fn has_finalizer(&self, name: &str) -> bool;
    /// True when the apiserver has marked the object for deletion
    fn is_being_deleted(&self) -> bool;
}

impl<K: Resource> ResourceExt for K {
    fn name_any(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    fn uid(&self) -> Option<String> {
        self.meta().uid.clone()
    }

    fn generation(&self) -> Option<i64> {
        self.meta().generation
    }

    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }

    fn finalizers(&self) -> &[String] {
        self.meta().finalizers.as_deref().unwrap_or_default()
    }

    fn finalizers_mut(&mut self) -> &mut Vec<String> {
        self.meta_mut().finalizers.get_or_insert_with(Vec::new)
    }

    fn has_finalizer(&self, name: &str) -> bool {
        self.finalizers().iter().any(|f| f == name)
    }

    fn is_being_deleted(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }
}
