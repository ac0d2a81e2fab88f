//! Registration-time type information for a custom resource.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Finalizer written by the runtime when a resource type does not declare its own.
pub const DEFAULT_FINALIZER: &str = "operon.dev/reconcile";

#[derive(Debug, Error)]
#[error("invalid finalizer name: {0}")]
/// The finalizer was empty or not a DNS subdomain (optionally `domain/name`).
pub struct InvalidFinalizerError(pub String);

/// Core information about a custom resource type.
///
/// Constructed once per type at registration and immutable afterwards. The
/// `finalizer` is the token this controller writes into `metadata.finalizers`
/// to gate deletion of objects of this type.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// API group, empty for the core group
    pub group: String,
    /// Version
    pub version: String,
    /// Plural resource name used in API paths
    pub plural: String,
    /// Finalizer owned by this controller
    pub finalizer: String,
}

impl Descriptor {
    /// Construct from explicit group, version and plural, with the framework
    /// default finalizer.
    pub fn new(group: &str, version: &str, plural: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            plural: plural.to_string(),
            finalizer: DEFAULT_FINALIZER.to_string(),
        }
    }

    /// Replace the default finalizer with one owned by the calling operator.
    ///
    /// The name must be a non-empty DNS subdomain, optionally qualified as
    /// `domain/name` like the conventional controller finalizers.
    pub fn finalizer(mut self, name: &str) -> Result<Self, InvalidFinalizerError> {
        if !is_valid_finalizer(name) {
            return Err(InvalidFinalizerError(name.to_string()));
        }
        self.finalizer = name.to_string();
        Ok(self)
    }

    /// Generate the apiVersion string used in this kind's yaml
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// The url path for requests against this resource, for URL-building
    /// client implementations
    pub fn url_path(&self, namespace: Option<&str>) -> String {
        let namespaces = namespace
            .map(|ns| format!("namespaces/{ns}/"))
            .unwrap_or_default();
        let root = if self.group.is_empty() { "api" } else { "apis" };
        format!("/{root}/{}/{namespaces}{}", self.api_version(), self.plural)
    }
}

fn is_valid_finalizer(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    let mut parts = name.splitn(2, '/');
    let domain = parts.next().unwrap_or_default();
    let suffix = parts.next();
    let label_ok = |label: &str| {
        !label.is_empty()
            && label.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
            && label.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    };
    if !domain.split('.').all(label_ok) {
        return false;
    }
    match suffix {
        // Qualified names allow mixed case after the slash
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        }
        None => true,
    }
}

#[cfg(test)]
mod test {
    use super::{Descriptor, DEFAULT_FINALIZER};

    #[test]
    fn api_version_rendering() {
        let dr = Descriptor::new("example.dev", "v1", "documents");
        assert_eq!(dr.api_version(), "example.dev/v1");
        let core = Descriptor::new("", "v1", "configmaps");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn url_paths_for_both_scopes() {
        let dr = Descriptor::new("example.dev", "v1", "documents");
        assert_eq!(
            dr.url_path(Some("library")),
            "/apis/example.dev/v1/namespaces/library/documents"
        );
        assert_eq!(dr.url_path(None), "/apis/example.dev/v1/documents");
        let core = Descriptor::new("", "v1", "configmaps");
        assert_eq!(core.url_path(None), "/api/v1/configmaps");
    }

    #[test]
    fn default_finalizer_applies() {
        let dr = Descriptor::new("example.dev", "v1", "documents");
        assert_eq!(dr.finalizer, DEFAULT_FINALIZER);
    }

    #[test]
    fn finalizer_validation() {
        let dr = Descriptor::new("example.dev", "v1", "documents");
        let ok = dr.clone().finalizer("example.dev/cleanup").unwrap();
        assert_eq!(ok.finalizer, "example.dev/cleanup");
        assert!(dr.clone().finalizer("").is_err());
        assert!(dr.clone().finalizer("-leading.dash").is_err());
        assert!(dr.clone().finalizer("UPPER.case").is_err());
        assert!(dr.finalizer("plain-name").is_ok());
    }
}
