//! Core value records for the mirroring pipeline
//!
//! `Capture` is one archived version of one URL as reported by the archive's
//! capture index; `ResourceRef` is one embedded asset discovered while
//! rewriting a page. Both carry structural identity over `(url, timestamp)`
//! only; mutable fields like downloaded content never participate in
//! equality or hashing, so instances stay valid as set members while they
//! move through the pipeline.

use std::hash::{Hash, Hasher};

/// One archived version of one URL.
///
/// Created by the capture catalog during discovery. `content` is populated
/// transiently by the fetcher and cleared again after the page has been
/// rewritten, so a long run never holds more page bodies in memory than it
/// has in-flight workers.
#[derive(Debug, Clone)]
pub struct Capture {
    /// The URL as originally served, e.g. `http://example.com/page.html`
    pub original_url: String,

    /// 14-digit archive timestamp (`YYYYMMDDhhmmss`)
    pub timestamp: String,

    /// HTTP status code recorded at capture time (kept as the index reports it)
    pub status_code: String,

    /// MIME type recorded at capture time
    pub mime_type: String,

    /// Content digest from the capture index, when present
    pub digest: Option<String>,

    /// Raw page bytes, present only between fetch and rewrite
    pub content: Option<Vec<u8>>,

    /// Set once the page has been rewritten and written out
    pub processed: bool,
}

impl Capture {
    /// Creates a capture from index metadata (no content yet).
    pub fn new(
        original_url: impl Into<String>,
        timestamp: impl Into<String>,
        status_code: impl Into<String>,
        mime_type: impl Into<String>,
        digest: Option<String>,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            timestamp: timestamp.into(),
            status_code: status_code.into(),
            mime_type: mime_type.into(),
            digest,
            content: None,
            processed: false,
        }
    }

    /// Identity key used for deduplication.
    pub fn identity(&self) -> (&str, &str) {
        (&self.original_url, &self.timestamp)
    }
}

impl PartialEq for Capture {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Capture {}

impl Hash for Capture {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Classification of an embedded resource, used to pick its output
/// subdirectory and for index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Style,
    Script,
    Image,
    Font,
    Other,
}

impl ResourceKind {
    /// Subdirectory name under the resources root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Style => "css",
            Self::Script => "js",
            Self::Image => "images",
            Self::Font => "fonts",
            Self::Other => "other",
        }
    }

    /// All kinds, in output-directory creation order.
    pub fn all() -> [ResourceKind; 5] {
        [
            Self::Style,
            Self::Script,
            Self::Image,
            Self::Font,
            Self::Other,
        ]
    }
}

/// One embedded asset discovered in a page.
///
/// Created during page rewriting; marked downloaded by the resource queue's
/// workers. A given `(url, timestamp)` identity enters the download queue at
/// most once.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    /// Absolute URL of the asset
    pub url: String,

    /// Timestamp of the capture the asset was discovered in
    pub timestamp: String,

    /// Resource classification
    pub kind: ResourceKind,

    /// Tag name of the element that referenced the asset
    pub source_tag: String,

    /// Attribute the reference was found in
    pub source_attr: String,

    /// Path the asset was saved to, once downloaded
    pub local_path: Option<String>,

    /// Set by the download pass on success
    pub downloaded: bool,
}

impl ResourceRef {
    pub fn new(
        url: impl Into<String>,
        timestamp: impl Into<String>,
        kind: ResourceKind,
        source_tag: impl Into<String>,
        source_attr: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            timestamp: timestamp.into(),
            kind,
            source_tag: source_tag.into(),
            source_attr: source_attr.into(),
            local_path: None,
            downloaded: false,
        }
    }

    /// Identity key used for queue dedup.
    pub fn identity(&self) -> (&str, &str) {
        (&self.url, &self.timestamp)
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ResourceRef {}

impl Hash for ResourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn capture_identity_ignores_mutable_fields() {
        let mut a = Capture::new("http://example.com/", "20050101000000", "200", "text/html", None);
        let b = Capture::new("http://example.com/", "20050101000000", "200", "text/html", None);
        a.content = Some(vec![1, 2, 3]);
        a.processed = true;
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn capture_identity_distinguishes_timestamps() {
        let a = Capture::new("http://example.com/", "20050101000000", "200", "text/html", None);
        let b = Capture::new("http://example.com/", "20060101000000", "200", "text/html", None);
        assert_ne!(a, b);
    }

    #[test]
    fn resource_ref_identity_ignores_download_state() {
        let mut a = ResourceRef::new(
            "http://example.com/style.css",
            "20050101000000",
            ResourceKind::Style,
            "link",
            "href",
        );
        let b = a.clone();
        a.downloaded = true;
        a.local_path = Some("resources/css/x.css".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn kind_dir_names() {
        assert_eq!(ResourceKind::Style.dir_name(), "css");
        assert_eq!(ResourceKind::Image.dir_name(), "images");
        assert_eq!(ResourceKind::all().len(), 5);
    }
}
