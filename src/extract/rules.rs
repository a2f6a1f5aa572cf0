//! Resource-bearing element rules and kind classification

use crate::model::ResourceKind;

/// One rule naming an element/attribute pair that can reference a resource.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRule {
    /// Element name
    pub tag: &'static str,
    /// Attribute holding the reference
    pub attr: &'static str,
    /// Required `rel` token, when the element needs one to qualify
    pub rel: Option<&'static str>,
    /// Whether the attribute is a responsive-image candidate list
    pub srcset: bool,
}

/// Everything the extractor rewrites, in application order.
pub const REWRITE_RULES: &[RewriteRule] = &[
    RewriteRule { tag: "link", attr: "href", rel: Some("stylesheet"), srcset: false },
    RewriteRule { tag: "script", attr: "src", rel: None, srcset: false },
    RewriteRule { tag: "img", attr: "src", rel: None, srcset: false },
    RewriteRule { tag: "a", attr: "href", rel: None, srcset: false },
    RewriteRule { tag: "source", attr: "srcset", rel: None, srcset: true },
    RewriteRule { tag: "img", attr: "srcset", rel: None, srcset: true },
    RewriteRule { tag: "source", attr: "src", rel: None, srcset: false },
    RewriteRule { tag: "video", attr: "src", rel: None, srcset: false },
    RewriteRule { tag: "audio", attr: "src", rel: None, srcset: false },
];

const STYLE_EXTS: &[&str] = &[".css", ".scss", ".less"];
const SCRIPT_EXTS: &[&str] = &[".js", ".jsx", ".ts", ".tsx"];
const IMAGE_EXTS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".bmp", ".ico"];
const FONT_EXTS: &[&str] = &[".woff", ".woff2", ".ttf", ".otf", ".eot"];

/// Classifies a resource from its element kind, falling back to the URL's
/// extension. The element wins: an `<img>` is an image whatever its URL
/// looks like.
pub fn classify_kind(url: &str, tag: &str) -> ResourceKind {
    match tag {
        "link" => return ResourceKind::Style,
        "script" => return ResourceKind::Script,
        "img" => return ResourceKind::Image,
        _ => {}
    }

    let url = url.to_lowercase();
    let has_ext = |exts: &[&str]| exts.iter().any(|ext| url.ends_with(ext));

    if has_ext(STYLE_EXTS) {
        ResourceKind::Style
    } else if has_ext(SCRIPT_EXTS) {
        ResourceKind::Script
    } else if has_ext(IMAGE_EXTS) {
        ResourceKind::Image
    } else if has_ext(FONT_EXTS) {
        ResourceKind::Font
    } else {
        ResourceKind::Other
    }
}
