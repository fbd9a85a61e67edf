//! Source selection and the attachment strategy for each source kind.

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::models::{Source, SourceKind};

/// How the current source is wired to the playback element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Attachment {
    /// The episode has no sources; terminal for this session
    Empty,
    /// Rendered as an embedded frame, nothing attached to the element
    Embed { url: String },
    /// URL assigned straight to the element
    Direct { url: String },
    /// Adaptive client bound to the manifest
    Adaptive { url: String },
    /// Manifest handed to the element because the engine is unavailable
    NativeManifest { url: String },
    /// Nothing could play the manifest; the player stays stalled
    Unplayable { url: String },
}

impl Attachment {
    /// URL the element itself should load, if any
    pub fn element_url(&self) -> Option<&str> {
        match self {
            Attachment::Direct { url } | Attachment::NativeManifest { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Attachment::Adaptive { .. })
    }
}

/// The first entry always wins; there is no scoring and no fallback.
pub fn select_source(sources: &[Source]) -> Option<&Source> {
    sources.first()
}

/// Decide how `source` should be attached given what the runtime offers.
pub fn plan(source: Option<&Source>, engine_supported: bool, native_manifest: bool) -> Attachment {
    let Some(source) = source else {
        return Attachment::Empty;
    };

    let url = source.url.clone();
    match source.kind {
        SourceKind::Embed => Attachment::Embed {
            url: embed_url(&url),
        },
        SourceKind::DirectVideo => Attachment::Direct { url },
        SourceKind::AdaptiveManifest if engine_supported => Attachment::Adaptive { url },
        SourceKind::AdaptiveManifest => manifest_fallback(url, native_manifest),
    }
}

/// Where a manifest goes when the engine cannot take it.
pub fn manifest_fallback(url: String, native_manifest: bool) -> Attachment {
    if native_manifest {
        Attachment::NativeManifest { url }
    } else {
        Attachment::Unplayable { url }
    }
}

/// Rewrite provider "view" pages into their embeddable form.
///
/// Google Drive share links (`/file/d/<id>/view`) refuse to render inside a
/// frame; the `/preview` variant of the same path does.
pub fn embed_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    if parsed.host_str() != Some("drive.google.com") || !parsed.path().ends_with("/view") {
        return raw.to_string();
    }

    let path = parsed.path().trim_end_matches("/view").to_string();
    parsed.set_path(&format!("{path}/preview"));
    parsed.set_query(None);
    debug!("Rewrote embed link to {}", parsed);
    parsed.to_string()
}
