//! Viewer URL construction.
//!
//! The downstream document viewer (Collabora Online style) is addressed with a
//! `file_path` query parameter carrying the server's absolute filesystem path
//! of the document, e.g.
//!
//! `http://localhost:9980/loleaflet/dist/loleaflet.html?file_path=/srv/uploads/report.pdf`

use std::path::Path;
use url::Url;

/// Build the viewer URL for a stored document.
///
/// The path is appended verbatim rather than form-encoded: the viewer expects
/// literal slashes in `file_path`, and filenames have already been sanitized
/// down to a single path component.
pub fn viewer_link(base: &Url, document_path: &Path) -> String {
    let separator = if base.query().is_some() { '&' } else { '?' };
    format!("{base}{separator}file_path={}", document_path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn link_matches_viewer_format() {
        let base = Url::parse("http://localhost:9980/loleaflet/dist/loleaflet.html").unwrap();
        let path = PathBuf::from("/srv/uploads/report.pdf");
        assert_eq!(
            viewer_link(&base, &path),
            "http://localhost:9980/loleaflet/dist/loleaflet.html?file_path=/srv/uploads/report.pdf"
        );
    }

    #[test]
    fn link_appends_to_existing_query() {
        let base = Url::parse("http://viewer.internal/cool.html?lang=fr").unwrap();
        let path = PathBuf::from("/data/a.odt");
        assert_eq!(viewer_link(&base, &path), "http://viewer.internal/cool.html?lang=fr&file_path=/data/a.odt");
    }
}
