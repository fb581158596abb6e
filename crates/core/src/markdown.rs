//! Markdown post-processing for exported Google Docs.
//!
//! Exported documents get two treatments before they are written to disk:
//! links pointing back at other Google Docs are rewritten into site-internal
//! routes, and a front matter block is prepended so the site generator knows
//! the route, the source document and the last modification time.

use std::borrow::Cow;
use std::fmt;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// MIME type Drive uses for native Google Docs.
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// Matches `[label](https://docs.google.com/document/d/<id>/edit...)`.
///
/// Group 1 is the label, group 2 the document id. Backslash-escaped brackets
/// such as `\[draft\]` are part of the label. Neither group can cross a link
/// boundary, so several links on one line are matched separately.
pub const DEFAULT_LINK_PATTERN: &str =
    r"\[((?:\\.|[^\]\\])*)\]\(https://docs\.google\.com/document/d/([^/)\s]+)/edit[^)]*\)";

/// Timestamp written when Drive did not report a modification time.
pub const UNKNOWN_DATE: &str = "N/A";

// ---------------------------------------------------------------------------
// Export formats
// ---------------------------------------------------------------------------

/// One row of the export mapping: which Drive MIME type is exported to which
/// target format, and the extension the written file gets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportFormat {
    /// MIME type of the native Drive file.
    pub source_mime: String,
    /// Key into the file's `exportLinks` map.
    pub target_mime: String,
    /// Extension including the leading dot.
    pub extension: String,
}

impl ExportFormat {
    /// Google Document to Markdown.
    pub fn google_doc_markdown() -> Self {
        Self {
            source_mime: GOOGLE_DOC_MIME.into(),
            target_mime: "text/markdown".into(),
            extension: ".md".into(),
        }
    }
}

/// The set of MIME types this tool knows how to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    formats: Vec<ExportFormat>,
}

impl ExportTable {
    pub fn new(formats: Vec<ExportFormat>) -> Self {
        Self { formats }
    }

    /// Find the export row for a source MIME type.
    pub fn lookup(&self, source_mime: &str) -> Option<&ExportFormat> {
        self.formats.iter().find(|f| f.source_mime == source_mime)
    }

    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }
}

impl Default for ExportTable {
    fn default() -> Self {
        Self::new(vec![ExportFormat::google_doc_markdown()])
    }
}

// ---------------------------------------------------------------------------
// Link rewriting
// ---------------------------------------------------------------------------

/// Rewrite every link matched by `pattern` into `[label](/id)`.
///
/// `pattern` must capture the label in group 1 and the document id in
/// group 2. The label text is copied verbatim. Output that has already been
/// rewritten is returned unchanged as long as the pattern only matches
/// absolute Google Docs URLs.
pub fn rewrite_links<'a>(body: &'a str, pattern: &Regex) -> Cow<'a, str> {
    pattern.replace_all(body, "[${1}](/${2})")
}

/// A compiled link pattern ready to be applied to document bodies.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    pattern: Regex,
}

impl LinkRewriter {
    /// Compile `pattern`, checking it exposes the two capture groups
    /// [`rewrite_links`] relies on.
    pub fn new(pattern: &str) -> Result<Self, String> {
        let pattern = Regex::new(pattern).map_err(|e| e.to_string())?;
        // captures_len counts the implicit whole-match group.
        if pattern.captures_len() < 3 {
            return Err(format!(
                "pattern must capture the link label and the document id, found {} group(s)",
                pattern.captures_len() - 1
            ));
        }
        Ok(Self { pattern })
    }

    pub fn rewrite<'a>(&self, body: &'a str) -> Cow<'a, str> {
        rewrite_links(body, &self.pattern)
    }
}

impl Default for LinkRewriter {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_LINK_PATTERN).expect("default link pattern is valid"),
        }
    }
}

// ---------------------------------------------------------------------------
// Front matter
// ---------------------------------------------------------------------------

/// Metadata block prepended to every generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    /// Route without the leading slash. Empty for the site's home document.
    pub slug: String,
    pub drive_id: String,
    pub last_update: String,
}

impl FrontMatter {
    /// Build the front matter for a Drive document.
    ///
    /// The document whose id equals `root_doc_id` is routed at `/`; every
    /// other document is routed at `/<id>`.
    pub fn for_document(doc_id: &str, modified_time: Option<&str>, root_doc_id: Option<&str>) -> Self {
        let slug = if root_doc_id == Some(doc_id) {
            String::new()
        } else {
            doc_id.to_string()
        };
        Self {
            slug,
            drive_id: doc_id.to_string(),
            last_update: modified_time
                .filter(|t| !t.is_empty())
                .unwrap_or(UNKNOWN_DATE)
                .to_string(),
        }
    }

    /// Front matter followed by `body`.
    pub fn prepend_to(&self, body: &str) -> String {
        format!("{self}{body}")
    }
}

impl fmt::Display for FrontMatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "---\nslug: /{}\ndrive_id: {}\nlast_update:\n  date: {}\n---\n\n",
            self.slug, self.drive_id, self.last_update
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_single_link() {
        let rewriter = LinkRewriter::default();
        let body = "See [Onboarding](https://docs.google.com/document/d/abc123/edit?usp=sharing).";
        assert_eq!(rewriter.rewrite(body), "See [Onboarding](/abc123).");
    }

    #[test]
    fn test_rewrite_all_occurrences_on_one_line() {
        let rewriter = LinkRewriter::default();
        let body = "[A](https://docs.google.com/document/d/id-1/edit) and \
                    [B](https://docs.google.com/document/d/id_2/edit#heading=h.x)";
        let out = rewriter.rewrite(body);
        assert_eq!(out, "[A](/id-1) and [B](/id_2)");
        assert!(!out.contains("docs.google.com"));
    }

    #[test]
    fn test_rewrite_across_lines() {
        let rewriter = LinkRewriter::default();
        let body = "- [One](https://docs.google.com/document/d/1/edit)\n\
                    - [Two](https://docs.google.com/document/d/2/edit)\n";
        assert_eq!(rewriter.rewrite(body), "- [One](/1)\n- [Two](/2)\n");
    }

    #[test]
    fn test_rewrite_preserves_label_text() {
        let rewriter = LinkRewriter::default();
        let body = "[**Bold** label: with *stuff* & 123](https://docs.google.com/document/d/X/edit)";
        assert_eq!(
            rewriter.rewrite(body),
            "[**Bold** label: with *stuff* & 123](/X)"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let rewriter = LinkRewriter::default();
        let body = "[a](https://docs.google.com/document/d/q/edit) [b](/already) \
                    [c](https://example.com/page)";
        let once = rewriter.rewrite(body).into_owned();
        let twice = rewriter.rewrite(&once).into_owned();
        assert_eq!(once, twice);
        assert_eq!(once, "[a](/q) [b](/already) [c](https://example.com/page)");
    }

    #[test]
    fn test_rewrite_label_with_escaped_brackets() {
        let rewriter = LinkRewriter::default();
        let body = r"See [RFC \[draft\]](https://docs.google.com/document/d/abc/edit?usp=sharing) now";
        let once = rewriter.rewrite(body).into_owned();
        assert_eq!(once, r"See [RFC \[draft\]](/abc) now");
        assert_eq!(rewriter.rewrite(&once), once);
    }

    #[test]
    fn test_rewrite_leaves_other_google_urls() {
        let rewriter = LinkRewriter::default();
        let body = "[sheet](https://docs.google.com/spreadsheets/d/s1/edit)";
        assert!(matches!(rewriter.rewrite(body), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rewrite_links_with_custom_pattern() {
        let pattern = Regex::new(r"\[([^\]]*)\]\(https://intranet/doc/(\w+)\)").unwrap();
        let out = rewrite_links("[x](https://intranet/doc/abc)", &pattern);
        assert_eq!(out, "[x](/abc)");
    }

    #[test]
    fn test_link_rewriter_rejects_missing_groups() {
        assert!(LinkRewriter::new(r"\[(.*)\]").is_err());
        assert!(LinkRewriter::new(r"([").is_err());
        assert!(LinkRewriter::new(DEFAULT_LINK_PATTERN).is_ok());
    }

    #[test]
    fn test_front_matter_shape() {
        let fm = FrontMatter::for_document("doc1", Some("2024-05-01T10:00:00.000Z"), None);
        assert_eq!(
            fm.to_string(),
            "---\nslug: /doc1\ndrive_id: doc1\nlast_update:\n  date: 2024-05-01T10:00:00.000Z\n---\n\n"
        );
    }

    #[test]
    fn test_front_matter_root_document() {
        let fm = FrontMatter::for_document("home", None, Some("home"));
        let rendered = fm.prepend_to("# Welcome\n");
        assert!(rendered.starts_with("---\nslug: /\n"));
        assert!(rendered.contains("drive_id: home\n"));
        assert!(rendered.contains("  date: N/A\n"));
        assert!(rendered.ends_with("---\n\n# Welcome\n"));
    }

    #[test]
    fn test_export_table_lookup() {
        let table = ExportTable::default();
        let fmt = table.lookup(GOOGLE_DOC_MIME).unwrap();
        assert_eq!(fmt.extension, ".md");
        assert_eq!(fmt.target_mime, "text/markdown");
        assert!(table.lookup("application/vnd.google-apps.spreadsheet").is_none());
    }
}
