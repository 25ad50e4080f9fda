//! Loading source and filter lists from plain files or OPML outlines.

use crate::types::{AggregatorError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// OPML outlines contribute their `xmlUrl`
    Sources,
    /// Leaf OPML outlines contribute their `text`; folders are skipped
    Filters,
}

impl ListKind {
    fn opml_attribute(self) -> &'static [u8] {
        match self {
            ListKind::Sources => b"xmlUrl",
            ListKind::Filters => b"text",
        }
    }
}

/// Read a list file, choosing OPML or line parsing from its name and content.
pub fn load_list(path: &Path, kind: ListKind) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let is_opml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("opml"))
        .unwrap_or(false)
        || looks_like_opml(&content);

    let entries = if is_opml {
        parse_opml(&content, kind)?
    } else {
        parse_lines(&content)
    };
    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Trimmed lines, without blanks and `#` comments.
pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn looks_like_opml(content: &str) -> bool {
    let head: String = content.chars().take(1024).collect::<String>().to_lowercase();
    head.contains("<opml")
}

/// Attribute values of `outline` elements in document order. Filter lists skip
/// outlines that have children.
pub fn parse_opml(content: &str, kind: ListKind) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let wanted = kind.opml_attribute();
    let mut values = Vec::new();
    // Filter text of the innermost open outline, kept only if it has no children
    let mut open_leaf: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if is_outline(&e) => {
                let value = outline_attribute(&e, wanted)?;
                match kind {
                    ListKind::Sources => values.extend(value),
                    ListKind::Filters => open_leaf = value,
                }
            }
            Event::Empty(e) if is_outline(&e) => {
                open_leaf = None;
                values.extend(outline_attribute(&e, wanted)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"outline" => {
                values.extend(open_leaf.take());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(values)
}

fn is_outline(element: &BytesStart) -> bool {
    element.local_name().as_ref() == b"outline"
}

fn outline_attribute(element: &BytesStart, wanted: &[u8]) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.as_ref() == wanted {
            let value = attribute.unescape_value()?.trim().to_string();
            return Ok(Some(value).filter(|v| !v.is_empty()));
        }
    }
    Ok(None)
}

/// Inline entries first, then the file's, in order.
pub fn collect(inline: &[String], file: Option<&Path>, kind: ListKind) -> Result<Vec<String>> {
    let mut entries: Vec<String> = inline.to_vec();
    if let Some(path) = file {
        entries.extend(load_list(path, kind)?);
    }
    if kind == ListKind::Sources && entries.is_empty() {
        return Err(AggregatorError::NoSources);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const OPML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>subscriptions</title></head>
  <body>
    <outline text="News">
      <outline type="rss" text="First" xmlUrl="https://one.example/rss"/>
      <outline type="rss" text="Second" xmlUrl="https://two.example/atom?a=1&amp;b=2"/>
    </outline>
    <outline text="Standalone"/>
    <outline type="rss" text="Third" xmlUrl="https://three.example/feed"></outline>
  </body>
</opml>"#;

    #[test]
    fn lines_skip_blanks_and_comments() {
        let content = "# my feeds\nhttps://a.example/rss\n\n   \n  https://b.example/atom  \n#https://disabled.example\n";
        assert_eq!(parse_lines(content), vec!["https://a.example/rss", "https://b.example/atom"]);
    }

    #[test]
    fn opml_sources_in_document_order() {
        let sources = parse_opml(OPML, ListKind::Sources).unwrap();
        assert_eq!(
            sources,
            vec![
                "https://one.example/rss",
                "https://two.example/atom?a=1&b=2",
                "https://three.example/feed",
            ]
        );
    }

    #[test]
    fn opml_filters_use_leaf_text() {
        let filters = parse_opml(OPML, ListKind::Filters).unwrap();
        assert_eq!(filters, vec!["First", "Second", "Standalone", "Third"]);
    }

    #[test]
    fn broken_opml_is_an_error() {
        assert!(parse_opml("<opml><body><outline xmlUrl=\"x></body>", ListKind::Sources).is_err());
    }

    #[test]
    fn load_list_detects_format() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("sources.txt");
        std::fs::File::create(&plain)
            .unwrap()
            .write_all(b"https://a.example/rss\n# skip\n")
            .unwrap();
        assert_eq!(load_list(&plain, ListKind::Sources).unwrap(), vec!["https://a.example/rss"]);

        let opml = dir.path().join("subscriptions.xml");
        std::fs::write(&opml, OPML).unwrap();
        assert_eq!(load_list(&opml, ListKind::Sources).unwrap().len(), 3);
    }

    #[test]
    fn collect_puts_inline_first_and_requires_sources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("more.txt");
        std::fs::write(&file, "https://file.example/rss\n").unwrap();

        let inline = vec!["https://inline.example/rss".to_string()];
        let all = collect(&inline, Some(&file), ListKind::Sources).unwrap();
        assert_eq!(all, vec!["https://inline.example/rss", "https://file.example/rss"]);

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "# nothing here\n").unwrap();
        assert!(matches!(
            collect(&[], Some(&empty), ListKind::Sources),
            Err(AggregatorError::NoSources)
        ));
        assert!(collect(&[], None, ListKind::Filters).unwrap().is_empty());

        let missing = dir.path().join("missing.txt");
        assert!(matches!(collect(&[], Some(&missing), ListKind::Sources), Err(AggregatorError::Io(_))));
    }
}
