// src/sitemap/parse.rs
// =============================================================================
// This module parses the raw bytes of one sitemap into a SitemapDocument.
//
// Steps:
// 1. If the bytes start with the gzip magic number (1f 8b), decompress them
// 2. Strip a UTF-8 byte-order mark if there is one
// 3. Stream through the XML with quick-xml, remembering the root element and
//    every <loc> that sits inside a <url> (urlset) or <sitemap> (index)
//
// Real-world sitemaps are often sloppy, so parsing is tolerant:
// - Namespace prefixes are ignored (<sm:urlset> is a urlset)
// - Mismatched end tags don't abort the parse
// - If the reader hits an error half-way through, everything read so far
//   is kept
//
// Rust concepts:
// - Streaming parsers: Events instead of building a full tree in memory
// - Cow<str>: Text that may or may not need unescaping
// =============================================================================

use super::SitemapError;
use flate2::read::MultiGzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use tracing::warn;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// What kind of sitemap a document is, judged by its root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootKind {
    /// `<urlset>`: locations are page URLs
    UrlSet,
    /// `<sitemapindex>`: locations point at more sitemaps
    SitemapIndex,
    /// Anything else, holding the local tag name
    Unrecognized(String),
}

impl RootKind {
    fn from_local_name(name: &str) -> Self {
        match name {
            "urlset" => RootKind::UrlSet,
            "sitemapindex" => RootKind::SitemapIndex,
            other => RootKind::Unrecognized(other.to_string()),
        }
    }

    // The element that wraps each <loc> for this kind of document
    fn entry_tag(&self) -> Option<&'static str> {
        match self {
            RootKind::UrlSet => Some("url"),
            RootKind::SitemapIndex => Some("sitemap"),
            RootKind::Unrecognized(_) => None,
        }
    }
}

/// One parsed sitemap payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    pub kind: RootKind,
    /// Trimmed, non-empty `<loc>` values in document order
    pub locations: Vec<String>,
}

/// Decompresses `data` if it looks like a gzip stream, otherwise returns it unchanged.
pub fn decompress_if_gzip(data: Vec<u8>) -> Result<Vec<u8>, SitemapError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data);
    }

    // Concatenated gzip members decompress to their concatenated contents
    let mut decoder = MultiGzDecoder::new(&data[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

// Parses an (already decompressed) XML payload
//
// Returns:
//   Ok(document) if a root element was found, even when the rest of the
//   document is broken
//   Err(Parse) if the reader failed before any element was seen
//   Err(EmptyDocument) if there was no element at all
pub fn parse_document(data: &[u8]) -> Result<SitemapDocument, SitemapError> {
    let data = data.strip_prefix(&UTF8_BOM[..]).unwrap_or(data);

    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut kind: Option<RootKind> = None;
    // Local names of the currently open elements
    let mut stack: Vec<String> = Vec::new();
    let mut locations = Vec::new();
    // Text collected for the <loc> we're currently inside, if any
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let root = kind.get_or_insert_with(|| RootKind::from_local_name(&name));
                stack.push(name);

                if stack.len() == 3 && stack[2] == "loc" && root.entry_tag() == Some(stack[1].as_str()) {
                    current = Some(String::new());
                }
            }
            Ok(Event::Empty(e)) => {
                // A self-closing root like <urlset/> is still a valid, empty document
                if kind.is_none() {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    kind = Some(RootKind::from_local_name(&name));
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => buf.push_str(&text),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() == 3 {
                    if let Some(text) = current.take() {
                        let loc = text.trim();
                        if !loc.is_empty() {
                            locations.push(loc.to_string());
                        }
                    }
                }
                stack.pop();
            }
            Ok(Event::Eof) => break,
            // Comments, processing instructions, the XML declaration, doctypes
            Ok(_) => {}
            Err(e) => {
                if kind.is_none() {
                    return Err(SitemapError::Parse(e.to_string()));
                }
                warn!(
                    "XML error at byte {}, keeping {} location(s) parsed so far: {}",
                    reader.buffer_position(),
                    locations.len(),
                    e
                );
                break;
            }
        }
    }

    match kind {
        Some(kind) => Ok(SitemapDocument { kind, locations }),
        None => Err(SitemapError::EmptyDocument),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_parse_urlset() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc><lastmod>2024-01-01</lastmod></url>
  <url>
    <loc>
      https://example.com/about
    </loc>
  </url>
</urlset>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.kind, RootKind::UrlSet);
        assert_eq!(doc.locations, vec!["https://example.com/", "https://example.com/about"]);
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = br#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/a.xml</loc></sitemap>
  <sitemap><loc>https://example.com/b.xml.gz</loc></sitemap>
</sitemapindex>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.kind, RootKind::SitemapIndex);
        assert_eq!(doc.locations.len(), 2);
    }

    #[test]
    fn test_namespace_prefixes_are_ignored() {
        let xml = br#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:url><sm:loc>https://example.com/x</sm:loc></sm:url>
</sm:urlset>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.kind, RootKind::UrlSet);
        assert_eq!(doc.locations, vec!["https://example.com/x"]);
    }

    #[test]
    fn test_bom_comments_and_entities() {
        let mut xml = UTF8_BOM.to_vec();
        xml.extend_from_slice(
            br#"<urlset>
  <!-- <url><loc>https://example.com/commented</loc></url> -->
  <url><loc>https://example.com/?a=1&amp;b=2</loc></url>
  <url><loc><![CDATA[https://example.com/cdata]]></loc></url>
</urlset>"#,
        );
        let doc = parse_document(&xml).unwrap();
        assert_eq!(
            doc.locations,
            vec!["https://example.com/?a=1&b=2", "https://example.com/cdata"]
        );
    }

    #[test]
    fn test_loc_outside_entry_is_ignored() {
        let xml = br#"<urlset>
  <loc>https://example.com/stray</loc>
  <url><image><loc>https://example.com/img.png</loc></image><loc>https://example.com/page</loc></url>
</urlset>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.locations, vec!["https://example.com/page"]);
    }

    #[test]
    fn test_truncated_document_keeps_parsed_locations() {
        let xml = br#"<urlset>
  <url><loc>https://example.com/one</loc></url>
  <url><loc>https://example.com/two</loc></url>
  <url><loc>https://exa"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.kind, RootKind::UrlSet);
        assert_eq!(doc.locations, vec!["https://example.com/one", "https://example.com/two"]);
    }

    #[test]
    fn test_mismatched_end_tags_are_tolerated() {
        let xml = br#"<urlset>
  <url><loc>https://example.com/one</loc></URL>
  <url><loc>https://example.com/two</loc></url>
</urlset>"#;
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.locations.len(), 2);
    }

    #[test]
    fn test_unrecognized_root() {
        let doc = parse_document(b"<html><body>Not a sitemap</body></html>").unwrap();
        assert_eq!(doc.kind, RootKind::Unrecognized("html".to_string()));
        assert!(doc.locations.is_empty());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(parse_document(b""), Err(SitemapError::EmptyDocument)));
        assert!(matches!(
            parse_document(b"   just some text   "),
            Err(SitemapError::EmptyDocument)
        ));
    }

    #[test]
    fn test_self_closing_root_is_empty_urlset() {
        let doc = parse_document(b"<urlset/>").unwrap();
        assert_eq!(doc.kind, RootKind::UrlSet);
        assert!(doc.locations.is_empty());
    }

    #[test]
    fn test_gzip_is_detected_by_magic_number() {
        let xml = b"<urlset><url><loc>https://example.com/gz</loc></url></urlset>".to_vec();
        let unzipped = decompress_if_gzip(gzip(&xml)).unwrap();
        assert_eq!(unzipped, xml);

        // Plain bytes pass through untouched
        assert_eq!(decompress_if_gzip(xml.clone()).unwrap(), xml);
    }

    #[test]
    fn test_multi_member_gzip_is_fully_decompressed() {
        let mut data = gzip(b"<urlset><url><loc>https://example.com/a</loc></url>");
        data.extend(gzip(b"<url><loc>https://example.com/b</loc></url></urlset>"));

        let unzipped = decompress_if_gzip(data).unwrap();
        let document = parse_document(&unzipped).unwrap();
        assert_eq!(
            document.locations,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let mut data = gzip(b"<urlset></urlset>");
        data.truncate(6);
        assert!(matches!(decompress_if_gzip(data), Err(SitemapError::Decompress(_))));
    }
}
