//! Minimal XMP packet scanner.
//!
//! Photo managers (Lightroom, darktable, digiKam) embed an XMP packet as
//! plain UTF-8 XML inside the file, either in a JPEG APP1 segment or a TIFF
//! tag. Rather than walking every container format we locate the
//! `<x:xmpmeta` … `</x:xmpmeta>` span anywhere in the bytes and pull three
//! properties out of it:
//!
//! - `xmp:Rating`, as attribute (`xmp:Rating="4"`) or element (`<xmp:Rating>4</xmp:Rating>`)
//! - `dc:title`, first `rdf:li` of the `rdf:Alt`
//! - `dc:subject`, every `rdf:li` of the `rdf:Bag`

/// XMP metadata extracted from an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpData {
    pub title: Option<String>,
    pub rating: Option<i32>,
    pub subjects: Vec<String>,
}

const PACKET_START: &[u8] = b"<x:xmpmeta";
const PACKET_END: &[u8] = b"</x:xmpmeta>";

/// Read XMP metadata from encoded image bytes.
/// Returns default (empty) metadata when no packet is found.
pub fn read_xmp(data: &[u8]) -> XmpData {
    let Some(packet) = find_packet(data) else {
        return XmpData::default();
    };
    parse_packet(&String::from_utf8_lossy(packet))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn find_packet(data: &[u8]) -> Option<&[u8]> {
    let start = find_subslice(data, PACKET_START)?;
    let len = find_subslice(&data[start..], PACKET_END)?;
    Some(&data[start..start + len + PACKET_END.len()])
}

fn parse_packet(xml: &str) -> XmpData {
    XmpData {
        title: element_body(xml, "dc:title")
            .and_then(|body| list_items(body).into_iter().next()),
        rating: read_rating(xml),
        subjects: element_body(xml, "dc:subject")
            .map(list_items)
            .unwrap_or_default(),
    }
}

fn read_rating(xml: &str) -> Option<i32> {
    let raw = attribute_value(xml, "xmp:Rating").or_else(|| element_body(xml, "xmp:Rating"))?;
    let rating = raw.trim().parse::<f64>().ok()?;
    // -1 marks a rejected photo, 0..=5 stars otherwise
    (-1.0..=5.0)
        .contains(&rating)
        .then_some(rating.round() as i32)
}

/// Value of `name="..."` (or single-quoted) anywhere in the packet.
fn attribute_value<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = xml;
    while let Some(pos) = rest.find(name) {
        let after = rest[pos + name.len()..].trim_start();
        if let Some(after_eq) = after.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let quote = after_eq.chars().next()?;
            if quote == '"' || quote == '\'' {
                let value = &after_eq[1..];
                let end = value.find(quote)?;
                return Some(&value[..end]);
            }
        }
        rest = &rest[pos + name.len()..];
    }
    None
}

/// Text between `<name ...>` and `</name>`.
fn element_body<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let mut rest = xml;
    while let Some(pos) = rest.find(&open) {
        let tail = &rest[pos + open.len()..];
        // Reject prefix matches such as <dc:titleFoo>
        if tail.starts_with(['>', ' ', '\t', '\r', '\n']) {
            let body_start = tail.find('>')? + 1;
            let body = &tail[body_start..];
            let end = body.find(&close)?;
            return Some(&body[..end]);
        }
        rest = tail;
    }
    None
}

/// Unescaped, trimmed, non-empty text of every `<rdf:li>` in `body`.
fn list_items(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut rest = body;
    while let Some(text) = element_body(rest, "rdf:li") {
        let value = unescape(text.trim());
        if !value.is_empty() {
            items.push(value);
        }
        // Advance past this item's closing tag
        match rest.find("</rdf:li>") {
            Some(pos) => rest = &rest[pos + "</rdf:li>".len()..],
            None => break,
        }
    }
    items
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
