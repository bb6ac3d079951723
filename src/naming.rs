//! Names derived from text on disk and in photos.
//!
//! Two conversions live here:
//!
//! - **Folder display names.** Folders are often numbered to force an order
//!   on disk (`010-Landscapes`, `020-Summer-Trip`). The number is dropped
//!   from the heading and dashes read as spaces: "Summer Trip".
//! - **Slugs.** Tags become path segments of tag views. A slug keeps ASCII
//!   letters and digits, lowercased, with every other run of characters
//!   collapsed to one dash, so `Fish & Chips` is reachable as `fish-chips`.

/// Longest slug produced by [`slug`], in bytes.
pub const MAX_SLUG_LEN: usize = 80;

/// Split a leading `NNN-` (or bare `NNN`) order prefix from a folder name.
///
/// Returns the number and whatever follows the dash.
fn split_order_prefix(raw: &str) -> Option<(u32, &str)> {
    let (prefix, rest) = raw.split_once('-').unwrap_or((raw, ""));
    let number = prefix.parse().ok()?;
    Some((number, rest))
}

/// Heading shown for a folder named `raw` on disk.
///
/// ```
/// # use vitrine::naming::display_name;
/// assert_eq!(display_name("020-Summer-Trip"), "Summer Trip");
/// assert_eq!(display_name("wip-drafts"), "wip drafts");
/// assert_eq!(display_name("2019"), "2019");
/// ```
pub fn display_name(raw: &str) -> String {
    let name = match split_order_prefix(raw) {
        Some((_, rest)) => rest,
        None => raw,
    };
    let title = name.replace('-', " ");
    if title.trim().is_empty() {
        raw.to_string()
    } else {
        title
    }
}

/// Lowercase URL segment for `text`, possibly empty.
///
/// Slugs longer than [`MAX_SLUG_LEN`] are cut at the last dash that fits.
///
/// ```
/// # use vitrine::naming::slug;
/// assert_eq!(slug("Fish & Chips"), "fish-chips");
/// assert_eq!(slug("  --Sea-- "), "sea");
/// ```
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(&word.to_ascii_lowercase());
    }

    if out.len() > MAX_SLUG_LEN {
        // Only ASCII remains, so any byte offset is a char boundary
        let cut = out[..=MAX_SLUG_LEN].rfind('-').unwrap_or(MAX_SLUG_LEN);
        out.truncate(cut);
    }
    out
}
