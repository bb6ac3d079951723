//! IPTC-IIM reader for JPEG and TIFF originals.
//!
//! Only two datasets of the application record (record 2) are used:
//!
//! | Dataset | Name | Use |
//! |---|---|---|
//! | `2:05` | Object Name | title fallback |
//! | `2:25` | Keywords | tags, repeatable |
//!
//! JPEG stores IIM inside a Photoshop image resource (`8BIM`, id `0x0404`)
//! in an APP13 segment. TIFF stores it raw under IFD tag 33723 or as a
//! Photoshop resource block under tag 34377.

/// IPTC fields found in an original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcData {
    pub object_name: Option<String>,
    pub keywords: Vec<String>,
}

impl IptcData {
    fn is_empty(&self) -> bool {
        self.object_name.is_none() && self.keywords.is_empty()
    }
}

/// Read IPTC fields from encoded image bytes. Unknown formats and malformed
/// blocks yield empty data.
pub fn read_iptc(data: &[u8]) -> IptcData {
    let iim = match data {
        [0xFF, 0xD8, ..] => jpeg_iim(data).map(parse_iim),
        [b'I', b'I', ..] => tiff_iim(data, Endian::Little),
        [b'M', b'M', ..] => tiff_iim(data, Endian::Big),
        _ => None,
    };
    iim.unwrap_or_default()
}

/// Bounds-checked big- or little-endian reads over a byte slice.
#[derive(Clone, Copy)]
enum Endian {
    Big,
    Little,
}

impl Endian {
    fn u16_at(self, data: &[u8], at: usize) -> Option<u16> {
        let bytes: [u8; 2] = data.get(at..at + 2)?.try_into().ok()?;
        Some(match self {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        })
    }

    fn u32_at(self, data: &[u8], at: usize) -> Option<u32> {
        let bytes: [u8; 4] = data.get(at..at + 4)?.try_into().ok()?;
        Some(match self {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        })
    }
}

// ============================================================================
// IIM datasets
// ============================================================================

const TAG_MARKER: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;
const OBJECT_NAME: u8 = 5;
const KEYWORDS: u8 = 25;

/// Collect the record-2 datasets of interest.
///
/// Each dataset is `0x1C`, record, dataset number, a big-endian `u16`
/// length, then the value. Bytes outside a dataset are skipped; a value
/// running past the end stops the scan.
fn parse_iim(data: &[u8]) -> IptcData {
    let mut found = IptcData::default();
    let mut pos = 0;

    while let Some(&byte) = data.get(pos) {
        if byte != TAG_MARKER {
            pos += 1;
            continue;
        }
        let (Some(&[record, dataset]), Some(len)) = (
            data.get(pos + 1..pos + 3).and_then(|b| <&[u8; 2]>::try_from(b).ok()),
            Endian::Big.u16_at(data, pos + 3),
        ) else {
            break;
        };
        let start = pos + 5;
        let Some(raw) = data.get(start..start + len as usize) else {
            break;
        };
        pos = start + raw.len();

        if record != APPLICATION_RECORD {
            continue;
        }
        let value = String::from_utf8_lossy(raw).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match dataset {
            OBJECT_NAME => found.object_name = Some(value),
            KEYWORDS => found.keywords.push(value),
            _ => {}
        }
    }
    found
}

// ============================================================================
// Photoshop image resources
// ============================================================================

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const IPTC_RESOURCE: u16 = 0x0404;

/// Find the IIM block in a sequence of `8BIM` resources.
///
/// A resource is the signature, a `u16` id, a Pascal name padded to an
/// even length, a `u32` size, then data padded to an even length.
fn photoshop_iim(block: &[u8]) -> Option<&[u8]> {
    let data = block.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(block);
    let mut pos = 0;

    while pos + 12 <= data.len() {
        if !data[pos..].starts_with(RESOURCE_SIGNATURE) {
            pos += 1;
            continue;
        }
        let id = Endian::Big.u16_at(data, pos + 4)?;
        let name_len = *data.get(pos + 6)? as usize;
        let size_at = pos + 6 + (name_len + 2) / 2 * 2;
        let size = Endian::Big.u32_at(data, size_at)? as usize;
        let start = size_at + 4;
        let body = data.get(start..start + size)?;

        if id == IPTC_RESOURCE {
            return Some(body);
        }
        pos = start + size + size % 2;
    }
    None
}

// ============================================================================
// JPEG
// ============================================================================

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP13: u8 = 0xED;

/// The IIM bytes of the first APP13 segment that carries them.
///
/// Segments are walked marker by marker up to the start of scan data.
fn jpeg_iim(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        match marker {
            SOS => return None,
            // Fill bytes and stuffed zeros
            0xFF | 0x00 => pos += 1,
            SOI | EOI | 0xD0..=0xD7 => pos += 2,
            _ => {
                let len = Endian::Big.u16_at(data, pos + 2)? as usize;
                if marker == APP13 {
                    let end = (pos + 2 + len).min(data.len());
                    if let Some(iim) = data.get(pos + 4..end).and_then(photoshop_iim) {
                        return Some(iim);
                    }
                }
                pos += 2 + len;
            }
        }
    }
    None
}

// ============================================================================
// TIFF
// ============================================================================

const TIFF_MAGIC: u16 = 42;
const TAG_IPTC_NAA: u16 = 33723;
const TAG_PHOTOSHOP: u16 = 34377;
const IFD_ENTRY_LEN: usize = 12;

/// Bytes per value of a TIFF field type.
fn field_type_size(field_type: u16) -> usize {
    match field_type {
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 => 8,
        _ => 1,
    }
}

/// Walk the IFD chain for an IPTC-NAA or Photoshop tag with usable data.
fn tiff_iim(data: &[u8], endian: Endian) -> Option<IptcData> {
    if endian.u16_at(data, 2)? != TIFF_MAGIC {
        return None;
    }
    let mut ifd = endian.u32_at(data, 4)? as usize;
    // Each IFD is visited once; a looping chain ends the walk
    let mut seen = Vec::new();

    while ifd != 0 && !seen.contains(&ifd) {
        seen.push(ifd);
        let count = endian.u16_at(data, ifd)? as usize;

        for i in 0..count {
            let entry = ifd + 2 + i * IFD_ENTRY_LEN;
            let tag = endian.u16_at(data, entry)?;
            if tag != TAG_IPTC_NAA && tag != TAG_PHOTOSHOP {
                continue;
            }
            let len = endian.u32_at(data, entry + 4)? as usize
                * field_type_size(endian.u16_at(data, entry + 2)?);
            let offset = endian.u32_at(data, entry + 8)? as usize;
            let Some(value) = data.get(offset..offset + len) else {
                continue;
            };
            let iim = if tag == TAG_IPTC_NAA {
                Some(value)
            } else {
                photoshop_iim(value)
            };
            if let Some(found) = iim.map(parse_iim).filter(|f| !f.is_empty()) {
                return Some(found);
            }
        }
        ifd = endian.u32_at(data, ifd + 2 + count * IFD_ENTRY_LEN)? as usize;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(record: u8, number: u8, value: &[u8]) -> Vec<u8> {
        let mut out = vec![TAG_MARKER, record, number];
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value);
        out
    }

    fn resource(id: u16, body: &[u8]) -> Vec<u8> {
        let mut out = RESOURCE_SIGNATURE.to_vec();
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    /// SOI, an APP13 segment holding `resources`, EOI.
    fn jpeg_with(resources: &[u8]) -> Vec<u8> {
        let mut segment = PHOTOSHOP_HEADER.to_vec();
        segment.extend_from_slice(resources);
        let mut jpeg = vec![0xFF, SOI, 0xFF, APP13];
        jpeg.extend_from_slice(&((segment.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(&segment);
        jpeg.extend_from_slice(&[0xFF, EOI]);
        jpeg
    }

    // =========================================================================
    // IIM
    // =========================================================================

    #[test]
    fn iim_collects_name_and_keywords() {
        let data = [
            dataset(2, OBJECT_NAME, b"Pier"),
            dataset(2, KEYWORDS, b"sea"),
            dataset(2, 120, b"a caption"),
            dataset(2, KEYWORDS, b" dusk "),
        ]
        .concat();

        let found = parse_iim(&data);
        assert_eq!(found.object_name.as_deref(), Some("Pier"));
        assert_eq!(found.keywords, ["sea", "dusk"]);
    }

    #[test]
    fn iim_ignores_other_records_and_blank_values() {
        let data = [
            dataset(1, OBJECT_NAME, b"envelope"),
            dataset(2, KEYWORDS, b"   "),
        ]
        .concat();
        assert_eq!(parse_iim(&data), IptcData::default());
    }

    #[test]
    fn iim_stops_at_truncated_value() {
        let mut data = dataset(2, KEYWORDS, b"kept");
        data.extend_from_slice(&[TAG_MARKER, 2, KEYWORDS, 0x00, 0x40, b'x']);
        assert_eq!(parse_iim(&data).keywords, ["kept"]);
    }

    // =========================================================================
    // Containers
    // =========================================================================

    #[test]
    fn jpeg_app13_resource_is_found() {
        let iim = [dataset(2, OBJECT_NAME, b"Harbour"), dataset(2, KEYWORDS, b"boats")].concat();
        let resources = [resource(0x03ED, b"res"), resource(IPTC_RESOURCE, &iim)].concat();

        let found = read_iptc(&jpeg_with(&resources));
        assert_eq!(found.object_name.as_deref(), Some("Harbour"));
        assert_eq!(found.keywords, ["boats"]);
    }

    #[test]
    fn jpeg_without_iptc_is_empty() {
        let resources = resource(0x03ED, b"other");
        assert_eq!(read_iptc(&jpeg_with(&resources)), IptcData::default());
        assert_eq!(read_iptc(&[0xFF, SOI, 0xFF, EOI]), IptcData::default());
    }

    #[test]
    fn scan_data_ends_the_search() {
        let iim = dataset(2, KEYWORDS, b"late");
        let mut jpeg = vec![0xFF, SOI, 0xFF, SOS, 0x00, 0x02];
        jpeg.extend_from_slice(&jpeg_with(&resource(IPTC_RESOURCE, &iim))[2..]);
        assert_eq!(read_iptc(&jpeg), IptcData::default());
    }

    #[test]
    fn tiff_iptc_naa_tag_is_read() {
        let iim = dataset(2, KEYWORDS, b"fog");
        let mut tiff = b"II".to_vec();
        tiff.extend_from_slice(&TIFF_MAGIC.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&TAG_IPTC_NAA.to_le_bytes());
        tiff.extend_from_slice(&7u16.to_le_bytes());
        tiff.extend_from_slice(&(iim.len() as u32).to_le_bytes());
        tiff.extend_from_slice(&26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&iim);

        assert_eq!(read_iptc(&tiff).keywords, ["fog"]);
    }

    #[test]
    fn big_endian_tiff_photoshop_tag_is_read() {
        let block = resource(IPTC_RESOURCE, &dataset(2, OBJECT_NAME, b"Ridge"));
        let mut tiff = b"MM".to_vec();
        tiff.extend_from_slice(&TIFF_MAGIC.to_be_bytes());
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&TAG_PHOTOSHOP.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&(block.len() as u32).to_be_bytes());
        tiff.extend_from_slice(&26u32.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(&block);

        assert_eq!(read_iptc(&tiff).object_name.as_deref(), Some("Ridge"));
    }

    #[test]
    fn looping_ifd_chain_terminates() {
        let mut tiff = b"II".to_vec();
        tiff.extend_from_slice(&TIFF_MAGIC.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&0u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());

        assert_eq!(read_iptc(&tiff), IptcData::default());
    }

    #[test]
    fn unknown_formats_are_empty() {
        assert_eq!(read_iptc(b"GIF89a...."), IptcData::default());
        assert_eq!(read_iptc(&[]), IptcData::default());
    }
}
