//! EXIF extraction: content fingerprints and capture times.
//!
//! The fingerprint hashes the decoded EXIF fields rather than the file
//! bytes, so the same shot matches across copies whose pixel data or
//! container layout was touched by a sync tool. Fields are fed to BLAKE3
//! in (IFD, tag) order with their decoded values, never with file offsets.

use std::fs::File;
use std::io::{BufReader, Cursor, Seek};
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{Exif, In, Tag, Value};
use photokit_recon::Fingerprint;

/// Format of the EXIF date tags.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Capture-time tags, most preferred first.
const DATE_TAGS: [Tag; 3] = [Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

fn read_exif<R: std::io::BufRead + Seek>(reader: &mut R) -> Result<Option<Exif>, String> {
    match exif::Reader::new().read_from_container(reader) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

fn exif_from_path(path: &Path) -> Result<Option<Exif>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    read_exif(&mut BufReader::new(file))
}

/// Fingerprint of the EXIF block in `bytes`. The bytes may be only the
/// head of a file, as long as the metadata segment is included.
///
/// `Ok(None)` means the image carries no EXIF at all.
pub fn exif_fingerprint(bytes: &[u8]) -> Result<Option<Fingerprint>, String> {
    Ok(read_exif(&mut Cursor::new(bytes))?.map(|exif| fingerprint_of(&exif)))
}

pub fn file_fingerprint(path: &Path) -> Result<Option<Fingerprint>, String> {
    Ok(exif_from_path(path)?.map(|exif| fingerprint_of(&exif)))
}

pub fn fingerprint_of(exif: &Exif) -> Fingerprint {
    let mut fields: Vec<&exif::Field> = exif.fields().collect();
    fields.sort_by_key(|f| (f.ifd_num.index(), f.tag.number()));

    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(&field.ifd_num.index().to_le_bytes());
        hasher.update(&field.tag.number().to_le_bytes());
        hash_value(&mut hasher, &field.value);
    }
    Fingerprint::from_bytes(*hasher.finalize().as_bytes())
}

fn hash_value(hasher: &mut blake3::Hasher, value: &Value) {
    // Type byte first so e.g. Short([1]) and Long([1]) differ.
    match value {
        Value::Byte(v) => {
            hasher.update(&[1]);
            hasher.update(v);
        }
        Value::Ascii(parts) => {
            hasher.update(&[2]);
            for part in parts {
                hasher.update(&(part.len() as u32).to_le_bytes());
                hasher.update(part);
            }
        }
        Value::Short(v) => {
            hasher.update(&[3]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_le_bytes());
            });
        }
        Value::Long(v) => {
            hasher.update(&[4]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_le_bytes());
            });
        }
        Value::Rational(v) => {
            hasher.update(&[5]);
            for r in v {
                hasher.update(&r.num.to_le_bytes());
                hasher.update(&r.denom.to_le_bytes());
            }
        }
        Value::SByte(v) => {
            hasher.update(&[6]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_le_bytes());
            });
        }
        // The second field is a file offset, not content.
        Value::Undefined(v, _) => {
            hasher.update(&[7]);
            hasher.update(v);
        }
        Value::SShort(v) => {
            hasher.update(&[8]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_le_bytes());
            });
        }
        Value::SLong(v) => {
            hasher.update(&[9]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_le_bytes());
            });
        }
        Value::SRational(v) => {
            hasher.update(&[10]);
            for r in v {
                hasher.update(&r.num.to_le_bytes());
                hasher.update(&r.denom.to_le_bytes());
            }
        }
        Value::Float(v) => {
            hasher.update(&[11]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_bits().to_le_bytes());
            });
        }
        Value::Double(v) => {
            hasher.update(&[12]);
            v.iter().for_each(|x| {
                hasher.update(&x.to_bits().to_le_bytes());
            });
        }
        Value::Unknown(typ, count, _) => {
            hasher.update(&[13]);
            hasher.update(&typ.to_le_bytes());
            hasher.update(&count.to_le_bytes());
        }
    }
}

/// Capture time from the first date tag present.
///
/// `Ok(None)` when the file has no EXIF or none of the date tags. A tag
/// that is present but malformed is an error, not a fallthrough.
pub fn capture_time(path: &Path) -> Result<Option<NaiveDateTime>, String> {
    match exif_from_path(path)? {
        Some(exif) => capture_time_of(&exif),
        None => Ok(None),
    }
}

pub fn capture_time_of(exif: &Exif) -> Result<Option<NaiveDateTime>, String> {
    for tag in DATE_TAGS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };
        let text = match &field.value {
            Value::Ascii(parts) if !parts.is_empty() => String::from_utf8_lossy(&parts[0]).into_owned(),
            other => return Err(format!("{} has unexpected value {:?}", tag, other)),
        };
        let parsed = NaiveDateTime::parse_from_str(text.trim_end_matches('\0').trim(), EXIF_DATE_FORMAT)
            .map_err(|e| format!("{} '{}': {}", tag, text, e))?;
        return Ok(Some(parsed));
    }
    Ok(None)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    // Minimal big-endian TIFF block with IFD0 DateTime and an Exif IFD
    // holding DateTimeOriginal.
    fn tiff_block(datetime: Option<&str>, original: &str) -> Vec<u8> {
        let mut t = Vec::new();
        t.extend_from_slice(b"MM\0\x2a\0\0\0\x08");

        let entries: u16 = if datetime.is_some() { 2 } else { 1 };
        let ifd0_len = 2 + 12 * entries as u32 + 4;
        let exif_ifd_at = 8 + ifd0_len;
        let exif_ifd_len = 2 + 12 + 4;
        let data_at = exif_ifd_at + exif_ifd_len;

        t.extend_from_slice(&entries.to_be_bytes());
        if datetime.is_some() {
            // 0x0132 DateTime, ASCII, 20, offset
            t.extend_from_slice(&[0x01, 0x32, 0x00, 0x02, 0, 0, 0, 20]);
            t.extend_from_slice(&(data_at + 20).to_be_bytes());
        }
        // 0x8769 ExifIFDPointer, LONG, 1
        t.extend_from_slice(&[0x87, 0x69, 0x00, 0x04, 0, 0, 0, 1]);
        t.extend_from_slice(&exif_ifd_at.to_be_bytes());
        t.extend_from_slice(&[0, 0, 0, 0]);

        t.extend_from_slice(&1u16.to_be_bytes());
        // 0x9003 DateTimeOriginal, ASCII, 20
        t.extend_from_slice(&[0x90, 0x03, 0x00, 0x02, 0, 0, 0, 20]);
        t.extend_from_slice(&data_at.to_be_bytes());
        t.extend_from_slice(&[0, 0, 0, 0]);

        t.extend_from_slice(original.as_bytes());
        t.push(0);
        if let Some(dt) = datetime {
            t.extend_from_slice(dt.as_bytes());
            t.push(0);
        }
        t
    }

    /// JPEG with an APP1 Exif segment and no image data past it.
    pub(crate) fn jpeg_with_exif(datetime: Option<&str>, original: &str) -> Vec<u8> {
        let tiff = tiff_block(datetime, original);
        let mut j = vec![0xFF, 0xD8, 0xFF, 0xE1];
        j.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
        j.extend_from_slice(b"Exif\0\0");
        j.extend_from_slice(&tiff);
        j.extend_from_slice(&[0xFF, 0xD9]);
        j
    }

    #[test]
    fn no_exif_is_none() {
        let bare = vec![0xFF, 0xD8, 0xFF, 0xD9];
        assert_eq!(exif_fingerprint(&bare).unwrap(), None);
    }

    #[test]
    fn garbage_is_error() {
        assert!(exif_fingerprint(b"definitely not an image").is_err());
    }

    #[test]
    fn same_metadata_same_fingerprint() {
        let a = jpeg_with_exif(None, "2024:07:01 10:20:30");
        let b = jpeg_with_exif(None, "2024:07:01 10:20:30");
        let c = jpeg_with_exif(None, "2024:07:01 10:20:31");
        let fa = exif_fingerprint(&a).unwrap().unwrap();
        assert_eq!(Some(fa), exif_fingerprint(&b).unwrap());
        assert_ne!(Some(fa), exif_fingerprint(&c).unwrap());
    }

    #[test]
    fn capture_time_prefers_datetime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_with_exif(Some("2024:07:02 08:00:00"), "2024:07:01 10:20:30")).unwrap();
        let at = capture_time(&path).unwrap().unwrap();
        assert_eq!(at.format("%Y-%m-%d %H:%M").to_string(), "2024-07-02 08:00");
    }

    #[test]
    fn capture_time_falls_back_to_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_with_exif(None, "2024:07:01 10:20:30")).unwrap();
        let at = capture_time(&path).unwrap().unwrap();
        assert_eq!(at.format("%Y-%m-%d-%H-%M").to_string(), "2024-07-01-10-20");
    }

    #[test]
    fn malformed_date_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, jpeg_with_exif(None, "not a date at all!!")).unwrap();
        assert!(capture_time(&path).is_err());
    }

    #[test]
    fn head_of_file_is_enough() {
        let mut full = jpeg_with_exif(None, "2024:07:01 10:20:30");
        let expected = exif_fingerprint(&full).unwrap();
        full.extend(std::iter::repeat(0u8).take(10_000));
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.jpg");
        std::fs::write(&path, &full).unwrap();
        assert_eq!(exif_fingerprint(&full[..512]).unwrap(), expected);
        assert_eq!(file_fingerprint(&path).unwrap(), expected);
    }
}
