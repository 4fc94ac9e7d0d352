//! ICC Profile Module
//!
//! Minimal reader for the profile description (`desc` tag) of an ICC profile.
//! Only the header tag table is walked; no color math happens here.

use std::io;
use std::path::Path;

/// Tag signature of the profile description, "desc"
pub const TAG_SIG_DESC: u32 = 0x6465_7363;

const TAG_COUNT_OFFSET: usize = 128;
const TAG_TABLE_OFFSET: usize = 132;
const TAG_ENTRY_SIZE: usize = 12;
/// Type signature plus reserved bytes preceding the description payload
const DESC_TYPE_HEADER: usize = 8;

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let chunk = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Extract the description from raw ICC profile bytes.
///
/// Handles the v2 `desc` layout (ASCII count + string) and the v4 `mluc`
/// layout (first UTF-16BE record). Returns `None` on truncated or malformed
/// data.
pub fn profile_description(icc: &[u8]) -> Option<String> {
    let tag_count = read_u32_be(icc, TAG_COUNT_OFFSET)? as usize;

    for i in 0..tag_count {
        let entry = TAG_TABLE_OFFSET.checked_add(i.checked_mul(TAG_ENTRY_SIZE)?)?;
        let signature = read_u32_be(icc, entry)?;
        if signature != TAG_SIG_DESC {
            continue;
        }

        let data_offset = read_u32_be(icc, entry + 4)? as usize;
        let data_size = read_u32_be(icc, entry + 8)? as usize;
        let data = icc.get(data_offset..data_offset.checked_add(data_size)?)?;
        return decode_description(data);
    }

    None
}

fn decode_description(data: &[u8]) -> Option<String> {
    match data.get(0..4)? {
        b"desc" => {
            let count = read_u32_be(data, DESC_TYPE_HEADER)? as usize;
            let start = DESC_TYPE_HEADER + 4;
            let raw = data.get(start..start.checked_add(count)?)?;
            let text = String::from_utf8_lossy(raw);
            Some(text.trim_end_matches('\0').to_string())
        }
        b"mluc" => {
            let records = read_u32_be(data, DESC_TYPE_HEADER)?;
            if records == 0 {
                return None;
            }
            // first record: language(2) country(2) length(4) offset(4)
            let length = read_u32_be(data, 20)? as usize;
            let offset = read_u32_be(data, 24)? as usize;
            let raw = data.get(offset..offset.checked_add(length)?)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Some(String::from_utf16_lossy(&units).trim_end_matches('\0').to_string())
        }
        _ => None,
    }
}

/// Read a profile file and return its description, `Ok(None)` if the file is
/// not a parseable ICC profile.
pub fn read_profile_description(path: &Path) -> io::Result<Option<String>> {
    let bytes = std::fs::read(path)?;
    Ok(profile_description(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a profile whose only tag is a v2 `desc` holding `text`.
    fn v2_profile(text: &str) -> Vec<u8> {
        let mut tag = Vec::new();
        tag.extend_from_slice(b"desc");
        tag.extend_from_slice(&[0; 4]);
        tag.extend_from_slice(&((text.len() + 1) as u32).to_be_bytes());
        tag.extend_from_slice(text.as_bytes());
        tag.push(0);

        let data_offset = (TAG_TABLE_OFFSET + TAG_ENTRY_SIZE) as u32;
        let mut icc = vec![0u8; TAG_COUNT_OFFSET];
        icc.extend_from_slice(&1u32.to_be_bytes());
        icc.extend_from_slice(&TAG_SIG_DESC.to_be_bytes());
        icc.extend_from_slice(&data_offset.to_be_bytes());
        icc.extend_from_slice(&(tag.len() as u32).to_be_bytes());
        icc.extend_from_slice(&tag);
        icc
    }

    fn v4_profile(text: &str) -> Vec<u8> {
        let utf16: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        let mut tag = Vec::new();
        tag.extend_from_slice(b"mluc");
        tag.extend_from_slice(&[0; 4]);
        tag.extend_from_slice(&1u32.to_be_bytes());
        tag.extend_from_slice(&12u32.to_be_bytes());
        tag.extend_from_slice(b"enUS");
        tag.extend_from_slice(&(utf16.len() as u32).to_be_bytes());
        tag.extend_from_slice(&28u32.to_be_bytes());
        tag.extend_from_slice(&utf16);

        let data_offset = (TAG_TABLE_OFFSET + 2 * TAG_ENTRY_SIZE) as u32;
        let mut icc = vec![0u8; TAG_COUNT_OFFSET];
        icc.extend_from_slice(&2u32.to_be_bytes());
        // unrelated tag first
        icc.extend_from_slice(b"wtpt");
        icc.extend_from_slice(&0u32.to_be_bytes());
        icc.extend_from_slice(&0u32.to_be_bytes());
        icc.extend_from_slice(&TAG_SIG_DESC.to_be_bytes());
        icc.extend_from_slice(&data_offset.to_be_bytes());
        icc.extend_from_slice(&(tag.len() as u32).to_be_bytes());
        icc.extend_from_slice(&tag);
        icc
    }

    #[test]
    fn test_v2_description() {
        let icc = v2_profile("sRGB IEC61966-2.1");
        assert_eq!(
            profile_description(&icc).as_deref(),
            Some("sRGB IEC61966-2.1")
        );
    }

    #[test]
    fn test_v4_description_after_other_tag() {
        let icc = v4_profile("Adobe RGB (1998)");
        assert_eq!(profile_description(&icc).as_deref(), Some("Adobe RGB (1998)"));
    }

    #[test]
    fn test_truncated_profile() {
        let icc = v2_profile("Generic Gray Profile");
        assert_eq!(profile_description(&icc[..140]), None);
        assert_eq!(profile_description(&[0u8; 64]), None);
    }

    #[test]
    fn test_no_desc_tag() {
        let mut icc = vec![0u8; TAG_COUNT_OFFSET];
        icc.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(profile_description(&icc), None);
    }

    #[test]
    fn test_read_profile_description_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("target.icc");
        std::fs::write(&path, v2_profile("sRGB Profile")).unwrap();
        assert_eq!(
            read_profile_description(&path).unwrap().as_deref(),
            Some("sRGB Profile")
        );
        assert!(read_profile_description(&dir.path().join("missing.icc")).is_err());
    }
}
