//! Codec descriptor decoding from `CodecPrivateData`.
//!
//! Smooth Streaming signals codec configuration as a hex-encoded binary blob
//! whose layout depends on the FourCC. This module turns that blob into an
//! RFC 6381 style codec string (`avc1.PPCCLL`, `mp4a.40.N`).

use tracing::{debug, warn};

/// Annex B start code in hex form
const START_CODE: &[u8] = b"00000001";

/// Start code plus the two hex characters of the NAL header byte
const SPS_MARKER_LEN: usize = START_CODE.len() + 2;

/// profile_idc, constraint flags and level_idc: three bytes, six hex chars
const AVC_TRIPLET_LEN: usize = 6;

/// Emitted when an H264 blob carries no SPS NAL unit
pub const AVC_UNDEFINED: &str = "avc1.undefined";

/// Decode a FourCC + `CodecPrivateData` pair into a codec descriptor.
///
/// Returns `None` for unsupported FourCCs and for absent private data;
/// callers treat that as an unknown codec, not as a failure.
pub fn codec_descriptor(four_cc: &str, private_data: Option<&str>) -> Option<String> {
    let private_data = private_data?;

    if four_cc == "H264" {
        Some(avc_descriptor(private_data))
    } else if four_cc.starts_with("AAC") {
        aac_descriptor(private_data)
    } else {
        debug!("No codec descriptor for FourCC {}", four_cc);
        None
    }
}

/// `avc1.` followed by the profile/compatibility/level triplet that
/// follows the first SPS marker, or [`AVC_UNDEFINED`] when there is none.
fn avc_descriptor(private_data: &str) -> String {
    let hex = private_data.as_bytes();

    match find_sps_marker(hex) {
        Some(pos) => {
            let start = pos + SPS_MARKER_LEN;
            let end = (start + AVC_TRIPLET_LEN).min(hex.len());
            let triplet = String::from_utf8_lossy(&hex[start..end]).to_ascii_lowercase();
            format!("avc1.{}", triplet)
        }
        None => {
            warn!("H264 CodecPrivateData has no SPS NAL unit");
            AVC_UNDEFINED.to_string()
        }
    }
}

/// Offset of the first `00000001` start code whose NAL header is written
/// as a decimal digit followed by `7`.
fn find_sps_marker(hex: &[u8]) -> Option<usize> {
    hex.windows(SPS_MARKER_LEN).position(|window| {
        window.starts_with(START_CODE)
            && window[START_CODE.len()].is_ascii_digit()
            && window[START_CODE.len() + 1] == b'7'
    })
}

/// `mp4a.40.` followed by the audio object type (top five bits of the
/// first AudioSpecificConfig byte).
fn aac_descriptor(private_data: &str) -> Option<String> {
    let first_byte = leading_hex_byte(private_data)?;
    let object_type = (first_byte & 0xF8) >> 3;
    Some(format!("mp4a.40.{}", object_type))
}

/// Parse the leading hex digits of the first two characters.
fn leading_hex_byte(hex: &str) -> Option<u8> {
    let digits: String = hex
        .chars()
        .take(2)
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();

    if digits.is_empty() {
        warn!("AAC CodecPrivateData does not start with a hex byte");
        return None;
    }
    u8::from_str_radix(&digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avc_triplet_after_sps_marker() {
        let cpd = "000000016764001FAC2CA5014016EFFC100010014808080A000007D200017700C10000000168E9093525";
        assert_eq!(
            codec_descriptor("H264", Some(cpd)),
            Some("avc1.64001f".to_string())
        );
    }

    #[test]
    fn avc_skips_non_sps_nal_units() {
        // PPS (type 8) first, SPS second
        let cpd = "0000000168EE3CB0000000012742C01E8D";
        assert_eq!(
            codec_descriptor("H264", Some(cpd)),
            Some("avc1.42c01e".to_string())
        );
    }

    #[test]
    fn avc_marker_accepts_any_digit_before_seven() {
        assert_eq!(
            codec_descriptor("H264", Some("00000001274D401F")),
            Some("avc1.4d401f".to_string())
        );
    }

    #[test]
    fn avc_without_sps_is_undefined() {
        assert_eq!(
            codec_descriptor("H264", Some("0000000168EE3CB0")),
            Some(AVC_UNDEFINED.to_string())
        );
        assert_eq!(
            codec_descriptor("H264", Some("")),
            Some(AVC_UNDEFINED.to_string())
        );
    }

    #[test]
    fn avc_truncated_triplet_keeps_available_chars() {
        assert_eq!(
            codec_descriptor("H264", Some("00000001676400")),
            Some("avc1.6400".to_string())
        );
    }

    #[test]
    fn aac_object_type_from_first_byte() {
        // 0x12 = 0001 0010 -> object type 2 (AAC LC)
        assert_eq!(
            codec_descriptor("AACL", Some("1210")),
            Some("mp4a.40.2".to_string())
        );
        // 0x2B = 0010 1011 -> object type 5 (SBR)
        assert_eq!(
            codec_descriptor("AACH", Some("2B920800")),
            Some("mp4a.40.5".to_string())
        );
    }

    #[test]
    fn aac_matches_on_prefix_only() {
        assert_eq!(codec_descriptor("aacl", Some("1210")), None);
        assert_eq!(codec_descriptor("XAAC", Some("1210")), None);
    }

    #[test]
    fn aac_malformed_first_byte_is_absent() {
        assert_eq!(codec_descriptor("AACL", Some("ZZ10")), None);
        assert_eq!(codec_descriptor("AACL", Some("")), None);
        // single leading hex digit is still a value
        assert_eq!(
            codec_descriptor("AACL", Some("FZ")),
            Some("mp4a.40.1".to_string())
        );
    }

    #[test]
    fn unknown_fourcc_or_missing_data_is_absent() {
        assert_eq!(codec_descriptor("WVC1", Some("250000010FCBEE")), None);
        assert_eq!(codec_descriptor("H264", None), None);
        assert_eq!(codec_descriptor("AACL", None), None);
    }
}
