use super::{Manifest, PresentationHeader, QualityLevel, Stream, StreamType};
use crate::codec::codec_descriptor;
use crate::error::{MssError, Result};
use crate::markup::Element;
use tracing::{debug, info};

const ROOT: &str = "SmoothStreamingMedia";
const STREAM_INDEX: &str = "StreamIndex";
const QUALITY_LEVEL: &str = "QualityLevel";

/// Build a [`Manifest`] from a parsed markup document.
///
/// Only the document shape is fatal: a missing `SmoothStreamingMedia` root
/// or a root without any `StreamIndex` is a [`MssError::Structure`]. A
/// malformed individual attribute becomes `None` and the build continues.
pub fn build_manifest(document: &Element) -> Result<Manifest> {
    let root = document
        .children(ROOT)
        .next()
        .ok_or_else(|| MssError::Structure(format!("missing <{}> root element", ROOT)))?;

    let stream_elements: Vec<&Element> = root.children(STREAM_INDEX).collect();
    if stream_elements.is_empty() {
        return Err(MssError::Structure(format!(
            "<{}> has no <{}> elements",
            ROOT, STREAM_INDEX
        )));
    }

    let header = build_header(root);
    let streams: Vec<Stream> = stream_elements.into_iter().map(build_stream).collect();

    info!(
        "Built manifest: version={:?}, live={}, {} stream(s)",
        header.version,
        header.is_live,
        streams.len()
    );

    Ok(Manifest::new(header, streams))
}

fn build_header(root: &Element) -> PresentationHeader {
    let version = match (root.attr("MajorVersion"), root.attr("MinorVersion")) {
        (Some(major), Some(minor)) => Some(format!("{}.{}", major, minor)),
        _ => None,
    };

    PresentationHeader {
        version,
        timescale: int_attr(root, "TimeScale"),
        duration: int_attr(root, "Duration"),
        // case-sensitive on purpose: only the literal TRUE is live
        is_live: root.attr("IsLive") == Some("TRUE"),
        dvr_window_length: int_attr(root, "DVRWindowLength"),
        look_ahead_fragment_count: int_attr(root, "LookAheadFragmentCount"),
    }
}

fn build_stream(element: &Element) -> Stream {
    let quality_levels: Vec<QualityLevel> = element
        .children(QUALITY_LEVEL)
        .map(build_quality_level)
        .collect();

    let stream = Stream {
        stream_type: element.attr("Type").map(StreamType::from_attr),
        name: string_attr(element, "Name"),
        sub_type: string_attr(element, "Subtype"),
        chunks: int_attr(element, "Chunks"),
        max_width: nonzero_attr(element, "MaxWidth"),
        max_height: nonzero_attr(element, "MaxHeight"),
        display_width: nonzero_attr(element, "DisplayWidth"),
        display_height: nonzero_attr(element, "DisplayHeight"),
        url: string_attr(element, "Url"),
        chunk_list: Vec::new(),
        quality_levels,
    };

    debug!(
        "Stream {:?} ({:?}): {} quality level(s)",
        stream.name,
        stream.stream_type,
        stream.quality_levels.len()
    );
    stream
}

fn build_quality_level(element: &Element) -> QualityLevel {
    let four_cc = string_attr(element, "FourCC");
    let codec = four_cc
        .as_deref()
        .and_then(|fourcc| codec_descriptor(fourcc, element.attr("CodecPrivateData")));

    QualityLevel {
        index: string_attr(element, "Index"),
        bitrate: int_attr(element, "Bitrate"),
        four_cc,
        max_width: nonzero_attr(element, "MaxWidth"),
        max_height: nonzero_attr(element, "MaxHeight"),
        audio_tag: string_attr(element, "AudioTag"),
        channels: nonzero_attr(element, "Channels"),
        sampling_rate: nonzero_attr(element, "SamplingRate"),
        bits_per_sample: nonzero_attr(element, "BitsPerSample"),
        packet_size: nonzero_attr(element, "PacketSize"),
        codec,
    }
}

fn string_attr(element: &Element, name: &str) -> Option<String> {
    element.attr(name).map(str::to_string)
}

/// Integer attribute; a present `0` stays `Some(0)`.
fn int_attr(element: &Element, name: &str) -> Option<u64> {
    let raw = element.attr(name)?;
    let value = parse_leading_int(raw);
    if value.is_none() {
        debug!("<{}> {}={:?} is not an integer, treating as absent", element.name, name, raw);
    }
    value
}

/// Integer attribute where `0` is treated the same as absent.
fn nonzero_attr(element: &Element, name: &str) -> Option<u64> {
    int_attr(element, name).filter(|value| *value != 0)
}

/// Parse the leading decimal digits of `raw` after optional whitespace and
/// a `+` sign (`"720p"` -> 720). Negative and digit-less values are absent.
fn parse_leading_int(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    unsigned[..digits_end].parse().ok()
}
