//! Typed Smooth Streaming presentation model.
//!
//! A [`Manifest`] is built in one pass from a markup tree (see
//! [`builder::build_manifest`]) and is never mutated afterwards.

pub mod builder;

pub use builder::build_manifest;

use serde::Serialize;
use std::fmt;

/// Global timing and liveness metadata from the `SmoothStreamingMedia` root.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationHeader {
    /// `MajorVersion.MinorVersion`; absent if either part is missing
    pub version: Option<String>,
    /// Ticks per second
    pub timescale: Option<u64>,
    /// Total duration in ticks
    pub duration: Option<u64>,
    pub is_live: bool,
    /// DVR window in ticks
    pub dvr_window_length: Option<u64>,
    pub look_ahead_fragment_count: Option<u64>,
}

/// Track group type from the `Type` attribute of a `StreamIndex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum StreamType {
    Video,
    Audio,
    Text,
    Other(String),
}

impl StreamType {
    pub fn from_attr(value: &str) -> Self {
        match value {
            "video" => StreamType::Video,
            "audio" => StreamType::Audio,
            "text" => StreamType::Text,
            other => StreamType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StreamType::Video => "video",
            StreamType::Audio => "audio",
            StreamType::Text => "text",
            StreamType::Other(other) => other,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StreamType> for String {
    fn from(stream_type: StreamType) -> Self {
        stream_type.as_str().to_string()
    }
}

/// Per-fragment timing entry of a stream.
///
/// Reserved: the builder does not populate chunk lists yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkTiming {
    pub start_time: Option<u64>,
    pub duration: Option<u64>,
}

/// One bitrate variant of a [`Stream`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityLevel {
    pub index: Option<String>,
    /// Bits per second
    pub bitrate: Option<u64>,
    #[serde(rename = "fourCC")]
    pub four_cc: Option<String>,
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    pub audio_tag: Option<String>,
    pub channels: Option<u64>,
    pub sampling_rate: Option<u64>,
    pub bits_per_sample: Option<u64>,
    pub packet_size: Option<u64>,
    /// Codec string derived from FourCC and `CodecPrivateData`
    pub codec: Option<String>,
}

/// One logical track group (`StreamIndex`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(rename = "type")]
    pub stream_type: Option<StreamType>,
    pub name: Option<String>,
    pub sub_type: Option<String>,
    pub chunks: Option<u64>,
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    pub display_width: Option<u64>,
    pub display_height: Option<u64>,
    /// Fragment URL template, e.g. `QualityLevels({bitrate})/Fragments(video={start time})`
    pub url: Option<String>,
    pub chunk_list: Vec<ChunkTiming>,
    pub quality_levels: Vec<QualityLevel>,
}

/// A fully built presentation: header plus ordered streams.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    header: PresentationHeader,
    streams: Vec<Stream>,
}

impl Manifest {
    pub(crate) fn new(header: PresentationHeader, streams: Vec<Stream>) -> Self {
        Self { header, streams }
    }

    pub fn header(&self) -> &PresentationHeader {
        &self.header
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// Streams of the given type, in manifest order.
    pub fn streams_of<'a>(
        &'a self,
        stream_type: &'a StreamType,
    ) -> impl Iterator<Item = &'a Stream> + 'a {
        self.streams
            .iter()
            .filter(move |s| s.stream_type.as_ref() == Some(stream_type))
    }
}
