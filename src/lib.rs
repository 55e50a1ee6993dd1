//! Streaming parser for Microsoft Smooth Streaming (MSS) manifests.
//!
//! Bytes are pushed into a [`ManifestAccumulator`] in any chunking and any of
//! the supported [`Encoding`]s; on end of input the text is parsed into a
//! markup tree and built into a typed [`Manifest`] with decoded codec strings.
//!
//! ```
//! use mss_parser::{Encoding, ManifestAccumulator};
//!
//! let mut accumulator = ManifestAccumulator::new(Encoding::Utf8);
//! accumulator.write(br#"<SmoothStreamingMedia MajorVersion="2" MinorVersion="0">"#)?;
//! accumulator.write(br#"<StreamIndex Type="audio"><QualityLevel FourCC="AACL" CodecPrivateData="1210"/>"#)?;
//! accumulator.write(b"</StreamIndex></SmoothStreamingMedia>")?;
//! let manifest = accumulator.end()?;
//!
//! assert_eq!(manifest.header().version.as_deref(), Some("2.0"));
//! assert_eq!(manifest.streams()[0].quality_levels[0].codec.as_deref(), Some("mp4a.40.2"));
//! # Ok::<(), mss_parser::MssError>(())
//! ```

pub mod accumulator;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod markup;
pub mod metrics;

pub use accumulator::{AccumulatorState, Completion, Encoding, ManifestAccumulator};
pub use error::{MssError, Result};
pub use manifest::{Manifest, PresentationHeader, QualityLevel, Stream, StreamType};
