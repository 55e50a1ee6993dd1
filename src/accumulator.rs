//! Push-driven manifest accumulator.
//!
//! Bytes arrive in arbitrary chunks tagged with a declared character
//! encoding. Each chunk is decoded as it arrives; a code point split across
//! chunks is buffered by the decoder until the next chunk completes it. On
//! [`ManifestAccumulator::end`] the complete text is parsed into a markup tree
//! and built into a [`Manifest`].
//!
//! State machine: `Idle -> Accumulating -> Finalizing -> Completed | Failed`.

use crate::error::{MssError, Result};
use crate::manifest::{Manifest, build_manifest};
use crate::markup::{MarkupParser, QuickXmlParser};
use crate::metrics;
use encoding_rs::{Decoder, DecoderResult};
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Character encodings a manifest may be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// ISO-8859-1: each byte is the code point of the same value
    #[default]
    Latin1,
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Stateful decoder for multi-byte encodings; `None` for Latin1, where
    /// every byte is a whole character.
    fn new_decoder(self) -> Option<Decoder> {
        let encoding = match self {
            Encoding::Latin1 => return None,
            Encoding::Utf8 => encoding_rs::UTF_8,
            Encoding::Utf16Le => encoding_rs::UTF_16LE,
            Encoding::Utf16Be => encoding_rs::UTF_16BE,
        };
        Some(encoding.new_decoder_with_bom_removal())
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
        }
    }
}

impl FromStr for Encoding {
    type Err = MssError;

    fn from_str(label: &str) -> Result<Self> {
        match label.trim().to_lowercase().as_str() {
            "latin1" | "binary" | "iso-8859-1" => Ok(Encoding::Latin1),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "utf16be" | "utf-16be" => Ok(Encoding::Utf16Be),
            other => Err(MssError::Config(format!("Unsupported encoding '{}'", other))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable phase of a [`ManifestAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Idle,
    Accumulating,
    Finalizing,
    Completed,
    Failed,
}

/// Terminal event delivered to a subscriber exactly once.
#[derive(Debug, Clone)]
pub enum Completion {
    Finished(Arc<Manifest>),
    Failed(MssError),
}

enum Phase {
    Idle,
    Accumulating,
    Finalizing,
    Completed(Arc<Manifest>),
    Failed(MssError),
}

/// Decodes a manifest byte stream and builds its [`Manifest`] on end of input.
///
/// One instance handles exactly one manifest. Dropping an instance before
/// [`end`](Self::end) abandons it; subscribers then observe a closed channel.
pub struct ManifestAccumulator<P = QuickXmlParser> {
    encoding: Encoding,
    decoder: Option<Decoder>,
    text: String,
    bytes_received: u64,
    phase: Phase,
    parser: P,
    listener: Option<oneshot::Sender<Completion>>,
    started_at: Option<Instant>,
}

impl ManifestAccumulator<QuickXmlParser> {
    pub fn new(encoding: Encoding) -> Self {
        Self::with_parser(encoding, QuickXmlParser)
    }
}

impl Default for ManifestAccumulator<QuickXmlParser> {
    fn default() -> Self {
        Self::new(Encoding::default())
    }
}

impl<P: MarkupParser> ManifestAccumulator<P> {
    /// Create an accumulator that parses markup with `parser`.
    pub fn with_parser(encoding: Encoding, parser: P) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder(),
            text: String::new(),
            bytes_received: 0,
            phase: Phase::Idle,
            parser,
            listener: None,
            started_at: None,
        }
    }

    /// Register for the terminal [`Completion`] event.
    ///
    /// Only the most recent subscription receives the event. Subscribing
    /// after a terminal state has been reached delivers it immediately.
    pub fn subscribe(&mut self) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();
        match &self.phase {
            Phase::Completed(manifest) => {
                let _ = tx.send(Completion::Finished(Arc::clone(manifest)));
            }
            Phase::Failed(error) => {
                let _ = tx.send(Completion::Failed(error.clone()));
            }
            _ => {
                if self.listener.replace(tx).is_some() {
                    debug!("Replacing earlier completion subscriber; its channel is closed");
                }
            }
        }
        rx
    }

    /// Decode and append one chunk.
    ///
    /// # Errors
    /// - [`MssError::Usage`] once [`end`](Self::end) has been called or a
    ///   terminal state was reached; the accumulator is left unchanged.
    /// - [`MssError::Decode`] for bytes invalid in the declared encoding;
    ///   the accumulator moves to `Failed`.
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Accumulating;
                self.started_at = Some(Instant::now());
            }
            Phase::Accumulating => {}
            _ => {
                return Err(MssError::Usage(format!(
                    "write of {} byte(s) after end of input ({:?})",
                    chunk.len(),
                    self.state()
                )));
            }
        }

        self.bytes_received += chunk.len() as u64;
        debug!(
            "Accumulating {} byte chunk ({} total, {})",
            chunk.len(),
            self.bytes_received,
            self.encoding
        );

        if let Err(error) = self.decode(chunk, false) {
            self.fail(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Signal end of input: flush the decoder, parse and build the manifest.
    ///
    /// # Errors
    /// [`MssError::Usage`] if called twice; otherwise the decode, markup or
    /// structure error that moved the accumulator to `Failed`.
    pub fn end(&mut self) -> Result<Arc<Manifest>> {
        match self.phase {
            Phase::Idle | Phase::Accumulating => {}
            _ => {
                return Err(MssError::Usage(format!(
                    "end of input already signalled ({:?})",
                    self.state()
                )));
            }
        }

        self.phase = Phase::Finalizing;
        self.started_at.get_or_insert_with(Instant::now);

        match self.finalize() {
            Ok(manifest) => {
                let manifest = Arc::new(manifest);
                info!(
                    "Manifest complete: {} stream(s) from {} byte(s)",
                    manifest.streams().len(),
                    self.bytes_received
                );
                metrics::record_parse("finished", self.bytes_received);
                if let Some(started_at) = self.started_at {
                    metrics::record_parse_duration(started_at);
                }
                self.phase = Phase::Completed(Arc::clone(&manifest));
                self.notify(Completion::Finished(Arc::clone(&manifest)));
                Ok(manifest)
            }
            Err(error) => {
                self.fail(error.clone());
                Err(error)
            }
        }
    }

    /// Drain a stream of byte chunks into the accumulator and end it.
    ///
    /// # Errors
    /// The first error yielded by the stream (mapped with `map_err`), or any
    /// error from [`write`](Self::write) / [`end`](Self::end).
    pub async fn feed<S, B, E>(
        &mut self,
        chunks: S,
        map_err: impl Fn(E) -> MssError,
    ) -> Result<Arc<Manifest>>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
    {
        futures_util::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => self.write(bytes.as_ref())?,
                Err(e) => {
                    let error = map_err(e);
                    if matches!(self.phase, Phase::Idle | Phase::Accumulating) {
                        self.fail(error.clone());
                    }
                    return Err(error);
                }
            }
        }
        self.end()
    }

    pub fn state(&self) -> AccumulatorState {
        match self.phase {
            Phase::Idle => AccumulatorState::Idle,
            Phase::Accumulating => AccumulatorState::Accumulating,
            Phase::Finalizing => AccumulatorState::Finalizing,
            Phase::Completed(_) => AccumulatorState::Completed,
            Phase::Failed(_) => AccumulatorState::Failed,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The built manifest; only available once `Completed`.
    pub fn manifest(&self) -> Option<&Arc<Manifest>> {
        match &self.phase {
            Phase::Completed(manifest) => Some(manifest),
            _ => None,
        }
    }

    /// The error that moved the accumulator to `Failed`.
    pub fn error(&self) -> Option<&MssError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Text decoded so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn finalize(&mut self) -> Result<Manifest> {
        self.decode(&[], true)?;
        let document = self.parser.parse(&self.text)?;
        build_manifest(&document)
    }

    fn decode(&mut self, mut src: &[u8], last: bool) -> Result<()> {
        let Some(decoder) = self.decoder.as_mut() else {
            self.text.push_str(&encoding_rs::mem::decode_latin1(src));
            return Ok(());
        };

        loop {
            if let Some(needed) = decoder.max_utf8_buffer_length_without_replacement(src.len()) {
                self.text.reserve(needed);
            }

            let (result, read) =
                decoder.decode_to_string_without_replacement(src, &mut self.text, last);
            src = &src[read..];

            match result {
                DecoderResult::InputEmpty => return Ok(()),
                // reserve() above was not enough; grow and continue
                DecoderResult::OutputFull => self.text.reserve(src.len().max(16) * 3),
                DecoderResult::Malformed(malformed, _) => {
                    return Err(MssError::Decode(format!(
                        "{} malformed byte(s) for {} after {} decoded char(s)",
                        malformed,
                        self.encoding,
                        self.text.chars().count()
                    )));
                }
            }
        }
    }

    fn fail(&mut self, error: MssError) {
        warn!("Manifest parsing failed: {}", error);
        metrics::record_parse("failed", self.bytes_received);
        self.phase = Phase::Failed(error.clone());
        self.notify(Completion::Failed(error));
    }

    fn notify(&mut self, completion: Completion) {
        if let Some(listener) = self.listener.take() {
            // receiver may have been dropped; nobody left to tell
            let _ = listener.send(completion);
        }
    }
}

impl<P> fmt::Debug for ManifestAccumulator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestAccumulator")
            .field("encoding", &self.encoding)
            .field("bytes_received", &self.bytes_received)
            .field("text_len", &self.text.len())
            .finish_non_exhaustive()
    }
}

impl<P> fmt::Display for ManifestAccumulator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
