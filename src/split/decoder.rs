use crate::error::DecodeError;
use crate::split::types::DecoderKind;
use serde_json::Value;

/// Parses single ndjson lines into JSON values
pub struct RecordDecoder {
    kind: DecoderKind,
    // simd-json parses in place, so lines are copied into a reusable buffer
    scratch: Vec<u8>,
}

impl RecordDecoder {
    pub fn new(kind: DecoderKind) -> Self {
        RecordDecoder {
            kind,
            scratch: Vec::new(),
        }
    }

    pub fn kind(&self) -> DecoderKind {
        self.kind
    }

    /// Decode one line, without its terminator, into a record.
    ///
    /// Lines are raw bytes; anything that is not UTF-8 is a decode failure.
    pub fn decode(&mut self, line: &[u8]) -> Result<Value, DecodeError> {
        match self.kind {
            DecoderKind::Serde => Ok(serde_json::from_slice(line)?),
            DecoderKind::Simd => {
                self.scratch.clear();
                self.scratch.extend_from_slice(line);
                Ok(simd_json::serde::from_slice(&mut self.scratch)?)
            }
        }
    }
}

impl Default for RecordDecoder {
    fn default() -> Self {
        RecordDecoder::new(DecoderKind::default())
    }
}
