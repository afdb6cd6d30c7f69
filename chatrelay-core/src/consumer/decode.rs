//! Incremental UTF-8 decoding of the relay body

use super::ConsumerError;

/// Holds back an incomplete trailing multi-byte sequence until the next
/// chunk completes it
#[derive(Debug, Default)]
pub(crate) struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    /// Decode `chunk` onto `out`. Returns whether any text was added.
    pub(crate) fn push(&mut self, chunk: &[u8], out: &mut String) -> Result<bool, ConsumerError> {
        self.pending.extend_from_slice(chunk);
        let before = out.len();

        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                out.push_str(text);
                self.pending.len()
            }
            Err(e) if e.error_len().is_some() => {
                return Err(ConsumerError::Decode(e.to_string()));
            }
            Err(e) => {
                let valid = e.valid_up_to();
                let text = std::str::from_utf8(&self.pending[..valid])
                    .map_err(|e| ConsumerError::Decode(e.to_string()))?;
                out.push_str(text);
                valid
            }
        };
        self.pending.drain(..valid);

        Ok(out.len() > before)
    }

    /// Fails if the stream ended in the middle of a multi-byte sequence
    pub(crate) fn finish(&self) -> Result<(), ConsumerError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(ConsumerError::Decode(format!(
                "stream ended with {} bytes of an incomplete character",
                self.pending.len()
            )))
        }
    }
}
