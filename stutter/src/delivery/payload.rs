use rama::bytes::Bytes;
use rand::RngExt as _;

use crate::behavior::PayloadKind;

/// Alphabet of textual payloads.
pub const TEXT_ALPHABET: &[u8; 63] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 \n";

/// Upper bound of the generated payload buffer.
///
/// Writes larger than this are served by repeating the buffer,
/// so a huge `size` never turns into a huge allocation.
pub const MAX_PAYLOAD_BUFFER_LEN: usize = 1024 * 1024;

/// Generate the payload buffer for a response whose largest write is `max_chunk_len`.
///
/// The buffer is generated once and reused for every chunk.
#[must_use]
pub fn generate(kind: PayloadKind, max_chunk_len: u64) -> Bytes {
    let len = usize::try_from(max_chunk_len)
        .unwrap_or(usize::MAX)
        .min(MAX_PAYLOAD_BUFFER_LEN);

    let mut rng = rand::rng();
    let mut buf = vec![0u8; len];
    match kind {
        PayloadKind::Binary => rng.fill(buf.as_mut_slice()),
        PayloadKind::Text => {
            for b in buf.iter_mut() {
                *b = TEXT_ALPHABET[rng.random_range(0..TEXT_ALPHABET.len())];
            }
        }
    }

    Bytes::from(buf)
}
