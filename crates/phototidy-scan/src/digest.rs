//! Content digest functions.

use std::io::{self, Read};

use blake3::Hasher;

use phototidy_core::ContentHash;

/// Size of each read when streaming a file through a digest.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// A function from a byte stream to a fixed-size fingerprint.
///
/// Implementations must read incrementally; media files can be far larger
/// than available memory.
pub trait ContentDigest: Send + Sync {
    /// Consume `reader` to the end and return its digest.
    fn digest(&self, reader: &mut dyn Read) -> io::Result<ContentHash>;
}

/// BLAKE3 digest, fed in [`CHUNK_SIZE`] reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digest;

impl ContentDigest for Blake3Digest {
    fn digest(&self, reader: &mut dyn Read) -> io::Result<ContentHash> {
        let mut hasher = Hasher::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(ContentHash::new(*hasher.finalize().as_bytes()))
    }
}
