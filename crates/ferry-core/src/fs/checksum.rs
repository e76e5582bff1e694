//! Content checksums for deployed files and backup snapshots.
//!
//! Checksums are blake3 digests rendered as lowercase hex. They are recorded
//! in the deployment manifest so that backups and deployed files can be
//! verified later without keeping the original bytes around.

use anyhow::Context;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the blake3 hex checksum of a single file.
///
/// The file is streamed in fixed-size chunks so large assets do not have to
/// fit in memory.
///
/// # Example
/// ```no_run
/// use ferry_core::fs::checksum::file_checksum;
/// use std::path::Path;
///
/// let sum = file_checksum(Path::new("/srv/forum/inc/plugins/widget.php"))?;
/// assert_eq!(sum.len(), 64);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn file_checksum(path: &Path) -> anyhow::Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Checksum of an in-memory buffer, used for pushed theme resources.
pub fn bytes_checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
