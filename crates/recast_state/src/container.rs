//! Framed binary container for persisted state.
//!
//! Every state file starts with a 4-byte little-endian header length, then a
//! bincode-encoded [`StateHeader`] (magic bytes, format version, state kind,
//! payload checksum), then the bincode payload. Decoding validates every part
//! of the header before touching the payload, so truncated or garbled files
//! are rejected as a whole instead of yielding partially populated state.

use std::io::Write;
use std::path::Path;

use recast_common::ContentHash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Magic bytes identifying a recast state file.
const STATE_MAGIC: [u8; 4] = *b"RCST";

/// Current container format version. Increment on breaking changes to the
/// header or to any payload layout.
pub const STATE_FORMAT_VERSION: u32 = 2;

/// Upper bound on bytes a header may claim while decoding.
const HEADER_LIMIT: usize = 4 * 1024;

/// Largest payload accepted at all.
const PAYLOAD_MAX: usize = 1 << 30;

/// Header prepended to every state file for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateHeader {
    /// Magic bytes: must be `b"RCST"`.
    pub magic: [u8; 4],

    /// Container format version.
    pub format_version: u32,

    /// Which state model the payload holds (e.g. `"dependency-store"`).
    pub kind: String,

    /// Fingerprint of the payload bytes.
    pub checksum: ContentHash,
}

/// Serializes `value` into a framed container of the given kind.
pub fn encode<T: Serialize>(kind: &str, value: &T) -> Result<Vec<u8>, StateError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
        |e| StateError::Serialization {
            reason: e.to_string(),
        },
    )?;

    let header = StateHeader {
        magic: STATE_MAGIC,
        format_version: STATE_FORMAT_VERSION,
        kind: kind.to_string(),
        checksum: ContentHash::from_bytes(&payload),
    };

    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| StateError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| StateError::Serialization {
        reason: "state header too large".to_string(),
    })?;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes a framed container, checking magic, version, kind, and checksum.
pub fn decode<T: DeserializeOwned>(kind: &str, raw: &[u8]) -> Result<T, StateError> {
    if raw.len() < 4 {
        return Err(StateError::InvalidHeader {
            reason: format!("file too short ({} bytes)", raw.len()),
        });
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let body = &raw[4..];
    if body.len() < header_len {
        return Err(StateError::InvalidHeader {
            reason: format!("header truncated ({} of {header_len} bytes)", body.len()),
        });
    }

    let (header, _): (StateHeader, usize) =
        decode_limited::<_, HEADER_LIMIT>(&body[..header_len]).map_err(|e| {
            StateError::InvalidHeader {
                reason: e.to_string(),
            }
        })?;

    if header.magic != STATE_MAGIC {
        return Err(StateError::InvalidHeader {
            reason: "missing magic bytes".to_string(),
        });
    }
    if header.format_version != STATE_FORMAT_VERSION {
        return Err(StateError::VersionMismatch {
            expected: STATE_FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    if header.kind != kind {
        return Err(StateError::InvalidHeader {
            reason: format!("expected kind `{kind}`, found `{}`", header.kind),
        });
    }

    let payload = &body[header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(StateError::ChecksumMismatch {
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    if payload.len() > PAYLOAD_MAX {
        return Err(StateError::Serialization {
            reason: format!("payload of {} bytes exceeds {PAYLOAD_MAX}", payload.len()),
        });
    }
    // Length prefixes are only trusted up to a bound scaled to the payload.
    let decoded = match payload.len() {
        n if n <= 1 << 16 => decode_limited::<T, { 1 << 20 }>(payload),
        n if n <= 1 << 20 => decode_limited::<T, { 1 << 24 }>(payload),
        _ => decode_limited::<T, PAYLOAD_MAX>(payload),
    };
    let (value, consumed) = decoded.map_err(|e| StateError::Serialization {
        reason: e.to_string(),
    })?;
    if consumed != payload.len() {
        return Err(StateError::Serialization {
            reason: format!("{} trailing bytes after payload", payload.len() - consumed),
        });
    }
    Ok(value)
}

fn decode_limited<T: DeserializeOwned, const LIMIT: usize>(
    bytes: &[u8],
) -> Result<(T, usize), bincode::error::DecodeError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard().with_limit::<LIMIT>())
}

/// Writes `bytes` to `path` so that a crash never leaves a valid-looking file
/// with the wrong content.
///
/// The bytes go to a sibling temporary file which is synced and then renamed
/// over the target. A crash before the rename leaves the previous file (or
/// none); a crash after leaves the complete new file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StateError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StateError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp_path = dir.join(format!(".{file_name}.tmp"));

    let mut file = std::fs::File::create(&tmp_path).map_err(|e| StateError::io(&tmp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| StateError::io(&tmp_path, e))?;
    file.sync_all().map_err(|e| StateError::io(&tmp_path, e))?;
    drop(file);

    std::fs::rename(&tmp_path, path).map_err(|e| StateError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> BTreeMap<String, Vec<String>> {
        let mut m = BTreeMap::new();
        m.insert("lib/x86/libfoo.so".to_string(), vec!["main".to_string()]);
        m.insert(
            "META-INF/services/a.B".to_string(),
            vec!["main".to_string(), "dep.jar".to_string()],
        );
        m
    }

    #[test]
    fn encode_then_decode() {
        let bytes = encode("merge-state", &sample()).unwrap();
        let back: BTreeMap<String, Vec<String>> = decode("merge-state", &bytes).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn too_short_is_invalid() {
        let err = decode::<u32>("merge-state", &[1, 2]).unwrap_err();
        assert!(matches!(err, StateError::InvalidHeader { .. }));
    }

    #[test]
    fn truncated_payload_fails_checksum() {
        let bytes = encode("merge-state", &sample()).unwrap();
        let truncated = &bytes[..bytes.len() - 3];
        let err = decode::<BTreeMap<String, Vec<String>>>("merge-state", truncated).unwrap_err();
        assert!(matches!(err, StateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let mut bytes = encode("merge-state", &sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = decode::<BTreeMap<String, Vec<String>>>("merge-state", &bytes).unwrap_err();
        assert!(matches!(err, StateError::ChecksumMismatch { .. }));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = encode("merge-state", &sample()).unwrap();
        let err =
            decode::<BTreeMap<String, Vec<String>>>("dependency-store", &bytes).unwrap_err();
        assert!(matches!(err, StateError::InvalidHeader { .. }));
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut bytes = vec![8, 0, 0, 0];
        bytes.extend_from_slice(b"notvalid");
        bytes.extend_from_slice(b"payload");
        assert!(decode::<u32>("merge-state", &bytes).is_err());
    }

    fn huge_length_prefix() -> Vec<u8> {
        let mut bytes = vec![253];
        bytes.extend_from_slice(&(1u64 << 62).to_le_bytes());
        bytes
    }

    #[test]
    fn oversized_kind_length_is_rejected() {
        let mut header = STATE_MAGIC.to_vec();
        header.push(STATE_FORMAT_VERSION as u8);
        header.extend_from_slice(&huge_length_prefix());
        let mut bytes = (header.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header);

        let err = decode::<u32>("merge-state", &bytes).unwrap_err();
        assert!(matches!(err, StateError::InvalidHeader { .. }));
    }

    #[test]
    fn oversized_payload_length_is_rejected() {
        let payload = huge_length_prefix();
        let header = StateHeader {
            magic: STATE_MAGIC,
            format_version: STATE_FORMAT_VERSION,
            kind: "merge-state".to_string(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes =
            bincode::serde::encode_to_vec(&header, bincode::config::standard()).unwrap();
        let mut bytes = (header_bytes.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&payload);

        let err = decode::<String>("merge-state", &bytes).unwrap_err();
        assert!(matches!(err, StateError::Serialization { .. }));
    }

    #[test]
    fn write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("merge-state");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("nested").join(".merge-state.tmp").exists());
    }
}
