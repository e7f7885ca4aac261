//! Image representation for the media store.

use serde::{Deserialize, Serialize};

use super::NoteId;

/// An image ingested from the notes tree.
///
/// Content-addressed: `id` is the SHA-256 hex digest of the bytes, so the
/// same image referenced from several notes is stored once. Bytes serialize
/// as Base64 in the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// SHA-256 hex digest of the image bytes.
    pub id: String,
    /// Note that referenced the image when it was first ingested.
    pub note_id: NoteId,
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// MIME type inferred from the file extension.
    pub mime_type: String,
    /// The (percent-decoded) reference string as it appears in the note.
    pub relative_path: String,
    /// Resolved absolute path on disk at ingestion time.
    pub absolute_path: String,
}

impl Image {
    /// Compute the content-addressed id for a byte buffer.
    pub fn id_for_bytes(bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Base64 (de)serialization for image bytes.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
