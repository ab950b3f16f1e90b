//! Pages, chunks and the records stored in the vector index

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text of one PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index
    pub number: u32,
    /// Extracted text
    pub content: String,
}

impl Page {
    pub fn new(number: u32, content: impl Into<String>) -> Self {
        Self {
            number,
            content: content.into(),
        }
    }
}

/// A window of source text taken from a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Zero-based page index the text came from
    pub page: u32,
}

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub text: String,
    pub page: u32,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            page: chunk.page,
        }
    }
}

/// An `(id, vector, metadata)` triple for upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbor hit returned by the vector index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl VectorMatch {
    /// Stored chunk text.
    ///
    /// Older indexes keep the text under `content` instead of `text`.
    pub fn text(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        metadata
            .get("text")
            .or_else(|| metadata.get("content"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(metadata: Value) -> VectorMatch {
        serde_json::from_value(json!({ "id": "chunk_0", "score": 0.8, "metadata": metadata }))
            .unwrap()
    }

    #[test]
    fn test_text_prefers_text_field() {
        let m = hit(json!({ "text": "anemia", "content": "other", "page": 3 }));
        assert_eq!(m.text(), Some("anemia"));
    }

    #[test]
    fn test_text_falls_back_to_content() {
        let m = hit(json!({ "content": "fever" }));
        assert_eq!(m.text(), Some("fever"));
    }

    #[test]
    fn test_text_missing() {
        assert_eq!(hit(json!({ "page": 1 })).text(), None);

        let bare: VectorMatch = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert_eq!(bare.text(), None);
        assert_eq!(bare.score, 0.0);
    }

    #[test]
    fn test_record_wire_shape() {
        let chunk = Chunk {
            text: "aspirin".to_string(),
            page: 12,
        };
        let record = VectorRecord {
            id: "chunk_7".to_string(),
            values: vec![0.5, 0.25],
            metadata: ChunkMetadata::from(&chunk),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "id": "chunk_7", "values": [0.5, 0.25], "metadata": { "text": "aspirin", "page": 12 } })
        );
    }
}
