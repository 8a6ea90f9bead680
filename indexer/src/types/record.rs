use serde::Serialize;
use serde_json::{Map, Value};

use crate::conversions::attribute::decode_image;
use crate::error::IndexerResult;
use crate::types::StreamRecord;

/// A plain JSON object: the body indexed for a record.
pub type Document = Map<String, Value>;

/// Decoded form of a [`StreamRecord`]: three ordinary key to value maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedRecord {
    pub keys: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Document>,
}

impl ParsedRecord {
    /// Decodes the typed attribute maps of a change description.
    pub fn decode(record: &StreamRecord) -> IndexerResult<ParsedRecord> {
        Ok(ParsedRecord {
            keys: decode_image(&record.keys)?,
            new_image: record.new_image.as_ref().map(decode_image).transpose()?,
            old_image: record.old_image.as_ref().map(decode_image).transpose()?,
        })
    }

    /// Returns the maps in probing order: keys, new image, old image.
    pub fn images(&self) -> [Option<&Document>; 3] {
        [
            Some(&self.keys),
            self.new_image.as_ref(),
            self.old_image.as_ref(),
        ]
    }
}
