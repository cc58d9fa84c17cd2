//! Storage event notifications
//!
//! The importer is triggered by object-created notifications in the shape
//! S3 delivers them: a `Records` array where each record names a bucket and
//! a URL-encoded object key. This module parses the notification document
//! and resolves each record into an [`ObjectLocator`].

use hwlog_common::{ImportError, Result};
use serde::Deserialize;

use crate::config::CSV_SUFFIX;

/// An object-created notification document.
#[derive(Debug, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

/// A resolved storage locator: container plus decoded object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether the object key carries the suffix the trigger is filtered to.
    pub fn is_csv(&self) -> bool {
        self.key.to_lowercase().ends_with(CSV_SUFFIX)
    }
}

impl std::fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl StorageEvent {
    /// Parse a notification document from raw JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        let event: StorageEvent = serde_json::from_str(raw)
            .map_err(|e| ImportError::retrieval(format!("malformed event notification: {e}")))?;

        if event.records.is_empty() {
            return Err(ImportError::retrieval(
                "event notification contains no records",
            ));
        }

        Ok(event)
    }

    /// Resolve every record into a locator, decoding the object keys.
    pub fn locators(&self) -> Result<Vec<ObjectLocator>> {
        self.records
            .iter()
            .map(|record| {
                let key = decode_object_key(&record.s3.object.key)?;
                Ok(ObjectLocator::new(record.s3.bucket.name.clone(), key))
            })
            .collect()
    }
}

/// Decode a URL-encoded object key as it appears in event notifications.
///
/// Keys arrive form-encoded: `+` stands for a space and reserved bytes are
/// percent-escaped. A key that does not decode to valid UTF-8 is a
/// malformed locator.
pub fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ImportError::retrieval(format!("object key failed to decode: {e}")))
}
