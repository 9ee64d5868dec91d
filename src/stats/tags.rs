//! Tag dimensions attached to every sample.
//!
//! # Design Decisions
//! - Keys are a fixed, process-wide set
//! - Values must be printable ASCII and at most 255 bytes; anything else is
//!   rejected rather than rewritten

use std::fmt;

use metrics::Label;
use thiserror::Error;

/// Maximum length of a tag value in bytes.
pub const MAX_VALUE_LEN: usize = 255;

/// A tag dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagKey(&'static str);

impl TagKey {
    pub const METHOD: TagKey = TagKey("method");
    pub const PATH: TagKey = TagKey("path");
    pub const STATUS: TagKey = TagKey("status");
    pub const ERROR: TagKey = TagKey("error");

    /// Every dimension a sample may carry.
    pub const ALL: [TagKey; 4] = [Self::METHOD, Self::PATH, Self::STATUS, Self::ERROR];

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Rejected tag value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("value for tag {key} is {len} bytes, limit is {}", MAX_VALUE_LEN)]
    TooLong { key: TagKey, len: usize },

    #[error("value for tag {key} contains non-printable characters")]
    NonPrintable { key: TagKey },
}

/// Validated set of tags for one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<(TagKey, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, replacing an earlier value for the same key.
    pub fn insert(mut self, key: TagKey, value: impl Into<String>) -> Result<Self, TagError> {
        let value = value.into();
        if value.len() > MAX_VALUE_LEN {
            return Err(TagError::TooLong {
                key,
                len: value.len(),
            });
        }
        if !value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(TagError::NonPrintable { key });
        }

        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.tags.push((key, value)),
        }
        Ok(self)
    }

    pub fn get(&self, key: TagKey) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Labels in insertion order, for the metrics facade.
    pub fn labels(&self) -> Vec<Label> {
        self.tags
            .iter()
            .map(|(k, v)| Label::new(k.as_str(), v.clone()))
            .collect()
    }
}
