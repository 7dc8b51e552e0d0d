//! Restriction list
//!
//! An optional XML document whose `id` elements, at any depth, form an
//! allow-list of source join keys.

use crate::domain::{GarError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::path::Path;

/// Allow-list of join keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionList {
    ids: HashSet<String>,
}

impl RestrictionList {
    /// Parses a restriction document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut ids = HashSet::new();
        let mut depth_in_id = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"id" => depth_in_id += 1,
                Ok(Event::End(e)) if e.local_name().as_ref() == b"id" => {
                    depth_in_id = depth_in_id.saturating_sub(1)
                }
                Ok(Event::Text(text)) if depth_in_id > 0 => {
                    let value = text.unescape().map_err(|e| {
                        GarError::Input(format!("Invalid restriction document: {e}"))
                    })?;
                    let value = value.trim();
                    if !value.is_empty() {
                        ids.insert(value.to_string());
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(GarError::Input(format!(
                        "Invalid restriction document at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
            }
        }

        Ok(Self { ids })
    }

    /// Reads and parses a restriction document
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = tokio::fs::read_to_string(path).await.map_err(|e| {
            GarError::Input(format!(
                "Failed to read restriction document {}: {}",
                path.display(),
                e
            ))
        })?;

        let list = Self::from_xml(&xml)?;
        tracing::info!(
            path = %path.display(),
            count = list.len(),
            "Loaded restriction list"
        );
        Ok(list)
    }

    /// Builds a list from known ids
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, join_key: &str) -> bool {
        self.ids.contains(join_key.trim())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Whether an entity passes an optional restriction list
pub fn is_allowed(restriction: Option<&RestrictionList>, join_key: Option<&str>) -> bool {
    match restriction {
        None => true,
        Some(list) => join_key.is_some_and(|key| list.contains(key)),
    }
}
