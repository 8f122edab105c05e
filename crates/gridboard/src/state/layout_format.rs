//! Compact persisted layout format.
//!
//! ```json
//! { "v": 2, "widgets": { "kpi-1": { "t": "kpi", "x": 0, "y": 0, "w": 3, "h": 2 } } }
//! ```
//!
//! Only type and geometry are stored. Widget `data` and visibility are
//! runtime concerns and are re-derived after a restore.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A serialized layout, stamped with its schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLayout {
    /// Schema version the layout was written with.
    #[serde(rename = "v")]
    pub version: u32,
    /// Widgets keyed by id. Ordered so exports are byte-stable.
    #[serde(default)]
    pub widgets: BTreeMap<String, PersistedWidget>,
}

/// Just the version stamp, read before the rest of a document so layouts
/// written by another schema can be recognised whatever their shape.
#[derive(Deserialize)]
struct VersionHeader {
    v: u32,
}

/// Geometry and type of one persisted widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedWidget {
    /// Widget type identifier.
    #[serde(rename = "t")]
    pub widget_type: String,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Width in columns.
    #[serde(rename = "w")]
    pub width: u32,
    /// Height in rows.
    #[serde(rename = "h")]
    pub height: u32,
}

impl PersistedLayout {
    /// An empty layout for `version`.
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            widgets: BTreeMap::new(),
        }
    }

    /// Reads only the `v` stamp of a serialized layout.
    pub fn read_version(text: &str) -> Result<u32, serde_json::Error> {
        Ok(serde_json::from_str::<VersionHeader>(text)?.v)
    }

    /// Parses the compact JSON form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Compact JSON, as written to storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented JSON, for display.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
