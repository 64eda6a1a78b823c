//! Parameter manifest decoding and storage-size selection
//!
//! A manifest maps artifact file names to the content id used to fetch them,
//! their expected digest and the storage (sector) size they apply to.
//!
//! # Examples
//!
//! ```rust
//! use param_fetcher::app::Manifest;
//!
//! let bytes = br#"{
//!     "a.vk": {"cid": "QmA", "digest": "0e0958009936b9d5e515ec97b8cb792d", "sector_size": 2048},
//!     "b.params": {"cid": "QmB", "digest": "4dae975de4f011f101f5a2f86d1daaba", "sector_size": 536870912}
//! }"#;
//!
//! let manifest = Manifest::from_slice(bytes, "parameter").unwrap();
//! let selected: Vec<_> = manifest.select_for_size(2048).map(|(name, _)| name).collect();
//! assert_eq!(selected, vec!["a.vk"]);
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::constants::fetch;
use crate::errors::{ManifestError, ManifestResult};

/// One artifact described by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    /// Content locator appended to the gateway URL
    #[serde(rename = "cid")]
    pub content_id: String,
    /// Expected lowercase hex of the truncated BLAKE2b-512 hash
    pub digest: String,
    /// Storage size this artifact applies to (0 = all sizes)
    #[serde(rename = "sector_size", default)]
    pub storage_size: u64,
}

/// Mapping from artifact file name to its entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Decode a manifest from raw JSON bytes
    ///
    /// `which` names the manifest in error messages.
    pub fn from_slice(bytes: &[u8], which: &'static str) -> ManifestResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ManifestError::Decode { which, source })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Entries that apply to `storage_size`
    pub fn select_for_size(
        &self,
        storage_size: u64,
    ) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.iter()
            .filter(move |(name, entry)| applies_to_size(name, entry, storage_size))
    }
}

/// Whether a file name follows the size-specific parameter naming convention
pub fn is_parameter_file(name: &str) -> bool {
    name.ends_with(fetch::PARAMS_SUFFIX)
}

/// Size filter for the primary manifest.
///
/// Only `.params` files are size-specific; verifying keys and other auxiliary
/// files are always selected.
pub fn applies_to_size(name: &str, entry: &ManifestEntry, storage_size: u64) -> bool {
    !is_parameter_file(name) || entry.storage_size == storage_size
}
