//! Benchmark configuration

use std::path::{Path, PathBuf};

use mvrtree::{PropertyKind, PropertySet, PropertyValue};
use thiserror::Error;

/// Property names holding unsigned integers
const UNSIGNED_PROPERTIES: &[&str] = &[
    "Dimension",
    "IndexCapacity",
    "LeafCapacity",
    "IndexPoolCapacity",
    "LeafPoolCapacity",
    "RegionPoolCapacity",
    "PointPoolCapacity",
    "NearMinimumOverlapFactor",
];

/// Property names holding doubles
const DOUBLE_PROPERTIES: &[&str] = &[
    "FillFactor",
    "SplitDistributionFactor",
    "ReinsertFactor",
    "StrongVersionOverflow",
    "VersionUnderflow",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of value a property holds. Unknown names are booleans.
pub fn classify(name: &str) -> PropertyKind {
    if UNSIGNED_PROPERTIES.contains(&name) {
        PropertyKind::UnsignedInt
    } else if DOUBLE_PROPERTIES.contains(&name) {
        PropertyKind::Double
    } else {
        PropertyKind::Bool
    }
}

fn parse_value(name: &str, token: &str) -> Option<PropertyValue> {
    match classify(name) {
        PropertyKind::UnsignedInt => token.parse().ok().map(PropertyValue::UnsignedInt),
        PropertyKind::Double => token.parse().ok().map(PropertyValue::Double),
        // anything but a literal zero counts as true
        PropertyKind::Bool => Some(PropertyValue::Bool(
            token.parse::<i64>().map(|v| v != 0).unwrap_or(true),
        )),
    }
}

/// Parse `name value` pairs, one per line.
///
/// Lines with fewer than two tokens are skipped and tokens after the second
/// are ignored. A numeric value that does not parse drops its pair with a
/// warning. A repeated name keeps the last value.
pub fn parse_properties(text: &str) -> PropertySet {
    let mut properties = PropertySet::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let (name, token) = match (tokens.next(), tokens.next()) {
            (Some(name), Some(token)) => (name, token),
            _ => continue,
        };

        match parse_value(name, token) {
            Some(value) => {
                properties.set(name, value);
            }
            None => log::warn!(
                "Skipping property {} on line {}: {:?} is not a valid {} value",
                name,
                line_no + 1,
                token,
                classify(name)
            ),
        }
    }
    properties
}

/// Reads index properties from a flat key/value file.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: impl AsRef<Path>) -> Result<PropertySet, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let properties = parse_properties(&text);
        log::debug!("Loaded {} properties from {:?}", properties.len(), path);
        Ok(properties)
    }
}

/// Configuration for harness runs
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Pages the index buffer keeps in memory
    pub buffer_pages: usize,
    /// Bytes stored with every inserted entry
    pub payload_size: usize,
    /// Appended to the index name to form the storage file
    pub storage_extension: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            buffer_pages: 10,
            payload_size: 1,
            storage_extension: "mvrtree".to_string(),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage_path(&self, index_name: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", index_name, self.storage_extension))
    }
}
