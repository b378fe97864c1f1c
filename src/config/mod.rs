//! Config Parser (C1): turns a directory of Cisco-IOS-style text files
//! into the shared device-record entity model.

pub mod device;
pub mod normalize;
pub mod parser;

pub use device::{
    BgpNeighbor, BgpRecord, DeviceKind, DeviceRecord, InterfaceRecord, OspfNetwork, OspfRecord,
    SpanningTreeConfig, StaticRoute, VlanEntry, VlanState,
};
pub use normalize::normalize_interface_name;
pub use parser::parse;

use std::path::Path;

use log::warn;

use crate::error::{NetlabError, Result};

/// Read every file in `dir` and parse it into a [`DeviceRecord`].
///
/// A file that cannot be read produces a synthetic error record (§4.1
/// Failures) rather than aborting the batch; only a failure to read the
/// directory itself is fatal.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<DeviceRecord>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|source| NetlabError::ConfigDir {
        path: dir.display().to_string(),
        source,
    })?;

    let mut records = Vec::new();
    let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if !path.is_file() {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read_to_string(&path) {
            Ok(text) => records.push(parse(&stem, &text)),
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                records.push(DeviceRecord::error(&stem));
            }
        }
    }
    Ok(records)
}
