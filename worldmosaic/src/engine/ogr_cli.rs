//! Vector mask backed by the OGR command-line tools.
//!
//! `ogrinfo` with a spatial filter reports how many features of the mask
//! layer intersect a bounding box; any nonzero count includes the block.

use crate::geo::Bounds;
use crate::mask::vector::VectorMask;
use crate::mask::MaskError;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

const OGRINFO_BIN: &str = "ogrinfo";

/// [`VectorMask`] implementation querying a vector layer via `ogrinfo`.
pub struct OgrCliVectorMask {
    path: PathBuf,
    layer: Option<String>,
}

impl OgrCliVectorMask {
    pub fn new(path: PathBuf, layer: Option<String>) -> Self {
        Self { path, layer }
    }
}

/// Sums the `Feature Count:` lines of an `ogrinfo` summary.
fn parse_feature_count(summary: &str) -> Option<u64> {
    let mut found = false;
    let mut total = 0u64;
    for line in summary.lines() {
        if let Some(raw) = line.trim().strip_prefix("Feature Count:") {
            total += raw.trim().parse::<u64>().ok()?;
            found = true;
        }
    }
    found.then_some(total)
}

impl VectorMask for OgrCliVectorMask {
    fn intersects(&self, footprint: &Bounds) -> Result<bool, MaskError> {
        let mut cmd = Command::new(OGRINFO_BIN);
        cmd.arg("-ro")
            .arg("-so")
            .arg("-spat")
            .arg(footprint.min_x.to_string())
            .arg(footprint.min_y.to_string())
            .arg(footprint.max_x.to_string())
            .arg(footprint.max_y.to_string());
        match &self.layer {
            Some(layer) => {
                cmd.arg(&self.path).arg(layer);
            }
            None => {
                cmd.arg("-al").arg(&self.path);
            }
        }

        let output = cmd
            .output()
            .map_err(|e| MaskError::VectorQuery(format!("failed to run ogrinfo: {e}")))?;
        if !output.status.success() {
            return Err(MaskError::VectorQuery(format!(
                "ogrinfo exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let summary = String::from_utf8_lossy(&output.stdout);
        let count = parse_feature_count(&summary).ok_or_else(|| {
            MaskError::VectorQuery("ogrinfo summary had no feature count".to_string())
        })?;
        debug!(count, "vector mask features intersecting block footprint");
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_layer_count() {
        let summary = "Layer name: aoi\nGeometry: Polygon\nFeature Count: 3\nExtent: ...";
        assert_eq!(parse_feature_count(summary), Some(3));
    }

    #[test]
    fn test_parse_sums_multiple_layers() {
        let summary = "Feature Count: 2\nother\n  Feature Count: 5\n";
        assert_eq!(parse_feature_count(summary), Some(7));
    }

    #[test]
    fn test_parse_missing_count_is_none() {
        assert_eq!(parse_feature_count("INFO: no layers"), None);
    }
}
