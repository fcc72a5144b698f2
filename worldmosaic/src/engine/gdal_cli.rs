//! Raster engine backed by the GDAL command-line tools.
//!
//! `gdalinfo -json` inspects datasets, `gdal_translate` fetches and resamples
//! block windows, and `gdalbuildvrt` assembles the mosaic. Engine options
//! (remote cache path, proxy) are passed per invocation via `--config`, so no
//! ambient process state is mutated.

use super::{
    DatasetInfo, EngineContext, EngineError, FetchOutcome, FetchRequest, RasterEngine,
};
use crate::geo::{Bounds, GeoTransform};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

const GDALINFO_BIN: &str = "gdalinfo";
const GDAL_TRANSLATE_BIN: &str = "gdal_translate";
const GDALBUILDVRT_BIN: &str = "gdalbuildvrt";

#[derive(Debug, Deserialize)]
struct GdalInfoReport {
    size: [u64; 2],
    #[serde(rename = "geoTransform")]
    geo_transform: Option<[f64; 6]>,
}

/// GDAL CLI implementation of [`RasterEngine`].
#[derive(Debug, Default, Clone)]
pub struct GdalCliEngine;

impl GdalCliEngine {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, tool: &str, cmd: &mut Command) -> Result<Vec<u8>, EngineError> {
        debug!(tool, args = ?cmd.get_args().collect::<Vec<_>>(), "invoking engine tool");
        let output = cmd.output().map_err(|source| EngineError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(EngineError::Tool {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl RasterEngine for GdalCliEngine {
    fn dataset_info(&self, input: &str) -> Result<DatasetInfo, EngineError> {
        let stdout = self.run(
            GDALINFO_BIN,
            Command::new(GDALINFO_BIN).arg("-json").arg(input),
        )?;
        let report: GdalInfoReport =
            serde_json::from_slice(&stdout).map_err(|e| EngineError::Parse(e.to_string()))?;
        // Ungeoreferenced datasets fall back to the identity transform.
        let geo_transform = GeoTransform(
            report
                .geo_transform
                .unwrap_or([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
        );
        Ok(DatasetInfo {
            width: report.size[0],
            height: report.size[1],
            geo_transform,
        })
    }

    fn fetch_block(&self, ctx: &EngineContext, req: &FetchRequest) -> FetchOutcome {
        let mut cmd = Command::new(GDAL_TRANSLATE_BIN);
        cmd.arg("--config")
            .arg("GDAL_DEFAULT_WMS_CACHE_PATH")
            .arg(&ctx.cache_dir)
            .arg("--config")
            .arg("GDAL_TIFF_OVR_BLOCKSIZE")
            .arg(req.profile.tile_size.to_string());
        if let Some(proxy) = &ctx.proxy {
            cmd.arg("--config").arg("GDAL_HTTP_PROXY").arg(proxy);
        }
        cmd.arg("-srcwin")
            .arg(req.window.x.to_string())
            .arg(req.window.y.to_string())
            .arg(req.window.width.to_string())
            .arg(req.window.height.to_string())
            .arg("-outsize")
            .arg(req.out_width.to_string())
            .arg(req.out_height.to_string());
        for option in [
            "BIGTIFF=YES".to_string(),
            "TILED=YES".to_string(),
            format!("BLOCKXSIZE={}", req.profile.tile_size),
            format!("BLOCKYSIZE={}", req.profile.tile_size),
            format!("COMPRESS={}", req.profile.compression),
        ] {
            cmd.arg("-co").arg(option);
        }
        if req.profile.copy_overviews {
            cmd.arg("-co").arg("COPY_SRC_OVERVIEWS=YES");
        }
        cmd.arg(&req.input).arg(&req.out_path);

        match self.run(GDAL_TRANSLATE_BIN, &mut cmd) {
            Ok(_) if req.out_path.is_file() => FetchOutcome::Fetched(req.out_path.clone()),
            Ok(_) => FetchOutcome::Failed(format!(
                "engine reported success but produced no file at {}",
                req.out_path.display()
            )),
            Err(e) => {
                warn!(error = %e, "block fetch failed");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }

    fn build_mosaic(
        &self,
        mosaic_path: &Path,
        files: &[std::path::PathBuf],
        bounds: Bounds,
    ) -> Result<(), EngineError> {
        let mut cmd = Command::new(GDALBUILDVRT_BIN);
        cmd.arg("-te")
            .arg(bounds.min_x.to_string())
            .arg(bounds.min_y.to_string())
            .arg(bounds.max_x.to_string())
            .arg(bounds.max_y.to_string())
            .arg(mosaic_path);
        for file in files {
            cmd.arg(file);
        }
        self.run(GDALBUILDVRT_BIN, &mut cmd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gdalinfo_report_parsing() {
        let json = r#"{
            "size": [8192, 4096],
            "geoTransform": [10.0, 0.5, 0.0, 60.0, 0.0, -0.5],
            "bands": []
        }"#;
        let report: GdalInfoReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.size, [8192, 4096]);
        assert_eq!(report.geo_transform.unwrap()[5], -0.5);
    }

    #[test]
    fn test_gdalinfo_report_without_geotransform() {
        let json = r#"{"size": [100, 100]}"#;
        let report: GdalInfoReport = serde_json::from_str(json).unwrap();
        assert!(report.geo_transform.is_none());
    }
}
