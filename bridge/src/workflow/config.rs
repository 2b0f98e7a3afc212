use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bind: SocketAddr,
    pub historical_db: PathBuf,
    pub nowcast_db: PathBuf,
    /// GeoJSON polygons used as nowcast fishing grounds.
    pub nowcast_grounds: Option<PathBuf>,
    /// Directory holding `fishing_grounds_{year}.geojson` and
    /// `boat_detections_{year}.csv` per historical year.
    pub historical_dir: PathBuf,
    /// Uploaded archives and saved tracks are written here.
    pub scratch_dir: PathBuf,
    pub sample_seed: u64,
    pub phase_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            historical_db: PathBuf::from("database/historical.json"),
            nowcast_db: PathBuf::from("database/nowcast.json"),
            nowcast_grounds: None,
            historical_dir: PathBuf::from("data/historical"),
            scratch_dir: PathBuf::from("data/scratch"),
            sample_seed: 42,
            phase_ms: 800,
        }
    }
}

impl BridgeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading bridge config {}", path_ref.display()))?;
        let config: BridgeConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing bridge config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(bind: SocketAddr, data_dir: &Path, phase_ms: u64) -> Self {
        Self {
            bind,
            historical_db: data_dir.join("database/historical.json"),
            nowcast_db: data_dir.join("database/nowcast.json"),
            nowcast_grounds: Some(data_dir.join("gis/fishing_grounds_nowcast.geojson")),
            historical_dir: data_dir.join("historical"),
            scratch_dir: data_dir.join("scratch"),
            phase_ms,
            ..Self::default()
        }
    }

    pub fn phase_delay(&self) -> Duration {
        Duration::from_millis(self.phase_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_lays_out_data_dir() {
        let cfg = BridgeConfig::from_args(
            SocketAddr::from(([0, 0, 0, 0], 9100)),
            Path::new("/srv/cyclone"),
            10,
        );
        assert_eq!(cfg.nowcast_db, PathBuf::from("/srv/cyclone/database/nowcast.json"));
        assert_eq!(cfg.historical_dir, PathBuf::from("/srv/cyclone/historical"));
        assert_eq!(cfg.sample_seed, 42);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"bind: 127.0.0.1:9200\nphase_ms: 50\nscratch_dir: /tmp/cyclone\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = BridgeConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 9200);
        assert_eq!(cfg.phase_delay(), Duration::from_millis(50));
        assert_eq!(cfg.historical_db, PathBuf::from("database/historical.json"));
    }

    #[test]
    fn config_load_reports_path_on_error() {
        let err = BridgeConfig::load("/nonexistent/bridge.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/bridge.yaml"));
    }
}
