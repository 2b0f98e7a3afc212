use crate::repository::{
    ingest, DetectionArchive, HistoricalRepository, NowcastRepository, TinyDb, TyphoonRepository,
};
use crate::workflow::config::BridgeConfig;
use crate::workflow::runner::{RunPlan, Runner};
use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cyclonecore::analysis::{historical_request, nowcast_request, TrackSource};
use cyclonecore::draft::TrackDraft;
use cyclonecore::prelude::Mode;
use cyclonecore::upload::validate_archive_name;
use cyclonecore::wire::{
    CreateTyphoonRequest, HistoricalRunRequest, NowcastRunRequest, RunResponse, UploadRequest,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the HTTP routes serve from.
pub struct BridgeState {
    historical: HistoricalRepository,
    nowcast: NowcastRepository,
    detections: DetectionArchive,
    historical_runs: Runner,
    nowcast_runs: Runner,
    scratch_dir: PathBuf,
}

impl BridgeState {
    pub fn new(
        historical: HistoricalRepository,
        nowcast: NowcastRepository,
        detections: DetectionArchive,
        phase_delay: Duration,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            historical,
            nowcast,
            detections,
            historical_runs: Runner::new(Mode::Historical, phase_delay),
            nowcast_runs: Runner::new(Mode::Nowcast, phase_delay),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> anyhow::Result<Self> {
        let historical = HistoricalRepository::new(TinyDb::load(&config.historical_db)?)
            .with_grounds_dir(&config.historical_dir);
        let grounds = match &config.nowcast_grounds {
            Some(path) => NowcastRepository::load_grounds(path)?,
            None => Vec::new(),
        };
        let nowcast = NowcastRepository::new(TinyDb::load(&config.nowcast_db)?)
            .with_path(&config.nowcast_db)
            .with_grounds(grounds);
        Ok(Self::new(
            historical,
            nowcast,
            DetectionArchive::new(&config.historical_dir, config.sample_seed),
            config.phase_delay(),
            &config.scratch_dir,
        ))
    }

    pub fn repository(&self, mode: Mode) -> &dyn TyphoonRepository {
        match mode {
            Mode::Historical => &self.historical,
            Mode::Nowcast => &self.nowcast,
        }
    }

    pub fn runner(&self, mode: Mode) -> &Runner {
        match mode {
            Mode::Historical => &self.historical_runs,
            Mode::Nowcast => &self.nowcast_runs,
        }
    }

    pub fn detections(&self) -> &DetectionArchive {
        &self.detections
    }

    pub fn historical_plan(&self, request: &HistoricalRunRequest) -> Result<RunPlan, RunResponse> {
        let request = historical_request(&request.country, request.year, request.overwrite)
            .map_err(|err| RunResponse::error(err.to_string()))?;
        Ok(RunPlan::new(format!(
            "{} {} (overwrite: {})",
            request.country, request.year, request.overwrite
        )))
    }

    /// A track archive that is missing on disk fails once the pipeline
    /// reaches the cyclone processing phase.
    pub fn nowcast_plan(&self, request: &NowcastRunRequest) -> Result<RunPlan, RunResponse> {
        let source = match request.local_zip_path.as_deref() {
            None => TrackSource::Live,
            Some(path) if path.ends_with(".json") => TrackSource::Drawn,
            Some(_) => TrackSource::Upload,
        };
        let request = nowcast_request(
            &request.country,
            source,
            request.local_zip_path.as_deref(),
            request.days,
        )
        .map_err(|err| RunResponse::error(err.to_string()))?;
        let plan = match (&request.local_zip_path, request.days) {
            (Some(path), _) => RunPlan::new(format!("{} from {}", request.country, path)),
            (None, Some(days)) => {
                RunPlan::new(format!("{} from the live feed, last {} days", request.country, days))
            }
            (None, None) => RunPlan::new(request.country.clone()),
        };
        match &request.local_zip_path {
            Some(path) if !Path::new(path).exists() => {
                Ok(plan.failing_at(2, format!("Track file not found: {}", path)))
            }
            _ => Ok(plan),
        }
    }

    /// Builds a nowcast storm from its daily table and track shapefile;
    /// `None` when the files cannot be turned into a storm.
    pub fn create_typhoon(&self, request: &CreateTyphoonRequest) -> Option<String> {
        let created = ingest::storm_from_files(
            &request.name,
            Path::new(&request.csv_path),
            Path::new(&request.shapefile_path),
        )
        .and_then(|(uuid, record)| self.nowcast.insert(record).map(|_| uuid));
        match created {
            Ok(uuid) => {
                log::info!("created nowcast storm {} as {}", request.name, uuid);
                Some(uuid)
            }
            Err(err) => {
                log::error!("creating nowcast storm {}: {:#}", request.name, err);
                None
            }
        }
    }

    pub fn delete_typhoon(&self, id: &str) -> bool {
        match self.nowcast.delete(id) {
            Ok(removed) => {
                if removed {
                    log::info!("deleted nowcast storm {}", id);
                }
                removed
            }
            Err(err) => {
                log::error!("deleting nowcast storm {}: {:#}", id, err);
                false
            }
        }
    }

    fn scratch(&self, folder: &str) -> anyhow::Result<PathBuf> {
        let dir = self.scratch_dir.join(folder);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(dir)
    }

    /// Decodes an uploaded archive into the scratch directory.
    pub fn store_upload(&self, upload: &UploadRequest) -> anyhow::Result<PathBuf> {
        validate_archive_name(&upload.filename)?;
        let name = Path::new(upload.filename.trim())
            .file_name()
            .ok_or_else(|| anyhow!("no file name in {:?}", upload.filename))?;
        let bytes = STANDARD
            .decode(upload.file_data.as_bytes())
            .context("decoding uploaded archive")?;
        let path = self.scratch("uploads")?.join(name);
        fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Writes a drawn track; `None` when it has no points.
    pub fn store_track(&self, track: &Value) -> anyhow::Result<Option<PathBuf>> {
        let has_points = track
            .get("points")
            .and_then(Value::as_array)
            .map_or(false, |points| !points.is_empty());
        if !has_points {
            log::warn!("no track points to save");
            return Ok(None);
        }
        let draft: TrackDraft =
            serde_json::from_value(track.clone()).context("reading track points")?;
        let json = draft.to_json()?;
        let path = self.scratch("tracks")?.join("drawn_track.json");
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved {} track points to {}", draft.len(), path.display());
        Ok(Some(path))
    }
}
