use chrono::Datelike;
use cyclonecore::analysis::request::DEFAULT_NOWCAST_DAYS;
use cyclonecore::analysis::{country_code, historical_request, nowcast_request, TrackSource, COUNTRIES};
use cyclonecore::catalog::create_request;
use cyclonecore::draft::TrackDraft;
use cyclonecore::wire::{CreateTyphoonRequest, HistoricalRunRequest, NowcastRunRequest};
use cyclonecore::{EngineConfig, EngineError, EngineResult};
use std::fmt;

/// Display name of a supported country, falling back to the first one.
pub fn country_name(country: Option<&str>) -> &'static str {
    country
        .and_then(|country| country_code(country).ok())
        .and_then(|code| COUNTRIES.iter().find(|(_, known)| *known == code))
        .map_or(COUNTRIES[0].0, |(name, _)| *name)
}

pub fn country_names() -> Vec<&'static str> {
    COUNTRIES.iter().map(|(name, _)| *name).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChoice {
    Live,
    Upload,
    Drawn,
}

impl SourceChoice {
    pub const ALL: [SourceChoice; 3] = [SourceChoice::Live, SourceChoice::Upload, SourceChoice::Drawn];

    pub fn track_source(self) -> TrackSource {
        match self {
            SourceChoice::Live => TrackSource::Live,
            SourceChoice::Upload => TrackSource::Upload,
            SourceChoice::Drawn => TrackSource::Drawn,
        }
    }
}

impl fmt::Display for SourceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceChoice::Live => write!(f, "Live feed"),
            SourceChoice::Upload => write!(f, "Upload archive"),
            SourceChoice::Drawn => write!(f, "Draw track"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FormField {
    Year,
    Days,
    ArchivePath,
}

/// Analysis configuration as typed on the configuration screen.
#[derive(Debug, Clone)]
pub struct AnalysisForm {
    pub country: &'static str,
    pub year: String,
    pub overwrite: bool,
    pub source: SourceChoice,
    pub days: String,
    pub archive_path: String,
    /// Where the bridge stored the uploaded or drawn track.
    pub track_path: Option<String>,
}

impl AnalysisForm {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            country: country_name(config.default_country.as_deref()),
            year: (chrono::Local::now().year() - 1).to_string(),
            overwrite: false,
            source: SourceChoice::Live,
            days: DEFAULT_NOWCAST_DAYS.to_string(),
            archive_path: String::new(),
            track_path: None,
        }
    }

    pub fn update_field(&mut self, field: FormField, value: String) {
        match field {
            FormField::Year => self.year = value,
            FormField::Days => self.days = value,
            FormField::ArchivePath => self.archive_path = value,
        }
    }

    /// Switching the source forgets a track stored for the previous one.
    pub fn set_source(&mut self, source: SourceChoice) {
        if self.source != source {
            self.track_path = None;
        }
        self.source = source;
    }

    pub fn historical(&self) -> EngineResult<HistoricalRunRequest> {
        let year = self
            .year
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("invalid year {:?}", self.year)))?;
        historical_request(self.country, year, self.overwrite)
    }

    pub fn nowcast(&self) -> EngineResult<NowcastRunRequest> {
        let days = match self.days.trim() {
            "" => None,
            days => Some(days.parse().map_err(|_| {
                EngineError::InvalidInput(format!("invalid number of days {:?}", self.days))
            })?),
        };
        nowcast_request(
            self.country,
            self.source.track_source(),
            self.track_path.as_deref(),
            days,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DraftField {
    Lat,
    Lon,
    Time,
    CycloneSpeed,
    WindSpeed,
}

/// Inputs of the next point of a drawn track.
#[derive(Debug, Clone, Default)]
pub struct DraftForm {
    pub lat: String,
    pub lon: String,
    pub time: String,
    pub cyclone_spd: String,
    pub wind_spd: String,
}

impl DraftForm {
    pub fn update_field(&mut self, field: DraftField, value: String) {
        match field {
            DraftField::Lat => self.lat = value,
            DraftField::Lon => self.lon = value,
            DraftField::Time => self.time = value,
            DraftField::CycloneSpeed => self.cyclone_spd = value,
            DraftField::WindSpeed => self.wind_spd = value,
        }
    }

    fn number(label: &str, value: &str) -> EngineResult<f64> {
        value
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidInput(format!("{} must be a number, got {:?}", label, value)))
    }

    /// Appends the typed point to `draft`. Coordinates are cleared after a
    /// successful push; time and speeds stay for the next fix.
    pub fn push_into(&mut self, draft: &mut TrackDraft) -> EngineResult<()> {
        let lat = Self::number("latitude", &self.lat)?;
        let lon = Self::number("longitude", &self.lon)?;
        let cyclone_spd = Self::number("cyclone speed", &self.cyclone_spd)?;
        let wind_spd = Self::number("wind speed", &self.wind_spd)?;
        draft.push(lat, lon, &self.time, cyclone_spd, wind_spd)?;
        self.lat.clear();
        self.lon.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CatalogField {
    Name,
    CsvPath,
    ShapefilePath,
}

/// Files of a nowcast storm to add to the stored set.
#[derive(Debug, Clone, Default)]
pub struct CatalogForm {
    pub name: String,
    pub csv_path: String,
    pub shapefile_path: String,
}

impl CatalogForm {
    pub fn update_field(&mut self, field: CatalogField, value: String) {
        match field {
            CatalogField::Name => self.name = value,
            CatalogField::CsvPath => self.csv_path = value,
            CatalogField::ShapefilePath => self.shapefile_path = value,
        }
    }

    pub fn request(&self) -> EngineResult<CreateTyphoonRequest> {
        create_request(&self.name, &self.csv_path, &self.shapefile_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_country_resolves_to_display_name() {
        assert_eq!(country_name(Some("vnm")), "Vietnam");
        assert_eq!(country_name(Some("Fiji")), "Fiji");
        assert_eq!(country_name(Some("Atlantis")), "Philippines");
        assert_eq!(country_name(None), "Philippines");
    }

    #[test]
    fn historical_form_builds_request() {
        let mut form = AnalysisForm::new(&EngineConfig::default());
        form.update_field(FormField::Year, " 2023 ".into());
        form.overwrite = true;
        let request = form.historical().unwrap();
        assert_eq!(request.country, "phl");
        assert_eq!(request.year, 2023);
        assert!(request.overwrite);

        form.update_field(FormField::Year, "twenty".into());
        assert!(form.historical().is_err());
    }

    #[test]
    fn nowcast_form_needs_a_stored_track_for_uploads() {
        let mut form = AnalysisForm::new(&EngineConfig::default());
        assert_eq!(form.nowcast().unwrap().days, Some(7));

        form.set_source(SourceChoice::Upload);
        assert!(form.nowcast().is_err());
        form.track_path = Some("/scratch/uploads/track.zip".into());
        let request = form.nowcast().unwrap();
        assert_eq!(request.local_zip_path.as_deref(), Some("/scratch/uploads/track.zip"));
        assert_eq!(request.days, None);

        form.set_source(SourceChoice::Drawn);
        assert!(form.track_path.is_none());
    }

    #[test]
    fn draft_form_pushes_valid_points() {
        let mut form = DraftForm::default();
        let mut draft = TrackDraft::new();
        form.update_field(DraftField::Lat, "14.6".into());
        form.update_field(DraftField::Lon, "120.9".into());
        form.update_field(DraftField::Time, "2025-07-23 06:00".into());
        form.update_field(DraftField::CycloneSpeed, "12".into());
        form.update_field(DraftField::WindSpeed, "x".into());
        assert!(form.push_into(&mut draft).is_err());
        assert!(draft.is_empty());

        form.update_field(DraftField::WindSpeed, "65".into());
        form.push_into(&mut draft).unwrap();
        assert_eq!(draft.len(), 1);
        assert!(form.lat.is_empty());
        assert_eq!(form.time, "2025-07-23 06:00");
    }

    #[test]
    fn catalog_form_needs_both_files() {
        let mut form = CatalogForm::default();
        form.update_field(CatalogField::Name, "WIPHA".into());
        form.update_field(CatalogField::CsvPath, "/data/wipha_daily.csv".into());
        assert!(form.request().is_err());

        form.update_field(CatalogField::ShapefilePath, "/data/wipha.shp".into());
        let request = form.request().unwrap();
        assert_eq!(request.name, "WIPHA");
        assert_eq!(request.shapefile_path, "/data/wipha.shp");
    }
}
