mod canvas;
mod form;
mod http;
mod live_map;

use crate::canvas::{DualAxisCanvas, MapCanvas, RankedCanvas};
use crate::form::{
    country_name, country_names, AnalysisForm, CatalogField, CatalogForm, DraftField, DraftForm,
    FormField, SourceChoice,
};
use crate::http::HttpBridge;
use crate::live_map::LiveMap;
use cyclonecore::analysis::{AnalysisJob, AnalysisMonitor, AnalysisOutcome};
use cyclonecore::catalog::{create_storm, delete_storm};
use cyclonecore::context::LoadOutcome;
use cyclonecore::derived::RankedStorm;
use cyclonecore::draft::TrackDraft;
use cyclonecore::navigation::{BannerLevel, Navigator, Screen};
use cyclonecore::selector::LoadRequest;
use cyclonecore::upload::upload_track_file;
use cyclonecore::views::{StormCard, TableView};
use cyclonecore::wire::{AnalysisStatus, HistoricalRunRequest, NowcastRunRequest};
use cyclonecore::{DashboardEngine, DashboardFrame, EngineConfig, Mode, Scope};
use iced::{
    time,
    widget::{
        button, column, pick_list, progress_bar, row, scrollable, text, text_input, Canvas, Column,
        Container, Row,
    },
    Alignment, Color, Element, Length, Subscription, Task, Theme,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Path of the engine's YAML settings when none is given on the command line.
const CONFIG_ENV: &str = "CYCLONE_DASHBOARD_CONFIG";

const ERROR_TEXT: Color = Color::from_rgb(0.95, 0.4, 0.4);
const INFO_TEXT: Color = Color::from_rgb(0.5, 0.8, 0.95);
const HIGHLIGHT_TEXT: Color = Color::from_rgb(0.95, 0.7, 0.2);

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Dashboard::boot, Dashboard::update, Dashboard::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(state: &Dashboard) -> String {
    match state.navigator.screen().mode() {
        Some(mode) => format!("Cyclone Impact Dashboard ({})", mode),
        None => "Cyclone Impact Dashboard".into(),
    }
}

fn application_subscription(state: &Dashboard) -> Subscription<Message> {
    match &state.job {
        Some(job) => time::every(state.settings.poll_interval(job.mode())).map(|_| Message::Tick),
        None => Subscription::none(),
    }
}

fn application_theme(_: &Dashboard) -> Theme {
    Theme::Dark
}

fn load_settings() -> EngineConfig {
    let Some(path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
    else {
        return EngineConfig::default();
    };
    match EngineConfig::load(&path) {
        Ok(config) => {
            log::info!("loaded settings from {}", path);
            config
        }
        Err(err) => {
            log::warn!("{}; using default settings", err);
            EngineConfig::default()
        }
    }
}

/// Carries a started job from its task back into the update loop.
#[derive(Clone)]
struct JobSlot(Arc<Mutex<Option<AnalysisJob<HttpBridge>>>>);

impl JobSlot {
    fn new(job: AnalysisJob<HttpBridge>) -> Self {
        Self(Arc::new(Mutex::new(Some(job))))
    }

    fn take(&self) -> Option<AnalysisJob<HttpBridge>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl fmt::Debug for JobSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JobSlot")
    }
}

enum RunRequest {
    Historical(HistoricalRunRequest),
    Nowcast(NowcastRunRequest),
}

#[derive(Debug, Clone, PartialEq)]
struct StormChoice {
    id: String,
    label: String,
}

impl fmt::Display for StormChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

struct Dashboard {
    settings: EngineConfig,
    navigator: Navigator,
    form: AnalysisForm,
    draft: TrackDraft,
    draft_form: DraftForm,
    catalog: CatalogForm,
    engine: Option<DashboardEngine<HttpBridge>>,
    frame: Option<DashboardFrame>,
    live_map: LiveMap,
    job: Option<AnalysisJob<HttpBridge>>,
    progress: AnalysisStatus,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    ModeChosen(Mode),
    Back,
    Home,
    DismissBanner(u64),
    CountryPicked(&'static str),
    FormFieldChanged(FormField, String),
    SourcePicked(SourceChoice),
    ToggleOverwrite,
    UploadArchive,
    ArchiveUploaded(Result<String, String>),
    DraftFieldChanged(DraftField, String),
    AddDraftPoint,
    UndoDraftPoint,
    ClearDraft,
    SaveDraft,
    DraftSaved(Result<String, String>),
    StartAnalysis,
    AnalysisStarted(Result<JobSlot, String>),
    CancelAnalysis,
    AnalysisCancelled(Result<(), String>),
    AnalysisFinished(AnalysisOutcome),
    OpenDashboard,
    ScopesFetched(Vec<Scope>),
    Loaded(LoadOutcome),
    StormPicked(StormChoice),
    ScopePicked(Scope),
    DashboardCountryPicked(&'static str),
    ToggleBoats,
    CatalogFieldChanged(CatalogField, String),
    CreateStorm,
    StormCreated(Result<String, String>),
    DeleteStorm(String),
    StormDeleted(Result<(), String>),
}

impl Dashboard {
    fn boot() -> (Self, Task<Message>) {
        let settings = load_settings();
        (
            Dashboard {
                form: AnalysisForm::new(&settings),
                settings,
                navigator: Navigator::new(),
                draft: TrackDraft::new(),
                draft_form: DraftForm::default(),
                catalog: CatalogForm::default(),
                engine: None,
                frame: None,
                live_map: LiveMap::default(),
                job: None,
                progress: AnalysisStatus::default(),
                history: Vec::new(),
            },
            Task::none(),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let Some(job) = state.job.as_ref() else {
                    return Task::none();
                };
                state.progress = job.progress();
                if !job.is_finished() {
                    return Task::none();
                }
                match state.job.take() {
                    Some(mut job) => {
                        Task::perform(async move { job.wait().await }, Message::AnalysisFinished)
                    }
                    None => Task::none(),
                }
            }
            Message::ModeChosen(mode) => {
                if let Err(err) = state.navigator.choose_mode(mode) {
                    log::warn!("{}", err);
                }
                Task::none()
            }
            Message::Back => {
                let task = state.leave_screen();
                state.navigator.back();
                task
            }
            Message::Home => {
                let task = state.leave_screen();
                state.navigator.home();
                task
            }
            Message::DismissBanner(id) => {
                state.navigator.dismiss(id);
                Task::none()
            }
            Message::CountryPicked(country) => {
                state.form.country = country;
                Task::none()
            }
            Message::FormFieldChanged(field, value) => {
                state.form.update_field(field, value);
                Task::none()
            }
            Message::SourcePicked(source) => {
                state.form.set_source(source);
                Task::none()
            }
            Message::ToggleOverwrite => {
                state.form.overwrite = !state.form.overwrite;
                Task::none()
            }
            Message::UploadArchive => {
                let path = PathBuf::from(state.form.archive_path.trim());
                if path.as_os_str().is_empty() {
                    state.error("Choose a track archive to upload first");
                    return Task::none();
                }
                let bridge = state.bridge(Mode::Nowcast);
                Task::perform(
                    async move {
                        upload_track_file(&bridge, &path)
                            .await
                            .map_err(|err| err.to_string())
                    },
                    Message::ArchiveUploaded,
                )
            }
            Message::ArchiveUploaded(Ok(path)) => {
                state.info(format!("Track archive uploaded to {}", path));
                state.form.track_path = Some(path);
                Task::none()
            }
            Message::ArchiveUploaded(Err(err)) => {
                state.error(format!("Upload failed: {}", err));
                Task::none()
            }
            Message::DraftFieldChanged(field, value) => {
                state.draft_form.update_field(field, value);
                Task::none()
            }
            Message::AddDraftPoint => {
                if let Err(err) = state.draft_form.push_into(&mut state.draft) {
                    state.error(err.to_string());
                }
                Task::none()
            }
            Message::UndoDraftPoint => {
                state.draft.undo();
                Task::none()
            }
            Message::ClearDraft => {
                state.draft.clear();
                Task::none()
            }
            Message::SaveDraft => {
                let draft = state.draft.clone();
                let bridge = state.bridge(Mode::Nowcast);
                Task::perform(
                    async move { draft.save(&bridge).await.map_err(|err| err.to_string()) },
                    Message::DraftSaved,
                )
            }
            Message::DraftSaved(Ok(path)) => {
                state.info(format!("Track saved to {}", path));
                state.form.track_path = Some(path);
                Task::none()
            }
            Message::DraftSaved(Err(err)) => {
                state.error(format!("Could not save the track: {}", err));
                Task::none()
            }
            Message::StartAnalysis => state.start_analysis(),
            Message::AnalysisStarted(Ok(slot)) => {
                let Some(job) = slot.take() else {
                    return Task::none();
                };
                state.job = Some(job);
                // the user left the progress screen while the run was starting
                if matches!(state.navigator.screen(), Screen::Progress(_)) {
                    Task::none()
                } else {
                    state.cancel_job()
                }
            }
            Message::AnalysisStarted(Err(err)) => {
                state.navigator.back();
                state.error(format!("Could not start the analysis: {}", err));
                Task::none()
            }
            Message::CancelAnalysis => {
                if let Err(err) = state.navigator.finish_analysis(&AnalysisOutcome::Cancelled) {
                    log::warn!("{}", err);
                }
                state.push_history("Analysis cancelled".into());
                state.cancel_job()
            }
            Message::AnalysisCancelled(Ok(())) => Task::none(),
            Message::AnalysisCancelled(Err(err)) => {
                state.error(format!("Could not cancel the analysis: {}", err));
                Task::none()
            }
            Message::AnalysisFinished(outcome) => {
                state.push_history(match &outcome {
                    AnalysisOutcome::Completed => "Analysis completed".into(),
                    AnalysisOutcome::Failed(message) => format!("Analysis failed: {}", message),
                    AnalysisOutcome::Cancelled => "Analysis cancelled".into(),
                });
                match state.navigator.finish_analysis(&outcome) {
                    Ok(Screen::Dashboard(mode)) => state.open_engine(mode),
                    Ok(_) => Task::none(),
                    Err(err) => {
                        log::warn!("{}", err);
                        Task::none()
                    }
                }
            }
            Message::OpenDashboard => match state.navigator.open_dashboard() {
                Ok(Screen::Dashboard(mode)) => {
                    state.job = None;
                    state.open_engine(mode)
                }
                Ok(_) => Task::none(),
                Err(err) => {
                    log::warn!("{}", err);
                    Task::none()
                }
            },
            Message::ScopesFetched(scopes) => state.begin(Some(&scopes)),
            Message::Loaded(outcome) => {
                if let Some(engine) = state.engine.as_mut() {
                    let ticket = outcome.ticket.id;
                    let status = engine.commit(outcome);
                    log::debug!("load {} committed: {:?}", ticket, status);
                }
                state.refresh();
                Task::none()
            }
            Message::StormPicked(choice) => {
                let Some(engine) = state.engine.as_mut() else {
                    return Task::none();
                };
                match engine.select_storm(&choice.id) {
                    Ok(()) => state.refresh(),
                    Err(err) => state.error(err.to_string()),
                }
                Task::none()
            }
            Message::ScopePicked(scope) => {
                let Some(engine) = state.engine.as_mut() else {
                    return Task::none();
                };
                match engine.select_scope(scope) {
                    Ok(request) => {
                        state.refresh();
                        state.load(request)
                    }
                    Err(err) => {
                        state.error(err.to_string());
                        Task::none()
                    }
                }
            }
            Message::DashboardCountryPicked(country) => {
                if let Some(engine) = state.engine.as_mut() {
                    if let Err(err) = engine.select_country(country) {
                        state.error(err.to_string());
                    }
                }
                state.refresh();
                Task::none()
            }
            Message::ToggleBoats => {
                if let Some(engine) = state.engine.as_mut() {
                    engine.toggle_boats();
                }
                state.refresh();
                Task::none()
            }
            Message::CatalogFieldChanged(field, value) => {
                state.catalog.update_field(field, value);
                Task::none()
            }
            Message::CreateStorm => {
                let request = match state.catalog.request() {
                    Ok(request) => request,
                    Err(err) => {
                        state.error(err.to_string());
                        return Task::none();
                    }
                };
                let bridge = state.bridge(Mode::Nowcast);
                Task::perform(
                    async move {
                        create_storm(&bridge, &request)
                            .await
                            .map_err(|err| err.to_string())
                    },
                    Message::StormCreated,
                )
            }
            Message::StormCreated(Ok(uuid)) => {
                state.info(format!("Added {} ({})", state.catalog.name.trim(), uuid));
                state.catalog = CatalogForm::default();
                state.reload()
            }
            Message::StormCreated(Err(err)) => {
                state.error(format!("Could not add the storm: {}", err));
                Task::none()
            }
            Message::DeleteStorm(id) => {
                let bridge = state.bridge(Mode::Nowcast);
                Task::perform(
                    async move { delete_storm(&bridge, &id).await.map_err(|err| err.to_string()) },
                    Message::StormDeleted,
                )
            }
            Message::StormDeleted(Ok(())) => {
                state.info("Storm deleted");
                state.reload()
            }
            Message::StormDeleted(Err(err)) => {
                state.error(format!("Could not delete the storm: {}", err));
                Task::none()
            }
        }
    }

    /// Re-fetches the open dashboard after its stored storms changed.
    fn reload(&mut self) -> Task<Message> {
        let Some(engine) = self.engine.as_mut() else {
            return Task::none();
        };
        let request = engine.reload();
        self.refresh();
        self.load(request)
    }

    fn bridge(&self, mode: Mode) -> HttpBridge {
        HttpBridge::new(&self.settings.bridge_url, mode)
    }

    fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.push_history(message.clone());
        self.navigator.push_banner(BannerLevel::Info, message);
    }

    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.push_history(message.clone());
        self.navigator.push_banner(BannerLevel::Error, message);
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }

    /// Stops whatever the current screen keeps running before navigating away.
    fn leave_screen(&mut self) -> Task<Message> {
        match self.navigator.screen() {
            Screen::Progress(_) => self.cancel_job(),
            Screen::Dashboard(_) => {
                self.engine = None;
                self.frame = None;
                Task::none()
            }
            _ => Task::none(),
        }
    }

    fn start_analysis(&mut self) -> Task<Message> {
        let Screen::Configuration(mode) = self.navigator.screen() else {
            return Task::none();
        };
        let request = match mode {
            Mode::Historical => self.form.historical().map(RunRequest::Historical),
            Mode::Nowcast => self.form.nowcast().map(RunRequest::Nowcast),
        };
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                self.error(err.to_string());
                return Task::none();
            }
        };
        if let Err(err) = self.navigator.start_analysis() {
            log::warn!("{}", err);
            return Task::none();
        }
        self.progress = AnalysisStatus::default();
        self.push_history(format!("Starting {} analysis", mode));

        let monitor = AnalysisMonitor::new(Arc::new(self.bridge(mode)), &self.settings);
        Task::perform(
            async move {
                let job = match request {
                    RunRequest::Historical(request) => monitor.start_historical(&request).await,
                    RunRequest::Nowcast(request) => monitor.start_nowcast(&request).await,
                };
                job.map(JobSlot::new).map_err(|err| err.to_string())
            },
            Message::AnalysisStarted,
        )
    }

    fn cancel_job(&mut self) -> Task<Message> {
        match self.job.take() {
            Some(mut job) => Task::perform(
                async move { job.cancel().await.map_err(|err| err.to_string()) },
                Message::AnalysisCancelled,
            ),
            None => Task::none(),
        }
    }

    /// Builds a fresh engine for `mode` and kicks off its first load.
    fn open_engine(&mut self, mode: Mode) -> Task<Message> {
        let mut engine = DashboardEngine::new(self.bridge(mode), self.settings.clone().with_mode(mode));
        if mode == Mode::Nowcast {
            if let Err(err) = engine.select_country(self.form.country) {
                log::warn!("{}", err);
            }
        }
        self.live_map = LiveMap::default();
        self.frame = None;

        let scopes = engine.needs_scopes().then(|| {
            let gateway = engine.gateway();
            Task::perform(
                async move { gateway.fetch_available_scopes(mode, None).await },
                Message::ScopesFetched,
            )
        });
        self.engine = Some(engine);
        match scopes {
            Some(task) => task,
            None => self.begin(None),
        }
    }

    fn begin(&mut self, scopes: Option<&[Scope]>) -> Task<Message> {
        let Some(engine) = self.engine.as_mut() else {
            return Task::none();
        };
        let request = engine.begin(scopes);
        self.refresh();
        self.load(request)
    }

    fn load(&self, request: LoadRequest) -> Task<Message> {
        let Some(engine) = self.engine.as_ref() else {
            return Task::none();
        };
        let gateway = engine.gateway();
        Task::perform(
            async move { request.execute(gateway.as_ref()).await },
            Message::Loaded,
        )
    }

    fn refresh(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            let frame = engine.render();
            self.live_map.sync(&frame.map, &frame.track);
            self.frame = Some(frame);
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let screen = state.navigator.screen();
        let body: Element<'_, Message> = match screen {
            Screen::Welcome => state.welcome_view(),
            Screen::Configuration(mode) => state.configuration_view(mode),
            Screen::Progress(mode) => state.progress_view(mode),
            Screen::Dashboard(_) => state.dashboard_view(),
        };

        let mut header = row![text(application_title(state)).size(26)]
            .spacing(12)
            .align_y(Alignment::Center);
        if screen != Screen::Welcome {
            header = header
                .push(button("Back").on_press(Message::Back).padding(6))
                .push(button("Home").on_press(Message::Home).padding(6));
        }

        let banners = state
            .navigator
            .banners()
            .iter()
            .fold(Column::new().spacing(4), |col, banner| {
                let color = match banner.level {
                    BannerLevel::Info => INFO_TEXT,
                    BannerLevel::Error => ERROR_TEXT,
                };
                col.push(
                    row![
                        text(&banner.message).size(14).color(color),
                        button("Dismiss")
                            .on_press(Message::DismissBanner(banner.id))
                            .padding(4),
                    ]
                    .spacing(10)
                    .align_y(Alignment::Center),
                )
            });

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry).size(12))
                })
        };

        let layout = column![
            header,
            banners,
            body,
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(80.0))).padding(6),
        ]
        .spacing(12)
        .padding(20);

        Container::new(scrollable(layout))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn welcome_view(&self) -> Element<'_, Message> {
        column![
            text("Cyclone impact on fishing activity").size(22),
            text("Historical analysis compares boat activity before and after past cyclones.")
                .size(14),
            text("Nowcast analysis estimates the impact of active cyclones on fishing grounds.")
                .size(14),
            row![
                button("Historical analysis")
                    .on_press(Message::ModeChosen(Mode::Historical))
                    .padding(10),
                button("Nowcast analysis")
                    .on_press(Message::ModeChosen(Mode::Nowcast))
                    .padding(10),
            ]
            .spacing(16),
        ]
        .spacing(12)
        .into()
    }

    fn configuration_view(&self, mode: Mode) -> Element<'_, Message> {
        let form = &self.form;
        let mut fields = column![
            text(format!("Configure {} analysis", mode)).size(22),
            text("Country").size(14),
            pick_list(country_names(), Some(form.country), Message::CountryPicked),
        ]
        .spacing(10)
        .width(Length::Fixed(420.0));

        match mode {
            Mode::Historical => {
                fields = fields
                    .push(text("Year").size(14))
                    .push(
                        text_input("Year", &form.year)
                            .on_input(|value| Message::FormFieldChanged(FormField::Year, value))
                            .padding(6),
                    )
                    .push(
                        button(text(if form.overwrite {
                            "Overwrite existing results: yes"
                        } else {
                            "Overwrite existing results: no"
                        }))
                        .on_press(Message::ToggleOverwrite)
                        .padding(6),
                    );
            }
            Mode::Nowcast => {
                let sources = SourceChoice::ALL.iter().fold(Row::new().spacing(8), |row, source| {
                    let caption = if *source == form.source {
                        format!("[{}]", source)
                    } else {
                        source.to_string()
                    };
                    row.push(button(text(caption)).on_press(Message::SourcePicked(*source)).padding(6))
                });
                fields = fields.push(text("Cyclone tracks").size(14)).push(sources);
                fields = match form.source {
                    SourceChoice::Live => fields.push(text("Days of live tracks").size(14)).push(
                        text_input("Days", &form.days)
                            .on_input(|value| Message::FormFieldChanged(FormField::Days, value))
                            .padding(6),
                    ),
                    SourceChoice::Upload => fields.push(
                        row![
                            text_input("Path to a zipped track archive", &form.archive_path)
                                .on_input(|value| {
                                    Message::FormFieldChanged(FormField::ArchivePath, value)
                                })
                                .padding(6),
                            button("Upload").on_press(Message::UploadArchive).padding(6),
                        ]
                        .spacing(8),
                    ),
                    SourceChoice::Drawn => fields.push(self.draft_editor()),
                };
                if let Some(path) = &form.track_path {
                    fields = fields.push(text(format!("Track file: {}", path)).size(12));
                }
            }
        }

        fields
            .push(
                row![
                    button("Run analysis").on_press(Message::StartAnalysis).padding(10),
                    button("Open existing results")
                        .on_press(Message::OpenDashboard)
                        .padding(10),
                ]
                .spacing(12),
            )
            .into()
    }

    fn draft_editor(&self) -> Element<'_, Message> {
        let form = &self.draft_form;
        let points = self
            .draft
            .points
            .iter()
            .enumerate()
            .fold(Column::new().spacing(2), |col, (i, point)| {
                let [lon, lat] = point.coordinates;
                col.push(
                    text(format!(
                        "{}. {} ({:.2}, {:.2}) cyclone {} km/h, wind {} km/h",
                        i + 1,
                        point.date_time,
                        lat,
                        lon,
                        point.cyclone_spd,
                        point.wind_spd
                    ))
                    .size(12),
                )
            });

        column![
            row![
                draft_input("Latitude", &form.lat, DraftField::Lat),
                draft_input("Longitude", &form.lon, DraftField::Lon),
            ]
            .spacing(6),
            draft_input("Time (YYYY-MM-DD HH:MM)", &form.time, DraftField::Time),
            row![
                draft_input("Cyclone speed", &form.cyclone_spd, DraftField::CycloneSpeed),
                draft_input("Wind speed", &form.wind_spd, DraftField::WindSpeed),
            ]
            .spacing(6),
            row![
                button("Add point").on_press(Message::AddDraftPoint).padding(6),
                button("Undo").on_press(Message::UndoDraftPoint).padding(6),
                button("Clear").on_press(Message::ClearDraft).padding(6),
                button("Save track").on_press(Message::SaveDraft).padding(6),
            ]
            .spacing(6),
            text(format!("{} points drawn", self.draft.len())).size(12),
            points,
        ]
        .spacing(6)
        .into()
    }

    fn progress_view(&self, mode: Mode) -> Element<'_, Message> {
        let status = &self.progress;
        let mut content = column![
            text(format!("Running {} analysis", mode)).size(22),
            text(format!(
                "Phase {}/{}: {}",
                status.current_phase, status.total_phases, status.phase_name
            ))
            .size(16),
            progress_bar(0.0..=100.0, status.progress_percent as f32),
            text(&status.message).size(14),
        ]
        .spacing(10)
        .width(Length::Fixed(520.0));

        if let Some(error) = &status.error_message {
            content = content.push(text(error).size(14).color(ERROR_TEXT));
        }

        let mut actions = row![].spacing(12);
        if self.job.is_some() {
            actions = actions.push(button("Cancel").on_press(Message::CancelAnalysis).padding(10));
        }
        actions = actions.push(
            button("Open existing results")
                .on_press(Message::OpenDashboard)
                .padding(10),
        );
        content.push(actions).into()
    }

    fn dashboard_view(&self) -> Element<'_, Message> {
        let Some(frame) = &self.frame else {
            return text("Loading...").size(16).into();
        };

        let storms: Vec<StormChoice> = frame
            .selectors
            .storms
            .iter()
            .map(|option| StormChoice {
                id: option.id.clone(),
                label: option.label.clone(),
            })
            .collect();
        let selected_storm = frame
            .selectors
            .selected_storm
            .as_ref()
            .and_then(|id| storms.iter().find(|choice| &choice.id == id).cloned());
        let scopes: Vec<Scope> = match frame.mode {
            Mode::Historical => frame.selectors.years.iter().copied().map(Scope::Year).collect(),
            Mode::Nowcast => frame.selectors.dates.iter().copied().map(Scope::Date).collect(),
        };

        let mut selectors = row![
            text(match frame.mode {
                Mode::Historical => "Year",
                Mode::Nowcast => "Date",
            })
            .size(14),
            pick_list(scopes, frame.selectors.selected_scope, Message::ScopePicked)
                .placeholder("Select"),
            text("Storm").size(14),
            pick_list(storms, selected_storm, Message::StormPicked).placeholder("Select a storm"),
        ]
        .spacing(10)
        .align_y(Alignment::Center);
        if frame.mode == Mode::Nowcast {
            selectors = selectors.push(text("Country").size(14)).push(pick_list(
                country_names(),
                frame.selectors.country.as_deref().map(|country| country_name(Some(country))),
                Message::DashboardCountryPicked,
            ));
        }
        selectors = selectors.push(
            button(text(if frame.map.boats_visible {
                "Hide boats"
            } else {
                "Show boats"
            }))
            .on_press(Message::ToggleBoats)
            .padding(6),
        );

        let mut content = column![selectors].spacing(14);
        if frame.mode == Mode::Nowcast {
            content = content.push(self.catalog_view(frame.selectors.selected_storm.as_deref()));
        }
        if let Some(notice) = &frame.notice {
            content = content.push(text(notice).size(14).color(INFO_TEXT));
        }

        let map = Canvas::new(MapCanvas::new(&self.live_map))
            .width(Length::FillPortion(3))
            .height(Length::Fixed(420.0));
        let charts = column![
            Canvas::new(DualAxisCanvas::new(&frame.dual_axis))
                .width(Length::Fill)
                .height(Length::Fixed(230.0)),
            Canvas::new(RankedCanvas::new(&frame.ranked))
                .width(Length::Fill)
                .height(Length::Fixed(180.0)),
        ]
        .spacing(10)
        .width(Length::FillPortion(2));

        content
            .push(summary_cards(frame))
            .push(row![map, charts].spacing(14))
            .push(
                row![
                    table_view("Storm speed", &frame.tables.speed),
                    table_view("Distance to fishing grounds", &frame.tables.distance),
                ]
                .spacing(20),
            )
            .into()
    }

    /// Add-storm inputs and deletion of the selected storm.
    fn catalog_view(&self, selected: Option<&str>) -> Element<'_, Message> {
        let delete = button("Delete storm")
            .on_press_maybe(selected.map(|id| Message::DeleteStorm(id.to_string())))
            .padding(6);
        row![
            catalog_input("Storm name", &self.catalog.name, CatalogField::Name),
            catalog_input("Daily table (.csv)", &self.catalog.csv_path, CatalogField::CsvPath),
            catalog_input("Track (.shp)", &self.catalog.shapefile_path, CatalogField::ShapefilePath),
            button("Add storm").on_press(Message::CreateStorm).padding(6),
            delete,
        ]
        .spacing(8)
        .align_y(Alignment::Center)
        .into()
    }
}

fn catalog_input<'a>(placeholder: &'a str, value: &'a str, field: CatalogField) -> Element<'a, Message> {
    text_input(placeholder, value)
        .on_input(move |value| Message::CatalogFieldChanged(field, value))
        .padding(6)
        .width(Length::FillPortion(2))
        .into()
}

fn draft_input<'a>(placeholder: &'a str, value: &'a str, field: DraftField) -> Element<'a, Message> {
    text_input(placeholder, value)
        .on_input(move |value| Message::DraftFieldChanged(field, value))
        .padding(6)
        .into()
}

fn card<'a>(title: &'a str, lines: Vec<String>) -> Element<'a, Message> {
    lines
        .into_iter()
        .fold(column![text(title).size(16)].spacing(4), |col, line| {
            col.push(text(line).size(13))
        })
        .padding(10)
        .width(Length::FillPortion(1))
        .into()
}

fn ranked_card<'a>(title: &'a str, ranked: Option<&RankedStorm>, unit: &str) -> Element<'a, Message> {
    let lines = match ranked {
        Some(ranked) => vec![ranked.name.clone(), format!("{:.1}{}", ranked.value, unit)],
        None => vec!["-".into()],
    };
    card(title, lines)
}

fn storm_card(storm: Option<&StormCard>) -> Element<'_, Message> {
    let lines = match storm {
        Some(storm) => vec![
            format!("{} ({})", storm.name, storm.category),
            storm.date_range.clone(),
            format!("Average speed: {}", storm.avg_speed),
            format!("Max speed: {}", storm.max_speed),
            format!("Max wind: {}", storm.max_wind),
            format!("Closest ground: {} ({})", storm.closest_ground, storm.min_distance),
        ],
        None => vec!["Select a storm".into()],
    };
    card("Selected storm", lines)
}

fn summary_cards(frame: &DashboardFrame) -> Element<'_, Message> {
    let cards = &frame.cards;
    row![
        storm_card(cards.storm.as_ref()),
        ranked_card("Most disruptive", cards.most_disruptive.as_ref(), "%"),
        ranked_card("Closest approach", cards.closest.as_ref(), " km"),
        ranked_card("Fastest", cards.fastest.as_ref(), " km/h"),
    ]
    .spacing(10)
    .into()
}

fn table_view<'a>(title: &'a str, table: &'a TableView) -> Element<'a, Message> {
    let header = table.headers.iter().fold(Row::new().spacing(6), |row, header| {
        row.push(text(header).size(13).width(Length::Fixed(110.0)))
    });
    let rows = table.rows.iter().fold(Column::new().spacing(2), |col, table_row| {
        let cells = table_row
            .cells
            .iter()
            .enumerate()
            .fold(Row::new().spacing(6), |row, (i, cell)| {
                let label = if cell.highlighted {
                    text(&cell.text).size(12).color(HIGHLIGHT_TEXT)
                } else {
                    text(&cell.text).size(12)
                };
                if i == 0 {
                    let choice = StormChoice {
                        id: table_row.storm.clone(),
                        label: cell.text.clone(),
                    };
                    row.push(
                        button(label)
                            .on_press(Message::StormPicked(choice))
                            .padding(2)
                            .width(Length::Fixed(110.0)),
                    )
                } else {
                    row.push(label.width(Length::Fixed(110.0)))
                }
            });
        col.push(cells)
    });
    column![
        text(title).size(16),
        header,
        scrollable(rows).height(Length::Fixed(220.0)),
    ]
    .spacing(6)
    .into()
}
