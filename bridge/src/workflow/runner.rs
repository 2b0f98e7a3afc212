use cyclonecore::prelude::Mode;
use cyclonecore::wire::{AnalysisStatus, JobState, RunResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const TOTAL_PHASES: u32 = 5;

/// (phase name, progress message) of each scripted phase.
fn phases(mode: Mode) -> [(&'static str, &'static str); 5] {
    match mode {
        Mode::Historical => [
            ("Downloading and preparing data...", "Downloading VIIRS data..."),
            ("Processing boat and cyclone data...", "Post-processing typhoon tracks..."),
            ("Analyzing fishing grounds...", "Determining fishing grounds..."),
            ("Calculating impact metrics...", "Calculating minimum distance..."),
            ("Generating visualizations and updating database...", "Updating database..."),
        ],
        Mode::Nowcast => [
            ("Loading GIS data...", "Getting shapefiles from GIS..."),
            ("Processing cyclone data...", "Processing cyclone data..."),
            ("Calculating baselines and distances...", "Calculating minimum distances..."),
            ("Generating predictions...", "Generating nowcast table..."),
            ("Creating visualizations...", "Generating map visualization..."),
        ],
    }
}

/// What a scripted run does: a description for the log and, optionally,
/// the phase at which it fails and why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPlan {
    pub description: String,
    pub failure: Option<(u32, String)>,
}

impl RunPlan {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            failure: None,
        }
    }

    pub fn failing_at(mut self, phase: u32, message: impl Into<String>) -> Self {
        self.failure = Some((phase, message.into()));
        self
    }
}

struct RunnerState {
    status: AnalysisStatus,
    run_id: u64,
}

/// Walks an analysis through its five phases on a timer. One run at a time.
#[derive(Clone)]
pub struct Runner {
    mode: Mode,
    phase_delay: Duration,
    state: Arc<Mutex<RunnerState>>,
}

impl Runner {
    pub fn new(mode: Mode, phase_delay: Duration) -> Self {
        Self {
            mode,
            phase_delay,
            state: Arc::new(Mutex::new(RunnerState {
                status: AnalysisStatus {
                    total_phases: TOTAL_PHASES,
                    ..AnalysisStatus::default()
                },
                run_id: 0,
            })),
        }
    }

    pub async fn status(&self) -> AnalysisStatus {
        self.state.lock().await.status.clone()
    }

    pub async fn start(&self, plan: RunPlan) -> RunResponse {
        let mut state = self.state.lock().await;
        if state.status.status == JobState::Running {
            return RunResponse::error(
                "Another analysis is already running. Please wait or cancel it first.",
            );
        }
        state.run_id += 1;
        state.status = AnalysisStatus {
            status: JobState::Running,
            current_phase: 0,
            total_phases: TOTAL_PHASES,
            phase_name: "Initializing...".into(),
            message: format!("Starting {} analysis...", self.mode),
            progress_percent: 0,
            error_message: None,
        };
        log::info!("[{}] run {} started: {}", self.mode, state.run_id, plan.description);
        tokio::spawn(self.clone().drive(state.run_id, plan));
        RunResponse::started("Processing started")
    }

    pub async fn cancel(&self) -> RunResponse {
        let mut state = self.state.lock().await;
        if state.status.status != JobState::Running {
            return RunResponse::error("No analysis is currently running");
        }
        state.status.status = JobState::Cancelled;
        state.status.message = "Processing was cancelled".into();
        log::info!("[{}] run {} cancelled", self.mode, state.run_id);
        RunResponse {
            status: "cancelled".into(),
            message: Some("Cancellation requested".into()),
        }
    }

    async fn drive(self, run_id: u64, plan: RunPlan) {
        for (phase, (name, message)) in (1..=TOTAL_PHASES).zip(phases(self.mode)) {
            tokio::time::sleep(self.phase_delay).await;
            let mut state = self.state.lock().await;
            if state.run_id != run_id || state.status.status != JobState::Running {
                return;
            }
            if let Some((failing, reason)) = &plan.failure {
                if *failing == phase {
                    log::error!("[{}] run {} failed in phase {}: {}", self.mode, run_id, phase, reason);
                    state.status.status = JobState::Error;
                    state.status.error_message = Some(reason.clone());
                    state.status.message = format!("Error: {}", reason);
                    return;
                }
            }
            state.status.current_phase = phase;
            state.status.phase_name = name.into();
            state.status.message = message.into();
            state.status.progress_percent = phase * 100 / TOTAL_PHASES;
        }

        tokio::time::sleep(self.phase_delay).await;
        let mut state = self.state.lock().await;
        if state.run_id == run_id && state.status.status == JobState::Running {
            state.status.status = JobState::Completed;
            state.status.progress_percent = 100;
            state.status.message = "Analysis completed successfully".into();
            log::info!("[{}] run {} completed", self.mode, run_id);
        }
    }
}
