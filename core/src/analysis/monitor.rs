use crate::analysis::CancellationToken;
use crate::config::EngineConfig;
use crate::gateway::{BridgeApi, TransportResult};
use crate::prelude::{EngineError, EngineResult, Mode};
use crate::telemetry::LogManager;
use crate::wire::{AnalysisStatus, HistoricalRunRequest, JobState, NowcastRunRequest, RunResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How an analysis job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Starts backend analysis jobs and polls them until they finish.
pub struct AnalysisMonitor<B: BridgeApi + 'static> {
    bridge: Arc<B>,
    historical_interval: Duration,
    nowcast_interval: Duration,
    max_failures: u32,
    logger: LogManager,
}

impl<B: BridgeApi + 'static> AnalysisMonitor<B> {
    pub fn new(bridge: Arc<B>, config: &EngineConfig) -> Self {
        Self {
            bridge,
            historical_interval: config.poll_interval(Mode::Historical),
            nowcast_interval: config.poll_interval(Mode::Nowcast),
            max_failures: config.retry.attempts(),
            logger: LogManager::new("analysis"),
        }
    }

    pub async fn start_historical(
        &self,
        request: &HistoricalRunRequest,
    ) -> EngineResult<AnalysisJob<B>> {
        let response = self.bridge.run_historical_analysis(request).await;
        self.accept(Mode::Historical, response)?;
        self.logger.record(&format!(
            "historical analysis started for {} {}",
            request.country, request.year
        ));
        Ok(self.spawn(Mode::Historical, self.historical_interval))
    }

    pub async fn start_nowcast(&self, request: &NowcastRunRequest) -> EngineResult<AnalysisJob<B>> {
        let response = self.bridge.run_nowcast_analysis(request).await;
        self.accept(Mode::Nowcast, response)?;
        self.logger
            .record(&format!("nowcast analysis started for {}", request.country));
        Ok(self.spawn(Mode::Nowcast, self.nowcast_interval))
    }

    fn accept(&self, mode: Mode, response: TransportResult<RunResponse>) -> EngineResult<()> {
        let response = response.map_err(|err| EngineError::Transport(err.to_string()))?;
        if response.is_error() {
            let message = response
                .message
                .unwrap_or_else(|| format!("{} analysis could not start", mode));
            self.logger.warn(&message);
            return Err(EngineError::Analysis(message));
        }
        Ok(())
    }

    fn spawn(&self, mode: Mode, interval: Duration) -> AnalysisJob<B> {
        let token = CancellationToken::new();
        let (progress_tx, progress_rx) = watch::channel(AnalysisStatus::default());
        let handle = tokio::spawn(poll_status(
            self.bridge.clone(),
            mode,
            interval,
            self.max_failures,
            token.clone(),
            progress_tx,
        ));
        AnalysisJob {
            mode,
            bridge: self.bridge.clone(),
            token,
            progress: progress_rx,
            handle: Some(handle),
        }
    }
}

async fn fetch_status<B: BridgeApi>(bridge: &B, mode: Mode) -> TransportResult<AnalysisStatus> {
    match mode {
        Mode::Historical => bridge.get_historical_analysis_status().await,
        Mode::Nowcast => bridge.get_nowcast_analysis_status().await,
    }
}

async fn poll_status<B: BridgeApi>(
    bridge: Arc<B>,
    mode: Mode,
    interval: Duration,
    max_failures: u32,
    token: CancellationToken,
    progress: watch::Sender<AnalysisStatus>,
) -> AnalysisOutcome {
    let logger = LogManager::new("analysis");
    let mut failures = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => return AnalysisOutcome::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }
        let status = tokio::select! {
            _ = token.cancelled() => return AnalysisOutcome::Cancelled,
            status = fetch_status(bridge.as_ref(), mode) => status,
        };
        match status {
            Ok(status) => {
                failures = 0;
                let state = status.status;
                let failure = status
                    .error_message
                    .clone()
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| status.message.clone());
                progress.send_replace(status);
                match state {
                    JobState::Completed => {
                        logger.record(&format!("{} analysis completed", mode));
                        return AnalysisOutcome::Completed;
                    }
                    JobState::Error => {
                        logger.warn(&format!("{} analysis failed: {}", mode, failure));
                        return AnalysisOutcome::Failed(failure);
                    }
                    JobState::Cancelled => return AnalysisOutcome::Cancelled,
                    _ => {}
                }
            }
            Err(err) => {
                failures += 1;
                logger.warn(&format!(
                    "{} status poll failed ({}/{}): {}",
                    mode, failures, max_failures, err
                ));
                if failures >= max_failures {
                    return AnalysisOutcome::Failed(format!("lost contact with the analysis: {}", err));
                }
            }
        }
    }
}

/// Handle of a running analysis. Dropping it stops the polling task.
pub struct AnalysisJob<B: BridgeApi + 'static> {
    mode: Mode,
    bridge: Arc<B>,
    token: CancellationToken,
    progress: watch::Receiver<AnalysisStatus>,
    handle: Option<JoinHandle<AnalysisOutcome>>,
}

impl<B: BridgeApi + 'static> AnalysisJob<B> {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Latest status reported by the backend.
    pub fn progress(&self) -> AnalysisStatus {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.progress.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops polling at once, then asks the backend to cancel the job.
    pub async fn cancel(&mut self) -> EngineResult<()> {
        self.token.cancel();
        let response = match self.mode {
            Mode::Historical => self.bridge.cancel_historical_analysis().await,
            Mode::Nowcast => self.bridge.cancel_nowcast_analysis().await,
        };
        response
            .map(|_| ())
            .map_err(|err| EngineError::Transport(err.to_string()))
    }

    /// True once polling has stopped and `wait` will not block.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the polling task to finish.
    pub async fn wait(&mut self) -> AnalysisOutcome {
        let Some(handle) = self.handle.take() else {
            return AnalysisOutcome::Cancelled;
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => AnalysisOutcome::Cancelled,
            Err(err) => AnalysisOutcome::Failed(err.to_string()),
        }
    }
}

impl<B: BridgeApi + 'static> Drop for AnalysisJob<B> {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
