//! Screen flow of the application and the banner strip shown above it.

use crate::analysis::AnalysisOutcome;
use crate::prelude::{EngineError, EngineResult, Mode};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "mode", rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    Configuration(Mode),
    Progress(Mode),
    Dashboard(Mode),
}

impl Screen {
    pub fn mode(&self) -> Option<Mode> {
        match self {
            Screen::Welcome => None,
            Screen::Configuration(mode) | Screen::Progress(mode) | Screen::Dashboard(mode) => {
                Some(*mode)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub id: u64,
    pub level: BannerLevel,
    pub message: String,
}

/// Banners stay up until dismissed or until a configuration screen is entered.
#[derive(Debug)]
pub struct Navigator {
    screen: Screen,
    banners: Vec<Banner>,
    next_banner: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            screen: Screen::Welcome,
            banners: Vec::new(),
            next_banner: 1,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn banners(&self) -> &[Banner] {
        &self.banners
    }

    pub fn push_banner(&mut self, level: BannerLevel, message: impl Into<String>) -> u64 {
        let id = self.next_banner;
        self.next_banner += 1;
        self.banners.push(Banner {
            id,
            level,
            message: message.into(),
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.banners.len();
        self.banners.retain(|banner| banner.id != id);
        self.banners.len() != before
    }

    fn enter_configuration(&mut self, mode: Mode) -> Screen {
        self.banners.clear();
        self.screen = Screen::Configuration(mode);
        self.screen
    }

    fn invalid(&self, action: &str) -> EngineError {
        EngineError::InvalidInput(format!("cannot {} from {:?}", action, self.screen))
    }

    pub fn choose_mode(&mut self, mode: Mode) -> EngineResult<Screen> {
        match self.screen {
            Screen::Welcome => Ok(self.enter_configuration(mode)),
            _ => Err(self.invalid("choose a mode")),
        }
    }

    pub fn start_analysis(&mut self) -> EngineResult<Screen> {
        match self.screen {
            Screen::Configuration(mode) => {
                self.screen = Screen::Progress(mode);
                Ok(self.screen)
            }
            _ => Err(self.invalid("start an analysis")),
        }
    }

    /// Skips the analysis and opens the results already on disk.
    pub fn open_dashboard(&mut self) -> EngineResult<Screen> {
        match self.screen {
            Screen::Configuration(mode) | Screen::Progress(mode) => {
                self.screen = Screen::Dashboard(mode);
                Ok(self.screen)
            }
            _ => Err(self.invalid("open the dashboard")),
        }
    }

    /// Moves on from the progress screen once the job has ended. A failure
    /// keeps the progress screen and raises an error banner; a cancellation
    /// returns to configuration silently.
    pub fn finish_analysis(&mut self, outcome: &AnalysisOutcome) -> EngineResult<Screen> {
        let Screen::Progress(mode) = self.screen else {
            return Err(self.invalid("finish an analysis"));
        };
        match outcome {
            AnalysisOutcome::Completed => self.screen = Screen::Dashboard(mode),
            AnalysisOutcome::Failed(message) => {
                self.push_banner(BannerLevel::Error, format!("Analysis failed: {}", message));
            }
            AnalysisOutcome::Cancelled => {
                self.enter_configuration(mode);
            }
        }
        Ok(self.screen)
    }

    pub fn back(&mut self) -> Screen {
        match self.screen {
            Screen::Welcome | Screen::Configuration(_) => {
                self.screen = Screen::Welcome;
                self.screen
            }
            Screen::Progress(mode) | Screen::Dashboard(mode) => self.enter_configuration(mode),
        }
    }

    pub fn home(&mut self) -> Screen {
        self.screen = Screen::Welcome;
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_analysis_opens_dashboard() {
        let mut nav = Navigator::new();
        nav.choose_mode(Mode::Historical).unwrap();
        nav.start_analysis().unwrap();
        let screen = nav.finish_analysis(&AnalysisOutcome::Completed).unwrap();
        assert_eq!(screen, Screen::Dashboard(Mode::Historical));
        assert!(nav.banners().is_empty());
    }

    #[test]
    fn failure_banner_persists_until_configuration() {
        let mut nav = Navigator::new();
        nav.choose_mode(Mode::Nowcast).unwrap();
        nav.start_analysis().unwrap();
        nav.finish_analysis(&AnalysisOutcome::Failed("no tracks".into()))
            .unwrap();
        assert_eq!(nav.screen(), Screen::Progress(Mode::Nowcast));
        assert_eq!(nav.banners()[0].message, "Analysis failed: no tracks");

        assert_eq!(nav.back(), Screen::Configuration(Mode::Nowcast));
        assert!(nav.banners().is_empty());
    }

    #[test]
    fn cancellation_returns_without_banner() {
        let mut nav = Navigator::new();
        nav.choose_mode(Mode::Nowcast).unwrap();
        nav.start_analysis().unwrap();
        let screen = nav.finish_analysis(&AnalysisOutcome::Cancelled).unwrap();
        assert_eq!(screen, Screen::Configuration(Mode::Nowcast));
        assert!(nav.banners().is_empty());
    }

    #[test]
    fn banners_can_be_dismissed_individually() {
        let mut nav = Navigator::new();
        let first = nav.push_banner(BannerLevel::Info, "a");
        nav.push_banner(BannerLevel::Error, "b");
        assert!(nav.dismiss(first));
        assert!(!nav.dismiss(first));
        assert_eq!(nav.banners().len(), 1);
        assert!(nav.start_analysis().is_err());
    }
}
