//! Progress reporting for request processing

use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use conductor_application::ProgressNotifier;
use conductor_domain::{EngineState, SessionId};
use indicatif::{ProgressBar, ProgressStyle};

/// Reports engine state on a spinner
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn state_message(state: EngineState) -> &'static str {
        match state {
            EngineState::Advising => "Consulting the advisory role...",
            EngineState::PlanCheck => "Looking for an execution plan...",
            EngineState::Executing => "Executing plan...",
            EngineState::Done => "Done",
        }
    }

    /// Run `f` with the spinner hidden, so it can write to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        let guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    /// Stop the spinner, if one is running.
    pub fn clear(&self) {
        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_state(&self, _session: &SessionId, state: EngineState) {
        if state == EngineState::Done {
            self.clear();
            return;
        }

        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        pb.set_message(Self::state_message(state));
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_state(&self, _session: &SessionId, state: EngineState) {
        if state != EngineState::Done {
            eprintln!("{} {}", "->".cyan(), ProgressReporter::state_message(state));
        }
    }
}
