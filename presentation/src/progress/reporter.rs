//! Spinner for the worker currently running

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Shows one spinner per worker invocation and prints lines above it
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            enabled: true,
        }
    }

    /// Reporter that never draws a spinner; lines are still printed
    pub fn without_spinner() -> Self {
        Self {
            bar: Mutex::new(None),
            enabled: false,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:20.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("=>-")
    }

    /// `progress` is 0.0 to 1.0 of the step budget
    pub fn agent_started(&self, agent: &str, step: u32, progress: f32) {
        if !self.enabled {
            return;
        }
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| {
            let pb = ProgressBar::new(100);
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        bar.set_prefix(format!("step {}", step));
        bar.set_position((progress.clamp(0.0, 1.0) * 100.0) as u64);
        bar.set_message(agent.to_string());
    }

    pub fn agent_finished(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }

    /// Print a line without tearing the spinner
    pub fn println(&self, line: &str) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.println(line);
            return;
        }
        println!("{}", line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
