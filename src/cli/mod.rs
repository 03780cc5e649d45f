//! CLI command implementations

mod build;
mod context;
mod dist_tag;
mod info;
mod release;
pub mod style;

pub use build::run_build;
pub use dist_tag::run_set_dist_tag;
pub use info::run_info;
pub use release::run_release;

use anstream::{eprintln, println};
use async_trait::async_trait;
use indicatif::ProgressBar;
use release_train::progress::ProgressCallback;
use std::sync::Mutex;
use std::time::Duration;
use style::{Stylize, check, cross, spinner_style, warning};

/// Progress callback printing to the terminal
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a terminal progress reporter
    pub const fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    // Print around an active spinner so lines are not overwritten
    fn print(&self, line: &str, to_stderr: bool) {
        let spinner = self.spinner.lock().ok().and_then(|s| s.clone());
        match spinner {
            Some(spinner) => spinner.suspend(|| emit(line, to_stderr)),
            None => emit(line, to_stderr),
        }
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(line: &str, to_stderr: bool) {
    if to_stderr {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_success(&self, message: &str) {
        self.print(&format!("  {}  {message}", check()), false);
    }

    async fn on_message(&self, message: &str) {
        self.print(message, false);
    }

    async fn on_warning(&self, message: &str) {
        self.print(&format!("  {}  {}", warning(), message.warn()), false);
    }

    async fn on_error(&self, message: &str) {
        self.print(&format!("  {}  {}", cross(), message.error()), true);
    }

    async fn on_wait_start(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    async fn on_wait_end(&self) {
        let spinner = self.spinner.lock().ok().and_then(|mut s| s.take());
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    }
}
