use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::task::RealtimeSnapshot;

/// Terminal progress display for a locally-run task.
///
/// One overall bar tracks settled URLs; one spinner per in-flight URL.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    in_flight: HashMap<String, ProgressBar>,
    enabled: bool,
}

impl ProgressMonitor {
    /// * `total_urls` - initial bar length; grows if URLs are appended
    /// * `enabled` - disabled when stderr is not a terminal
    pub fn new(total_urls: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                in_flight: HashMap::new(),
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_urls as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} urls ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            in_flight: HashMap::new(),
            enabled: true,
        }
    }

    /// Applies a realtime snapshot: bar position, counts, and the in-flight spinners.
    pub fn update(&mut self, snap: &RealtimeSnapshot) {
        if !self.enabled {
            return;
        }

        self.overall.set_length(snap.progress.total as u64);
        self.overall.set_position(snap.progress.completed as u64);
        self.overall.set_message(format!(
            "ok {} / failed {}",
            snap.summary.completed, snap.summary.failed
        ));
        self.sync_in_flight(&snap.currently_processing);
    }

    fn sync_in_flight(&mut self, urls: &[String]) {
        let current: BTreeSet<&str> = urls.iter().map(String::as_str).collect();

        let done: Vec<String> = self
            .in_flight
            .keys()
            .filter(|u| !current.contains(u.as_str()))
            .cloned()
            .collect();
        for url in done {
            if let Some(bar) = self.in_flight.remove(&url) {
                bar.finish_and_clear();
            }
        }

        for url in current {
            if self.in_flight.contains_key(url) {
                continue;
            }
            let bar = self.multi.add(ProgressBar::new_spinner());
            if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
                bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
            }
            bar.set_message(url.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            self.in_flight.insert(url.to_string(), bar);
        }
    }

    pub fn finish(&mut self, success: bool) {
        if !self.enabled {
            return;
        }
        for (_, bar) in self.in_flight.drain() {
            bar.finish_and_clear();
        }
        let msg = if success {
            "✅ Task completed"
        } else {
            "❌ Task failed"
        };
        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.in_flight.drain() {
            bar.finish_and_clear();
        }
    }
}
