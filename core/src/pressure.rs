//! Process memory sampling for batch throttling.

use std::sync::Mutex;

use crate::config::MemoryPressureConfig;

/// Source of the current process resident set size.
pub trait MemoryProbe: Send + Sync {
    /// RSS in megabytes, or `None` when it cannot be sampled.
    fn rss_mb(&self) -> Option<u64>;
}

/// `sysinfo`-backed probe; one `System` instance is reused across samples.
pub struct SysinfoProbe {
    sys: Mutex<sysinfo::System>,
    pid: Option<sysinfo::Pid>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(sysinfo::System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn rss_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut sys = self.sys.lock().ok()?;
        sys.refresh_process(pid);
        sys.process(pid).map(|p| p.memory() / (1024 * 1024))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryLevel {
    Normal,
    ShouldCleanup,
    High,
    Critical,
}

impl MemoryLevel {
    pub fn from_rss(rss_mb: u64, cfg: &MemoryPressureConfig) -> Self {
        if rss_mb >= cfg.critical_rss_mb {
            Self::Critical
        } else if rss_mb >= cfg.high_rss_mb {
            Self::High
        } else if rss_mb >= cfg.cleanup_rss_mb {
            Self::ShouldCleanup
        } else {
            Self::Normal
        }
    }

    /// Multiplier applied to the inter-batch delay.
    pub fn delay_factor(self) -> u64 {
        match self {
            Self::Normal => 1,
            Self::ShouldCleanup => 2,
            Self::High | Self::Critical => 3,
        }
    }
}

pub fn sample_level(probe: &dyn MemoryProbe, cfg: &MemoryPressureConfig) -> MemoryLevel {
    if !cfg.enabled {
        return MemoryLevel::Normal;
    }
    probe
        .rss_mb()
        .map(|rss| MemoryLevel::from_rss(rss, cfg))
        .unwrap_or(MemoryLevel::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<u64>);

    impl MemoryProbe for Fixed {
        fn rss_mb(&self) -> Option<u64> {
            self.0
        }
    }

    #[test]
    fn test_levels() {
        let cfg = MemoryPressureConfig::default();
        assert_eq!(MemoryLevel::from_rss(100, &cfg), MemoryLevel::Normal);
        assert_eq!(MemoryLevel::from_rss(300, &cfg), MemoryLevel::ShouldCleanup);
        assert_eq!(MemoryLevel::from_rss(450, &cfg), MemoryLevel::High);
        assert_eq!(MemoryLevel::from_rss(600, &cfg), MemoryLevel::Critical);
    }

    #[test]
    fn test_sample_level_disabled_or_unavailable() {
        let mut cfg = MemoryPressureConfig::default();
        assert_eq!(sample_level(&Fixed(None), &cfg), MemoryLevel::Normal);
        assert_eq!(sample_level(&Fixed(Some(700)), &cfg), MemoryLevel::Critical);
        cfg.enabled = false;
        assert_eq!(sample_level(&Fixed(Some(700)), &cfg), MemoryLevel::Normal);
    }

    #[test]
    fn test_sysinfo_probe_reports_something() {
        let probe = SysinfoProbe::new();
        assert!(probe.rss_mb().is_some());
    }
}
