use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 單一階段（fetch / aggregate / write）的耗時紀錄
#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
}

#[cfg(feature = "cli")]
struct ProcessProbe {
    system: System,
    pid: Pid,
}

#[cfg(feature = "cli")]
impl ProcessProbe {
    fn new() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new_with_specifics(RefreshKind::everything());
        system.refresh_all();
        Some(Self { system, pid })
    }

    fn sample(&mut self) -> Option<(f32, u64)> {
        self.system.refresh_all();
        let process = self.system.process(self.pid)?;
        Some((process.cpu_usage(), process.memory() / 1024 / 1024))
    }
}

/// 記錄每個階段的耗時，啟用時另外取樣 CPU 與記憶體
pub struct RunMonitor {
    enabled: bool,
    started: Instant,
    phase_started: Mutex<Instant>,
    timings: Mutex<Vec<PhaseTiming>>,
    #[cfg(feature = "cli")]
    probe: Mutex<Option<ProcessProbe>>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            started: now,
            phase_started: Mutex::new(now),
            timings: Mutex::new(Vec::new()),
            #[cfg(feature = "cli")]
            probe: Mutex::new(if enabled { ProcessProbe::new() } else { None }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "cli")]
    fn sample(&self) -> Option<(f32, u64)> {
        self.probe.lock().ok()?.as_mut()?.sample()
    }

    #[cfg(not(feature = "cli"))]
    fn sample(&self) -> Option<(f32, u64)> {
        None
    }

    /// 結束目前階段並開始下一個
    pub fn finish_phase(&self, phase: &str) {
        let elapsed = match self.phase_started.lock() {
            Ok(mut started) => {
                let elapsed = started.elapsed();
                *started = Instant::now();
                elapsed
            }
            Err(_) => return,
        };

        let sample = if self.enabled { self.sample() } else { None };

        if let Some((cpu, memory_mb)) = sample {
            tracing::info!(
                "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB",
                phase,
                elapsed,
                cpu,
                memory_mb
            );
        } else {
            tracing::debug!("{} finished in {:?}", phase, elapsed);
        }

        if let Ok(mut timings) = self.timings.lock() {
            timings.push(PhaseTiming {
                phase: phase.to_string(),
                elapsed,
                memory_mb: sample.map(|(_, memory)| memory),
            });
        }
    }

    pub fn timings(&self) -> Vec<PhaseTiming> {
        self.timings
            .lock()
            .map(|timings| timings.clone())
            .unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self
            .timings()
            .iter()
            .filter_map(|timing| timing.memory_mb)
            .max()
            .unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.started.elapsed(),
            peak
        );
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
