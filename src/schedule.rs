//! Scheduling: run the pipeline repeatedly on a wall-clock cadence.
//!
//! Three cadences are supported. Fixed intervals sleep a constant duration
//! after each run returns, so run duration drifts the start times; that is
//! accepted. Time-of-day cadences recompute the next boundary from the
//! wall clock after every run, so they self-correct no matter how long a
//! run takes.
//!
//! Runs never overlap: each cycle awaits the previous one by construction.
//! The cycle log is truncated before every run, so it only ever holds the
//! latest run's record.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;
use crate::models::RunOutcome;

/// Unit for fixed-interval scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalUnit {
    fn seconds(&self) -> u64 {
        match self {
            IntervalUnit::Minutes => 60,
            IntervalUnit::Hours => 3600,
            IntervalUnit::Days => 86_400,
        }
    }
}

/// When the scheduler fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Sleep `count * unit` after each run returns
    EveryInterval { unit: IntervalUnit, count: u32 },
    /// Run at the given local time every day
    DailyAt(NaiveTime),
    /// Run at the given local time every `days` calendar days
    EveryNDaysAt { days: u32, time: NaiveTime },
}

impl ScheduleSpec {
    /// The sleep period for interval mode.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            ScheduleSpec::EveryInterval { unit, count } => {
                Some(Duration::from_secs(unit.seconds() * u64::from(*count)))
            }
            _ => None,
        }
    }

    /// First boundary for a time-of-day cadence: today's `hh:mm` if still
    /// ahead of `now`, otherwise tomorrow's.
    pub fn first_boundary(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let time = match self {
            ScheduleSpec::DailyAt(time) => *time,
            ScheduleSpec::EveryNDaysAt { time, .. } => *time,
            ScheduleSpec::EveryInterval { .. } => return None,
        };
        let today = now.date().and_time(time);
        if today > now {
            Some(today)
        } else {
            Some(today + ChronoDuration::days(1))
        }
    }

    /// Boundary following `previous`, given the wall clock after a run.
    ///
    /// Daily mode anchors on the calendar day after the run finished, so a
    /// run that overruns its own slot never causes a same-day double fire.
    /// N-day mode advances in fixed steps from the previous boundary,
    /// skipping any boundary the run overran entirely.
    pub fn boundary_after(&self, previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            ScheduleSpec::EveryInterval { .. } => previous,
            ScheduleSpec::DailyAt(time) => {
                let mut next = now.date().and_time(*time);
                while next <= now {
                    next += ChronoDuration::days(1);
                }
                next
            }
            ScheduleSpec::EveryNDaysAt { days, .. } => {
                let step = ChronoDuration::days(i64::from((*days).max(1)));
                let mut next = previous + step;
                while next <= now {
                    next += step;
                }
                next
            }
        }
    }
}

/// Wall clock and sleep, injectable so schedule behavior is testable
/// without real delays.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    async fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives repeated pipeline runs on a [`ScheduleSpec`].
pub struct Scheduler<C: Clock> {
    spec: ScheduleSpec,
    clock: C,
    log_path: PathBuf,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(spec: ScheduleSpec, clock: C, log_path: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            clock,
            log_path: log_path.into(),
        }
    }

    /// Run cycles until the process is terminated. Only a configuration
    /// error ends the loop from the inside.
    pub async fn run<F, Fut>(&self, mut cycle: F) -> Result<(), ConfigError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<RunOutcome, ConfigError>>,
    {
        if let Some(period) = self.spec.interval() {
            loop {
                self.run_cycle(&mut cycle).await?;
                self.clock.sleep(period).await;
            }
        }

        let mut boundary = match self.spec.first_boundary(self.clock.now()) {
            Some(b) => b,
            // Unreachable: interval mode returned above
            None => return Ok(()),
        };
        loop {
            let now = self.clock.now();
            if boundary > now {
                let wait = (boundary - now).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(next = %boundary, "sleeping until next boundary");
                self.clock.sleep(wait).await;
            }
            self.run_cycle(&mut cycle).await?;
            boundary = self.spec.boundary_after(boundary, self.clock.now());
        }
    }

    async fn run_cycle<F, Fut>(&self, cycle: &mut F) -> Result<(), ConfigError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<RunOutcome, ConfigError>>,
    {
        // Truncate before running: a crash mid-run still leaves this
        // cycle's partial record, never a stale one.
        self.log(true, |file| {
            writeln!(
                file,
                "cycle started {}",
                self.clock.now().format("%Y-%m-%d %H:%M:%S")
            )
        });
        let outcome = cycle().await?;
        self.log(false, |file| writeln!(file, "{}", outcome.summary()));
        Ok(())
    }

    fn log(&self, truncate: bool, write: impl FnOnce(&mut std::fs::File) -> std::io::Result<()>) {
        let result = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(truncate)
            .append(!truncate)
            .open(&self.log_path)
            .and_then(|mut file| write(&mut file));
        if let Err(e) = result {
            tracing::warn!(path = %self.log_path.display(), error = %e, "failed to write cycle log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
    }

    fn at(time: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time, "%H:%M").unwrap()
    }

    #[test]
    fn test_interval_duration() {
        let spec = ScheduleSpec::EveryInterval {
            unit: IntervalUnit::Minutes,
            count: 30,
        };
        assert_eq!(spec.interval(), Some(Duration::from_secs(1800)));
        assert!(ScheduleSpec::DailyAt(at("14:30")).interval().is_none());
    }

    #[test]
    fn test_first_boundary_today_if_ahead() {
        let spec = ScheduleSpec::DailyAt(at("14:30"));
        assert_eq!(
            spec.first_boundary(dt("2026-08-28", "09:00")),
            Some(dt("2026-08-28", "14:30"))
        );
    }

    #[test]
    fn test_first_boundary_tomorrow_if_passed() {
        let spec = ScheduleSpec::DailyAt(at("14:30"));
        assert_eq!(
            spec.first_boundary(dt("2026-08-28", "15:00")),
            Some(dt("2026-08-29", "14:30"))
        );
    }

    #[test]
    fn test_daily_boundary_corrects_for_run_duration() {
        // A run fired at 14:30 takes 45 minutes; the next boundary is
        // 14:30 the following day, not 15:15
        let spec = ScheduleSpec::DailyAt(at("14:30"));
        let next = spec.boundary_after(dt("2026-08-28", "14:30"), dt("2026-08-28", "15:15"));
        assert_eq!(next, dt("2026-08-29", "14:30"));
    }

    #[test]
    fn test_daily_boundary_skips_a_whole_day_overrun() {
        let spec = ScheduleSpec::DailyAt(at("14:30"));
        let next = spec.boundary_after(dt("2026-08-28", "14:30"), dt("2026-08-29", "16:00"));
        assert_eq!(next, dt("2026-08-30", "14:30"));
    }

    #[test]
    fn test_n_day_boundary_advances_from_previous_boundary() {
        let spec = ScheduleSpec::EveryNDaysAt {
            days: 3,
            time: at("08:00"),
        };
        let next = spec.boundary_after(dt("2026-08-28", "08:00"), dt("2026-08-28", "08:05"));
        assert_eq!(next, dt("2026-08-31", "08:00"));
    }

    #[test]
    fn test_n_day_boundary_skips_overrun_steps() {
        let spec = ScheduleSpec::EveryNDaysAt {
            days: 2,
            time: at("08:00"),
        };
        // The run somehow took five days; skip past the stale boundaries
        let next = spec.boundary_after(dt("2026-08-28", "08:00"), dt("2026-09-02", "10:00"));
        assert_eq!(next, dt("2026-09-03", "08:00"));
    }

    #[tokio::test]
    async fn test_cycle_log_is_overwritten_each_cycle() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct InstantClock;

        #[async_trait]
        impl Clock for InstantClock {
            fn now(&self) -> NaiveDateTime {
                dt("2026-08-28", "09:00")
            }
            async fn sleep(&self, _duration: Duration) {}
        }

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("cycle.log");
        let scheduler = Scheduler::new(
            ScheduleSpec::EveryInterval {
                unit: IntervalUnit::Minutes,
                count: 1,
            },
            InstantClock,
            &log,
        );

        // End the loop after two cycles by returning a config error
        let calls = AtomicU32::new(0);
        let result = scheduler
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        let mut outcome = RunOutcome::new();
                        outcome.record_channel("email", crate::models::ChannelStatus::Success);
                        Ok(outcome)
                    } else {
                        Err(ConfigError::NoSourceEnabled)
                    }
                }
            })
            .await;

        assert!(result.is_err());
        let content = std::fs::read_to_string(&log).unwrap();
        // The failing third cycle truncated the log before running, so
        // earlier cycles' records are gone and no summary was written
        assert_eq!(content.matches("cycle started").count(), 1);
        assert!(!content.contains("channel email"));
    }

    #[tokio::test]
    async fn test_cycle_log_holds_start_line_and_summary() {
        struct BlockingClock;

        #[async_trait]
        impl Clock for BlockingClock {
            fn now(&self) -> NaiveDateTime {
                dt("2026-08-28", "09:00")
            }
            async fn sleep(&self, _duration: Duration) {
                std::future::pending::<()>().await;
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("cycle.log");
        let scheduler = Scheduler::new(
            ScheduleSpec::EveryInterval {
                unit: IntervalUnit::Hours,
                count: 1,
            },
            BlockingClock,
            &log,
        );

        // The post-run sleep never returns; time out after the first cycle
        let run = scheduler.run(|| async {
            let mut outcome = RunOutcome::new();
            outcome.record_channel("email", crate::models::ChannelStatus::Success);
            Ok(outcome)
        });
        let _ = tokio::time::timeout(Duration::from_millis(100), run).await;

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("cycle started 2026-08-28 09:00:00"));
        assert!(content.contains("channel email: success"));
    }
}
