use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use tileworld_engine::{FrameStats, MovementStats};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::demo::DemoSession;
use super::metrics::MetricsAccumulator;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) metrics_log_interval: Duration,
    /// Simulated time after which the headless run stops.
    pub(crate) run_duration: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            run_duration: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u64,
    pub(crate) simulated: Duration,
    pub(crate) dropped_backlog: Duration,
    pub(crate) movement: MovementStats,
}

impl RunSummary {
    fn record_tick(&mut self, fixed_dt: Duration, stats: &FrameStats) {
        self.ticks = self.ticks.saturating_add(1);
        self.simulated = self.simulated.saturating_add(fixed_dt);
        self.movement.accumulate(stats.movement);
    }
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let mut session = match DemoSession::new(app.world_config, app.scenario) {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    info!(map = session.map(), "scene_loaded");

    let summary = run_headless(&app.config, &mut session);
    info!(
        ticks = summary.ticks,
        elapsed_seconds = session.elapsed_seconds(),
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        interactions_fired = summary.movement.interactions_fired,
        entities_freed = summary.movement.entities_freed,
        dialogue_lines = session.transcript().len(),
        map = session.map(),
        "shutdown"
    );
    ExitCode::SUCCESS
}

/// Real-time fixed-step loop without a window: frames are paced by sleeping
/// and the session is stepped at `target_tps`.
pub(crate) fn run_headless(config: &LoopConfig, session: &mut DemoSession) -> RunSummary {
    let target_tps = config.target_tps.max(1);
    let fixed_dt = fixed_tick_duration(target_tps);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        run_duration_ms = config.run_duration.as_millis() as u64,
        "loop_config"
    );

    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut summary = RunSummary::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();

    while summary.simulated < config.run_duration {
        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        let frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
        accumulator = accumulator.saturating_add(frame_dt);
        metrics_accumulator.record_frame(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            let stats = session.step(fixed_dt.as_secs_f32());
            summary.record_tick(fixed_dt, &stats);
            metrics_accumulator.record_tick(&stats);
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                actors_moved = snapshot.movement.actors_moved,
                interactions_fired = snapshot.movement.interactions_fired,
                collisions_unresolved = snapshot.movement.collisions_unresolved,
                map = session.map(),
                "loop_metrics"
            );
        }

        let elapsed = Instant::now().saturating_duration_since(now);
        let pace_sleep = compute_cap_sleep(elapsed, Some(fixed_dt));
        if pace_sleep > Duration::ZERO {
            thread::sleep(pace_sleep);
        }
    }

    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn fixed_tick_duration(target_tps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_tps.max(1) as f64)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scenario::Scenario;
    use tileworld_engine::WorldConfig;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn plan_sim_steps_keeps_partial_tick() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(20), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 1);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(4));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), Duration::from_secs(1)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn compute_cap_sleep_zero_when_past_tick_target() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), Some(fixed_tick_duration(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_ahead_of_tick_target() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), Some(fixed_tick_duration(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn headless_run_stops_after_simulated_duration() {
        let scenario = Scenario::builtin().expect("builtin scenario");
        let mut session = DemoSession::new(WorldConfig::default(), scenario).expect("session");
        let config = LoopConfig {
            run_duration: Duration::from_millis(100),
            ..LoopConfig::default()
        };

        let summary = run_headless(&config, &mut session);
        assert!(summary.ticks >= 6);
        assert!(summary.simulated >= config.run_duration);
        assert!(session.elapsed_seconds() > 0.09);
    }
}
