use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use kissan_core::storage::credentials;
use kissan_core::{
    AuthSession, Config, DwellMode, EngagementProvider, EngagementTracker, Event,
    HttpRewardClient, LifecycleHub, LifecycleState, LogSink, Notification, NotificationSink,
    RewardGuard, RewardPolicy,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

#[derive(Subcommand)]
pub enum EngagementAction {
    /// Replay a lifecycle script on a virtual clock and print events as JSON lines
    Simulate {
        /// Comma-separated "<secs>:<event>" entries; events are
        /// enable, disable, active, inactive, background
        #[arg(long, default_value = "0:enable")]
        script: String,
        /// Stop the virtual clock at this many seconds
        #[arg(long, default_value = "600")]
        until: u64,
        /// Override engagement.reward_threshold_secs
        #[arg(long)]
        threshold_secs: Option<u64>,
        /// Override engagement.poll_interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Override engagement.dwell_mode (cumulative | continuous)
        #[arg(long)]
        dwell_mode: Option<String>,
    },
    /// Run the live timer against the configured API; reads lifecycle
    /// commands (active, inactive, background, login, logout, quit) from stdin
    Watch,
}

pub fn run(action: EngagementAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        EngagementAction::Simulate {
            script,
            until,
            threshold_secs,
            interval_secs,
            dwell_mode,
        } => {
            let mut policy = Config::load()?.engagement.policy();
            if let Some(secs) = threshold_secs {
                policy.threshold = Duration::from_secs(secs);
            }
            if let Some(secs) = interval_secs {
                policy.poll_interval = Duration::from_secs(secs);
            }
            if let Some(mode) = dwell_mode {
                policy.dwell_mode = parse_dwell_mode(&mode)?;
            }
            if policy.poll_interval.is_zero() {
                return Err("poll interval must be greater than 0".into());
            }
            let entries = parse_script(&script)?;
            for line in simulate(policy, &entries, until)? {
                println!("{}", serde_json::to_string(&line)?);
            }
        }
        EngagementAction::Watch => watch()?,
    }
    Ok(())
}

// ── Simulation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptAction {
    Enable,
    Disable,
    Lifecycle(LifecycleState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScriptEntry {
    at: u64,
    action: ScriptAction,
}

#[derive(Debug, Serialize)]
struct SimLine {
    t: u64,
    #[serde(flatten)]
    event: Event,
}

fn parse_dwell_mode(s: &str) -> Result<DwellMode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "cumulative" => Ok(DwellMode::Cumulative),
        "continuous" => Ok(DwellMode::Continuous),
        other => Err(format!("unknown dwell mode: {other}")),
    }
}

fn parse_script(script: &str) -> Result<Vec<ScriptEntry>, String> {
    let mut entries = Vec::new();
    for raw in script.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (at, name) = raw
            .split_once(':')
            .ok_or_else(|| format!("expected <secs>:<event>, got '{raw}'"))?;
        let at = at
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("invalid time in '{raw}'"))?;
        let action = match name.trim() {
            "enable" => ScriptAction::Enable,
            "disable" => ScriptAction::Disable,
            other => ScriptAction::Lifecycle(other.parse()?),
        };
        entries.push(ScriptEntry { at, action });
    }
    // Stable: entries at the same second keep their written order.
    entries.sort_by_key(|e| e.at);
    Ok(entries)
}

/// Drive an [`EngagementTracker`] the way the live timer does, but on a
/// virtual clock measured in whole seconds from `t0`.
///
/// Polls that cannot change anything are skipped: none run once the reward
/// has been claimed, and while counting down the clock jumps straight to the
/// first poll at or past the threshold.
fn simulate(
    policy: RewardPolicy,
    entries: &[ScriptEntry],
    until: u64,
) -> Result<Vec<SimLine>, String> {
    let mut tracker = EngagementTracker::new(policy, RewardGuard::new());
    let interval = tracker.policy().poll_interval.as_secs().max(1);
    let threshold = ceil_secs(tracker.policy().threshold);
    let mut host = LifecycleState::Active;
    let t0 = Instant::now();
    t0.checked_add(Duration::from_secs(until))
        .ok_or_else(|| format!("--until {until} is out of range"))?;
    // Every instant handed to the tracker is at or before `until`.
    let at = |secs: u64| t0 + Duration::from_secs(secs);

    let mut lines = Vec::new();
    let mut next_poll: Option<u64> = None;
    let mut pending = entries.iter().peekable();

    loop {
        let next_entry = pending.peek().map(|e| e.at);
        let due_poll = if tracker.is_rewarded() {
            None
        } else {
            next_poll.map(|p| match tracker.session_start() {
                Some(start) => {
                    let start = start.duration_since(t0).as_secs();
                    first_poll_at_or_after(p, start.saturating_add(threshold), interval)
                }
                None => p,
            })
        };
        // A poll due at the same second as a script entry runs first.
        let (t, is_poll) = match (due_poll, next_entry) {
            (Some(p), Some(e)) if p <= e => (p, true),
            (_, Some(e)) => (e, false),
            (Some(p), None) => (p, true),
            (None, None) => break,
        };
        if t > until {
            break;
        }

        let event = if is_poll {
            next_poll = Some(t.saturating_add(interval));
            tracker.poll(at(t))
        } else {
            let entry = pending.next().map(|e| e.action);
            match entry {
                Some(ScriptAction::Enable) => tracker.start(true, host.is_foreground(), at(t)),
                Some(ScriptAction::Disable) => tracker.start(false, host.is_foreground(), at(t)),
                Some(ScriptAction::Lifecycle(state)) => {
                    host = state;
                    tracker.on_lifecycle(state, at(t))
                }
                None => None,
            }
        };

        match (tracker.is_polling(), next_poll.is_some()) {
            (true, false) => next_poll = Some(t.saturating_add(interval)),
            (false, true) => next_poll = None,
            _ => {}
        }

        if let Some(event) = event {
            lines.push(SimLine { t, event });
        }
    }

    lines.push(SimLine {
        t: until,
        event: tracker.snapshot(at(until)),
    });
    Ok(lines)
}

/// The first tick of the grid `next, next + interval, ...` that is `>= due`.
fn first_poll_at_or_after(next: u64, due: u64, interval: u64) -> u64 {
    if due <= next {
        return next;
    }
    let steps = (due - next).div_ceil(interval);
    next.saturating_add(steps.saturating_mul(interval))
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

// ── Live watch ──────────────────────────────────────────────────────

/// Prints notifications to stdout as JSON lines.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize notification"),
        }
    }
}

/// Log every event until the stream closes, returning how many were logged.
/// Falling behind the broadcast buffer skips events but keeps logging.
async fn log_events(mut events: broadcast::Receiver<Event>) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::info!(
                    event = event.name(),
                    "{}",
                    serde_json::to_string(&event).unwrap_or_default()
                );
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    logged
}

fn watch() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user = credentials::load_user()?
        .ok_or("not authenticated; run `kissan-cli auth login` first")?;

    let auth = AuthSession::from_user(Some(user.clone()));
    let hub = LifecycleHub::new();
    let reward = Arc::new(HttpRewardClient::new(&config.api, auth.clone())?);
    let sink: Arc<dyn NotificationSink> = if config.notifications.enabled {
        Arc::new(StdoutSink)
    } else {
        Arc::new(LogSink)
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let provider = EngagementProvider::mount(
            config.engagement.policy(),
            auth.clone(),
            hub.clone(),
            reward,
            sink,
        );

        let logger = tokio::spawn(log_events(provider.subscribe_events()));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match line.trim() {
                "" => {}
                "quit" | "exit" => break,
                "login" => auth.sign_in(user.clone()),
                "logout" => auth.sign_out(),
                other => match other.parse::<LifecycleState>() {
                    Ok(state) => hub.emit(state),
                    Err(e) => eprintln!("{e}"),
                },
            }
        }

        provider.unmount().await;
        logger.abort();
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(lines: &[SimLine]) -> Vec<(u64, &'static str)> {
        lines.iter().map(|l| (l.t, l.event.name())).collect()
    }

    #[test]
    fn parse_script_sorts_and_validates() {
        let entries = parse_script("60:background, 0:enable,600:active").unwrap();
        assert_eq!(entries[0].action, ScriptAction::Enable);
        assert_eq!(entries[1].at, 60);
        assert_eq!(
            entries[2].action,
            ScriptAction::Lifecycle(LifecycleState::Active)
        );

        assert!(parse_script("enable").is_err());
        assert!(parse_script("x:enable").is_err());
        assert!(parse_script("5:sleep").is_err());
        assert!(parse_script("").unwrap().is_empty());
    }

    #[test]
    fn continuous_use_triggers_at_threshold() {
        let entries = parse_script("0:enable").unwrap();
        let lines = simulate(RewardPolicy::default(), &entries, 400).unwrap();
        assert_eq!(
            names(&lines),
            vec![
                (0, "tracking_started"),
                (300, "reward_triggered"),
                (400, "state_snapshot"),
            ]
        );
    }

    #[test]
    fn refocus_after_long_background_triggers_on_next_poll() {
        let entries = parse_script("0:enable,60:background,600:active").unwrap();
        let lines = simulate(RewardPolicy::default(), &entries, 700).unwrap();
        assert_eq!(
            names(&lines),
            vec![
                (0, "tracking_started"),
                (60, "tracking_suspended"),
                (600, "tracking_resumed"),
                (610, "reward_triggered"),
                (700, "state_snapshot"),
            ]
        );
    }

    #[test]
    fn disable_before_threshold_prevents_reward() {
        let entries = parse_script("0:enable,200:disable").unwrap();
        let lines = simulate(RewardPolicy::default(), &entries, 900).unwrap();
        assert_eq!(
            names(&lines),
            vec![
                (0, "tracking_started"),
                (200, "tracking_stopped"),
                (900, "state_snapshot"),
            ]
        );
    }

    #[test]
    fn until_beyond_clock_range_is_an_error() {
        let entries = parse_script(&format!("{}:enable", u64::MAX)).unwrap();
        let err = simulate(RewardPolicy::default(), &entries, u64::MAX).unwrap_err();
        assert!(err.contains("out of range"), "{err}");
    }

    #[test]
    fn long_horizon_stops_polling_after_reward() {
        // 1e11 seconds is 1e10 poll ticks; only the useful ones run.
        let entries = parse_script("0:enable").unwrap();
        let lines = simulate(RewardPolicy::default(), &entries, 100_000_000_000).unwrap();
        assert_eq!(
            names(&lines),
            vec![
                (0, "tracking_started"),
                (300, "reward_triggered"),
                (100_000_000_000, "state_snapshot"),
            ]
        );
    }

    #[test]
    fn long_threshold_jumps_to_the_triggering_poll() {
        let policy = RewardPolicy {
            threshold: Duration::from_secs(50_000_000_005),
            ..RewardPolicy::default()
        };
        let entries = parse_script("3:enable").unwrap();
        let lines = simulate(policy, &entries, 100_000_000_000).unwrap();
        // Polls run every 10s from t=13; the first at or past 50_000_000_008.
        assert_eq!(lines[1].t, 50_000_000_013);
        assert_eq!(lines[1].event.name(), "reward_triggered");
    }

    #[test]
    fn poll_grid_rounds_up_to_the_due_tick() {
        assert_eq!(first_poll_at_or_after(10, 5, 10), 10);
        assert_eq!(first_poll_at_or_after(10, 300, 10), 300);
        assert_eq!(first_poll_at_or_after(13, 301, 10), 303);
        assert_eq!(first_poll_at_or_after(10, u64::MAX, 10), u64::MAX);
    }

    #[tokio::test]
    async fn event_logger_keeps_going_after_lag() {
        let (tx, rx) = broadcast::channel(1);
        let tracker = EngagementTracker::new(RewardPolicy::default(), RewardGuard::new());
        for _ in 0..3 {
            tx.send(tracker.snapshot(Instant::now())).unwrap();
        }
        drop(tx);

        // Two events are overwritten; the last one is still logged.
        assert_eq!(log_events(rx).await, 1);
    }

    #[test]
    fn dwell_mode_parses_case_insensitively() {
        assert_eq!(parse_dwell_mode("Continuous"), Ok(DwellMode::Continuous));
        assert!(parse_dwell_mode("daily").is_err());
    }
}
