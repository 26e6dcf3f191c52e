use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::engine::PropagationEngine;
use super::types::{
    ElementSet, ObserverCoordinate, TickPayload, TrackerEvent, TrackerMode, TrackerStatus,
    WorkerCommand,
};
use crate::pubsub::Channel;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub(super) struct Shared {
    pub status: TrackerStatus,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            status: TrackerStatus {
                mode: TrackerMode::Idle,
                session: None,
                period_ms: DEFAULT_PERIOD.as_millis() as u64,
                ticks: 0,
            },
        }
    }
}

/// Propagation side of the boundary. Everything here is touched only from the
/// worker task.
struct Worker {
    engine: Option<PropagationEngine>,
    names: Vec<String>,
    observer: ObserverCoordinate,
    period: Duration,
    shared: Arc<StdMutex<Shared>>,
    events: Channel<TrackerEvent>,
}

enum Step {
    Command(WorkerCommand),
    Tick,
}

pub(super) async fn run_worker(
    shared: Arc<StdMutex<Shared>>,
    events: Channel<TrackerEvent>,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut worker = Worker {
        engine: None,
        names: Vec::new(),
        observer: ObserverCoordinate::default(),
        period: DEFAULT_PERIOD,
        shared,
        events,
    };
    let mut ticker: Option<Interval> = None;

    loop {
        let step = tokio::select! {
            _ = &mut stop_rx => break,
            cmd = commands.recv() => match cmd {
                Some(cmd) => Step::Command(cmd),
                None => break,
            },
            _ = next_tick(&mut ticker) => Step::Tick,
        };

        match step {
            Step::Command(cmd) => {
                if let Some(period) = worker.handle(cmd) {
                    // Replacing the interval drops the old timer.
                    ticker = Some(new_ticker(period));
                }
            }
            Step::Tick => worker.tick(),
        }
    }

    log::debug!("Propagation worker stopped");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl Worker {
    /// Apply one command. Returns the period to (re)schedule ticks at, if the
    /// schedule must change.
    fn handle(&mut self, cmd: WorkerCommand) -> Option<Duration> {
        let period = cmd.period_duration();
        if let Some(period) = period {
            self.period = period;
            self.shared.lock().unwrap().status.period_ms = period.as_millis() as u64;
        }
        if let Some(coords) = cmd.coords {
            self.observer = coords;
            if let Some(engine) = self.engine.as_mut() {
                engine.set_observer(coords);
            }
        }

        match (cmd.gp_elements, self.engine.is_some()) {
            (Some(elements), false) => {
                if self.initialize(&elements) {
                    return Some(self.period);
                }
                None
            }
            (Some(_), true) => {
                log::debug!("Ignoring element set for an initialised session");
                period
            }
            (None, true) => period,
            (None, false) => None,
        }
    }

    fn initialize(&mut self, catalog: &[ElementSet]) -> bool {
        let engine = match PropagationEngine::new(catalog, self.observer) {
            Ok(engine) => engine,
            Err(e) => {
                let reason = e.to_string();
                log::error!("Propagation engine init failed: {}", reason);
                self.shared.lock().unwrap().status.mode = TrackerMode::Unavailable {
                    reason: reason.clone(),
                };
                self.events.publish(TrackerEvent::Unavailable(reason));
                return false;
            }
        };

        self.names = resolve_names(&engine.norad_ids(), catalog);
        log::info!(
            "Propagating {} of {} element sets every {:?}",
            self.names.len(),
            catalog.len(),
            self.period
        );
        self.shared.lock().unwrap().status.mode = TrackerMode::Ready {
            targets: self.names.len(),
        };
        self.engine = Some(engine);
        true
    }

    fn tick(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };

        let states = engine.propagate(Utc::now());
        let mut geodetic = Vec::with_capacity(states.len());
        let mut horizontal = Vec::with_capacity(states.len());
        let mut velocity = Vec::with_capacity(states.len());
        for state in states {
            geodetic.push(state.geodetic);
            horizontal.push(state.horizontal);
            velocity.push(state.velocity);
        }

        match TickPayload::new(geodetic, horizontal, velocity, self.names.clone()) {
            Ok(payload) => {
                self.shared.lock().unwrap().status.ticks += 1;
                self.events.publish(TrackerEvent::Tick(Arc::new(payload)));
            }
            Err(e) => log::error!("Dropping tick: {}", e),
        }
    }
}

/// Map engine slot ids back to catalog names. The resulting order is the
/// index basis of every tick for the session.
pub fn resolve_names(ids: &[u64], catalog: &[ElementSet]) -> Vec<String> {
    ids.iter()
        .map(|id| {
            catalog
                .iter()
                .find(|set| set.norad_cat_id == *id)
                .map(|set| set.object_name.clone())
                .unwrap_or_else(|| format!("NORAD {}", id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::engine::tests::{catalog, iss};

    struct Harness {
        shared: Arc<StdMutex<Shared>>,
        events: crate::pubsub::Subscription<TrackerEvent>,
        commands: mpsc::UnboundedSender<WorkerCommand>,
        _stop: oneshot::Sender<()>,
    }

    fn spawn() -> Harness {
        let shared = Arc::new(StdMutex::new(Shared::new()));
        let channel = Channel::new();
        let events = channel.subscribe();
        let (commands, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(run_worker(shared.clone(), channel, rx, stop_rx));
        Harness {
            shared,
            events,
            commands,
            _stop: stop_tx,
        }
    }

    fn ticks(events: &mut crate::pubsub::Subscription<TrackerEvent>) -> Vec<Arc<TickPayload>> {
        events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                TrackerEvent::Tick(p) => Some(p),
                TrackerEvent::Unavailable(_) => None,
            })
            .collect()
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn names_follow_engine_order() {
        let names = resolve_names(&[25544, 90001, 90002, 7], &catalog());
        assert_eq!(names, vec!["ISS (ZARYA)", "ALPHA", "BRAVO", "NORAD 7"]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_index_aligned_and_stable() {
        let mut h = spawn();
        h.commands
            .send(WorkerCommand::init(
                catalog(),
                ObserverCoordinate::new(0.0, 0.0, 0.0),
                Duration::from_millis(1000),
            ))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        settle().await;

        let ticks = ticks(&mut h.events);
        assert_eq!(ticks.len(), 2);
        for tick in &ticks {
            assert_eq!(tick.geodetic().len(), tick.len());
            assert_eq!(tick.horizontal().len(), tick.len());
            assert_eq!(tick.velocity().len(), tick.len());
            assert_eq!(tick.names(), ["ISS (ZARYA)", "ALPHA", "BRAVO"]);
        }
        assert_eq!(
            h.shared.lock().unwrap().status.mode,
            TrackerMode::Ready { targets: 3 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn period_change_replaces_the_timer() {
        let mut h = spawn();
        h.commands
            .send(WorkerCommand::init(
                vec![iss()],
                ObserverCoordinate::default(),
                Duration::from_millis(1000),
            ))
            .unwrap();
        settle().await;

        tokio::time::sleep(Duration::from_millis(450)).await;
        h.commands
            .send(WorkerCommand::period(Duration::from_millis(100)))
            .unwrap();
        settle().await;

        // New ticks at 550, 650, 750, 850, 950; the old timer would add 1000.
        tokio::time::sleep(Duration::from_millis(570)).await;
        settle().await;
        assert_eq!(ticks(&mut h.events).len(), 5);
        assert_eq!(h.shared.lock().unwrap().status.period_ms, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn second_element_set_is_ignored() {
        let mut h = spawn();
        h.commands
            .send(WorkerCommand::init(
                vec![iss()],
                ObserverCoordinate::default(),
                Duration::from_millis(1000),
            ))
            .unwrap();
        h.commands
            .send(WorkerCommand {
                gp_elements: Some(catalog()),
                ..Default::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        settle().await;

        let ticks = ticks(&mut h.events);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].names(), ["ISS (ZARYA)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_catalog_reports_unavailable() {
        let mut h = spawn();
        let mut bad = iss();
        bad.mean_motion = -1.0;
        h.commands
            .send(WorkerCommand::init(
                vec![bad],
                ObserverCoordinate::default(),
                Duration::from_millis(100),
            ))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;

        let events = h.events.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TrackerEvent::Unavailable(_)));
        assert!(matches!(
            h.shared.lock().unwrap().status.mode,
            TrackerMode::Unavailable { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn observer_update_applies_on_next_tick() {
        let mut h = spawn();
        h.commands
            .send(WorkerCommand::init(
                vec![iss()],
                ObserverCoordinate::new(0.0, 0.0, 0.0),
                Duration::from_millis(1000),
            ))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        h.commands
            .send(WorkerCommand::observer(ObserverCoordinate::new(60.0, 100.0, 0.0)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;

        let ticks = ticks(&mut h.events);
        assert_eq!(ticks.len(), 2);
        let before = ticks[0].horizontal()[0];
        let after = ticks[1].horizontal()[0];
        assert!((before.range_km - after.range_km).abs() > 100.0);
    }
}
