use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::TrackerError;
use super::source::ElementSource;
use super::types::{ObserverCoordinate, TrackerEvent, TrackerMode, TrackerStatus, WorkerCommand};
use super::worker::{run_worker, Shared};
use crate::pubsub::{Channel, Subscription};

#[derive(Debug)]
struct WorkerHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
    loader: JoinHandle<()>,
}

/// Interactive side of the propagation boundary.
///
/// `start` spawns the worker and a one-shot element-set load. Commands are
/// fire-and-forget; results arrive on [`PropagationChannel::subscribe`].
pub struct PropagationChannel {
    shared: Arc<StdMutex<Shared>>,
    events: Channel<TrackerEvent>,
    worker: Option<WorkerHandle>,
    pending_observer: Option<ObserverCoordinate>,
    pending_period: Option<Duration>,
}

impl PropagationChannel {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(StdMutex::new(Shared::new())),
            events: Channel::new(),
            worker: None,
            pending_observer: None,
            pending_period: None,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        self.shared.lock().unwrap().status.clone()
    }

    pub fn subscribe(&self) -> Subscription<TrackerEvent> {
        self.events.subscribe()
    }

    /// Start a tracking session. The first start wins: repeated calls while
    /// the element set is loading are dropped, calls on a ready session become
    /// observer/period updates, and a session that failed to initialise stays
    /// unavailable until [`PropagationChannel::stop`].
    ///
    /// Observer and period updates made before `start` take precedence over
    /// the arguments.
    pub fn start(
        &mut self,
        source: ElementSource,
        observer: ObserverCoordinate,
        period: Duration,
    ) -> Result<(), TrackerError> {
        let mode = self.status().mode;
        match mode {
            TrackerMode::Idle => {}
            TrackerMode::Starting => {
                log::debug!("Tracker still starting, dropping start");
                return Err(TrackerError::AlreadyRunning);
            }
            TrackerMode::Ready { .. } => {
                self.send(WorkerCommand {
                    coords: Some(observer),
                    ..WorkerCommand::period(period)
                });
                return Ok(());
            }
            TrackerMode::Unavailable { reason } => {
                log::warn!("Tracker unavailable ({}), dropping start", reason);
                return Err(TrackerError::Unavailable(reason));
            }
        }

        let observer = self.pending_observer.take().unwrap_or(observer);
        let period = self.pending_period.take().unwrap_or(period);
        let session = Uuid::new_v4();
        {
            let mut locked = self.shared.lock().unwrap();
            locked.status.mode = TrackerMode::Starting;
            locked.status.session = Some(session);
            locked.status.ticks = 0;
        }
        log::info!(
            "Starting tracker session {} from {}",
            session,
            source.describe()
        );

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_worker(
            self.shared.clone(),
            self.events.clone(),
            commands_rx,
            stop_rx,
        ));

        // Observer and period go first so that later updates are never
        // overwritten by the element set arriving.
        let _ = commands.send(WorkerCommand {
            coords: Some(observer),
            ..WorkerCommand::period(period)
        });

        let loader = tokio::spawn(load_elements(
            source,
            commands.clone(),
            self.shared.clone(),
            self.events.clone(),
        ));

        self.worker = Some(WorkerHandle {
            commands,
            stop_tx,
            join,
            loader,
        });
        Ok(())
    }

    /// Move the observer. Applied from the next tick on.
    pub fn update_observer(&mut self, observer: ObserverCoordinate) {
        if self.worker.is_some() {
            self.send(WorkerCommand::observer(observer));
        } else {
            self.pending_observer = Some(observer);
        }
    }

    /// Change the tick period. The worker replaces its timer.
    pub fn update_period(&mut self, period: Duration) {
        if self.worker.is_some() {
            self.send(WorkerCommand::period(period));
        } else {
            self.pending_period = Some(period);
        }
    }

    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.loader.abort();
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
        let mut locked = self.shared.lock().unwrap();
        locked.status.mode = TrackerMode::Idle;
        locked.status.session = None;
    }

    fn send(&self, cmd: WorkerCommand) {
        if let Some(worker) = &self.worker {
            if worker.commands.send(cmd).is_err() {
                log::warn!("{}", TrackerError::WorkerGone);
            }
        }
    }
}

impl Default for PropagationChannel {
    fn default() -> Self {
        Self::new()
    }
}

async fn load_elements(
    source: ElementSource,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    shared: Arc<StdMutex<Shared>>,
    events: Channel<TrackerEvent>,
) {
    match source.load().await {
        Ok(elements) => {
            log::info!("Loaded {} element sets", elements.len());
            let _ = commands.send(WorkerCommand {
                gp_elements: Some(elements),
                ..Default::default()
            });
        }
        Err(e) => {
            let reason = e.to_string();
            log::error!("Tracker unavailable: {}", reason);
            shared.lock().unwrap().status.mode = TrackerMode::Unavailable {
                reason: reason.clone(),
            };
            events.publish(TrackerEvent::Unavailable(reason));
        }
    }
}
