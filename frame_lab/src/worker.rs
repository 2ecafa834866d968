// THEORY:
// The `worker` module runs the frame lab's two independent loops and connects
// them to whoever presents the results.
//
// 1.  **Capture worker**: a single blocking task that owns the
//     `CaptureSourceManager` and the `LabPipeline`. It starts the device, then
//     repeatedly grabs a frame, applies queued pointer interactions, processes
//     the frame, publishes the report, and sleeps off the rest of the pacing
//     interval. At most one frame is in flight.
// 2.  **Simulation ticker**: an async task on a fixed `tokio::time::interval`,
//     independent of the capture cadence. It only ever reads the latest frame.
//
// Handoff: each loop publishes into a `tokio::sync::watch` channel, a single
// slot holding the latest value. A slow consumer never blocks the producer and
// never sees a half-written frame: it sees whole `Arc`s, and a newer report
// simply replaces an older one. Commands flow the other way over unbounded
// `mpsc` channels.
//
// Shutdown is either explicit (`shutdown`) or implied by dropping the handle,
// which closes the stop channel. Either way the capture worker stops the
// manager on its own thread before exiting, releasing the device exactly once.

use crate::config::SimulationConfig;
use crate::core_modules::agent::Agent;
use crate::core_modules::capture::{CaptureSourceManager, CaptureState};
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::simulation::Simulation;
use crate::pipeline::{FrameReport, Interaction, LabPipeline};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub type LatestReport = Option<Arc<FrameReport>>;

/// Controls a running capture worker.
pub struct CaptureHandle {
    reports: watch::Receiver<LatestReport>,
    state: watch::Receiver<CaptureState>,
    interactions: mpsc::UnboundedSender<Interaction>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CaptureHandle {
    /// The most recently published report, if any frame was ever produced.
    pub fn latest(&self) -> LatestReport {
        self.reports.borrow().clone()
    }

    /// A fresh receiver for the report slot, e.g. for a simulation ticker.
    pub fn subscribe(&self) -> watch::Receiver<LatestReport> {
        self.reports.clone()
    }

    pub fn state(&self) -> CaptureState {
        self.state.borrow().clone()
    }

    pub fn state_receiver(&self) -> watch::Receiver<CaptureState> {
        self.state.clone()
    }

    /// Queues an interaction; it is applied before the next frame is processed.
    /// Returns `false` once the worker has exited.
    pub fn send(&self, interaction: Interaction) -> bool {
        self.interactions.send(interaction).is_ok()
    }

    /// Stops the loop and waits for the device to be released.
    pub async fn shutdown(self) {
        self.stop.send_replace(true);
        if let Err(error) = self.task.await {
            tracing::warn!(%error, "capture worker ended abnormally");
        }
    }
}

/// Starts the capture worker on tokio's blocking pool. Must be called from
/// within a tokio runtime.
pub fn spawn_capture_worker(mut manager: CaptureSourceManager, mut pipeline: LabPipeline) -> CaptureHandle {
    let (reports_tx, reports_rx) = watch::channel::<LatestReport>(None);
    let (state_tx, state_rx) = watch::channel(manager.state().clone());
    let (interactions_tx, mut interactions_rx) = mpsc::unbounded_channel::<Interaction>();
    let (stop_tx, stop_rx) = watch::channel(false);

    let task = tokio::task::spawn_blocking(move || {
        let (width, height) = (pipeline.config().width, pipeline.config().height);
        state_tx.send_replace(manager.start(width, height).clone());
        if !manager.is_active() {
            info!("capture unavailable; worker exiting without frames");
            return;
        }

        let pacing = manager.pacing();
        while !stop_requested(&stop_rx) {
            let started = Instant::now();
            // Clone out of the manager's reusable buffer: the published frame must
            // stay stable after the next grab overwrites that buffer.
            if let Some(frame) = manager.grab_frame().cloned() {
                while let Ok(interaction) = interactions_rx.try_recv() {
                    pipeline.interact(interaction, &frame);
                }
                let report = pipeline.process(frame);
                reports_tx.send_replace(Some(Arc::new(report)));
            }
            pace(started, pacing);
        }

        manager.stop();
        state_tx.send_replace(manager.state().clone());
        debug!("capture worker finished");
    });

    CaptureHandle {
        reports: reports_rx,
        state: state_rx,
        interactions: interactions_tx,
        stop: stop_tx,
        task,
    }
}

/// A dropped handle counts as a stop request, so the device is released even
/// when nobody calls `shutdown`.
fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    stop.has_changed().is_err() || *stop.borrow()
}

fn pace(started: Instant, pacing: Duration) {
    if let Some(remaining) = pacing.checked_sub(started.elapsed()) {
        std::thread::sleep(remaining);
    }
}

/// Where simulated agents look when they sample or paint.
pub enum FrameSource {
    None,
    /// The latest frame published by a capture worker.
    Live(watch::Receiver<LatestReport>),
    /// A still image.
    Still(Arc<Frame>),
}

/// A frame kept alive for the length of one tick without copying it.
enum HeldFrame {
    Report(Arc<FrameReport>),
    Still(Arc<Frame>),
}

impl HeldFrame {
    fn frame(&self) -> &Frame {
        match self {
            HeldFrame::Report(report) => &report.frame,
            HeldFrame::Still(frame) => frame,
        }
    }
}

impl FrameSource {
    fn current(&self) -> Option<HeldFrame> {
        match self {
            FrameSource::None => None,
            FrameSource::Live(reports) => reports.borrow().clone().map(HeldFrame::Report),
            FrameSource::Still(frame) => Some(HeldFrame::Still(frame.clone())),
        }
    }
}

/// The agent population as of one tick.
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub tick: u64,
    pub agents: Vec<Agent>,
    /// The painted canvas, when painting is enabled and a frame was available.
    pub canvas: Option<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentCommand {
    /// Grow every agent under (x, y).
    PointerDown { x: f64, y: f64 },
    Shutdown,
}

pub struct SimulationHandle {
    snapshots: watch::Receiver<Arc<AgentSnapshot>>,
    commands: mpsc::UnboundedSender<AgentCommand>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    pub fn latest(&self) -> Arc<AgentSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AgentSnapshot>> {
        self.snapshots.clone()
    }

    pub fn send(&self, command: AgentCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(AgentCommand::Shutdown);
        if let Err(error) = self.task.await {
            tracing::warn!(%error, "simulation ticker ended abnormally");
        }
    }
}

/// Ticks `simulation` every `config.interval` on the tokio runtime.
/// When `paint` is set, agents paint their patch of the source frame onto a
/// canvas that is published with every snapshot.
pub fn spawn_simulation(
    mut simulation: Simulation,
    config: &SimulationConfig,
    source: FrameSource,
    paint: bool,
) -> SimulationHandle {
    let initial = AgentSnapshot {
        tick: simulation.ticks(),
        agents: simulation.agents().to_vec(),
        canvas: None,
    };
    let (snapshots_tx, snapshots_rx) = watch::channel(Arc::new(initial));
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel::<AgentCommand>();
    let interval = config.interval;
    let grow_factor = config.grow_factor;

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut canvas: Option<Frame> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let current = source.current();
                    let frame = current.as_ref().map(HeldFrame::frame).filter(|f| !f.is_empty());
                    if let (true, Some(frame)) = (paint, frame) {
                        if canvas.as_ref().is_none_or(|c| !c.same_dimensions(frame)) {
                            canvas = Some(Frame::new(frame.width(), frame.height()));
                        }
                        if let Some(canvas) = canvas.as_mut() {
                            simulation.paint_all(frame, canvas);
                        }
                    }
                    simulation.tick(frame);
                    snapshots_tx.send_replace(Arc::new(AgentSnapshot {
                        tick: simulation.ticks(),
                        agents: simulation.agents().to_vec(),
                        canvas: canvas.clone(),
                    }));
                }
                command = commands_rx.recv() => match command {
                    Some(AgentCommand::PointerDown { x, y }) => {
                        let grown = simulation.grow_hits(x, y, grow_factor);
                        debug!(x, y, grown, "agents hit");
                    }
                    Some(AgentCommand::Shutdown) | None => break,
                },
            }
        }
        debug!(ticks = simulation.ticks(), "simulation ticker finished");
    });

    SimulationHandle {
        snapshots: snapshots_rx,
        commands: commands_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClickAction, LabConfig};
    use crate::core_modules::agent::{Bounds, Motion};
    use crate::core_modules::capture::{CaptureDriver, SyntheticCamera};
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::core_modules::simulation::{ColorSampling, TickPolicy};
    use crate::error::CaptureError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> LabConfig {
        LabConfig {
            width: 8,
            height: 6,
            pacing: Duration::from_millis(5),
            ..LabConfig::default()
        }
    }

    fn manager(drivers: Vec<Box<dyn CaptureDriver>>, config: &LabConfig) -> CaptureSourceManager {
        CaptureSourceManager::new(drivers, config.pacing)
    }

    /// A solid camera that counts how often it is released.
    struct CountingCamera {
        inner: SyntheticCamera,
        releases: Arc<AtomicUsize>,
    }

    impl CaptureDriver for CountingCamera {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn open(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
            self.inner.open(width, height)
        }
        fn grab(&mut self, frame: &mut Frame) -> Result<(), CaptureError> {
            self.inner.grab(frame)
        }
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.inner.release();
        }
    }

    async fn next_report(rx: &mut watch::Receiver<LatestReport>) -> Arc<FrameReport> {
        loop {
            timeout(WAIT, rx.changed())
                .await
                .expect("report within timeout")
                .expect("worker alive");
            if let Some(report) = rx.borrow_and_update().clone() {
                return report;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_publishes_processed_frames() {
        let config = fast_config();
        let camera = SyntheticCamera::solid(Pixel::new(30, 60, 90));
        let pipeline = LabPipeline::new(config.clone(), None);
        let handle = spawn_capture_worker(manager(vec![Box::new(camera)], &config), pipeline);

        let mut reports = handle.subscribe();
        let first = next_report(&mut reports).await;
        assert_eq!(first.frame.dimensions(), (8, 6));
        assert_eq!(handle.state(), CaptureState::Active { driver: "synthetic".into() });

        assert!(handle.send(Interaction::PointerDown { x: 3, y: 3 }));
        let tracked = loop {
            let report = next_report(&mut reports).await;
            if report.tracked_point.is_some() {
                break report;
            }
        };
        assert_eq!(tracked.track_color, Some(Pixel::new(30, 60, 90)));
        assert!(tracked.frame_id > first.frame_id);

        let state = handle.state_receiver();
        handle.shutdown().await;
        assert_eq!(*state.borrow(), CaptureState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_handle_releases_the_device_once() {
        let config = fast_config();
        let releases = Arc::new(AtomicUsize::new(0));
        let camera = CountingCamera {
            inner: SyntheticCamera::solid(Pixel::WHITE),
            releases: releases.clone(),
        };
        let handle = spawn_capture_worker(manager(vec![Box::new(camera)], &config), LabPipeline::new(config.clone(), None));

        let mut reports = handle.subscribe();
        let mut state = handle.state_receiver();
        next_report(&mut reports).await;
        drop(handle);

        timeout(WAIT, state.wait_for(|s| *s == CaptureState::Stopped))
            .await
            .expect("worker stops after its handle is dropped")
            .expect("state sender alive until the worker exits");
        // Let the worker thread finish and drop the manager.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_consumer_only_sees_the_latest_report() {
        let config = fast_config();
        let camera = SyntheticCamera::solid(Pixel::WHITE);
        let handle = spawn_capture_worker(manager(vec![Box::new(camera)], &config), LabPipeline::new(config.clone(), None));

        let mut reports = handle.subscribe();
        let first = next_report(&mut reports).await;
        // Several frames are published while nobody reads.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let seen = reports.borrow_and_update().clone().expect("reports were published");
        assert!(seen.frame_id >= first.frame_id + 3, "saw {} after {}", seen.frame_id, first.frame_id);
        assert!(seen.frame_id <= handle.latest().expect("published").frame_id);
        handle.shutdown().await;
    }

    #[test]
    fn live_source_lends_the_published_frame_without_copying() {
        let report = Arc::new(LabPipeline::new(fast_config(), None).process(Frame::filled(3, 2, Pixel::WHITE)));
        let (_tx, rx) = watch::channel::<LatestReport>(Some(report.clone()));
        let held = FrameSource::Live(rx).current().expect("a report is published");
        assert!(std::ptr::eq(held.frame(), &report.frame));

        let still = Arc::new(Frame::new(2, 2));
        let held = FrameSource::Still(still.clone()).current().expect("still image");
        assert!(std::ptr::eq(held.frame(), still.as_ref()));
        assert!(FrameSource::None.current().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disabled_capture_never_publishes() {
        let config = fast_config();
        let drivers: Vec<Box<dyn CaptureDriver>> = vec![
            Box::new(SyntheticCamera::unavailable().named("primary")),
            Box::new(SyntheticCamera::unavailable().named("secondary")),
        ];
        let handle = spawn_capture_worker(manager(drivers, &config), LabPipeline::new(config.clone(), None));

        let mut state = handle.state_receiver();
        timeout(WAIT, state.wait_for(|s| *s == CaptureState::Disabled))
            .await
            .expect("state within timeout")
            .expect("state sender alive");
        assert!(handle.latest().is_none());
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn background_capture_goes_through_the_worker() {
        let config = LabConfig {
            click_action: ClickAction::CaptureBackground,
            track_enabled: false,
            ..fast_config()
        };
        let scenery = Frame::filled(8, 6, Pixel::new(0, 255, 0));
        let camera = SyntheticCamera::solid(Pixel::new(100, 100, 100));
        let pipeline = LabPipeline::new(config.clone(), Some(scenery));
        let handle = spawn_capture_worker(manager(vec![Box::new(camera)], &config), pipeline);

        let mut reports = handle.subscribe();
        next_report(&mut reports).await;
        handle.send(Interaction::PointerDown { x: 0, y: 0 });
        let replaced = loop {
            let report = next_report(&mut reports).await;
            if report.frame.get(0, 0) == Some(&Pixel::new(0, 255, 0)) {
                break report;
            }
        };
        assert!(replaced.frame.pixels().iter().all(|p| *p == Pixel::new(0, 255, 0)));
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simulation_ticks_and_samples_a_still_image() {
        let image = Arc::new(Frame::filled(20, 20, Pixel::new(9, 8, 7)));
        let agents = vec![Agent::new(10.0, 10.0, 2.0, Pixel::WHITE, Motion::ElasticBounce { dx: 1.0, dy: 1.0 })];
        let sim_config = SimulationConfig {
            bounds: Bounds::new(20.0, 20.0),
            interval: Duration::from_millis(5),
            sampling: ColorSampling::BeforeMove,
            ..SimulationConfig::default()
        };
        let simulation = Simulation::new(agents, sim_config.bounds, TickPolicy::All, sim_config.sampling, 0);
        let handle = spawn_simulation(simulation, &sim_config, FrameSource::Still(image), true);

        let mut snapshots = handle.subscribe();
        let snapshot = loop {
            timeout(WAIT, snapshots.changed()).await.expect("tick").expect("alive");
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.tick >= 3 {
                break snapshot;
            }
        };
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.agents[0].color, Pixel::new(9, 8, 7));
        let canvas = snapshot.canvas.as_ref().expect("painting enabled");
        assert!(canvas.pixels().iter().any(|p| *p == Pixel::new(9, 8, 7)));
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simulation_samples_the_live_capture() {
        let config = fast_config();
        let camera = SyntheticCamera::solid(Pixel::new(12, 34, 56));
        let capture = spawn_capture_worker(manager(vec![Box::new(camera)], &config), LabPipeline::new(config.clone(), None));

        let agents = vec![Agent::new(4.0, 3.0, 1.0, Pixel::WHITE, Motion::Stationary)];
        let sim_config = SimulationConfig {
            bounds: Bounds::new(8.0, 6.0),
            interval: Duration::from_millis(5),
            ..SimulationConfig::default()
        };
        let simulation = Simulation::new(agents, sim_config.bounds, TickPolicy::All, ColorSampling::AfterMove, 0);
        let ticker = spawn_simulation(simulation, &sim_config, FrameSource::Live(capture.subscribe()), false);

        let mut snapshots = ticker.subscribe();
        loop {
            timeout(WAIT, snapshots.changed()).await.expect("tick").expect("alive");
            if snapshots.borrow_and_update().agents[0].color == Pixel::new(12, 34, 56) {
                break;
            }
        }
        ticker.shutdown().await;
        capture.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pointer_press_grows_hit_agents() {
        let agents = vec![
            Agent::new(10.0, 10.0, 3.0, Pixel::WHITE, Motion::Stationary),
            Agent::new(50.0, 50.0, 3.0, Pixel::WHITE, Motion::Stationary),
        ];
        let sim_config = SimulationConfig {
            interval: Duration::from_millis(5),
            ..SimulationConfig::default()
        };
        let simulation = Simulation::new(agents, sim_config.bounds, TickPolicy::All, ColorSampling::AfterMove, 0);
        let handle = spawn_simulation(simulation, &sim_config, FrameSource::None, false);
        assert!(handle.send(AgentCommand::PointerDown { x: 11.0, y: 9.0 }));

        let mut snapshots = handle.subscribe();
        let snapshot = loop {
            timeout(WAIT, snapshots.changed()).await.expect("tick").expect("alive");
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.agents[0].radius > 3.0 {
                break snapshot;
            }
        };
        assert_eq!(snapshot.agents[0].radius, 6.0);
        assert_eq!(snapshot.agents[1].radius, 3.0);
        assert_eq!(snapshot.agents[0].color, Pixel::WHITE);
        assert!(snapshot.canvas.is_none());
        handle.shutdown().await;
    }
}
