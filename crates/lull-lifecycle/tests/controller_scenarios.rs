//! End-to-end controller scenarios against mock panel and host
//! implementations, on a paused clock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lull_lifecycle::{
    InstanceId, LifecycleConfig, LifecycleController, PanelClient, ProbeError, ReadinessCheck,
    ResourceId, ResourcePhase, SessionHandoff, SessionId,
};
use parking_lot::Mutex;

/// Records every start and stop command without talking to anything.
#[derive(Default)]
struct RecordingPanel {
    starts: Mutex<Vec<InstanceId>>,
    stops: Mutex<Vec<InstanceId>>,
}

impl RecordingPanel {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn starts(&self) -> Vec<InstanceId> {
        self.starts.lock().clone()
    }

    fn stops(&self) -> Vec<InstanceId> {
        self.stops.lock().clone()
    }
}

#[async_trait]
impl PanelClient for RecordingPanel {
    async fn start_server(&self, instance: &InstanceId) -> lull_panel::Result<()> {
        self.starts.lock().push(instance.clone());
        Ok(())
    }

    async fn stop_server(&self, instance: &InstanceId) -> lull_panel::Result<()> {
        self.stops.lock().push(instance.clone());
        Ok(())
    }
}

/// Host with a switchable set of ready resources and recorded transfers.
#[derive(Default)]
struct TestHost {
    ready: Mutex<HashSet<ResourceId>>,
    transfers: Mutex<Vec<(SessionId, ResourceId)>>,
}

impl TestHost {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set_ready(&self, resource: &ResourceId) {
        self.ready.lock().insert(resource.clone());
    }

    fn transfers(&self) -> Vec<(SessionId, ResourceId)> {
        self.transfers.lock().clone()
    }
}

#[async_trait]
impl ReadinessCheck for TestHost {
    async fn check(&self, resource: &ResourceId) -> Result<(), ProbeError> {
        if self.ready.lock().contains(resource) {
            Ok(())
        } else {
            Err(ProbeError("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl SessionHandoff for TestHost {
    async fn transfer(&self, session: &SessionId, resource: &ResourceId) {
        self.transfers
            .lock()
            .push((session.clone(), resource.clone()));
    }
}

const TIMEOUT: Duration = Duration::from_secs(30 * 60);

fn config() -> LifecycleConfig {
    let mut servers = HashMap::new();
    servers.insert(ResourceId::from("survival"), InstanceId::from("abc123"));
    servers.insert(ResourceId::from("creative"), InstanceId::from("def456"));

    LifecycleConfig {
        servers,
        inactivity_timeout: TIMEOUT,
        probe_timeout: Duration::from_secs(1),
        probe_interval: Duration::from_secs(5),
        probe_attempts: 3,
    }
}

fn setup() -> (
    LifecycleController<RecordingPanel, TestHost>,
    Arc<RecordingPanel>,
    Arc<TestHost>,
) {
    let panel = RecordingPanel::new();
    let host = TestHost::new();
    let controller = LifecycleController::new(config(), Arc::clone(&panel), Arc::clone(&host));
    (controller, panel, host)
}

fn r(name: &str) -> ResourceId {
    ResourceId::from(name)
}

fn s(id: &str) -> SessionId {
    SessionId::from(id)
}

#[tokio::test(start_paused = true)]
async fn first_join_issues_one_start() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("survival"), s("p1")).await;
    controller.handle_attached(r("survival"), s("p2")).await;

    assert_eq!(panel.starts(), vec![InstanceId::from("abc123")]);
    assert!(panel.stops().is_empty());
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);
}

#[tokio::test(start_paused = true)]
async fn last_leave_stops_after_the_timeout() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("survival"), s("p1")).await;
    controller.handle_attached(r("survival"), s("p2")).await;
    controller.handle_detached(s("p1")).await;

    // One session remains; nothing is armed yet.
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);

    controller.handle_detached(s("p2")).await;
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Cooling);
    assert!(panel.stops().is_empty());

    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    assert_eq!(panel.stops(), vec![InstanceId::from("abc123")]);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn rejoin_during_cooldown_cancels_the_stop() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("survival"), s("p1")).await;
    assert_eq!(panel.starts(), vec![InstanceId::from("abc123")]);

    controller.handle_detached(s("p1")).await;
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Cooling);

    // A new session arrives five minutes into the thirty-minute window.
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    controller.handle_attached(r("survival"), s("p2")).await;
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);

    // Well past the original deadline: no stop was ever issued, and the
    // new occupancy interval fired its own start.
    tokio::time::sleep(Duration::from_secs(40 * 60)).await;
    assert!(panel.stops().is_empty());
    assert_eq!(
        panel.starts(),
        vec![InstanceId::from("abc123"), InstanceId::from("abc123")]
    );
}

#[tokio::test(start_paused = true)]
async fn each_idle_interval_arms_exactly_one_stop() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("survival"), s("p1")).await;
    controller.handle_detached(s("p1")).await;
    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    controller.handle_attached(r("survival"), s("p2")).await;
    controller.handle_detached(s("p2")).await;
    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    assert_eq!(
        panel.stops(),
        vec![InstanceId::from("abc123"), InstanceId::from("abc123")]
    );
}

#[tokio::test(start_paused = true)]
async fn blocked_sessions_queue_and_hand_off_once_ready() {
    let (controller, panel, host) = setup();

    controller.handle_blocked(r("survival"), s("p1")).await;
    controller.handle_blocked(r("survival"), s("p2")).await;

    // Only the first queued session triggered a start.
    assert_eq!(panel.starts(), vec![InstanceId::from("abc123")]);
    assert_eq!(controller.sessions_waiting(&r("survival")), 2);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Starting);

    // The instance comes up before the watch gives up.
    host.set_ready(&r("survival"));
    tokio::time::sleep(Duration::from_secs(6)).await;

    let mut transfers = host.transfers();
    transfers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    assert_eq!(
        transfers,
        vec![(s("p1"), r("survival")), (s("p2"), r("survival"))]
    );
    assert_eq!(controller.sessions_waiting(&r("survival")), 0);
    assert_eq!(controller.sessions_attached(&r("survival")), 2);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);
}

#[tokio::test(start_paused = true)]
async fn queued_sessions_for_other_resources_are_untouched() {
    let (controller, _panel, host) = setup();

    controller.handle_blocked(r("survival"), s("p1")).await;
    controller.handle_blocked(r("creative"), s("p2")).await;

    host.set_ready(&r("survival"));
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(host.transfers(), vec![(s("p1"), r("survival"))]);
    assert_eq!(controller.sessions_waiting(&r("creative")), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_watch_leaves_sessions_queued_until_the_next_arrival() {
    let (controller, panel, host) = setup();

    controller.handle_blocked(r("survival"), s("p1")).await;

    // Three attempts, five seconds apart, all failing.
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(host.transfers().is_empty());
    assert_eq!(controller.sessions_waiting(&r("survival")), 1);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Starting);

    // A later arrival re-arms the watch; no second start is issued since
    // the resource already has a queued session.
    controller.handle_blocked(r("survival"), s("p2")).await;
    assert_eq!(panel.starts(), vec![InstanceId::from("abc123")]);

    host.set_ready(&r("survival"));
    tokio::time::sleep(Duration::from_secs(6)).await;

    let mut transfers = host.transfers();
    transfers.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    assert_eq!(
        transfers,
        vec![(s("p1"), r("survival")), (s("p2"), r("survival"))]
    );
    assert_eq!(controller.sessions_attached(&r("survival")), 2);
}

#[tokio::test(start_paused = true)]
async fn waiting_session_disconnect_cancels_the_watch() {
    let (controller, panel, host) = setup();

    controller.handle_blocked(r("survival"), s("p1")).await;
    controller.handle_detached(s("p1")).await;

    assert_eq!(controller.sessions_waiting(&r("survival")), 0);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Idle);

    // Even once the instance comes up, there is nobody to hand off.
    host.set_ready(&r("survival"));
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(host.transfers().is_empty());
    assert_eq!(panel.starts(), vec![InstanceId::from("abc123")]);
}

#[tokio::test(start_paused = true)]
async fn unmapped_resource_is_tracked_but_never_commanded() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("lobby"), s("p1")).await;
    assert_eq!(controller.sessions_attached(&r("lobby")), 1);

    controller.handle_detached(s("p1")).await;
    assert_eq!(controller.phase_of(&r("lobby")), ResourcePhase::Cooling);

    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    assert!(panel.starts().is_empty());
    assert!(panel.stops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn moving_between_resources_cools_the_one_left_behind() {
    let (controller, panel, _host) = setup();

    controller.handle_attached(r("survival"), s("p1")).await;
    controller.handle_attached(r("creative"), s("p1")).await;

    assert_eq!(controller.sessions_attached(&r("survival")), 0);
    assert_eq!(controller.sessions_attached(&r("creative")), 1);
    assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Cooling);

    tokio::time::sleep(TIMEOUT + Duration::from_secs(1)).await;

    assert_eq!(panel.stops(), vec![InstanceId::from("abc123")]);
}
