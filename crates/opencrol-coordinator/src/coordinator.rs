//! Polling coordinator for one OpenCtrol agent
//!
//! Owns the poll cycle and the published [`Snapshot`]. Every successful
//! cycle replaces the snapshot wholesale; a failed cycle leaves it in place
//! and only marks the agent unavailable.

use chrono::{DateTime, Utc};
use opencrol_client::{ClientResult, HttpClient};
use opencrol_core::{AudioApp, AudioDevice, Command, ConnectionStatus, Snapshot};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::error::UpdateFailed;
use crate::state::PollState;

/// Default time between poll cycles
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// Receiver side of the snapshot channel; `None` until the first success
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

/// Outcome bookkeeping across poll cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateHealth {
    pub state: PollState,

    /// Last cycle succeeded and the agent reported itself online
    pub available: bool,

    pub last_update_success: bool,

    /// Failed cycles since the last success
    pub consecutive_failures: u32,

    pub last_success_at: Option<DateTime<Utc>>,

    pub last_failure_at: Option<DateTime<Utc>>,

    pub last_error: Option<String>,
}

/// Aggregates the agent's endpoints into snapshots and forwards commands
pub struct Coordinator {
    client: HttpClient,
    client_id: Option<String>,
    update_interval: Duration,

    /// Serializes refreshes so at most one cycle is in flight
    refresh_lock: AsyncMutex<()>,

    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    health: Mutex<UpdateHealth>,

    shutdown: watch::Sender<bool>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            client_id: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            refresh_lock: AsyncMutex::new(()),
            snapshot: watch::Sender::new(None),
            health: Mutex::new(UpdateHealth::default()),
            shutdown: watch::Sender::new(false),
            poller: Mutex::new(None),
        }
    }

    /// Client id used when the agent does not report one
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// The last published snapshot
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Watch for newly published snapshots
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshot.subscribe()
    }

    pub fn health(&self) -> UpdateHealth {
        self.lock_health().clone()
    }

    pub fn is_available(&self) -> bool {
        self.lock_health().available
    }

    pub fn last_update_success(&self) -> bool {
        self.lock_health().last_update_success
    }

    /// Run one poll cycle and publish its snapshot
    ///
    /// Status and monitors are required. The audio endpoints are fetched
    /// together and degrade to empty lists when either fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let _lock = self.refresh_lock.lock().await;
        self.transition(PollState::Polling);
        let _cycle = CycleGuard { health: &self.health };

        match self.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot.send_replace(Some(Arc::clone(&snapshot)));

                let mut health = self.lock_health();
                apply_transition(&mut health, PollState::Updated);
                if !health.available && snapshot.is_online() {
                    info!("OpenCtrol agent {} is available", self.client.base_url());
                }
                health.available = snapshot.is_online();
                health.last_update_success = true;
                health.consecutive_failures = 0;
                health.last_success_at = Some(snapshot.fetched_at);
                health.last_error = None;
                drop(health);

                debug!(
                    status = %snapshot.status,
                    monitors = snapshot.total_monitors(),
                    audio_apps = snapshot.audio_apps.len(),
                    "Published snapshot"
                );
                Ok(snapshot)
            }
            Err(err) => {
                error!("Error updating OpenCtrol data: {}", err);

                let mut health = self.lock_health();
                apply_transition(&mut health, PollState::Failed);
                health.available = false;
                health.last_update_success = false;
                health.consecutive_failures = health.consecutive_failures.saturating_add(1);
                health.last_failure_at = Some(Utc::now());
                health.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, UpdateFailed> {
        let status = self.client.get_status().await?;
        let (monitors, current_monitor) = self
            .client
            .get_monitors()
            .await?
            .into_parts(status.current_monitor);

        let (audio_apps, audio_devices) = match self.fetch_audio().await {
            Ok(audio) => audio,
            Err(err) => {
                warn!("Error getting audio data, continuing without it: {}", err);
                (Vec::new(), Vec::new())
            }
        };

        let audio_apps = audio_apps
            .into_iter()
            .filter(|app| {
                if !app.has_valid_process_id() {
                    debug!("Skipping audio app {} with invalid process ID", app.name);
                }
                app.has_valid_process_id()
            })
            .collect();

        let master_volume = if status.master_volume.is_finite() {
            status.master_volume.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(Snapshot {
            status: ConnectionStatus::from_online(status.online),
            monitors,
            current_monitor,
            audio_apps,
            audio_devices,
            capabilities: status.capabilities,
            master_volume,
            screen_capture_active: status.screen_capture_active,
            client_id: status.client_id.or_else(|| self.client_id.clone()),
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_audio(&self) -> ClientResult<(Vec<AudioApp>, Vec<AudioDevice>)> {
        let apps = self.client.get_audio_apps().await?;
        let devices = self.client.get_audio_devices().await?;
        Ok((apps, devices))
    }

    /// Dispatch a command to the agent
    ///
    /// Returns `false` without sending anything while the agent is
    /// unavailable.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn send_command(&self, command: Command) -> bool {
        if !self.is_available() {
            warn!(
                "OpenCtrol agent unavailable, not sending {}",
                command.name()
            );
            return false;
        }

        debug!("Sending command: {}", command.name());
        let client = &self.client;
        match command {
            Command::MoveMouse { x, y, relative } => client.move_mouse(x, y, relative).await,
            Command::Click { button, x, y } => client.click(button, x, y).await,
            Command::Scroll { delta } => client.scroll(delta).await,
            Command::TypeText { text } => client.type_text(&text).await,
            Command::SendKey { key, keys } => {
                client.send_key(key.as_deref(), keys.as_deref()).await
            }
            Command::SecureAttention => client.send_secure_attention().await,
            Command::SetVolume { volume } => client.set_volume(volume).await,
            Command::SetAppVolume { process_id, volume } => {
                client.set_app_volume(process_id, volume).await
            }
            Command::SetAppDevice {
                process_id,
                device_id,
            } => client.set_app_device(process_id, &device_id).await,
            Command::SetDefaultDevice { device_id } => {
                client.set_default_device(&device_id).await
            }
            Command::SelectMonitor { monitor_index } => client.select_monitor(monitor_index).await,
            Command::StartScreenCapture => client.start_screen_capture().await,
            Command::StopScreenCapture => client.stop_screen_capture().await,
            Command::SendToSecureDesktop { text } => client.send_to_secure_desktop(&text).await,
            Command::TakeScreenshot => client.take_screenshot().await.is_some_and(|result| {
                result
                    .get("success")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false)
            }),
            Command::Restart => client.restart_client().await,
            Command::Lock => client.lock_workstation().await,
        }
    }

    /// Parse a command by name and dispatch it
    ///
    /// Unknown names and malformed arguments are logged and return `false`.
    pub async fn send_named(&self, name: &str, args: serde_json::Value) -> bool {
        match Command::from_name(name, args) {
            Ok(command) => self.send_command(command).await,
            Err(err) => {
                warn!("Rejected command: {}", err);
                false
            }
        }
    }

    /// Start refreshing on `update_interval` in a background task
    ///
    /// Returns `false` if polling is already running or the coordinator was
    /// shut down.
    pub fn spawn_polling(self: &Arc<Self>) -> bool {
        let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if poller.is_some() || *self.shutdown.borrow() {
            return false;
        }

        let coordinator = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        let period = self.update_interval;

        *poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = coordinator.refresh().await {
                            debug!("Scheduled refresh failed: {}", err);
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Polling stopped for {}", coordinator.client.base_url());
        }));

        info!(
            "Polling {} every {:?}",
            self.client.base_url(),
            self.update_interval
        );
        true
    }

    /// Whether the background polling task is running
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop polling, close pooled connections and discard the snapshot
    ///
    /// A refresh already in flight runs to completion first, so its later
    /// sub-fetches cannot reopen the pool after it was closed.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let handle = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!("Polling task ended abnormally: {}", err);
            }
        }

        // Wait out any refresh still running outside the polling task
        let _lock = self.refresh_lock.lock().await;
        self.client.close().await;
        self.snapshot.send_replace(None);

        let mut health = self.lock_health();
        if health.state != PollState::Idle {
            apply_transition(&mut health, PollState::Idle);
        }
        health.available = false;
        drop(health);

        info!("Shut down coordinator for {}", self.client.base_url());
    }

    fn transition(&self, to: PollState) {
        apply_transition(&mut self.lock_health(), to);
    }

    fn lock_health(&self) -> std::sync::MutexGuard<'_, UpdateHealth> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a cycle whose future was dropped before finishing as failed
struct CycleGuard<'a> {
    health: &'a Mutex<UpdateHealth>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if health.state.is_polling() {
            warn!("Refresh cancelled before completing");
            apply_transition(&mut health, PollState::Failed);
            health.available = false;
            health.last_update_success = false;
            health.consecutive_failures = health.consecutive_failures.saturating_add(1);
            health.last_failure_at = Some(Utc::now());
            health.last_error = Some("refresh cancelled".to_string());
        }
    }
}

fn apply_transition(health: &mut UpdateHealth, to: PollState) {
    match health.state.try_transition(to) {
        Ok(state) => health.state = state,
        Err(err) => warn!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencrol_client::mock::MockTransport;
    use opencrol_client::{Method, RetryPolicy, TransportError};
    use opencrol_core::endpoints;
    use serde_json::json;

    fn coordinator(mock: &Arc<MockTransport>) -> Coordinator {
        let client = HttpClient::with_transport("http://host:8080", mock.clone(), RetryPolicy::none());
        Coordinator::new(client)
    }

    fn script_online(mock: &MockTransport) {
        mock.json(
            Method::Get,
            endpoints::STATUS,
            200,
            json!({"online": true, "master_volume": 0.4}),
        )
        .json(Method::Get, endpoints::MONITORS, 200, json!([{"index": 0}]))
        .json(Method::Get, endpoints::AUDIO_APPS, 200, json!([]))
        .json(Method::Get, endpoints::AUDIO_DEVICES, 200, json!([]));
    }

    #[tokio::test]
    async fn test_commands_refused_until_available() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        mock.json(Method::Post, endpoints::AUDIO_VOLUME, 200, json!({"success": true}));
        let coordinator = coordinator(&mock);

        assert!(!coordinator.send_command(Command::SetVolume { volume: 0.5 }).await);
        assert_eq!(mock.count(Method::Post, endpoints::AUDIO_VOLUME), 0);

        coordinator.refresh().await.unwrap();
        assert!(coordinator.send_command(Command::SetVolume { volume: 0.5 }).await);
        assert_eq!(mock.count(Method::Post, endpoints::AUDIO_VOLUME), 1);
    }

    #[tokio::test]
    async fn test_offline_status_is_not_available() {
        let mock = Arc::new(MockTransport::new());
        mock.json(Method::Get, endpoints::STATUS, 200, json!({"online": false}))
            .json(Method::Get, endpoints::MONITORS, 200, json!([]))
            .json(Method::Get, endpoints::AUDIO_APPS, 200, json!([]))
            .json(Method::Get, endpoints::AUDIO_DEVICES, 200, json!([]));
        let coordinator = coordinator(&mock);

        let snapshot = coordinator.refresh().await.unwrap();
        assert_eq!(snapshot.status, ConnectionStatus::Offline);
        assert!(coordinator.last_update_success());
        assert!(!coordinator.is_available());
    }

    #[tokio::test]
    async fn test_health_tracks_failures() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(
            Method::Get,
            endpoints::STATUS,
            TransportError::Connect("refused".to_string()),
        );
        let coordinator = coordinator(&mock);

        assert!(coordinator.refresh().await.is_err());
        assert!(coordinator.refresh().await.is_err());

        let health = coordinator.health();
        assert_eq!(health.state, PollState::Failed);
        assert_eq!(health.consecutive_failures, 2);
        assert!(!health.last_update_success);
        assert!(health.last_failure_at.is_some());
        assert!(health.last_error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_master_volume_clamped_and_client_id_fallback() {
        let mock = Arc::new(MockTransport::new());
        mock.json(
            Method::Get,
            endpoints::STATUS,
            200,
            json!({"online": true, "master_volume": 1.7}),
        )
        .json(Method::Get, endpoints::MONITORS, 200, json!([]))
        .json(
            Method::Get,
            endpoints::AUDIO_APPS,
            200,
            json!([
                {"process_id": 0, "name": "System", "volume": 1.0},
                {"process_id": 42, "name": "Spotify", "volume": 0.3}
            ]),
        )
        .json(Method::Get, endpoints::AUDIO_DEVICES, 200, json!([]));
        let coordinator = coordinator(&mock).with_client_id(Some("office-pc".to_string()));

        let snapshot = coordinator.refresh().await.unwrap();
        assert_eq!(snapshot.master_volume, 1.0);
        assert_eq!(snapshot.client_id.as_deref(), Some("office-pc"));
        assert_eq!(snapshot.audio_apps.len(), 1);
        assert_eq!(snapshot.audio_apps[0].process_id, 42);
    }

    #[tokio::test]
    async fn test_bad_audio_app_does_not_empty_audio_lists() {
        let mock = Arc::new(MockTransport::new());
        mock.json(Method::Get, endpoints::STATUS, 200, json!({"online": true}))
            .json(Method::Get, endpoints::MONITORS, 200, json!([]))
            .json(
                Method::Get,
                endpoints::AUDIO_APPS,
                200,
                json!([
                    {"process_id": 42, "id": 42, "name": "Chrome", "volume": 0.5},
                    {"name": "System Sounds", "volume": 1.0},
                    {"id": 43, "name": "Music", "volume": 0.2}
                ]),
            )
            .json(
                Method::Get,
                endpoints::AUDIO_DEVICES,
                200,
                json!([{"id": "speakers", "name": "Speakers", "is_default": true}]),
            );
        let coordinator = coordinator(&mock);

        let snapshot = coordinator.refresh().await.unwrap();
        let pids: Vec<i64> = snapshot.audio_apps.iter().map(|a| a.process_id).collect();
        assert_eq!(pids, vec![42, 43]);
        assert_eq!(snapshot.audio_devices.len(), 1);
        assert_eq!(snapshot.default_device().map(|d| d.id.as_str()), Some("speakers"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_refresh_leaves_no_session() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        mock.delay(Method::Get, endpoints::STATUS, Duration::from_millis(300));
        let coordinator = Arc::new(coordinator(&mock));

        let refreshing = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(mock.has_session());

        coordinator.shutdown().await;

        assert!(refreshing.await.unwrap());
        assert!(mock.is_closed());
        assert!(!mock.has_session());
        assert!(coordinator.data().is_none());
        assert_eq!(coordinator.health().state, PollState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_refresh_is_marked_failed() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        mock.delay(Method::Get, endpoints::STATUS, Duration::from_millis(300));
        let coordinator = coordinator(&mock);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), coordinator.refresh()).await;
        assert!(cancelled.is_err());

        let health = coordinator.health();
        assert_eq!(health.state, PollState::Failed);
        assert!(!health.last_update_success);
        assert_eq!(health.consecutive_failures, 1);

        coordinator.refresh().await.unwrap();
        assert_eq!(coordinator.health().state, PollState::Updated);
        assert_eq!(coordinator.health().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_screenshot_requires_success_flag() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        mock.json(Method::Post, endpoints::SCREENSHOT, 200, json!({"success": false}))
            .json(
                Method::Post,
                endpoints::SCREENSHOT,
                200,
                json!({"success": true, "image": "aGk="}),
            );
        let coordinator = coordinator(&mock);
        coordinator.refresh().await.unwrap();

        assert!(!coordinator.send_command(Command::TakeScreenshot).await);
        assert!(coordinator.send_command(Command::TakeScreenshot).await);
    }

    #[tokio::test]
    async fn test_send_named_rejects_malformed_arguments() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        let coordinator = coordinator(&mock);
        coordinator.refresh().await.unwrap();

        assert!(!coordinator.send_named("type_text", json!("not an object")).await);
        assert!(!coordinator.send_named("self_destruct", json!({})).await);
        assert_eq!(mock.requests().iter().filter(|r| r.request.method == Method::Post).count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_discards_snapshot_and_closes() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        let coordinator = coordinator(&mock);
        coordinator.refresh().await.unwrap();
        assert!(coordinator.data().is_some());

        coordinator.shutdown().await;

        assert!(coordinator.data().is_none());
        assert!(mock.is_closed());
        assert!(!coordinator.is_available());
        assert_eq!(coordinator.health().state, PollState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_task_refreshes_until_shutdown() {
        let mock = Arc::new(MockTransport::new());
        script_online(&mock);
        let coordinator = Arc::new(coordinator(&mock).with_update_interval(Duration::from_secs(10)));

        assert!(coordinator.spawn_polling());
        assert!(!coordinator.spawn_polling());

        let mut updates = coordinator.subscribe();
        updates.changed().await.unwrap();
        assert_eq!(mock.count(Method::Get, endpoints::STATUS), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(mock.count(Method::Get, endpoints::STATUS), 3);

        coordinator.shutdown().await;
        assert!(!coordinator.is_polling());
        assert!(!coordinator.spawn_polling());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(mock.count(Method::Get, endpoints::STATUS), 3);
    }
}
