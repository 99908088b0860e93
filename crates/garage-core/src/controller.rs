// ── Controller ──
//
// Full lifecycle for one garage: change-feed listeners, the reconcile
// task that owns all state mutation, and fire-and-forget remote writes
// (tracked so they can be flushed).
// User calls, remote snapshots and listener cancellations share one
// input queue and are applied in arrival order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use garage_api::RealtimeClient;
use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult, Input};
use crate::config::ControllerConfig;
use crate::editor::OptionEdit;
use crate::engine::{Effect, Reconciler};
use crate::error::CoreError;
use crate::event::GarageEvent;
use crate::listener::{ListenerRegistry, Registration};
use crate::model::{
    AutoCloseWarning, DebugMessage, Feed, GarageAction, GarageStatus, RemotePaths, TokenList,
    remote_timestamp,
};
use crate::remote::{FeedEvent, RemoteSync, TokenSource};
use crate::store::{GarageState, GarageStore};
use crate::stream::StateStream;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Nothing runs until
/// [`start()`](Self::start); call [`shutdown()`](Self::shutdown) to stop
/// the background tasks.
pub struct Controller<R = RealtimeClient> {
    inner: Arc<ControllerInner<R>>,
}

impl<R> Clone for Controller<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<R> {
    config: ControllerConfig,
    paths: RemotePaths,
    remote: Arc<R>,
    store: Arc<GarageStore>,
    event_tx: broadcast::Sender<GarageEvent>,
    input_tx: mpsc::Sender<Input>,
    input_rx: Mutex<Option<mpsc::Receiver<Input>>>,
    listeners: ListenerRegistry,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    writes: TaskTracker,
}

impl Controller<RealtimeClient> {
    /// Build a controller talking to the configured realtime database.
    pub fn from_config(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = config.connect_realtime()?;
        Ok(Self::new(config, client))
    }
}

impl<R: RemoteSync> Controller<R> {
    pub fn new(config: ControllerConfig, remote: R) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_size.max(1));
        let (input_tx, input_rx) = mpsc::channel(config.command_channel_size.max(1));

        Self {
            inner: Arc::new(ControllerInner {
                paths: config.paths(),
                config,
                remote: Arc::new(remote),
                store: Arc::new(GarageStore::new()),
                event_tx,
                input_tx,
                input_rx: Mutex::new(Some(input_rx)),
                listeners: ListenerRegistry::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                writes: TaskTracker::new(),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn paths(&self) -> &RemotePaths {
        &self.inner.paths
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    pub fn store(&self) -> &Arc<GarageStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the reconcile task and subscribe to status, options and
    /// auto-close warnings. Calling it again only re-subscribes feeds
    /// whose listener has gone away.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.ensure_reconciler().await?;
        for feed in Feed::iter() {
            self.subscribe_feed(feed).await?;
        }
        info!(garage = %self.inner.paths, "controller started");
        Ok(())
    }

    /// Stop listeners and the reconcile task, then wait for in-flight
    /// writes to settle.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.listeners.clear();

        {
            let mut handles = self.inner.task_handles.lock().await;
            for handle in handles.drain(..) {
                let _ = handle.await;
            }
        }
        self.flush_writes().await;
        debug!("controller shut down");
    }

    /// Wait until every write submitted so far has completed or failed.
    pub async fn flush_writes(&self) {
        self.inner.writes.close();
        self.inner.writes.wait().await;
        self.inner.writes.reopen();
    }

    async fn ensure_reconciler(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }
        let Some(input_rx) = self.inner.input_rx.lock().await.take() else {
            return Ok(());
        };

        let reconciler = Reconciler::new(
            Arc::clone(&self.inner.store),
            self.inner.event_tx.clone(),
            self.inner.config.issuer_id.clone(),
        );
        let handle = tokio::spawn(reconcile_task(Arc::clone(&self.inner), reconciler, input_rx));
        self.inner.task_handles.lock().await.push(handle);
        Ok(())
    }

    // ── Listeners ────────────────────────────────────────────────

    /// Attach a change-feed listener for `feed`.
    ///
    /// Returns `Ok(false)` without touching the remote if one is
    /// already live.
    pub async fn subscribe_feed(&self, feed: Feed) -> Result<bool, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }
        let Some(registration) = self.inner.listeners.try_register(feed, &self.inner.cancel)
        else {
            debug!(%feed, "listener already active");
            return Ok(false);
        };

        let path = self.inner.paths.feed(feed);
        let feed_rx = match self.inner.remote.subscribe(&path).await {
            Ok(rx) => rx,
            Err(e) => {
                self.inner.listeners.release(feed, registration.generation);
                return Err(e);
            }
        };

        let handle = tokio::spawn(pump_feed(
            feed,
            registration,
            feed_rx,
            self.inner.input_tx.clone(),
        ));
        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);

        debug!(%feed, path, "listener registered");
        Ok(true)
    }

    /// Detach the listener for `feed`. Returns `false` if none was live.
    pub fn unsubscribe_feed(&self, feed: Feed) -> bool {
        self.inner.listeners.unsubscribe(feed)
    }

    pub fn is_subscribed(&self, feed: Feed) -> bool {
        self.inner.listeners.is_active(feed)
    }

    // ── Command execution ────────────────────────────────────────

    /// Queue a command behind any pending snapshots and wait for the
    /// reconcile task to apply it. Never waits on the network.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        self.ensure_reconciler().await?;

        let (tx, rx) = oneshot::channel();
        self.inner
            .input_tx
            .send(Input::Command(CommandEnvelope {
                command,
                response_tx: tx,
            }))
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    pub async fn request_open(&self) -> Result<(), CoreError> {
        self.execute(Command::RequestOpen).await.map(drop)
    }

    /// Ask the door to close. An opening door is shown as paused and a
    /// paused one as closing until the remote says otherwise.
    pub async fn request_close(&self) -> Result<(), CoreError> {
        self.execute(Command::RequestClose).await.map(drop)
    }

    pub async fn cancel_auto_close(&self) -> Result<(), CoreError> {
        self.execute(Command::CancelAutoClose).await.map(drop)
    }

    /// Apply a single-field options edit. `Ok(false)` when the field
    /// already held that value and nothing was written.
    pub async fn edit_options(&self, edit: OptionEdit) -> Result<bool, CoreError> {
        match self.execute(Command::EditOptions(edit)).await? {
            CommandResult::OptionsWritten(written) => Ok(written),
            _ => Ok(false),
        }
    }

    pub async fn set_auto_close_enabled(&self, enabled: bool) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::Enabled(enabled)).await
    }

    pub async fn set_warning_enabled(&self, enabled: bool) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::WarningEnabled(enabled)).await
    }

    pub async fn set_timeout(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::Timeout(timeout)).await
    }

    pub async fn set_warning_timeout(&self, timeout: Duration) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::WarningTimeout(timeout)).await
    }

    pub async fn set_timeout_progress(&self, progress: u32) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::timeout_progress(progress)).await
    }

    pub async fn set_warning_timeout_progress(&self, progress: u32) -> Result<bool, CoreError> {
        self.edit_options(OptionEdit::warning_timeout_progress(progress)).await
    }

    /// Consume the pending auto-close warning. Only one caller ever
    /// receives a given warning.
    pub async fn take_auto_close_warning(&self) -> Result<Option<AutoCloseWarning>, CoreError> {
        match self.execute(Command::TakeAutoCloseWarning).await? {
            CommandResult::Warning(warning) => Ok(warning),
            _ => Ok(None),
        }
    }

    // ── Push tokens ──────────────────────────────────────────────

    /// Fetch this device's push token and record it under `all_tokens`.
    pub async fn register_device_token<T: TokenSource>(
        &self,
        source: &T,
    ) -> Result<String, CoreError> {
        let token = source.fetch_token().await?;
        let path = self.inner.paths.token(TokenList::AllTokens, &token);
        self.inner
            .remote
            .write(&path, Value::String(self.inner.config.issuer_id.clone()))
            .await?;
        debug!("device token registered");
        Ok(token)
    }

    /// Ask for a push on every status change.
    pub async fn subscribe_status_updates(&self, token: &str) -> Result<(), CoreError> {
        let path = self.inner.paths.token(TokenList::StatusUpdate, token);
        self.inner
            .remote
            .write(&path, Value::String(self.inner.config.issuer_id.clone()))
            .await
    }

    pub async fn unsubscribe_status_updates(&self, token: &str) -> Result<(), CoreError> {
        let path = self.inner.paths.token(TokenList::StatusUpdate, token);
        self.inner.remote.remove(&path).await
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to the event broadcast stream.
    pub fn events(&self) -> broadcast::Receiver<GarageEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn state(&self) -> StateStream {
        self.inner.store.subscribe()
    }

    pub fn snapshot(&self) -> Arc<GarageState> {
        self.inner.store.snapshot()
    }

    pub fn status(&self) -> GarageStatus {
        self.inner.store.status()
    }

    /// Resolve once `feed` has delivered its first snapshot, even an
    /// empty one. Edits made before the options feed reports start from
    /// defaults.
    pub async fn wait_for_feed(&self, feed: Feed) -> Result<(), CoreError> {
        let mut reports = self.inner.store.subscribe_feed_reports();
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::ControllerStopped),
            result = reports.wait_for(|feeds| feeds.contains(&feed)) => {
                result.map(drop).map_err(|_| CoreError::ControllerStopped)
            }
        }
    }

    /// Resolve once the remote has reported a status at least once.
    pub async fn wait_for_status(&self) -> Result<GarageStatus, CoreError> {
        let mut reports = self.inner.store.subscribe_status_reports();
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::ControllerStopped),
            result = reports.wait_for(Option::is_some) => {
                result.map(drop).map_err(|_| CoreError::ControllerStopped)?;
                Ok(self.inner.store.status())
            }
        }
    }
}

// ── Effects ──────────────────────────────────────────────────────

impl<R: RemoteSync> ControllerInner<R> {
    fn perform(&self, effect: Effect) {
        match effect {
            Effect::SendAction(action_type) => {
                let action = GarageAction {
                    action_type,
                    issuer_id: self.config.issuer_id.clone(),
                    timestamp: remote_timestamp(&Local::now()),
                };
                info!(action = %action_type, "sending action");
                self.spawn_write(self.paths.action(), &action);
            }
            Effect::PushOptions(options) => {
                self.spawn_write(self.paths.auto_close_options(), &options);
            }
            Effect::DebugLog(message) => self.spawn_debug_log(message),
        }
    }

    /// Submit a write and move on. Failures surface as diagnostics.
    fn spawn_write<T: Serialize>(&self, path: String, body: &T) {
        let value = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(path, error = %e, "could not encode remote write");
                return;
            }
        };

        let remote = Arc::clone(&self.remote);
        let events = self.event_tx.clone();
        self.writes.spawn(async move {
            if let Err(e) = remote.write(&path, value).await {
                warn!(path, error = %e, "remote write failed");
                let _ = events.send(GarageEvent::Diagnostic(e));
            }
        });
    }

    /// Best effort: failures are logged and dropped.
    fn spawn_debug_log(&self, message: String) {
        let path = self
            .paths
            .debug(&self.config.issuer_id, &remote_timestamp(&Local::now()));
        let Ok(value) = serde_json::to_value(DebugMessage { message }) else {
            return;
        };

        let remote = Arc::clone(&self.remote);
        self.writes.spawn(async move {
            if let Err(e) = remote.write(&path, value).await {
                debug!(error = %e, "debug log write failed");
            }
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Apply inputs one at a time. The only task that mutates the store.
async fn reconcile_task<R: RemoteSync>(
    inner: Arc<ControllerInner<R>>,
    mut reconciler: Reconciler,
    mut input_rx: mpsc::Receiver<Input>,
) {
    let cancel = inner.cancel.clone();

    loop {
        let input = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            input = input_rx.recv() => {
                let Some(input) = input else { break };
                input
            }
        };

        let effects = match input {
            Input::Command(CommandEnvelope {
                command,
                response_tx,
            }) => {
                let (result, effects) = reconciler.handle(command);
                let _ = response_tx.send(Ok(result));
                effects
            }
            Input::Snapshot { feed, value } => reconciler.on_snapshot(feed, &value),
            Input::ListenerCancelled {
                feed,
                generation,
                reason,
            } => {
                inner.listeners.release(feed, generation);
                reconciler.on_listener_cancelled(feed, &reason)
            }
        };

        for effect in effects {
            inner.perform(effect);
        }
    }

    debug!("reconcile task stopped");
}

/// Forward one change feed into the input queue until it ends.
async fn pump_feed(
    feed: Feed,
    registration: Registration,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    input_tx: mpsc::Sender<Input>,
) {
    let Registration { generation, cancel } = registration;

    let reason = loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%feed, "listener detached");
                return;
            }
            event = feed_rx.recv() => event,
        };

        match event {
            Some(FeedEvent::Snapshot(value)) => {
                if input_tx.send(Input::Snapshot { feed, value }).await.is_err() {
                    return;
                }
            }
            Some(FeedEvent::Cancelled { reason }) => break reason,
            None => break "feed closed".to_owned(),
        }
    };

    let _ = input_tx
        .send(Input::ListenerCancelled {
            feed,
            generation,
            reason,
        })
        .await;
}
