//! Task stores and change notification.
//!
//! [`TaskStore`] is the seam the CLI and raffle consume: list, create,
//! update, delete, plus `on_change` subscriptions that receive the full task
//! list after every change. [`FileTaskStore`] persists to the event log under
//! `.taskraffle/`; [`MemoryTaskStore`] keeps everything in process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::TasksConfig;
use crate::error::{Error, Result};
use crate::lock::{lock_path_for, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;
use crate::task::{
    dedup_events, generate_task_id, resolve_task_id, sort_newest_first, Task,
    TaskDraft, TaskEvent, TaskPatch, TaskSnapshot,
};

const WATCH_DEBOUNCE_MS: u64 = 150;
const WATCH_POLL_MS: u64 = 100;

pub type ChangeCallback = Box<dyn Fn(&[Task]) + Send + Sync>;

/// The task list and its mutations
pub trait TaskStore {
    /// All tasks, newest first
    fn list(&self) -> Result<Vec<Task>>;

    fn create(&self, draft: TaskDraft) -> Result<Task>;

    fn update(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    fn delete(&self, id: &str) -> Result<()>;

    /// Register `callback` for every future change. Dropping the returned
    /// [`Subscription`] (or calling `unsubscribe`) detaches it.
    fn on_change(&self, callback: ChangeCallback) -> Subscription;

    fn get(&self, id: &str) -> Result<Task> {
        self.list()?
            .into_iter()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Map user input (full id or unique suffix prefix) to a task id
    fn resolve_id(&self, input: &str) -> Result<String> {
        resolve_task_id(&self.list()?, input)
    }

    fn toggle_complete(&self, id: &str) -> Result<Task> {
        let task = self.get(id)?;
        self.update(id, TaskPatch::completed(!task.completed))
    }
}

// =========================================================================
// Change notification
// =========================================================================

type SharedCallback = Arc<dyn Fn(&[Task]) + Send + Sync>;

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, SharedCallback>>,
}

impl NotifierInner {
    fn callbacks(&self) -> MutexGuard<'_, HashMap<u64, SharedCallback>> {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fan-out of task list changes to subscribers
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: ChangeCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.callbacks().insert(id, Arc::from(callback));
        Subscription {
            id,
            notifier: Arc::downgrade(&self.inner),
        }
    }

    /// Call every subscriber with `tasks`.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// unsubscribe themselves.
    pub fn notify(&self, tasks: &[Task]) {
        let callbacks: Vec<SharedCallback> = self.inner.callbacks().values().cloned().collect();
        tracing::debug!(subscribers = callbacks.len(), tasks = tasks.len(), "notifying");
        for callback in callbacks {
            callback(tasks);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.callbacks().len()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle for one `on_change` registration
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    notifier: Weak<NotifierInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            inner.callbacks().remove(&self.id);
        }
    }
}

// =========================================================================
// File-backed store
// =========================================================================

/// Event-log store rooted at a [`Storage`]
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    storage: Storage,
    config: TasksConfig,
    notifier: ChangeNotifier,
}

impl FileTaskStore {
    pub fn new(storage: Storage, config: TasksConfig) -> Self {
        Self {
            storage,
            config,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Open an initialized store; fails with `StoreNotInitialized` otherwise
    pub fn open(storage: Storage, config: TasksConfig) -> Result<Self> {
        storage.ensure_initialized()?;
        Ok(Self::new(storage, config))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Events in the order they were appended
    pub fn load_events(&self) -> Result<Vec<TaskEvent>> {
        let mut events: Vec<TaskEvent> = self.storage.read_jsonl(&self.storage.tasks_log())?;
        dedup_events(&mut events);
        Ok(events)
    }

    /// Rebuild and rewrite the snapshot from the event log
    pub fn rebuild_snapshot(&self) -> Result<TaskSnapshot> {
        let _lock = FileLock::acquire(self.log_lock_path(), DEFAULT_LOCK_TIMEOUT_MS)?;
        let snapshot = self.replay_log()?;
        self.storage
            .write_json(&self.storage.tasks_snapshot(), &snapshot)?;
        Ok(snapshot)
    }

    /// Watch the store directory and republish changes made by other
    /// processes to this store's subscribers.
    pub fn watch(&self) -> Result<StoreWatcher> {
        StoreWatcher::spawn(self.clone())
    }

    fn log_lock_path(&self) -> PathBuf {
        lock_path_for(&self.storage.tasks_log())
    }

    fn log_len(&self) -> Result<u64> {
        match std::fs::metadata(self.storage.tasks_log()) {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn replay_log(&self) -> Result<TaskSnapshot> {
        let log_len = self.log_len()?;
        let mut snapshot = TaskSnapshot::from_events(&self.load_events()?)?;
        snapshot.log_len = Some(log_len);
        Ok(snapshot)
    }

    /// The cached snapshot when it matches the log, otherwise a replay
    fn load_snapshot(&self) -> Result<TaskSnapshot> {
        let path = self.storage.tasks_snapshot();
        if path.exists() {
            match self.storage.read_json::<TaskSnapshot>(&path) {
                Ok(snapshot) if snapshot.log_len == Some(self.log_len()?) => return Ok(snapshot),
                Ok(snapshot) => {
                    tracing::warn!(
                        path = %path.display(),
                        snapshot_log_len = ?snapshot.log_len,
                        "snapshot behind event log, replaying"
                    );
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "rebuilding unreadable snapshot");
                }
            }
        }
        self.replay_log()
    }

    /// Under the log lock: build an event from the current list, append it,
    /// refresh the snapshot. Subscribers are notified after the lock drops.
    fn commit<F>(&self, build: F) -> Result<(TaskEvent, Vec<Task>)>
    where
        F: FnOnce(&[Task]) -> Result<TaskEvent>,
    {
        self.storage.ensure_initialized()?;
        let (event, tasks) = {
            let _lock = FileLock::acquire(self.log_lock_path(), DEFAULT_LOCK_TIMEOUT_MS)?;
            let mut snapshot = self.load_snapshot()?;
            let event = build(snapshot.tasks.as_slice())?;
            snapshot.apply(&event)?;
            self.storage
                .append_jsonl(&self.storage.tasks_log(), &event)?;
            snapshot.log_len = Some(self.log_len()?);
            self.storage
                .write_json(&self.storage.tasks_snapshot(), &snapshot)?;
            (event, snapshot.tasks)
        };
        tracing::debug!(task_id = %event.task_id, kind = ?event.event_type, "task event committed");
        self.notifier.notify(&tasks);
        Ok((event, tasks))
    }
}

fn find_task(tasks: &[Task], id: &str) -> Result<Task> {
    tasks
        .iter()
        .find(|task| task.id == id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

impl TaskStore for FileTaskStore {
    fn list(&self) -> Result<Vec<Task>> {
        self.storage.ensure_initialized()?;
        Ok(self.load_snapshot()?.tasks)
    }

    fn create(&self, draft: TaskDraft) -> Result<Task> {
        let draft = draft.validate()?;
        let (event, tasks) = self.commit(|tasks| {
            let id = generate_task_id(&self.config.id_prefix, self.config.id_min_len, tasks);
            Ok(TaskEvent::created(id, &draft))
        })?;
        find_task(&tasks, &event.task_id)
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validate()?;
        let (event, tasks) = self.commit(|tasks| {
            find_task(tasks, id)?;
            Ok(TaskEvent::updated(id, &patch))
        })?;
        find_task(&tasks, &event.task_id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.commit(|tasks| {
            find_task(tasks, id)?;
            Ok(TaskEvent::deleted(id))
        })?;
        Ok(())
    }

    fn on_change(&self, callback: ChangeCallback) -> Subscription {
        self.notifier.subscribe(callback)
    }
}

/// Background watcher started by [`FileTaskStore::watch`]; stops on drop.
pub struct StoreWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StoreWatcher {
    fn spawn(store: FileTaskStore) -> Result<Self> {
        store.storage.ensure_initialized()?;
        let store_dir = store.storage.store_dir();

        let (event_tx, event_rx) = mpsc::channel();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })?;
        watcher.watch(&store_dir, RecursiveMode::NonRecursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            // The watcher must live as long as the loop.
            let _watcher = watcher;
            let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
            let poll = Duration::from_millis(WATCH_POLL_MS);
            let mut pending: Option<Instant> = None;
            let mut last_published = store.list().ok();

            while !thread_stop.load(Ordering::Relaxed) {
                let timeout = pending
                    .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                    .unwrap_or(poll)
                    .min(poll);
                match event_rx.recv_timeout(timeout) {
                    Ok(Ok(event)) => {
                        if event.paths.iter().any(|path| is_data_file(path)) {
                            pending = Some(Instant::now() + debounce);
                        }
                    }
                    Ok(Err(err)) => tracing::warn!(%err, "store watch error"),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                if pending.is_some_and(|deadline| Instant::now() >= deadline) {
                    pending = None;
                    match store.list() {
                        Ok(tasks) if last_published.as_ref() != Some(&tasks) => {
                            store.notifier.notify(&tasks);
                            last_published = Some(tasks);
                        }
                        Ok(_) => {}
                        Err(err) => tracing::warn!(%err, "reload after change failed"),
                    }
                }
            }
        });

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StoreWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn is_data_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|name| name.to_str()),
        Some("tasks.jsonl" | "tasks.snapshot.json")
    )
}

// =========================================================================
// In-memory store
// =========================================================================

/// Process-local store, handy for embedding and tests
#[derive(Debug, Clone)]
pub struct MemoryTaskStore {
    tasks: Arc<Mutex<Vec<Task>>>,
    config: TasksConfig,
    notifier: ChangeNotifier,
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new(TasksConfig::default())
    }
}

impl MemoryTaskStore {
    pub fn new(config: TasksConfig) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            config,
            notifier: ChangeNotifier::new(),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<T>,
    {
        let (value, snapshot) = {
            let mut tasks = self.tasks();
            let value = f(&mut tasks)?;
            sort_newest_first(&mut tasks);
            (value, tasks.clone())
        };
        self.notifier.notify(&snapshot);
        Ok(value)
    }
}

impl TaskStore for MemoryTaskStore {
    fn list(&self) -> Result<Vec<Task>> {
        Ok(self.tasks().clone())
    }

    fn create(&self, draft: TaskDraft) -> Result<Task> {
        let draft = draft.validate()?;
        self.mutate(|tasks| {
            let now = Utc::now();
            let task = Task {
                id: generate_task_id(&self.config.id_prefix, self.config.id_min_len, tasks),
                title: draft.title,
                description: draft.description,
                priority: draft.priority,
                task_type: draft.task_type,
                completed: draft.completed,
                created_at: now,
                updated_at: now,
            };
            tasks.push(task.clone());
            Ok(task)
        })
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validate()?;
        self.mutate(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            patch.apply_to(task, Utc::now());
            Ok(task.clone())
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.mutate(|tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                return Err(Error::TaskNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    fn on_change(&self, callback: ChangeCallback) -> Subscription {
        self.notifier.subscribe(callback)
    }
}
