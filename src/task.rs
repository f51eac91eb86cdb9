//! Task model and event log replay.
//!
//! Tasks are stored as append-only events in `.taskraffle/tasks.jsonl`; the
//! current list is the replay of those events, cached in
//! `.taskraffle/tasks.snapshot.json`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

pub const TASKS_SCHEMA_VERSION: &str = "taskraffle.tasks.v1";
const ULID_TIME_LEN: usize = 10;
const ULID_RANDOM_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Sort rank, higher is more urgent
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::InvalidArgument(format!(
                "unknown task priority '{}' (expected low, medium or high)",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub task_type: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a task
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub task_type: String,
    pub completed: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: Priority::Medium,
            task_type: "General".to_string(),
            completed: false,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Trim text fields and reject blank ones
    pub fn validate(mut self) -> Result<Self> {
        self.title = required("title", &self.title)?;
        self.description = required("description", &self.description)?;
        self.task_type = required("type", &self.task_type)?;
        Ok(self)
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub task_type: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.task_type.is_none()
            && self.completed.is_none()
    }

    pub fn validate(mut self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }
        if let Some(title) = self.title.as_deref() {
            self.title = Some(required("title", title)?);
        }
        if let Some(description) = self.description.as_deref() {
            self.description = Some(required("description", description)?);
        }
        if let Some(task_type) = self.task_type.as_deref() {
            self.task_type = Some(required("type", task_type)?);
        }
        Ok(self)
    }

    /// Apply to `task`, stamping `updated_at`
    pub fn apply_to(&self, task: &mut Task, at: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(task_type) = &self.task_type {
            task.task_type = task_type.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = at;
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub event_id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub event_type: TaskEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskEvent {
    pub fn new(event_type: TaskEventType, task_id: impl Into<String>) -> Self {
        Self {
            event_id: Ulid::new().to_string(),
            task_id: task_id.into(),
            event_type,
            timestamp: Utc::now(),
            title: None,
            description: None,
            priority: None,
            task_type: None,
            completed: None,
        }
    }

    pub fn created(task_id: impl Into<String>, draft: &TaskDraft) -> Self {
        let mut event = Self::new(TaskEventType::TaskCreated, task_id);
        event.title = Some(draft.title.clone());
        event.description = Some(draft.description.clone());
        event.priority = Some(draft.priority);
        event.task_type = Some(draft.task_type.clone());
        event.completed = Some(draft.completed);
        event
    }

    pub fn updated(task_id: impl Into<String>, patch: &TaskPatch) -> Self {
        let mut event = Self::new(TaskEventType::TaskUpdated, task_id);
        event.title = patch.title.clone();
        event.description = patch.description.clone();
        event.priority = patch.priority;
        event.task_type = patch.task_type.clone();
        event.completed = patch.completed;
        event
    }

    pub fn deleted(task_id: impl Into<String>) -> Self {
        Self::new(TaskEventType::TaskDeleted, task_id)
    }

    fn patch(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            task_type: self.task_type.clone(),
            completed: self.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    /// Byte length of `tasks.jsonl` this snapshot reflects; `None` when
    /// unknown, which forces a replay.
    #[serde(default)]
    pub log_len: Option<u64>,
    pub tasks: Vec<Task>,
}

impl TaskSnapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            log_len: None,
            tasks: Vec::new(),
        }
    }

    /// Replay `events` in log order into a snapshot.
    ///
    /// Timestamps are not consulted: an event recorded after a clock step
    /// back still lands after the events written before it.
    pub fn from_events(events: &[TaskEvent]) -> Result<Self> {
        let mut map: HashMap<String, Task> = HashMap::new();
        for event in events {
            apply_event(&mut map, event)?;
        }
        Ok(Self::from_map(map, None))
    }

    /// Apply one more event on top of this snapshot
    pub fn apply(&mut self, event: &TaskEvent) -> Result<()> {
        let mut map: HashMap<String, Task> = self
            .tasks
            .drain(..)
            .map(|task| (task.id.clone(), task))
            .collect();
        apply_event(&mut map, event)?;
        *self = Self::from_map(map, self.log_len);
        Ok(())
    }

    fn from_map(map: HashMap<String, Task>, log_len: Option<u64>) -> Self {
        let mut tasks: Vec<Task> = map.into_values().collect();
        sort_newest_first(&mut tasks);
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            log_len,
            tasks,
        }
    }
}

/// Store order: newest `created_at` first, id as tiebreak
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn apply_event(map: &mut HashMap<String, Task>, event: &TaskEvent) -> Result<()> {
    match event.event_type {
        TaskEventType::TaskCreated => {
            if map.contains_key(&event.task_id) {
                return Err(Error::InvalidArgument(format!(
                    "task already exists: {}",
                    event.task_id
                )));
            }
            let title = event.title.clone().ok_or_else(|| {
                Error::InvalidArgument(format!("missing title for {}", event.task_id))
            })?;
            map.insert(
                event.task_id.clone(),
                Task {
                    id: event.task_id.clone(),
                    title,
                    description: event.description.clone().unwrap_or_default(),
                    priority: event.priority.unwrap_or(Priority::Medium),
                    task_type: event
                        .task_type
                        .clone()
                        .unwrap_or_else(|| "General".to_string()),
                    completed: event.completed.unwrap_or(false),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                },
            );
        }
        TaskEventType::TaskUpdated => {
            // Updates to tasks that were deleted concurrently are dropped.
            if let Some(task) = map.get_mut(&event.task_id) {
                event.patch().apply_to(task, event.timestamp);
            }
        }
        TaskEventType::TaskDeleted => {
            map.remove(&event.task_id);
        }
    }
    Ok(())
}

/// Drop duplicate events (same `event_id`), keeping first occurrence
pub fn dedup_events(events: &mut Vec<TaskEvent>) {
    let mut seen = HashSet::new();
    events.retain(|event| seen.insert(event.event_id.clone()));
}

/// Build `<prefix>-<suffix>` from the random half of a fresh ULID, using
/// the shortest suffix (at least `min_len`) not already taken.
pub fn generate_task_id(prefix: &str, min_len: usize, existing: &[Task]) -> String {
    let taken: HashSet<String> = existing
        .iter()
        .map(|task| id_suffix(&task.id))
        .collect();
    let prefix = prefix.trim();
    let mut len = min_len.clamp(1, ULID_RANDOM_LEN);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let ulid = Ulid::new().to_string().to_lowercase();
        let suffix = &ulid[ULID_TIME_LEN..ULID_TIME_LEN + len];
        if !taken.contains(suffix) {
            return format!("{prefix}-{suffix}");
        }
        // Crowded at this length; widen after a batch of collisions.
        if attempt % 32 == 0 {
            len = (len + 1).min(ULID_RANDOM_LEN);
        }
    }
}

/// Resolve user input to a task id: exact id, exact suffix, or a unique
/// suffix prefix. Case-insensitive; `/` is accepted for `-`.
pub fn resolve_task_id(tasks: &[Task], input: &str) -> Result<String> {
    let wanted = normalize_id(input);
    let wanted_suffix = id_suffix(&wanted);
    if wanted_suffix.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    let is_exact = |task: &&Task| {
        let id = normalize_id(&task.id);
        id == wanted || id_suffix(&id) == wanted
    };
    let mut hits: Vec<&Task> = tasks.iter().filter(is_exact).collect();
    if hits.is_empty() {
        hits = tasks
            .iter()
            .filter(|task| id_suffix(&task.id).starts_with(&wanted_suffix))
            .collect();
    }

    match hits.as_slice() {
        [] => Err(Error::TaskNotFound(input.trim().to_string())),
        [task] => Ok(task.id.clone()),
        many => Err(Error::InvalidArgument(format!(
            "ambiguous task id '{}': {}",
            input.trim(),
            many.iter().map(|task| task.id.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase().replace('/', "-")
}

/// Text after the last `-` (or `/`), lowercased
fn id_suffix(id: &str) -> String {
    let id = normalize_id(id);
    match id.rsplit_once('-') {
        Some((_, suffix)) => suffix.to_string(),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(id: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            task_type: "General".to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().expect("high"), Priority::High);
        assert_eq!(" low ".parse::<Priority>().expect("low"), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High.rank() > Priority::Medium.rank());
    }

    #[test]
    fn draft_validation_requires_text_fields() {
        let draft = TaskDraft::new("  Write report ", " quarterly ")
            .validate()
            .expect("valid");
        assert_eq!(draft.title, "Write report");
        assert_eq!(draft.description, "quarterly");

        let err = TaskDraft::new("  ", "x").validate().expect_err("blank title");
        assert!(err.to_string().contains("title is required"));
        let err = TaskDraft::new("x", "")
            .validate()
            .expect_err("blank description");
        assert!(err.to_string().contains("description is required"));
        assert!(TaskDraft::new("x", "y").task_type(" ").validate().is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(TaskPatch::default().validate().is_err());
        assert!(TaskPatch::completed(true).validate().is_ok());
    }

    #[test]
    fn replay_applies_create_update_delete() {
        let now = Utc::now();
        let draft = TaskDraft::new("A", "first").priority(Priority::High);
        let mut create_a = TaskEvent::created("task-a", &draft);
        create_a.timestamp = now;

        let mut create_b = TaskEvent::created("task-b", &TaskDraft::new("B", "second"));
        create_b.timestamp = now + Duration::milliseconds(1);

        let mut update = TaskEvent::updated("task-a", &TaskPatch::completed(true));
        update.timestamp = now + Duration::milliseconds(2);

        let mut delete = TaskEvent::deleted("task-b");
        delete.timestamp = now + Duration::milliseconds(3);

        let snapshot =
            TaskSnapshot::from_events(&[create_a, create_b, update, delete]).expect("replay");
        assert_eq!(snapshot.tasks.len(), 1);
        let task = &snapshot.tasks[0];
        assert_eq!(task.id, "task-a");
        assert!(task.completed);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now + Duration::milliseconds(2));
    }

    #[test]
    fn replay_follows_log_order_when_clock_steps_back() {
        let now = Utc::now();
        let mut create = TaskEvent::created("task-a", &TaskDraft::new("A", "a"));
        create.timestamp = now;
        let mut update = TaskEvent::updated("task-a", &TaskPatch::completed(true));
        update.timestamp = now - Duration::seconds(2);

        let mut live = TaskSnapshot::empty();
        live.apply(&create).expect("create");
        live.apply(&update).expect("update");

        let replayed = TaskSnapshot::from_events(&[create, update]).expect("replay");
        assert!(live.tasks[0].completed);
        assert_eq!(replayed.tasks, live.tasks);
    }

    #[test]
    fn duplicate_create_is_an_error() {
        let create = TaskEvent::created("task-a", &TaskDraft::new("A", "a"));
        let mut map = HashMap::new();
        apply_event(&mut map, &create).expect("first");
        assert!(apply_event(&mut map, &create).is_err());
    }

    #[test]
    fn update_after_delete_is_ignored() {
        let mut map = HashMap::new();
        apply_event(&mut map, &TaskEvent::created("task-a", &TaskDraft::new("A", "a")))
            .expect("create");
        apply_event(&mut map, &TaskEvent::deleted("task-a")).expect("delete");
        apply_event(&mut map, &TaskEvent::updated("task-a", &TaskPatch::completed(true)))
            .expect("update");
        assert!(map.is_empty());
    }

    #[test]
    fn snapshot_lists_newest_first() {
        let now = Utc::now();
        let mut older = TaskEvent::created("task-old", &TaskDraft::new("old", "o"));
        older.timestamp = now - Duration::days(1);
        let newer = TaskEvent::created("task-new", &TaskDraft::new("new", "n"));
        let snapshot = TaskSnapshot::from_events(&[older, newer]).expect("replay");
        let ids: Vec<&str> = snapshot.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task-new", "task-old"]);
    }

    #[test]
    fn dedup_keeps_first_event() {
        let event = TaskEvent::created("task-a", &TaskDraft::new("A", "a"));
        let mut events = vec![event.clone(), event];
        dedup_events(&mut events);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn suffix_is_text_after_last_delimiter() {
        assert_eq!(id_suffix("task-ABC"), "abc");
        assert_eq!(id_suffix("my-list/x9z"), "x9z");
        assert_eq!(id_suffix("x9z"), "x9z");
    }

    #[test]
    fn generated_ids_skip_taken_suffixes() {
        let existing: Vec<Task> = (0..20)
            .map(|_| task(&generate_task_id("task", 2, &[])))
            .collect();
        let id = generate_task_id("task", 2, &existing);
        assert!(existing.iter().all(|task| id_suffix(&task.id) != id_suffix(&id)));
    }

    #[test]
    fn generated_ids_carry_prefix_and_min_len() {
        let id = generate_task_id("task", 4, &[]);
        let suffix = id.strip_prefix("task-").expect("prefix");
        assert_eq!(suffix.len(), 4);
    }

    #[test]
    fn resolve_accepts_partial_and_prefixed() {
        let tasks = vec![task("task-ab1"), task("task-b1c"), task("old-a9b")];

        assert_eq!(resolve_task_id(&tasks, "ab").expect("resolve"), "task-ab1");
        assert_eq!(resolve_task_id(&tasks, "AB").expect("resolve"), "task-ab1");
        assert_eq!(resolve_task_id(&tasks, "b").expect("resolve"), "task-b1c");
        assert_eq!(resolve_task_id(&tasks, "a9").expect("resolve"), "old-a9b");
        assert_eq!(resolve_task_id(&tasks, "task/ab1").expect("resolve"), "task-ab1");

        let err = resolve_task_id(&tasks, "a").expect_err("ambiguous");
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = resolve_task_id(&tasks, "zzz").expect_err("missing");
        assert!(matches!(err, Error::TaskNotFound(_)));
        assert!(resolve_task_id(&tasks, "  ").is_err());
    }
}
