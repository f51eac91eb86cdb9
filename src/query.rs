//! Search, filter and sort over a task list, plus summary counts.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Completed,
    Pending,
    High,
    Medium,
    Low,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Completed => "completed",
            Filter::Pending => "pending",
            Filter::High => "high",
            Filter::Medium => "medium",
            Filter::Low => "low",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Pending => !task.completed,
            Filter::High => task.priority == Priority::High,
            Filter::Medium => task.priority == Priority::Medium,
            Filter::Low => task.priority == Priority::Low,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "completed" | "done" => Ok(Filter::Completed),
            "pending" | "open" => Ok(Filter::Pending),
            "high" => Ok(Filter::High),
            "medium" => Ok(Filter::Medium),
            "low" => Ok(Filter::Low),
            _ => Err(Error::InvalidArgument(format!(
                "unknown filter '{}' (expected all, completed, pending, high, medium or low)",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Priority,
    Status,
    Title,
    Type,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Priority => "priority",
            SortBy::Status => "status",
            SortBy::Title => "title",
            SortBy::Type => "type",
        }
    }

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortBy::Date => b.created_at.cmp(&a.created_at),
            SortBy::Priority => b.priority.rank().cmp(&a.priority.rank()),
            SortBy::Status => a.completed.cmp(&b.completed),
            SortBy::Title => compare_folded(&a.title, &b.title),
            SortBy::Type => compare_folded(&a.task_type, &b.task_type),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "created" => Ok(SortBy::Date),
            "priority" => Ok(SortBy::Priority),
            "status" => Ok(SortBy::Status),
            "title" => Ok(SortBy::Title),
            "type" => Ok(SortBy::Type),
            _ => Err(Error::InvalidArgument(format!(
                "unknown sort '{}' (expected date, priority, status, title or type)",
                s.trim()
            ))),
        }
    }
}

fn compare_folded(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// A view over a task list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub filter: Filter,
    pub sort: SortBy,
    pub limit: Option<usize>,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        self.filter.matches(task) && self.matches_search(task)
    }

    fn matches_search(&self, task: &Task) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        [&task.title, &task.description, &task.task_type]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Matching tasks, ignoring `limit`
    pub fn count_matches(&self, tasks: &[Task]) -> usize {
        tasks.iter().filter(|task| self.matches(task)).count()
    }

    /// Filter, then stable-sort, then truncate
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let mut selected: Vec<Task> = tasks
            .iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect();
        selected.sort_by(|a, b| self.sort.compare(a, b));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Summary counts; the per-priority counts cover pending tasks only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            if task.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
                match task.priority {
                    Priority::High => stats.high += 1,
                    Priority::Medium => stats.medium += 1,
                    Priority::Low => stats.low += 1,
                }
            }
            stats
        })
    }
}
