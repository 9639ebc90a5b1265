//! Task model types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (default).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// All priorities, most important first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Sort rank, 0 for the most important.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Get the string representation of the priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::InvalidPriority(s.to_string())),
        }
    }
}

/// A task in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Position in the persisted collection; rewritten on every save.
    #[serde(default)]
    pub id: usize,
    /// What needs doing. Never empty after trimming.
    #[serde(alias = "task")]
    pub description: String,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// Free-form labels.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// When the task was created. Timestamps without an offset are read as UTC.
    #[serde(default = "Utc::now", deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    /// 0-based indices of prerequisite tasks in the same collection.
    #[serde(default)]
    pub depends_on: Vec<usize>,
}

impl Task {
    /// Create a pending, untagged task with the given description and priority.
    ///
    /// The description is stored trimmed; callers validate it first.
    #[must_use]
    pub fn new(description: &str, priority: Priority) -> Self {
        Self {
            id: 0,
            description: description.trim().to_string(),
            priority,
            completed: false,
            tags: BTreeSet::new(),
            created_at: Utc::now(),
            due: None,
            depends_on: Vec::new(),
        }
    }
}

/// One element of a stored collection: a full task record, or a bare string
/// written by early versions of the tool.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTask {
    Record(Task),
    Legacy(String),
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        match stored {
            StoredTask::Record(task) => task,
            StoredTask::Legacy(description) => Self::new(&description, Priority::Medium),
        }
    }
}

/// Deserialize a stored collection, accepting legacy string entries.
///
/// # Errors
///
/// Returns the deserializer's error if the input is not an array of tasks.
pub fn deserialize_collection<'de, D>(deserializer: D) -> Result<Vec<Task>, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Vec::<StoredTask>::deserialize(deserializer)?;
    Ok(stored.into_iter().map(Task::from).collect())
}

/// Parse a creation timestamp: RFC 3339, or an ISO 8601 local time with no
/// offset (as older task files wrote it), taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|n| n.and_utc())
    })
}

/// Unreadable timestamps become "now" rather than failing the whole file.
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = raw.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp);
    if parsed.is_none() {
        tracing::debug!(value = ?raw, "unreadable created_at, using the current time");
    }
    Ok(parsed.unwrap_or_else(Utc::now))
}

/// Validate a description, returning it trimmed.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyDescription`] if nothing is left after trimming.
pub fn validate_description(description: &str) -> Result<&str, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(trimmed)
}

/// Parse a `YYYY-MM-DD` due date.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] if the string is not a valid date.
pub fn parse_due(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// Normalize user-supplied tags: trimmed, empty entries dropped, and
/// comma-separated values split (`--tags work,urgent`).
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .flat_map(|t| t.as_ref().split(',').map(str::trim).map(str::to_string).collect::<Vec<_>>())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_str() {
        assert_eq!("High".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!(" LOW ".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!(
            "urgent".parse::<Priority>(),
            Err(ValidationError::InvalidPriority("urgent".to_string()))
        );
    }

    #[test]
    fn test_priority_default_and_rank() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_priority_serializes_capitalized() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"High\"");
    }

    #[test]
    fn test_new_task_trims_description() {
        let task = Task::new("  Buy milk  ", Priority::Low);
        assert_eq!(task.description, "Buy milk");
        assert!(!task.completed);
        assert!(task.depends_on.is_empty());
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("  x ").unwrap(), "x");
        assert_eq!(validate_description(""), Err(ValidationError::EmptyDescription));
        assert_eq!(validate_description(" \t\n"), Err(ValidationError::EmptyDescription));
    }

    #[test]
    fn test_parse_due() {
        assert_eq!(parse_due("2026-03-01").unwrap(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(parse_due("tomorrow").is_err());
        assert!(parse_due("2026-02-30").is_err());
    }

    #[test]
    fn test_normalize_tags_splits_commas() {
        let tags = normalize_tags(["work, urgent", "", "home", "work"]);
        let expected: BTreeSet<String> =
            ["home", "urgent", "work"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn test_task_defaults_for_missing_fields() {
        let json = r#"{"id": 3, "task": "Old style"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.description, "Old style");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(task.tags.is_empty());
        assert!(task.depends_on.is_empty());
        assert!(task.due.is_none());
    }

    #[test]
    fn test_parse_timestamp_accepts_naive_iso() {
        let naive = parse_timestamp("2025-10-14T12:34:56.123456").unwrap();
        assert_eq!(naive.to_rfc3339(), "2025-10-14T12:34:56.123456+00:00");

        let offset = parse_timestamp("2025-10-14T14:34:56+02:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2025-10-14T12:34:56+00:00");

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_bad_created_at_falls_back_to_now() {
        let before = Utc::now();
        let task: Task =
            serde_json::from_str(r#"{"task": "Odd", "created_at": 17}"#).unwrap();
        assert!(task.created_at >= before);

        let task: Task =
            serde_json::from_str(r#"{"task": "Null", "created_at": null}"#).unwrap();
        assert!(task.created_at >= before);
    }

    #[test]
    fn test_due_omitted_when_none() {
        let task = Task::new("No date", Priority::Medium);
        let json = serde_json::to_string(&task).unwrap();
        assert!(!json.contains("due"));
    }

    #[test]
    fn test_deserialize_collection_accepts_legacy_strings() {
        let json = r#"["Buy milk", {"description": "Walk dog", "priority": "High"}]"#;
        let mut de = serde_json::Deserializer::from_str(json);
        let tasks = deserialize_collection(&mut de).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].description, "Buy milk");
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[1].priority, Priority::High);
    }

    #[test]
    fn test_deserialize_collection_rejects_object() {
        let mut de = serde_json::Deserializer::from_str(r#"{"tasks": []}"#);
        assert!(deserialize_collection(&mut de).is_err());
    }
}
