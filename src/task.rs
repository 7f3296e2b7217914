//! To-do tasks, as exchanged with the task store

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use chrono::{DateTime, NaiveDate};


/// The identifier of a task.
///
/// This is assigned by the store when a task is created, and is opaque to this crate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    content: String,
}

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Generate a random TaskId, the way a store would
    pub fn random() -> Self {
        let random = uuid::Uuid::new_v4().to_simple().to_string();
        Self { content: random }
    }
}
impl From<String> for TaskId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for TaskId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}
impl FromStr for TaskId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<TaskId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TaskId{ content: s })
    }
}



/// A to-do task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// The identifier, assigned by the store
    #[serde(rename = "_id")]
    id: TaskId,
    /// The display text of the task
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    is_important: bool,
    #[serde(default, with = "iso_date")]
    due_date: Option<NaiveDate>,
    #[serde(default, with = "iso_date")]
    scheduled_date: Option<NaiveDate>,
}

impl Task {
    /// Build a task that already exists in a store.
    ///
    /// Tasks are never created locally: use [`TaskSyncClient::create`](crate::TaskSyncClient::create) so that the store assigns an ID.
    pub fn new_with_parameters(id: TaskId, text: String, completed: bool, is_important: bool,
                               due_date: Option<NaiveDate>, scheduled_date: Option<NaiveDate>) -> Self
    {
        Self { id, text, completed, is_important, due_date, scheduled_date }
    }

    /// Build the record a store would return for a freshly created draft
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self::new_with_parameters(id, draft.text, false, draft.is_important, draft.due_date, draft.scheduled_date)
    }

    pub fn id(&self) -> &TaskId     { &self.id          }
    pub fn text(&self) -> &str      { &self.text        }
    pub fn completed(&self) -> bool { self.completed    }
    pub fn is_important(&self) -> bool { self.is_important }
    pub fn due_date(&self) -> Option<NaiveDate>       { self.due_date }
    pub fn scheduled_date(&self) -> Option<NaiveDate> { self.scheduled_date }

    /// Returns a copy of this task, with the fields of `patch` applied over it.
    ///
    /// The ID is never changed.
    pub fn merged_with(&self, patch: &TaskPatch) -> Task {
        let mut merged = self.clone();
        if let Some(text) = &patch.text {
            merged.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            merged.completed = completed;
        }
        if let Some(is_important) = patch.is_important {
            merged.is_important = is_important;
        }
        if let Some(due_date) = patch.due_date {
            merged.due_date = due_date;
        }
        if let Some(scheduled_date) = patch.scheduled_date {
            merged.scheduled_date = scheduled_date;
        }
        merged
    }
}


/// The payload sent to a store to create a new task
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub text: String,
    #[serde(default, with = "iso_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, with = "iso_date")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_important: bool,
}

impl TaskDraft {
    pub fn new<S: ToString>(text: S) -> Self {
        Self { text: text.to_string(), ..Self::default() }
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn scheduled(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn important(mut self, is_important: bool) -> Self {
        self.is_important = is_important;
        self
    }
}


/// A set of fields to change on an existing task.
///
/// `None` means "leave as is". For dates, `Some(None)` clears the date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub is_important: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub scheduled_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text<S: ToString>(mut self, text: S) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn important(mut self, is_important: bool) -> Self {
        self.is_important = Some(is_important);
        self
    }

    pub fn due_date(mut self, date: Option<NaiveDate>) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn scheduled_date(mut self, date: Option<NaiveDate>) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    /// A patch that sets every editable field to the value of `draft` (completion is left as is)
    pub fn from_draft(draft: TaskDraft) -> Self {
        Self::new()
            .text(draft.text)
            .important(draft.is_important)
            .due_date(draft.due_date)
            .scheduled_date(draft.scheduled_date)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}


/// The editable copy of a task, staged by [`TaskSyncClient::begin_edit`](crate::TaskSyncClient::begin_edit)
#[derive(Clone, Debug, PartialEq)]
pub struct EditBuffer {
    id: TaskId,
    pub text: String,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub is_important: bool,
}

impl EditBuffer {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id().clone(),
            text: task.text().to_string(),
            due_date: task.due_date(),
            scheduled_date: task.scheduled_date(),
            is_important: task.is_important(),
        }
    }

    /// The ID of the task being edited
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// The fields of this buffer, as a draft (used for validation)
    pub fn as_draft(&self) -> TaskDraft {
        TaskDraft {
            text: self.text.clone(),
            due_date: self.due_date,
            scheduled_date: self.scheduled_date,
            is_important: self.is_important,
        }
    }
}


/// Dates are exchanged as `YYYY-MM-DD` strings.
///
/// Some stores keep them as timestamps, so full RFC3339 values are accepted as well (and truncated to their date).
/// Empty strings and `null` mean "no date".
pub(crate) mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => super::parse_date(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Parse a date the way the store sends them (see [`iso_date`])
pub fn parse_date(s: &str) -> Result<Option<NaiveDate>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Some(d));
    }
    match DateTime::parse_from_rfc3339(s) {
        // Keep the day as written, whatever its offset
        Ok(dt) => Ok(Some(dt.naive_local().date())),
        Err(err) => Err(format!("Invalid date {:?}: {}", s, err)),
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deserialize_store_record() {
        let json = r#"{
            "_id": "6751b0c2e4b0a1f3c8d9e012",
            "text": "Buy milk",
            "completed": false,
            "dueDate": "2024-12-15",
            "scheduledDate": "2024-12-06T00:00:00.000Z",
            "isImportant": true,
            "__v": 0
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id().as_str(), "6751b0c2e4b0a1f3c8d9e012");
        assert_eq!(task.text(), "Buy milk");
        assert_eq!(task.completed(), false);
        assert_eq!(task.is_important(), true);
        assert_eq!(task.due_date(), Some(date(2024, 12, 15)));
        assert_eq!(task.scheduled_date(), Some(date(2024, 12, 6)));
    }

    #[test]
    fn timestamps_keep_their_written_day() {
        let json = r#"{"_id": "a", "text": "t", "dueDate": "2024-12-06T00:00:00+05:00", "scheduledDate": "2024-12-06T23:30:00-08:00"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date(), Some(date(2024, 12, 6)));
        assert_eq!(task.scheduled_date(), Some(date(2024, 12, 6)));
    }

    #[test]
    fn missing_flags_and_dates_use_defaults() {
        let task: Task = serde_json::from_str(r#"{"_id": "a", "text": "t", "dueDate": ""}"#).unwrap();
        assert_eq!(task.completed(), false);
        assert_eq!(task.is_important(), false);
        assert_eq!(task.due_date(), None);
        assert_eq!(task.scheduled_date(), None);
    }

    #[test]
    fn serialize_uses_wire_names() {
        let task = Task::new_with_parameters(TaskId::from("42"), "Read".into(), true, false, Some(date(2024, 1, 2)), None);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["_id"], "42");
        assert_eq!(value["isImportant"], false);
        assert_eq!(value["dueDate"], "2024-01-02");
        assert!(value["scheduledDate"].is_null());

        let draft = TaskDraft::new("Buy milk").due(date(2024, 12, 15));
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["text"], "Buy milk");
        assert_eq!(value["dueDate"], "2024-12-15");
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn invalid_date_is_rejected() {
        assert!(parse_date("15/12/2024").is_err());
        assert!(serde_json::from_str::<Task>(r#"{"_id": "a", "text": "t", "dueDate": "soon"}"#).is_err());
    }

    #[test]
    fn patch_only_changes_given_fields() {
        let task = Task::new_with_parameters(TaskId::from("1"), "Walk".into(), false, true, Some(date(2024, 3, 1)), Some(date(2024, 2, 28)));

        let merged = task.merged_with(&TaskPatch::new().completed(true));
        assert_eq!(merged.completed(), true);
        assert_eq!(merged.is_important(), true);
        assert_eq!(merged.text(), "Walk");
        assert_eq!(merged.due_date(), task.due_date());

        let merged = task.merged_with(&TaskPatch::new().due_date(None).text("Run"));
        assert_eq!(merged.due_date(), None);
        assert_eq!(merged.scheduled_date(), task.scheduled_date());
        assert_eq!(merged.text(), "Run");
        assert_eq!(merged.id(), task.id());

        assert!(TaskPatch::new().is_empty());
    }

    #[test]
    fn edit_buffer_round_trip() {
        let task = Task::new_with_parameters(TaskId::from("1"), "Walk".into(), true, true, None, Some(date(2024, 2, 28)));
        let mut buffer = EditBuffer::from_task(&task);
        buffer.text = "Walk the dog".to_string();

        let merged = task.merged_with(&TaskPatch::from_draft(buffer.as_draft()));
        assert_eq!(merged.text(), "Walk the dog");
        // completion is not part of the edit form
        assert_eq!(merged.completed(), true);
        assert_eq!(merged.scheduled_date(), Some(date(2024, 2, 28)));
    }
}
