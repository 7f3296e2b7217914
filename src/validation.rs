//! Checks that are run on drafts before anything is sent to the store

use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::task::{TaskDraft, TaskPatch};

/// What to do with tasks that have no due date or scheduled date
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatePolicy {
    /// Both dates must be set
    Required,
    /// Dates may be missing, they are sent as `null`
    Optional,
    /// Missing dates are set to the current day
    DefaultToToday,
}

impl Default for DatePolicy {
    fn default() -> Self {
        DatePolicy::Required
    }
}

impl FromStr for DatePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "required" => Ok(DatePolicy::Required),
            "optional" => Ok(DatePolicy::Optional),
            "today" | "default-to-today" => Ok(DatePolicy::DefaultToToday),
            other => Err(format!("Invalid date policy {:?} (expected \"required\", \"optional\" or \"today\")", other)),
        }
    }
}

impl DatePolicy {
    /// Check a draft, and return what should actually be sent to the store.
    ///
    /// `today` is only used by [`DatePolicy::DefaultToToday`].
    pub fn check_draft(&self, draft: TaskDraft, today: NaiveDate) -> Result<TaskDraft, ValidationError> {
        if draft.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }

        match self {
            DatePolicy::Required => {
                if draft.due_date.is_none() {
                    return Err(ValidationError::MissingDueDate);
                }
                if draft.scheduled_date.is_none() {
                    return Err(ValidationError::MissingScheduledDate);
                }
                Ok(draft)
            },
            DatePolicy::Optional => Ok(draft),
            DatePolicy::DefaultToToday => {
                let mut draft = draft;
                draft.due_date.get_or_insert(today);
                draft.scheduled_date.get_or_insert(today);
                Ok(draft)
            },
        }
    }

    /// Check the fields an update is about to change.
    ///
    /// Only the fields present in the patch are checked: toggling a flag on a task that has no dates is always accepted.
    pub fn check_patch(&self, patch: &TaskPatch) -> Result<(), ValidationError> {
        if let Some(text) = &patch.text {
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyText);
            }
        }

        if self == &DatePolicy::Required {
            if patch.due_date == Some(None) {
                return Err(ValidationError::MissingDueDate);
            }
            if patch.scheduled_date == Some(None) {
                return Err(ValidationError::MissingScheduledDate);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
    }
    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    #[test]
    fn empty_text_is_always_rejected() {
        for policy in &[DatePolicy::Required, DatePolicy::Optional, DatePolicy::DefaultToToday] {
            let draft = TaskDraft::new("   \t").due(date(15)).scheduled(date(6));
            assert_eq!(policy.check_draft(draft, today()), Err(ValidationError::EmptyText));
        }
    }

    #[test]
    fn required_dates() {
        let policy = DatePolicy::Required;
        assert_eq!(policy.check_draft(TaskDraft::new("Buy milk").scheduled(date(6)), today()),
                   Err(ValidationError::MissingDueDate));
        assert_eq!(policy.check_draft(TaskDraft::new("Buy milk").due(date(15)), today()),
                   Err(ValidationError::MissingScheduledDate));

        let draft = TaskDraft::new("Buy milk").due(date(15)).scheduled(date(6));
        assert_eq!(policy.check_draft(draft.clone(), today()), Ok(draft));
    }

    #[test]
    fn optional_dates_are_left_alone() {
        let draft = TaskDraft::new("Buy milk");
        assert_eq!(DatePolicy::Optional.check_draft(draft.clone(), today()), Ok(draft));
    }

    #[test]
    fn missing_dates_default_to_today() {
        let draft = TaskDraft::new("Buy milk").due(date(15));
        let checked = DatePolicy::DefaultToToday.check_draft(draft, today()).unwrap();
        assert_eq!(checked.due_date, Some(date(15)));
        assert_eq!(checked.scheduled_date, Some(today()));
    }

    #[test]
    fn patches() {
        let policy = DatePolicy::Required;
        assert_eq!(policy.check_patch(&TaskPatch::new().completed(true)), Ok(()));
        assert_eq!(policy.check_patch(&TaskPatch::new().text(" ")), Err(ValidationError::EmptyText));
        assert_eq!(policy.check_patch(&TaskPatch::new().scheduled_date(None)), Err(ValidationError::MissingScheduledDate));
        assert_eq!(policy.check_patch(&TaskPatch::new().due_date(Some(date(4)))), Ok(()));

        assert_eq!(DatePolicy::Optional.check_patch(&TaskPatch::new().due_date(None)), Ok(()));
    }

    #[test]
    fn parse() {
        assert_eq!("today".parse::<DatePolicy>(), Ok(DatePolicy::DefaultToToday));
        assert_eq!("REQUIRED".parse::<DatePolicy>(), Ok(DatePolicy::Required));
        assert!("never".parse::<DatePolicy>().is_err());
    }
}
