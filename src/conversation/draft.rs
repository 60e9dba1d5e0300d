//! Step-by-step task creation.

use chrono::NaiveDate;

use crate::domain::{Frequency, NewTask};
use crate::error::{RemindrError, Result};
use crate::service::validate_importance;

/// Where a draft is in the create-task flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Description,
    Deadline,
    Importance,
    Frequency,
    Complete,
}

impl Step {
    /// Question asked while waiting in this step
    pub fn prompt(&self) -> &'static str {
        match self {
            Step::Description => "Describe the task:",
            Step::Deadline => "Deadline (DD.MM.YYYY or YYYY-MM-DD):",
            Step::Importance => "Importance, 1-5 (reminders per day):",
            Step::Frequency => "Frequency (daily, every other day, weekly):",
            Step::Complete => "Task is ready.",
        }
    }
}

/// A task under construction, one answer per step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    step: Step,
    description: String,
    deadline: Option<NaiveDate>,
    importance: Option<u32>,
    frequency: Option<Frequency>,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskDraft {
    pub fn new() -> Self {
        Self {
            step: Step::Description,
            description: String::new(),
            deadline: None,
            importance: None,
            frequency: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == Step::Complete
    }

    /// Feed the answer for the current step. Invalid answers leave the draft
    /// untouched so the same question can be asked again.
    pub fn apply(&mut self, input: &str, today: NaiveDate) -> Result<Step> {
        let input = input.trim();
        match self.step {
            Step::Description => {
                if input.is_empty() {
                    return Err(RemindrError::InvalidInput("description must not be empty".to_string()));
                }
                self.description = input.to_string();
                self.step = Step::Deadline;
            }
            Step::Deadline => {
                let deadline = parse_deadline(input)?;
                if deadline < today {
                    return Err(RemindrError::InvalidInput(format!(
                        "deadline {} is in the past",
                        deadline.format("%d.%m.%Y")
                    )));
                }
                self.deadline = Some(deadline);
                self.step = Step::Importance;
            }
            Step::Importance => {
                let importance: u32 = input
                    .parse()
                    .map_err(|_| RemindrError::InvalidInput(format!("not a number: {:?}", input)))?;
                validate_importance(importance)?;
                self.importance = Some(importance);
                self.step = Step::Frequency;
            }
            Step::Frequency => {
                self.frequency = Some(parse_frequency(input)?);
                self.step = Step::Complete;
            }
            Step::Complete => {
                return Err(RemindrError::InvalidInput("draft is already complete".to_string()));
            }
        }
        Ok(self.step)
    }

    /// Turn a complete draft into a task for `user_id`.
    pub fn into_new_task(self, user_id: i64) -> Result<NewTask> {
        match (self.step, self.deadline, self.importance, self.frequency) {
            (Step::Complete, Some(deadline), Some(importance), Some(frequency)) => Ok(NewTask::new(
                user_id,
                self.description,
                deadline,
                importance,
                frequency,
            )),
            (step, ..) => Err(RemindrError::InvalidInput(format!(
                "draft is incomplete, waiting for {:?}",
                step
            ))),
        }
    }
}

/// Accepts `DD.MM.YYYY` and ISO `YYYY-MM-DD`
pub fn parse_deadline(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .map_err(|_| RemindrError::InvalidInput(format!("cannot read date {:?}, use DD.MM.YYYY", input)))
}

/// Accepts stored names (`every_other_day`) and labels (`Every other day`),
/// ignoring case
pub fn parse_frequency(input: &str) -> Result<Frequency> {
    let input = input.trim();
    Frequency::ALL
        .into_iter()
        .find(|f| f.as_str().eq_ignore_ascii_case(input) || f.display_name().eq_ignore_ascii_case(input))
        .ok_or_else(|| RemindrError::InvalidInput(format!("unknown frequency: {:?}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_full_flow() {
        let mut draft = TaskDraft::new();
        assert_eq!(draft.apply("Write report", today()).unwrap(), Step::Deadline);
        assert_eq!(draft.apply("20.01.2024", today()).unwrap(), Step::Importance);
        assert_eq!(draft.apply("4", today()).unwrap(), Step::Frequency);
        assert_eq!(draft.apply("weekly", today()).unwrap(), Step::Complete);
        assert!(draft.is_complete());

        let task = draft.into_new_task(9).unwrap();
        assert_eq!(task.user_id, 9);
        assert_eq!(task.description, "Write report");
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(task.importance, 4);
        assert_eq!(task.frequency, Frequency::Weekly);
    }

    #[test]
    fn test_invalid_answer_keeps_step() {
        let mut draft = TaskDraft::new();
        draft.apply("Write report", today()).unwrap();

        assert!(draft.apply("next tuesday", today()).is_err());
        assert!(draft.apply("14.01.2024", today()).is_err());
        assert_eq!(draft.step(), Step::Deadline);

        draft.apply("2024-01-15", today()).unwrap();
        assert!(draft.apply("6", today()).is_err());
        assert!(draft.apply("lots", today()).is_err());
        assert_eq!(draft.step(), Step::Importance);
    }

    #[test]
    fn test_blank_description_rejected() {
        let mut draft = TaskDraft::new();
        assert!(draft.apply("   ", today()).is_err());
        assert_eq!(draft.step(), Step::Description);
    }

    #[test]
    fn test_incomplete_draft_cannot_become_task() {
        let mut draft = TaskDraft::new();
        draft.apply("Write report", today()).unwrap();
        assert!(draft.into_new_task(1).is_err());
    }

    #[test]
    fn test_complete_draft_rejects_more_input() {
        let mut draft = TaskDraft::new();
        for answer in ["Write report", "16.01.2024", "1", "daily"] {
            draft.apply(answer, today()).unwrap();
        }
        assert!(draft.apply("more", today()).is_err());
    }

    #[test]
    fn test_parse_frequency_accepts_names_and_labels() {
        assert_eq!(parse_frequency("daily").unwrap(), Frequency::Daily);
        assert_eq!(parse_frequency("Every other day").unwrap(), Frequency::EveryOtherDay);
        assert_eq!(parse_frequency("EVERY_OTHER_DAY").unwrap(), Frequency::EveryOtherDay);
        assert_eq!(parse_frequency(" Weekly ").unwrap(), Frequency::Weekly);
        assert!(parse_frequency("hourly").is_err());
    }

    #[test]
    fn test_parse_deadline_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(parse_deadline("15.01.2025").unwrap(), expected);
        assert_eq!(parse_deadline("2025-01-15").unwrap(), expected);
        assert!(parse_deadline("31.02.2025").is_err());
        assert!(parse_deadline("01/15/2025").is_err());
    }
}
