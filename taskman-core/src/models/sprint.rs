use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation;

/// A date-bounded work period. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: i64,
    pub name: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub project_id: i64,
}

impl Sprint {
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.date_start <= day && day <= self.date_end
    }

    /// Active against the server's local calendar date.
    pub fn is_active(&self) -> bool {
        self.is_active_on(Local::now().date_naive())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSprintInput {
    pub name: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub project_id: i64,
}

impl CreateSprintInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::name(&mut errors, "name", &self.name);
        if self.date_start > self.date_end {
            errors.add("date_end", "must not be earlier than date_start");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSprintInput {
    pub name: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub project_id: Option<i64>,
}

impl UpdateSprintInput {
    pub fn merge(self, current: &Sprint) -> CreateSprintInput {
        CreateSprintInput {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            date_start: self.date_start.unwrap_or(current.date_start),
            date_end: self.date_end.unwrap_or(current.date_end),
            project_id: self.project_id.unwrap_or(current.project_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SprintFilter {
    pub project_id: Option<i64>,
    /// Only sprints whose range contains this day.
    pub active_on: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sprint(start: NaiveDate, end: NaiveDate) -> Sprint {
        Sprint {
            id: 1,
            name: "S1".into(),
            date_start: start,
            date_end: end,
            project_id: 1,
        }
    }

    #[test]
    fn active_range_is_inclusive() {
        let s = sprint(date(2024, 6, 1), date(2024, 6, 10));
        assert!(s.is_active_on(date(2024, 6, 1)));
        assert!(s.is_active_on(date(2024, 6, 10)));
        assert!(!s.is_active_on(date(2024, 5, 31)));
        assert!(!s.is_active_on(date(2024, 6, 11)));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let input = CreateSprintInput {
            name: "S1".into(),
            date_start: date(2024, 6, 10),
            date_end: date(2024, 6, 1),
            project_id: 1,
        };
        let err = input.validate().unwrap_err();
        assert!(err.has_field("date_end"));
    }

    #[test]
    fn single_day_sprint_is_valid() {
        let input = CreateSprintInput {
            name: "S1".into(),
            date_start: date(2024, 6, 1),
            date_end: date(2024, 6, 1),
            project_id: 1,
        };
        assert!(input.validate().is_ok());
    }
}
