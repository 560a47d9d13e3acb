//! Coaching session programs
//!
//! An approved application carries a program made of two collections:
//! intensive sessions and weekly follow-up sessions. This module tracks
//! completion and classifies each session against the current day.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One scheduled meeting in a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    /// 1-based, unique within its collection
    pub session_number: u32,
    pub date: NaiveDate,
    #[serde(with = "crate::time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time_format")]
    pub end_time: NaiveTime,
    pub topic: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Which collection a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCollection {
    Intensive,
    FollowUp,
}

impl SessionCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionCollection::Intensive => "intensive",
            SessionCollection::FollowUp => "follow_up",
        }
    }
}

impl fmt::Display for SessionCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionCollection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intensive" => Ok(SessionCollection::Intensive),
            "follow_up" | "follow-up" => Ok(SessionCollection::FollowUp),
            other => Err(Error::InvalidSchedule(format!("unknown collection {other}"))),
        }
    }
}

/// Status of a session relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    Overdue,
    Today,
    Next,
    Scheduled,
}

impl SessionStatus {
    /// Dashboard label
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "Terminée",
            SessionStatus::Overdue => "En retard",
            SessionStatus::Today => "Aujourd'hui",
            SessionStatus::Next => "Prochaine séance",
            SessionStatus::Scheduled => "Programmée",
        }
    }
}

/// Position of a session inside a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionRef {
    pub collection: SessionCollection,
    pub index: usize,
}

/// The session program attached to an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedSchedule {
    #[serde(default)]
    pub intensive_sessions: Vec<SessionSchedule>,
    #[serde(default)]
    pub follow_up_sessions: Vec<SessionSchedule>,
}

impl ProposedSchedule {
    pub fn collection(&self, collection: SessionCollection) -> &[SessionSchedule] {
        match collection {
            SessionCollection::Intensive => &self.intensive_sessions,
            SessionCollection::FollowUp => &self.follow_up_sessions,
        }
    }

    fn collection_mut(&mut self, collection: SessionCollection) -> &mut Vec<SessionSchedule> {
        match collection {
            SessionCollection::Intensive => &mut self.intensive_sessions,
            SessionCollection::FollowUp => &mut self.follow_up_sessions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intensive_sessions.is_empty() && self.follow_up_sessions.is_empty()
    }

    pub fn total(&self) -> usize {
        self.intensive_sessions.len() + self.follow_up_sessions.len()
    }

    pub fn completed_count(&self) -> usize {
        self.iter().filter(|(_, s)| s.completed).count()
    }

    /// All sessions, intensive first, each in stored order
    pub fn iter(&self) -> impl Iterator<Item = (SessionRef, &SessionSchedule)> {
        let intensive = self.intensive_sessions.iter().enumerate().map(|(index, s)| {
            (
                SessionRef {
                    collection: SessionCollection::Intensive,
                    index,
                },
                s,
            )
        });
        let follow_up = self.follow_up_sessions.iter().enumerate().map(|(index, s)| {
            (
                SessionRef {
                    collection: SessionCollection::FollowUp,
                    index,
                },
                s,
            )
        });
        intensive.chain(follow_up)
    }

    pub fn get(&self, at: SessionRef) -> Option<&SessionSchedule> {
        self.collection(at.collection).get(at.index)
    }

    /// Rounded share of completed sessions, 0 for an empty program
    pub fn completion_percentage(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let completed = self.completed_count();
        // round half up in integers: (2 * 100 * c + t) / (2 * t)
        ((200 * completed + total) / (2 * total)) as u8
    }

    /// Mark one session done or not done
    ///
    /// Only the addressed entry changes. `notes` replaces the stored note
    /// when given and leaves it untouched otherwise.
    pub fn set_completed(
        &mut self,
        collection: SessionCollection,
        index: usize,
        completed: bool,
        notes: Option<String>,
    ) -> Result<()> {
        let session = self
            .collection_mut(collection)
            .get_mut(index)
            .ok_or_else(|| Error::SessionNotFound {
                collection: collection.to_string(),
                index,
            })?;

        session.completed = completed;
        if let Some(notes) = notes {
            let trimmed = notes.trim();
            session.notes = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        Ok(())
    }

    /// Earliest incomplete session matching `keep`
    ///
    /// Ties on date break on start time, then intensive before follow-up,
    /// then stored order.
    fn earliest_incomplete<F>(&self, keep: F) -> Option<SessionRef>
    where
        F: Fn(&SessionSchedule) -> bool,
    {
        self.iter()
            .filter(|(_, s)| !s.completed && keep(s))
            .min_by_key(|(at, s)| (s.date, s.start_time, at.collection, at.index))
            .map(|(at, _)| at)
    }

    /// The next session to attend: earliest incomplete session today or later
    pub fn next_session(&self, today: NaiveDate) -> Option<SessionRef> {
        self.earliest_incomplete(|s| s.date >= today)
    }

    /// The session shown as "next up": earliest incomplete session after today
    pub fn upcoming_session(&self, today: NaiveDate) -> Option<SessionRef> {
        self.earliest_incomplete(|s| s.date > today)
    }

    pub fn status_of(&self, at: SessionRef, today: NaiveDate) -> Option<SessionStatus> {
        let session = self.get(at)?;
        Some(self.classify(at, session, today, self.upcoming_session(today)))
    }

    fn classify(
        &self,
        at: SessionRef,
        session: &SessionSchedule,
        today: NaiveDate,
        upcoming: Option<SessionRef>,
    ) -> SessionStatus {
        if session.completed {
            SessionStatus::Completed
        } else if session.date < today {
            SessionStatus::Overdue
        } else if session.date == today {
            SessionStatus::Today
        } else if upcoming == Some(at) {
            SessionStatus::Next
        } else {
            SessionStatus::Scheduled
        }
    }

    /// Summary for the dashboard
    pub fn progress(&self, today: NaiveDate) -> ProgramProgress {
        let upcoming = self.upcoming_session(today);
        let sessions = self
            .iter()
            .map(|(at, s)| {
                let status = self.classify(at, s, today, upcoming);
                SessionView {
                    collection: at.collection,
                    index: at.index,
                    session: s.clone(),
                    status,
                    label: status.label(),
                }
            })
            .collect();

        ProgramProgress {
            total: self.total(),
            completed: self.completed_count(),
            percentage: self.completion_percentage(),
            next_session: self.next_session(today),
            sessions,
        }
    }
}

/// A session with its computed status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub collection: SessionCollection,
    pub index: usize,
    #[serde(flatten)]
    pub session: SessionSchedule,
    pub status: SessionStatus,
    pub label: &'static str,
}

/// Aggregate progress through a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramProgress {
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
    pub next_session: Option<SessionRef>,
    pub sessions: Vec<SessionView>,
}

/// Expected size of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramShape {
    pub intensive_count: usize,
    pub follow_up_count: usize,
}

impl Default for ProgramShape {
    fn default() -> Self {
        Self {
            intensive_count: 6,
            follow_up_count: 2,
        }
    }
}

impl ProgramShape {
    /// Check a proposal before it is attached to an application
    pub fn validate(&self, schedule: &ProposedSchedule) -> Result<()> {
        if schedule.is_empty() {
            return Err(Error::EmptySchedule);
        }
        if schedule.intensive_sessions.len() != self.intensive_count {
            return Err(Error::InvalidSchedule(format!(
                "expected {} intensive sessions, got {}",
                self.intensive_count,
                schedule.intensive_sessions.len()
            )));
        }
        if schedule.follow_up_sessions.len() != self.follow_up_count {
            return Err(Error::InvalidSchedule(format!(
                "expected {} follow-up sessions, got {}",
                self.follow_up_count,
                schedule.follow_up_sessions.len()
            )));
        }

        for collection in [SessionCollection::Intensive, SessionCollection::FollowUp] {
            let mut seen = HashSet::new();
            for session in schedule.collection(collection) {
                if session.session_number == 0 || !seen.insert(session.session_number) {
                    return Err(Error::InvalidSchedule(format!(
                        "{} session number {} is invalid or repeated",
                        collection, session.session_number
                    )));
                }
                if session.start_time >= session.end_time {
                    return Err(Error::InvalidTimeRange {
                        start: crate::time_format::format_time(&session.start_time),
                        end: crate::time_format::format_time(&session.end_time),
                    });
                }
            }
        }
        Ok(())
    }

    /// Draft a program starting on `first_date`
    ///
    /// Intensive sessions fall on consecutive weekdays (weekends skipped);
    /// follow-ups are one week apart, the first one week after the last
    /// intensive session.
    pub fn draft(
        &self,
        first_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<ProposedSchedule> {
        if start_time >= end_time {
            return Err(Error::InvalidTimeRange {
                start: crate::time_format::format_time(&start_time),
                end: crate::time_format::format_time(&end_time),
            });
        }

        let mut intensive_sessions = Vec::with_capacity(self.intensive_count);
        let mut date = first_date;
        while intensive_sessions.len() < self.intensive_count {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let number = intensive_sessions.len() as u32 + 1;
                intensive_sessions.push(SessionSchedule {
                    session_number: number,
                    date,
                    start_time,
                    end_time,
                    topic: format!("Intensive session {number}"),
                    completed: false,
                    notes: None,
                });
            }
            date += Duration::days(1);
        }

        let anchor = intensive_sessions
            .last()
            .map(|s| s.date)
            .unwrap_or(first_date);
        let follow_up_sessions = (1..=self.follow_up_count as u32)
            .map(|number| SessionSchedule {
                session_number: number,
                date: anchor + Duration::weeks(number as i64),
                start_time,
                end_time,
                topic: format!("Follow-up {number}"),
                completed: false,
                notes: None,
            })
            .collect();

        Ok(ProposedSchedule {
            intensive_sessions,
            follow_up_sessions,
        })
    }
}
