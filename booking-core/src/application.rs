//! Political launch applications and their review workflow

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::program::{ProgramShape, ProposedSchedule};
use crate::{Error, Result};

/// Review status of an application
///
/// ```text
/// pending -> approved -> schedule_proposed -> schedule_validated -> payment_sent -> paid
///         \-> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    ScheduleProposed,
    ScheduleValidated,
    PaymentSent,
    Paid,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::ScheduleProposed => "schedule_proposed",
            ApplicationStatus::ScheduleValidated => "schedule_validated",
            ApplicationStatus::PaymentSent => "payment_sent",
            ApplicationStatus::Paid => "paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Rejected | ApplicationStatus::Paid)
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, ScheduleProposed)
                | (ScheduleProposed, ScheduleProposed)
                | (ScheduleProposed, ScheduleValidated)
                | (ScheduleValidated, PaymentSent)
                | (PaymentSent, Paid)
        )
    }

    fn transition(self, next: ApplicationStatus) -> Result<ApplicationStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "schedule_proposed" => Ok(ApplicationStatus::ScheduleProposed),
            "schedule_validated" => Ok(ApplicationStatus::ScheduleValidated),
            "payment_sent" => Ok(ApplicationStatus::PaymentSent),
            "paid" => Ok(ApplicationStatus::Paid),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// How the applicant intends to pay for the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    Full,
    Installments,
}

impl PaymentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOption::Full => "full",
            PaymentOption::Installments => "installments",
        }
    }
}

impl FromStr for PaymentOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(PaymentOption::Full),
            "installments" => Ok(PaymentOption::Installments),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// Fields submitted by an applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    #[serde(default)]
    pub political_party: Option<String>,
    #[serde(default)]
    pub target_office: Option<String>,
    pub motivation: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
    pub payment_option: PaymentOption,
    pub payment_method: String,
}

impl ApplicationForm {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("city", &self.city),
            ("motivation", &self.motivation),
            ("payment_method", &self.payment_method),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingField(name));
            }
        }
        if !self.email.contains('@') {
            return Err(Error::MissingField("email"));
        }
        Ok(())
    }
}

/// A candidacy for the political launch coaching program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    #[serde(flatten)]
    pub form: ApplicationForm,
    pub status: ApplicationStatus,
    pub proposed_schedule: Option<ProposedSchedule>,
    pub schedule_validated: bool,
    pub payment_link: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn submit(id: String, form: ApplicationForm, now: DateTime<Utc>) -> Result<Self> {
        form.validate()?;
        Ok(Self {
            id,
            form,
            status: ApplicationStatus::Pending,
            proposed_schedule: None,
            schedule_validated: false,
            payment_link: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(ApplicationStatus::Approved)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::MissingRejectionReason);
        }
        self.status = self.status.transition(ApplicationStatus::Rejected)?;
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Attach (or replace) the proposed program
    pub fn propose_schedule(
        &mut self,
        schedule: ProposedSchedule,
        shape: &ProgramShape,
        now: DateTime<Utc>,
    ) -> Result<()> {
        shape.validate(&schedule)?;
        self.status = self
            .status
            .transition(ApplicationStatus::ScheduleProposed)?;
        self.proposed_schedule = Some(schedule);
        self.schedule_validated = false;
        self.updated_at = now;
        Ok(())
    }

    pub fn validate_schedule(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.proposed_schedule.as_ref().map_or(true, |s| s.is_empty()) {
            return Err(Error::NoSchedule);
        }
        self.status = self
            .status
            .transition(ApplicationStatus::ScheduleValidated)?;
        self.schedule_validated = true;
        self.updated_at = now;
        Ok(())
    }

    pub fn send_payment_link(&mut self, link: &str, now: DateTime<Utc>) -> Result<()> {
        let link = link.trim();
        if link.is_empty() {
            return Err(Error::MissingPaymentLink);
        }
        self.status = self.status.transition(ApplicationStatus::PaymentSent)?;
        self.payment_link = Some(link.to_string());
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(ApplicationStatus::Paid)?;
        self.updated_at = now;
        Ok(())
    }

    /// The program, if one has been proposed
    pub fn schedule_mut(&mut self) -> Result<&mut ProposedSchedule> {
        self.proposed_schedule.as_mut().ok_or(Error::NoSchedule)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.form.first_name, self.form.last_name)
    }
}
