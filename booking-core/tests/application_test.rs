//! Application review workflow tests

use booking_core::application::{Application, ApplicationForm, ApplicationStatus, PaymentOption};
use booking_core::program::{ProgramShape, ProposedSchedule};
use booking_core::Error;
use chrono::{NaiveDate, NaiveTime, Utc};

fn form() -> ApplicationForm {
    ApplicationForm {
        first_name: "Louis".to_string(),
        last_name: "Bernard".to_string(),
        email: "louis@example.com".to_string(),
        phone: "0611223344".to_string(),
        city: "Nantes".to_string(),
        political_party: Some("Independent".to_string()),
        target_office: Some("Mayor".to_string()),
        motivation: "Run a first campaign".to_string(),
        experience: None,
        goals: Some("Win".to_string()),
        payment_option: PaymentOption::Installments,
        payment_method: "card".to_string(),
    }
}

fn program() -> ProposedSchedule {
    ProgramShape::default()
        .draft(
            NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        )
        .unwrap()
}

/// Test: the full happy path reaches `paid`
#[test]
fn test_full_lifecycle() {
    let shape = ProgramShape::default();
    let mut app = Application::submit("app-1".to_string(), form(), Utc::now()).unwrap();
    assert_eq!(app.status, ApplicationStatus::Pending);

    app.approve(Utc::now()).unwrap();
    assert_eq!(app.status, ApplicationStatus::Approved);

    app.propose_schedule(program(), &shape, Utc::now()).unwrap();
    assert_eq!(app.status, ApplicationStatus::ScheduleProposed);
    assert!(!app.schedule_validated);

    app.validate_schedule(Utc::now()).unwrap();
    assert!(app.schedule_validated);

    app.send_payment_link("https://pay.example.com/xyz", Utc::now())
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::PaymentSent);

    app.mark_paid(Utc::now()).unwrap();
    assert_eq!(app.status, ApplicationStatus::Paid);
    assert!(app.status.is_terminal());
}

/// Test: an empty proposal is refused and the status is unchanged
#[test]
fn test_empty_schedule_refused() {
    let mut app = Application::submit("app-1".to_string(), form(), Utc::now()).unwrap();
    app.approve(Utc::now()).unwrap();

    let result = app.propose_schedule(ProposedSchedule::default(), &ProgramShape::default(), Utc::now());
    assert_eq!(result, Err(Error::EmptySchedule));
    assert_eq!(app.status, ApplicationStatus::Approved);
    assert!(app.proposed_schedule.is_none());
}

/// Test: a proposal can be replaced until it is validated
#[test]
fn test_reproposal_resets_validation() {
    let shape = ProgramShape::default();
    let mut app = Application::submit("app-1".to_string(), form(), Utc::now()).unwrap();
    app.approve(Utc::now()).unwrap();
    app.propose_schedule(program(), &shape, Utc::now()).unwrap();
    app.propose_schedule(program(), &shape, Utc::now()).unwrap();
    assert_eq!(app.status, ApplicationStatus::ScheduleProposed);

    app.validate_schedule(Utc::now()).unwrap();
    assert!(matches!(
        app.propose_schedule(program(), &shape, Utc::now()),
        Err(Error::InvalidTransition { .. })
    ));
}

/// Test: a pending application cannot receive a schedule
#[test]
fn test_schedule_requires_approval() {
    let mut app = Application::submit("app-1".to_string(), form(), Utc::now()).unwrap();
    assert!(matches!(
        app.propose_schedule(program(), &ProgramShape::default(), Utc::now()),
        Err(Error::InvalidTransition { .. })
    ));
}

/// Test: payment link must be non-empty
#[test]
fn test_payment_link_required() {
    let shape = ProgramShape::default();
    let mut app = Application::submit("app-1".to_string(), form(), Utc::now()).unwrap();
    app.approve(Utc::now()).unwrap();
    app.propose_schedule(program(), &shape, Utc::now()).unwrap();
    app.validate_schedule(Utc::now()).unwrap();

    assert_eq!(
        app.send_payment_link("", Utc::now()),
        Err(Error::MissingPaymentLink)
    );
    assert_eq!(app.status, ApplicationStatus::ScheduleValidated);
}

/// Test: every status string round-trips and unknown ones are rejected
#[test]
fn test_status_strings() {
    for status in [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::ScheduleProposed,
        ApplicationStatus::ScheduleValidated,
        ApplicationStatus::PaymentSent,
        ApplicationStatus::Paid,
    ] {
        assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
    }
    assert!("archived".parse::<ApplicationStatus>().is_err());
}
