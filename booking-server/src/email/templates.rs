//! Notification email contents
//!
//! Every message is rendered twice from the same paragraphs: plain text,
//! and HTML with each paragraph escaped.

use booking_core::time_format::format_time;
use booking_core::{Application, ApplicationStatus, Booking, PaymentMethod, PaymentStatus};

use super::EmailMessage;

/// Escape text for inclusion in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Amount in euros with a decimal comma, e.g. `90,00 €`
pub fn format_amount(cents: i64) -> String {
    format!("{},{:02} €", cents / 100, (cents % 100).abs())
}

fn render(to: &str, subject: String, paragraphs: &[String]) -> EmailMessage {
    let html_body = paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect::<Vec<_>>()
        .join("\n");

    EmailMessage {
        to: to.to_string(),
        subject,
        html_body,
        text_body: paragraphs.join("\n\n"),
    }
}

fn booking_summary(booking: &Booking) -> String {
    format!(
        "Rendez-vous du {} de {} à {} : {}",
        booking.date.format("%d/%m/%Y"),
        format_time(&booking.start_time),
        format_time(&booking.end_time),
        booking.topic
    )
}

/// Acknowledgement sent to the client when a booking is recorded
pub fn booking_received(booking: &Booking) -> EmailMessage {
    let mut paragraphs = vec![
        format!("Bonjour {},", booking.customer_name),
        "Nous avons bien reçu votre demande de consultation.".to_string(),
        booking_summary(booking),
        format!("Montant : {}", format_amount(booking.amount_cents)),
    ];
    match booking.payment_method {
        PaymentMethod::Transfer => paragraphs.push(
            "Votre créneau sera confirmé à réception de votre virement.".to_string(),
        ),
        PaymentMethod::Card => {
            paragraphs.push("Votre paiement a bien été enregistré.".to_string())
        }
    }
    if booking.is_priority {
        paragraphs.push("Il s'agit d'une consultation prioritaire.".to_string());
    }

    let subject = if booking.is_priority {
        "Votre demande de consultation prioritaire".to_string()
    } else {
        "Votre demande de consultation".to_string()
    };
    render(&booking.email, subject, &paragraphs)
}

/// Alert sent to staff for every new booking
pub fn staff_booking_alert(booking: &Booking, staff_email: &str) -> EmailMessage {
    let kind = if booking.is_priority {
        "prioritaire"
    } else {
        "standard"
    };
    let mut paragraphs = vec![
        format!("Nouvelle réservation {} de {} ({}).", kind, booking.customer_name, booking.email),
        booking_summary(booking),
        format!(
            "Paiement : {} ({}), statut {}",
            format_amount(booking.amount_cents),
            booking.payment_method.as_str(),
            booking.payment_status
        ),
    ];
    if let Some(message) = &booking.message {
        paragraphs.push(format!("Message : {}", message));
    }

    render(
        staff_email,
        format!("Nouvelle réservation {} : {}", kind, booking.customer_name),
        &paragraphs,
    )
}

/// Sent to the client when staff change a booking's status
pub fn booking_status_changed(booking: &Booking) -> EmailMessage {
    let outcome = match booking.payment_status {
        PaymentStatus::Confirmed | PaymentStatus::Completed => "est confirmé",
        PaymentStatus::Cancelled => "a été annulé",
        PaymentStatus::Rejected => "n'a pas pu être accepté",
        PaymentStatus::Pending => "est en attente",
    };
    let paragraphs = vec![
        format!("Bonjour {},", booking.customer_name),
        format!("Votre rendez-vous {}.", outcome),
        booking_summary(booking),
    ];

    render(
        &booking.email,
        "Mise à jour de votre rendez-vous".to_string(),
        &paragraphs,
    )
}

/// Acknowledgement sent to an applicant
pub fn application_received(application: &Application) -> EmailMessage {
    let paragraphs = vec![
        format!("Bonjour {},", application.form.first_name),
        "Nous avons bien reçu votre candidature au programme de lancement politique.".to_string(),
        "Nous reviendrons vers vous après étude de votre dossier.".to_string(),
    ];

    render(
        &application.form.email,
        "Votre candidature a bien été reçue".to_string(),
        &paragraphs,
    )
}

/// Alert sent to staff for a new application
pub fn staff_application_alert(application: &Application, staff_email: &str) -> EmailMessage {
    let mut paragraphs = vec![
        format!(
            "Nouvelle candidature de {} ({}, {}).",
            application.full_name(),
            application.form.email,
            application.form.city
        ),
        format!("Motivation : {}", application.form.motivation),
        format!(
            "Paiement souhaité : {} / {}",
            application.form.payment_option.as_str(),
            application.form.payment_method
        ),
    ];
    if let Some(office) = &application.form.target_office {
        paragraphs.push(format!("Mandat visé : {}", office));
    }

    render(
        staff_email,
        format!("Nouvelle candidature : {}", application.full_name()),
        &paragraphs,
    )
}

/// Sent to the applicant after a status change
///
/// Returns `None` for statuses the applicant is not told about.
pub fn application_update(application: &Application) -> Option<EmailMessage> {
    let greeting = format!("Bonjour {},", application.form.first_name);
    let (subject, paragraphs) = match application.status {
        ApplicationStatus::Approved => (
            "Votre candidature est acceptée",
            vec![
                greeting,
                "Votre candidature a été acceptée. Nous vous proposerons prochainement un planning de séances.".to_string(),
            ],
        ),
        ApplicationStatus::Rejected => (
            "Réponse à votre candidature",
            vec![
                greeting,
                "Nous ne pouvons malheureusement pas donner suite à votre candidature.".to_string(),
                format!(
                    "Motif : {}",
                    application.rejection_reason.as_deref().unwrap_or_default()
                ),
            ],
        ),
        ApplicationStatus::ScheduleProposed => {
            let mut paragraphs = vec![
                greeting,
                "Voici le planning proposé pour votre accompagnement :".to_string(),
            ];
            if let Some(schedule) = &application.proposed_schedule {
                paragraphs.extend(schedule.iter().map(|(_, s)| {
                    format!(
                        "{} le {} de {} à {}",
                        s.topic,
                        s.date.format("%d/%m/%Y"),
                        format_time(&s.start_time),
                        format_time(&s.end_time)
                    )
                }));
            }
            ("Votre planning de séances", paragraphs)
        }
        ApplicationStatus::PaymentSent => (
            "Votre lien de paiement",
            vec![
                greeting,
                "Votre planning est validé. Vous pouvez régler votre accompagnement ici :".to_string(),
                application.payment_link.clone().unwrap_or_default(),
            ],
        ),
        ApplicationStatus::Paid => (
            "Paiement reçu",
            vec![
                greeting,
                "Nous avons bien reçu votre paiement. À très bientôt pour votre première séance.".to_string(),
            ],
        ),
        ApplicationStatus::Pending | ApplicationStatus::ScheduleValidated => return None,
    };

    Some(render(&application.form.email, subject.to_string(), &paragraphs))
}
