//! SQLite-based storage implementation

use std::sync::{Arc, Mutex};

use booking_core::program::ProposedSchedule;
use booking_core::slot::SlotDraft;
use booking_core::time_format::format_time;
use booking_core::{Application, ApplicationStatus, Booking, TimeSlot};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{
    AdminSession, ApplicationStore, BookingFilter, BookingStore, Notification, NotificationKind,
    NotificationStore, OutboxMessage, OutboxStatus, SessionId, SessionStore, StoreResult,
    TempBookingData,
};
use crate::crypto::{generate_csrf_token, generate_id};
use crate::error::ApiError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const BOOKING_COLUMNS: &str = "id, date, start_time, end_time, topic, customer_name, email, \
     message, payment_status, is_priority, payment_method, amount_cents, created_at, updated_at, \
     user_id, payment_session_id";

const APPLICATION_COLUMNS: &str = "id, first_name, last_name, email, phone, city, \
     political_party, target_office, motivation, experience, goals, payment_option, \
     payment_method, status, proposed_schedule, schedule_validated, payment_link, \
     rejection_reason, created_at, updated_at";

const OUTBOX_COLUMNS: &str = "id, recipient, subject, html_body, text_body, status, attempts, \
     last_error, created_at, updated_at";

/// SQLite-based store implementing every storage trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn internal(e: rusqlite::Error) -> ApiError {
    ApiError::Internal(e.to_string())
}

/// Map a unique index violation on bookings to a slot conflict
fn booking_write_error(e: rusqlite::Error) -> ApiError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            ApiError::SlotAlreadyBooked
        }
        _ => internal(e),
    }
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn optional_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let s: String = row.get(idx)?;
    booking_core::time_format::parse_time(&s).map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = booking_core::Error>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value: {0}")]
struct UnknownValue(String);

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<TimeSlot> {
    let day_of_week: Option<i64> = row.get(1)?;
    Ok(TimeSlot {
        id: row.get(0)?,
        day_of_week: day_of_week.map(|d| d as u8),
        start_time: time_column(row, 2)?,
        end_time: time_column(row, 3)?,
        is_available: row.get(4)?,
        is_recurring: row.get(5)?,
        specific_date: optional_date_column(row, 6)?,
    })
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        start_time: time_column(row, 2)?,
        end_time: time_column(row, 3)?,
        topic: row.get(4)?,
        customer_name: row.get(5)?,
        email: row.get(6)?,
        message: row.get(7)?,
        payment_status: parsed_column(row, 8)?,
        is_priority: row.get(9)?,
        payment_method: parsed_column(row, 10)?,
        amount_cents: row.get(11)?,
        created_at: timestamp_column(row, 12)?,
        updated_at: timestamp_column(row, 13)?,
        user_id: row.get(14)?,
        payment_session_id: row.get(15)?,
    })
}

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    let schedule: Option<String> = row.get(14)?;
    let proposed_schedule = schedule
        .map(|json| {
            serde_json::from_str::<ProposedSchedule>(&json).map_err(|e| conversion_error(14, e))
        })
        .transpose()?;

    Ok(Application {
        id: row.get(0)?,
        form: booking_core::application::ApplicationForm {
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            city: row.get(5)?,
            political_party: row.get(6)?,
            target_office: row.get(7)?,
            motivation: row.get(8)?,
            experience: row.get(9)?,
            goals: row.get(10)?,
            payment_option: parsed_column(row, 11)?,
            payment_method: row.get(12)?,
        },
        status: parsed_column(row, 13)?,
        proposed_schedule,
        schedule_validated: row.get(15)?,
        payment_link: row.get(16)?,
        rejection_reason: row.get(17)?,
        created_at: timestamp_column(row, 18)?,
        updated_at: timestamp_column(row, 19)?,
    })
}

fn outbox_from_row(row: &Row<'_>) -> rusqlite::Result<OutboxMessage> {
    let status: String = row.get(5)?;
    Ok(OutboxMessage {
        id: row.get(0)?,
        recipient: row.get(1)?,
        subject: row.get(2)?,
        html_body: row.get(3)?,
        text_body: row.get(4)?,
        status: OutboxStatus::from_str(&status)
            .ok_or_else(|| conversion_error(5, UnknownValue(status.clone())))?,
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn schedule_json(application: &Application) -> StoreResult<Option<String>> {
    application
        .proposed_schedule
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApiError::Internal(e.to_string()))
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(internal)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS time_slots (
                id TEXT PRIMARY KEY,
                day_of_week INTEGER,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_available INTEGER NOT NULL DEFAULT 1,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                specific_date TEXT
            );

            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                topic TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                email TEXT NOT NULL,
                message TEXT,
                payment_status TEXT NOT NULL,
                is_priority INTEGER NOT NULL DEFAULT 0,
                payment_method TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                user_id TEXT,
                payment_session_id TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(date);
            -- At most one slot-holding booking per start
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_slot
                ON bookings(date, start_time)
                WHERE payment_status IN ('pending', 'completed', 'confirmed');
            CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_payment_session
                ON bookings(payment_session_id)
                WHERE payment_session_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS temp_bookings_data (
                id TEXT PRIMARY KEY,
                payment_session_id TEXT NOT NULL UNIQUE,
                booking_data TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS political_launch_applications (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                city TEXT NOT NULL,
                political_party TEXT,
                target_office TEXT,
                motivation TEXT NOT NULL,
                experience TEXT,
                goals TEXT,
                payment_option TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                status TEXT NOT NULL,
                proposed_schedule TEXT,
                schedule_validated INTEGER NOT NULL DEFAULT 0,
                payment_link TEXT,
                rejection_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                booking_id TEXT,
                application_id TEXT,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS email_outbox (
                id TEXT PRIMARY KEY,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                html_body TEXT NOT NULL,
                text_body TEXT NOT NULL,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_outbox_status ON email_outbox(status);

            CREATE TABLE IF NOT EXISTS admin_sessions (
                id TEXT PRIMARY KEY,
                csrf_token TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(internal)?;

        Ok(())
    }
}

impl BookingStore for SqliteStore {
    fn list_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, day_of_week, start_time, end_time, is_available, is_recurring, specific_date
                 FROM time_slots ORDER BY specific_date, day_of_week, start_time",
            )
            .map_err(internal)?;

        let slots = stmt
            .query_map([], slot_from_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(slots)
    }

    fn get_slot(&self, id: &str) -> StoreResult<Option<TimeSlot>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, day_of_week, start_time, end_time, is_available, is_recurring, specific_date
             FROM time_slots WHERE id = ?1",
            params![id],
            slot_from_row,
        )
        .optional()
        .map_err(internal)
    }

    fn create_slot(&self, draft: SlotDraft) -> StoreResult<TimeSlot> {
        let slot = draft.into_slot(generate_id())?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO time_slots (id, day_of_week, start_time, end_time, is_available, is_recurring, specific_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                slot.id,
                slot.day_of_week.map(|d| d as i64),
                format_time(&slot.start_time),
                format_time(&slot.end_time),
                slot.is_available,
                slot.is_recurring,
                slot.specific_date.map(format_date),
            ],
        )
        .map_err(internal)?;

        Ok(slot)
    }

    fn update_slot(&self, slot: &TimeSlot) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE time_slots SET day_of_week = ?2, start_time = ?3, end_time = ?4,
                 is_available = ?5, is_recurring = ?6, specific_date = ?7 WHERE id = ?1",
                params![
                    slot.id,
                    slot.day_of_week.map(|d| d as i64),
                    format_time(&slot.start_time),
                    format_time(&slot.end_time),
                    slot.is_available,
                    slot.is_recurring,
                    slot.specific_date.map(format_date),
                ],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::SlotNotFound);
        }
        Ok(())
    }

    fn delete_slot(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute("DELETE FROM time_slots WHERE id = ?1", params![id])
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::SlotNotFound);
        }
        Ok(())
    }

    fn create_booking(&self, booking: &Booking) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO bookings ({BOOKING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            params![
                booking.id,
                format_date(booking.date),
                format_time(&booking.start_time),
                format_time(&booking.end_time),
                booking.topic,
                booking.customer_name,
                booking.email,
                booking.message,
                booking.payment_status.as_str(),
                booking.is_priority,
                booking.payment_method.as_str(),
                booking.amount_cents,
                booking.created_at.to_rfc3339(),
                booking.updated_at.to_rfc3339(),
                booking.user_id,
                booking.payment_session_id,
            ],
        )
        .map_err(booking_write_error)?;

        Ok(())
    }

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            booking_from_row,
        )
        .optional()
        .map_err(internal)
    }

    fn get_booking_by_payment_session(&self, session_id: &str) -> StoreResult<Option<Booking>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_session_id = ?1"),
            params![session_id],
            booking_from_row,
        )
        .optional()
        .map_err(internal)
    }

    fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let conn = self.conn.lock().unwrap();

        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("payment_status = ?{}", values.len()));
        }
        if let Some(from) = filter.from {
            values.push(format_date(from));
            clauses.push(format!("date >= ?{}", values.len()));
        }
        if let Some(to) = filter.to {
            values.push(format_date(to));
            clauses.push(format!("date <= ?{}", values.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings {where_clause} ORDER BY date, start_time"
            ))
            .map_err(internal)?;
        let args: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();

        let bookings = stmt
            .query_map(args.as_slice(), booking_from_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(bookings)
    }

    fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE bookings SET date = ?2, start_time = ?3, end_time = ?4, topic = ?5,
                 customer_name = ?6, email = ?7, message = ?8, payment_status = ?9,
                 is_priority = ?10, payment_method = ?11, amount_cents = ?12, updated_at = ?13,
                 user_id = ?14, payment_session_id = ?15
                 WHERE id = ?1",
                params![
                    booking.id,
                    format_date(booking.date),
                    format_time(&booking.start_time),
                    format_time(&booking.end_time),
                    booking.topic,
                    booking.customer_name,
                    booking.email,
                    booking.message,
                    booking.payment_status.as_str(),
                    booking.is_priority,
                    booking.payment_method.as_str(),
                    booking.amount_cents,
                    booking.updated_at.to_rfc3339(),
                    booking.user_id,
                    booking.payment_session_id,
                ],
            )
            .map_err(booking_write_error)?;

        if rows == 0 {
            return Err(ApiError::BookingNotFound);
        }
        Ok(())
    }

    fn create_temp_booking(&self, data: TempBookingData) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let payload =
            serde_json::to_string(&data.request).map_err(|e| ApiError::Internal(e.to_string()))?;

        conn.execute(
            "INSERT INTO temp_bookings_data (id, payment_session_id, booking_data, amount_cents, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                data.id,
                data.payment_session_id,
                payload,
                data.amount_cents,
                data.created_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(())
    }

    fn get_temp_booking(&self, payment_session_id: &str) -> StoreResult<Option<TempBookingData>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, payment_session_id, booking_data, amount_cents, created_at
             FROM temp_bookings_data WHERE payment_session_id = ?1",
            params![payment_session_id],
            |row| {
                let payload: String = row.get(2)?;
                Ok(TempBookingData {
                    id: row.get(0)?,
                    payment_session_id: row.get(1)?,
                    request: serde_json::from_str(&payload).map_err(|e| conversion_error(2, e))?,
                    amount_cents: row.get(3)?,
                    created_at: timestamp_column(row, 4)?,
                })
            },
        )
        .optional()
        .map_err(internal)
    }

    fn delete_temp_booking(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM temp_bookings_data WHERE id = ?1", params![id])
            .map_err(internal)?;

        Ok(())
    }
}

impl ApplicationStore for SqliteStore {
    fn create_application(&self, application: &Application) -> StoreResult<()> {
        let schedule = schedule_json(application)?;
        let conn = self.conn.lock().unwrap();
        let form = &application.form;

        conn.execute(
            &format!(
                "INSERT INTO political_launch_applications ({APPLICATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
            ),
            params![
                application.id,
                form.first_name,
                form.last_name,
                form.email,
                form.phone,
                form.city,
                form.political_party,
                form.target_office,
                form.motivation,
                form.experience,
                form.goals,
                form.payment_option.as_str(),
                form.payment_method,
                application.status.as_str(),
                schedule,
                application.schedule_validated,
                application.payment_link,
                application.rejection_reason,
                application.created_at.to_rfc3339(),
                application.updated_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(())
    }

    fn get_application(&self, id: &str) -> StoreResult<Option<Application>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!("SELECT {APPLICATION_COLUMNS} FROM political_launch_applications WHERE id = ?1"),
            params![id],
            application_from_row,
        )
        .optional()
        .map_err(internal)
    }

    fn list_applications(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<Application>> {
        let conn = self.conn.lock().unwrap();

        let applications = match status {
            Some(status) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {APPLICATION_COLUMNS} FROM political_launch_applications
                         WHERE status = ?1 ORDER BY created_at DESC"
                    ))
                    .map_err(internal)?;
                let rows = stmt
                    .query_map(params![status.as_str()], application_from_row)
                    .map_err(internal)?
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {APPLICATION_COLUMNS} FROM political_launch_applications
                         ORDER BY created_at DESC"
                    ))
                    .map_err(internal)?;
                let rows = stmt
                    .query_map([], application_from_row)
                    .map_err(internal)?
                    .collect::<Result<Vec<_>, _>>();
                rows
            }
        };

        applications.map_err(internal)
    }

    fn update_application(&self, application: &Application) -> StoreResult<()> {
        let schedule = schedule_json(application)?;
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE political_launch_applications SET status = ?2, proposed_schedule = ?3,
                 schedule_validated = ?4, payment_link = ?5, rejection_reason = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    application.id,
                    application.status.as_str(),
                    schedule,
                    application.schedule_validated,
                    application.payment_link,
                    application.rejection_reason,
                    application.updated_at.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::ApplicationNotFound);
        }
        Ok(())
    }
}

impl NotificationStore for SqliteStore {
    fn create_notification(&self, notification: Notification) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO notifications (id, kind, title, message, booking_id, application_id, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                notification.id,
                notification.kind.as_str(),
                notification.title,
                notification.message,
                notification.booking_id,
                notification.application_id,
                notification.is_read,
                notification.created_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(())
    }

    fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let filter = if unread_only { "WHERE is_read = 0" } else { "" };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, kind, title, message, booking_id, application_id, is_read, created_at
                 FROM notifications {filter} ORDER BY created_at DESC, rowid DESC"
            ))
            .map_err(internal)?;

        let notifications = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                Ok(Notification {
                    id: row.get(0)?,
                    kind: NotificationKind::from_str(&kind)
                        .ok_or_else(|| conversion_error(1, UnknownValue(kind.clone())))?,
                    title: row.get(2)?,
                    message: row.get(3)?,
                    booking_id: row.get(4)?,
                    application_id: row.get(5)?,
                    is_read: row.get(6)?,
                    created_at: timestamp_column(row, 7)?,
                })
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(notifications)
    }

    fn mark_notification_read(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                params![id],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::NotificationNotFound);
        }
        Ok(())
    }

    fn enqueue_email(&self, message: &OutboxMessage) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO email_outbox ({OUTBOX_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                message.id,
                message.recipient,
                message.subject,
                message.html_body,
                message.text_body,
                message.status.as_str(),
                message.attempts,
                message.last_error,
                message.created_at.to_rfc3339(),
                message.updated_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(())
    }

    fn update_outbox(&self, message: &OutboxMessage) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE email_outbox SET status = ?2, attempts = ?3, last_error = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    message.id,
                    message.status.as_str(),
                    message.attempts,
                    message.last_error,
                    message.updated_at.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::OutboxMessageNotFound);
        }
        Ok(())
    }

    fn list_outbox(&self, status: Option<OutboxStatus>) -> StoreResult<Vec<OutboxMessage>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {OUTBOX_COLUMNS} FROM email_outbox
                 WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at, rowid"
            ))
            .map_err(internal)?;

        let messages = stmt
            .query_map(params![status.map(|s| s.as_str())], outbox_from_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(messages)
    }

    fn due_outbox(&self, max_attempts: i64) -> StoreResult<Vec<OutboxMessage>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {OUTBOX_COLUMNS} FROM email_outbox
                 WHERE status = 'failed' AND attempts < ?1 ORDER BY created_at, rowid"
            ))
            .map_err(internal)?;

        let messages = stmt
            .query_map(params![max_attempts], outbox_from_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(messages)
    }

    fn claim_outbox(&self, id: &str, max_attempts: i64) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "UPDATE email_outbox SET status = 'pending', updated_at = ?3
                 WHERE id = ?1 AND status = 'failed' AND attempts < ?2",
                params![id, max_attempts, Utc::now().to_rfc3339()],
            )
            .map_err(internal)?;

        Ok(rows == 1)
    }
}

impl SessionStore for SqliteStore {
    fn create(&self, ttl: Duration) -> StoreResult<AdminSession> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let session = AdminSession {
            id: SessionId(generate_id()),
            csrf_token: generate_csrf_token(),
            created_at: now,
            expires_at: now + ttl,
        };

        conn.execute(
            "INSERT INTO admin_sessions (id, csrf_token, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                session.csrf_token,
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<AdminSession>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, csrf_token, created_at, expires_at FROM admin_sessions WHERE id = ?1",
            params![session_id.0],
            |row| {
                Ok(AdminSession {
                    id: SessionId(row.get(0)?),
                    csrf_token: row.get(1)?,
                    created_at: timestamp_column(row, 2)?,
                    expires_at: timestamp_column(row, 3)?,
                })
            },
        )
        .optional()
        .map_err(internal)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM admin_sessions WHERE id = ?1", params![session_id.0])
            .map_err(internal)?;

        Ok(())
    }

    fn cleanup_expired(&self) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        // rfc3339 strings with the same offset sort chronologically
        let rows = conn
            .execute(
                "DELETE FROM admin_sessions WHERE expires_at <= ?1",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(internal)?;

        Ok(rows as u64)
    }
}

// Implement traits for Arc<SqliteStore> so one database backs both the data and session stores
impl BookingStore for Arc<SqliteStore> {
    fn list_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        (**self).list_slots()
    }

    fn get_slot(&self, id: &str) -> StoreResult<Option<TimeSlot>> {
        (**self).get_slot(id)
    }

    fn create_slot(&self, draft: SlotDraft) -> StoreResult<TimeSlot> {
        (**self).create_slot(draft)
    }

    fn update_slot(&self, slot: &TimeSlot) -> StoreResult<()> {
        (**self).update_slot(slot)
    }

    fn delete_slot(&self, id: &str) -> StoreResult<()> {
        (**self).delete_slot(id)
    }

    fn create_booking(&self, booking: &Booking) -> StoreResult<()> {
        (**self).create_booking(booking)
    }

    fn get_booking(&self, id: &str) -> StoreResult<Option<Booking>> {
        (**self).get_booking(id)
    }

    fn get_booking_by_payment_session(&self, session_id: &str) -> StoreResult<Option<Booking>> {
        (**self).get_booking_by_payment_session(session_id)
    }

    fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        (**self).list_bookings(filter)
    }

    fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        (**self).update_booking(booking)
    }

    fn create_temp_booking(&self, data: TempBookingData) -> StoreResult<()> {
        (**self).create_temp_booking(data)
    }

    fn get_temp_booking(&self, payment_session_id: &str) -> StoreResult<Option<TempBookingData>> {
        (**self).get_temp_booking(payment_session_id)
    }

    fn delete_temp_booking(&self, id: &str) -> StoreResult<()> {
        (**self).delete_temp_booking(id)
    }
}

impl ApplicationStore for Arc<SqliteStore> {
    fn create_application(&self, application: &Application) -> StoreResult<()> {
        (**self).create_application(application)
    }

    fn get_application(&self, id: &str) -> StoreResult<Option<Application>> {
        (**self).get_application(id)
    }

    fn list_applications(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<Application>> {
        (**self).list_applications(status)
    }

    fn update_application(&self, application: &Application) -> StoreResult<()> {
        (**self).update_application(application)
    }
}

impl NotificationStore for Arc<SqliteStore> {
    fn create_notification(&self, notification: Notification) -> StoreResult<()> {
        (**self).create_notification(notification)
    }

    fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        (**self).list_notifications(unread_only)
    }

    fn mark_notification_read(&self, id: &str) -> StoreResult<()> {
        (**self).mark_notification_read(id)
    }

    fn enqueue_email(&self, message: &OutboxMessage) -> StoreResult<()> {
        (**self).enqueue_email(message)
    }

    fn update_outbox(&self, message: &OutboxMessage) -> StoreResult<()> {
        (**self).update_outbox(message)
    }

    fn list_outbox(&self, status: Option<OutboxStatus>) -> StoreResult<Vec<OutboxMessage>> {
        (**self).list_outbox(status)
    }

    fn due_outbox(&self, max_attempts: i64) -> StoreResult<Vec<OutboxMessage>> {
        (**self).due_outbox(max_attempts)
    }

    fn claim_outbox(&self, id: &str, max_attempts: i64) -> StoreResult<bool> {
        (**self).claim_outbox(id, max_attempts)
    }
}

impl SessionStore for Arc<SqliteStore> {
    fn create(&self, ttl: Duration) -> StoreResult<AdminSession> {
        (**self).create(ttl)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<AdminSession>> {
        (**self).get(session_id)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        (**self).delete(session_id)
    }

    fn cleanup_expired(&self) -> StoreResult<u64> {
        (**self).cleanup_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::program::{SessionCollection, SessionSchedule};
    use booking_core::{PaymentMethod, PaymentOption, PaymentStatus, ProgramShape};
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir)
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booking(id: &str, status: PaymentStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            start_time: time(14, 0),
            end_time: time(15, 0),
            topic: "Negotiation".to_string(),
            customer_name: "Louis".to_string(),
            email: "louis@example.com".to_string(),
            message: Some("Hello".to_string()),
            payment_status: status,
            is_priority: false,
            payment_method: PaymentMethod::Card,
            amount_cents: 9000,
            created_at: now,
            updated_at: now,
            user_id: None,
            payment_session_id: Some(format!("cs_{id}")),
        }
    }

    #[test]
    fn test_slot_crud() {
        let (store, _dir) = create_test_store();

        let slot = store
            .create_slot(SlotDraft::recurring(1, time(9, 0), time(12, 0)))
            .unwrap();
        let loaded = store.get_slot(&slot.id).unwrap().unwrap();
        assert_eq!(loaded, slot);

        let mut edited = loaded.clone();
        edited.is_available = false;
        store.update_slot(&edited).unwrap();
        assert!(!store.get_slot(&slot.id).unwrap().unwrap().is_available);

        store.delete_slot(&slot.id).unwrap();
        assert!(store.get_slot(&slot.id).unwrap().is_none());
        assert!(matches!(
            store.delete_slot(&slot.id),
            Err(ApiError::SlotNotFound)
        ));
    }

    #[test]
    fn test_booking_roundtrip_and_lookup_by_payment_session() {
        let (store, _dir) = create_test_store();
        let original = booking("b1", PaymentStatus::Completed);

        store.create_booking(&original).unwrap();

        assert_eq!(store.get_booking("b1").unwrap(), Some(original.clone()));
        assert_eq!(
            store.get_booking_by_payment_session("cs_b1").unwrap(),
            Some(original)
        );
    }

    #[test]
    fn test_unique_index_blocks_double_booking() {
        let (store, _dir) = create_test_store();
        store.create_booking(&booking("b1", PaymentStatus::Pending)).unwrap();

        let result = store.create_booking(&booking("b2", PaymentStatus::Pending));
        assert!(matches!(result, Err(ApiError::SlotAlreadyBooked)));
    }

    #[test]
    fn test_rejected_booking_releases_slot() {
        let (store, _dir) = create_test_store();
        let mut first = booking("b1", PaymentStatus::Pending);
        store.create_booking(&first).unwrap();

        first.payment_status = PaymentStatus::Rejected;
        store.update_booking(&first).unwrap();

        assert!(store.create_booking(&booking("b2", PaymentStatus::Pending)).is_ok());
    }

    #[test]
    fn test_list_bookings_filters() {
        let (store, _dir) = create_test_store();
        let mut other = booking("b2", PaymentStatus::Confirmed);
        other.date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        store.create_booking(&booking("b1", PaymentStatus::Pending)).unwrap();
        store.create_booking(&other).unwrap();

        let all = store.list_bookings(&BookingFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let confirmed = store
            .list_bookings(&BookingFilter {
                status: Some(PaymentStatus::Confirmed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "b2");

        let june = store
            .list_bookings(&BookingFilter {
                status: None,
                from: NaiveDate::from_ymd_opt(2024, 6, 1),
                to: NaiveDate::from_ymd_opt(2024, 6, 30),
            })
            .unwrap();
        assert_eq!(june.len(), 1);
        assert_eq!(june[0].id, "b1");
    }

    #[test]
    fn test_application_schedule_persists_as_whole() {
        let (store, _dir) = create_test_store();
        let form = booking_core::application::ApplicationForm {
            first_name: "Jeanne".to_string(),
            last_name: "Martin".to_string(),
            email: "jeanne@example.com".to_string(),
            phone: "0600000000".to_string(),
            city: "Lyon".to_string(),
            political_party: None,
            target_office: None,
            motivation: "Serve".to_string(),
            experience: None,
            goals: None,
            payment_option: PaymentOption::Installments,
            payment_method: "transfer".to_string(),
        };
        let now = Utc::now();
        let mut application = Application::submit("a1".to_string(), form, now).unwrap();
        store.create_application(&application).unwrap();

        let shape = ProgramShape::default();
        let schedule = shape
            .draft(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(), time(9, 0), time(11, 0))
            .unwrap();
        application.approve(now).unwrap();
        application.propose_schedule(schedule, &shape, now).unwrap();
        application
            .schedule_mut()
            .unwrap()
            .set_completed(SessionCollection::FollowUp, 1, true, Some("Done".to_string()))
            .unwrap();
        store.update_application(&application).unwrap();

        let loaded = store.get_application("a1").unwrap().unwrap();
        assert_eq!(loaded.status, ApplicationStatus::ScheduleProposed);
        let follow_up: &SessionSchedule =
            &loaded.proposed_schedule.as_ref().unwrap().follow_up_sessions[1];
        assert!(follow_up.completed);
        assert_eq!(follow_up.notes.as_deref(), Some("Done"));
        assert_eq!(loaded, application);
    }

    #[test]
    fn test_outbox_due_messages() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();
        let mut message = OutboxMessage {
            id: "m1".to_string(),
            recipient: "client@example.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            text_body: "Hello".to_string(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        store.enqueue_email(&message).unwrap();
        // In flight, not due
        assert!(store.due_outbox(3).unwrap().is_empty());

        message.status = OutboxStatus::Failed;
        message.attempts = 1;
        store.update_outbox(&message).unwrap();
        assert_eq!(store.due_outbox(3).unwrap().len(), 1);

        // Only one claim wins
        assert!(store.claim_outbox("m1", 3).unwrap());
        assert!(!store.claim_outbox("m1", 3).unwrap());
        assert!(store.due_outbox(3).unwrap().is_empty());

        message.attempts = 3;
        store.update_outbox(&message).unwrap();
        assert!(store.due_outbox(3).unwrap().is_empty());
        assert!(!store.claim_outbox("m1", 3).unwrap());
        assert_eq!(store.list_outbox(Some(OutboxStatus::Failed)).unwrap().len(), 1);
    }

    #[test]
    fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();

        let session = store.create(Duration::hours(1)).unwrap();
        let loaded = store.get(&session.id).unwrap().unwrap();
        assert_eq!(loaded.csrf_token, session.csrf_token);

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_expired_sessions() {
        let (store, _dir) = create_test_store();
        store.create(Duration::seconds(-5)).unwrap();
        let live = store.create(Duration::hours(1)).unwrap();

        assert_eq!(store.cleanup_expired().unwrap(), 1);
        assert!(store.get(&live.id).unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        {
            let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
            store
                .create_slot(SlotDraft::recurring(2, time(10, 0), time(11, 0)))
                .unwrap();
        }
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(store.list_slots().unwrap().len(), 1);
    }
}
