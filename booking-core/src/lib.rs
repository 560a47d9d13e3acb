//! Booking Core Library
//!
//! Scheduling rules for a consulting practice:
//! - Published time slots resolve into bookable windows for a given day
//! - Priority bookings bypass published slots but need 48 hours of lead time
//! - Approved coaching applications carry a fixed-shape session program
//! - Calendar helpers project dates onto month and week grids

pub mod application;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod error;
pub mod priority;
pub mod program;
pub mod slot;
pub mod time_format;

pub use application::{Application, ApplicationStatus, PaymentOption};
pub use availability::{OccupancyPolicy, TimeWindow};
pub use booking::{Booking, PaymentMethod, PaymentStatus};
pub use calendar::{GanttBar, MonthCell, WeekGrid};
pub use error::Error;
pub use priority::PriorityRule;
pub use program::{
    ProgramProgress, ProgramShape, ProposedSchedule, SessionCollection, SessionSchedule,
    SessionStatus,
};
pub use slot::TimeSlot;

/// Result type for booking-core operations
pub type Result<T> = std::result::Result<T, Error>;
