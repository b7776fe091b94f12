pub mod appointment;
pub mod availability;
pub mod care_provider;
pub mod contact;
pub mod milestone;

pub use appointment::{
    Appointment, AppointmentLocation, AppointmentPatch, AppointmentStatus, BookingRequest,
    DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
};
pub use availability::{AvailabilityEntry, AvailabilityQuery};
pub use care_provider::{CareProvider, NewCareProvider};
pub use contact::{ContactSubmission, NewContactSubmission};
pub use milestone::{CareMilestone, MilestoneStatus};
