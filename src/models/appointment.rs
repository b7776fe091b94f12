use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Longest single visit, one day.
pub const MAX_DURATION_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub care_provider_id: Option<String>,
    pub appointment_type: String,
    pub date: NaiveDateTime,
    pub duration_minutes: i32,
    pub location: AppointmentLocation,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// Exclusive end of the `[date, date + duration)` interval.
    pub fn end(&self) -> NaiveDateTime {
        self.date + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn overlaps(&self, start: &NaiveDateTime, end: &NaiveDateTime) -> bool {
        self.date < *end && self.end() > *start
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentLocation {
    #[default]
    Home,
    Center,
    Virtual,
}

impl AppointmentLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentLocation::Home => "home",
            AppointmentLocation::Center => "center",
            AppointmentLocation::Virtual => "virtual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home" => Some(AppointmentLocation::Home),
            "center" => Some(AppointmentLocation::Center),
            "virtual" => Some(AppointmentLocation::Virtual),
            _ => None,
        }
    }
}

/// Raw booking request as it arrives from a client. Dates are strings and the
/// duration is any JSON value so that an unparsable value surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub appointment_type: Option<String>,
    pub date: Option<String>,
    pub duration: Option<serde_json::Value>,
    pub care_provider_id: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    pub appointment_type: Option<String>,
    pub date: Option<String>,
    pub duration: Option<serde_json::Value>,
    pub care_provider_id: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}
