use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Free/busy state of one calendar day for a care provider. Derived on
/// request, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityEntry {
    pub date: NaiveDate,
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}
