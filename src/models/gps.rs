use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A location ping admitted under an active shift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsLocation {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub shift_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
