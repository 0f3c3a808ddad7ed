use crate::error::AppError;
use crate::models::gps::GeoPoint;

const MAX_LATITUDE: f64 = 90.0;
const MAX_LONGITUDE: f64 = 180.0;

/// Checks that a coordinate pair lies on the globe.
pub fn validate_point(lat: f64, lng: f64) -> Result<GeoPoint, AppError> {
    if !lat.is_finite() || lat.abs() > MAX_LATITUDE {
        return Err(AppError::Validation(format!(
            "latitude {lat} must be within [-{MAX_LATITUDE}, {MAX_LATITUDE}]"
        )));
    }
    if !lng.is_finite() || lng.abs() > MAX_LONGITUDE {
        return Err(AppError::Validation(format!(
            "longitude {lng} must be within [-{MAX_LONGITUDE}, {MAX_LONGITUDE}]"
        )));
    }
    Ok(GeoPoint { lat, lng })
}
