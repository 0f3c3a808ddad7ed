use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::validate_point;
use crate::models::event::FleetEvent;
use crate::models::gps::GpsLocation;
use crate::state::AppState;

/// Stores a location ping if the vehicle is bound to an active shift.
pub async fn admit(
    state: &AppState,
    vehicle_id: Uuid,
    latitude: f64,
    longitude: f64,
    recorded_at: Option<DateTime<Utc>>,
) -> Result<GpsLocation, AppError> {
    state.reference.vehicle(vehicle_id)?;
    let point = validate_point(latitude, longitude)?;

    let mut uow = state.store.begin().await;
    let Some(shift_id) = uow.active_shift_for_vehicle(vehicle_id).map(|shift| shift.id) else {
        state
            .metrics
            .gps_pings_total
            .with_label_values(&["rejected"])
            .inc();
        debug!(vehicle_id = %vehicle_id, "gps ping rejected: no active shift");
        return Err(AppError::BadRequest(format!(
            "vehicle {vehicle_id} has no active shift"
        )));
    };

    let now = state.now();
    let ping = GpsLocation {
        id: Uuid::new_v4(),
        vehicle_id,
        shift_id: Some(shift_id),
        latitude: point.lat,
        longitude: point.lng,
        recorded_at: recorded_at.unwrap_or(now),
        created_at: now,
    };
    uow.append_gps(ping.clone())?;
    uow.commit();

    state
        .metrics
        .gps_pings_total
        .with_label_values(&["admitted"])
        .inc();
    info!(vehicle_id = %vehicle_id, shift_id = %shift_id, "gps ping admitted");
    state.publish(FleetEvent::GpsAdmitted(ping.clone()));
    Ok(ping)
}

pub async fn history(
    state: &AppState,
    vehicle_id: Uuid,
    shift_id: Option<Uuid>,
) -> Result<Vec<GpsLocation>, AppError> {
    state.reference.vehicle(vehicle_id)?;
    Ok(state.store.begin().await.gps_for_vehicle(vehicle_id, shift_id))
}

pub async fn latest(state: &AppState, vehicle_id: Uuid) -> Result<GpsLocation, AppError> {
    history(state, vehicle_id, None)
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("no location recorded for vehicle {vehicle_id}")))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::{admit, history, latest};
    use crate::engine::shift;
    use crate::engine::testing::Fixture;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn ping_without_active_shift_is_rejected() {
        let fx = Fixture::new();
        fx.allocate_today().await;

        let err = admit(&fx.state, fx.vehicle, 53.55, 9.99, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(history(&fx.state, fx.vehicle, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ping_is_stamped_with_the_active_shift() {
        let fx = Fixture::new();
        fx.allocate_today().await;
        let shift = shift::start(&fx.state, fx.driver).await.unwrap();

        let ping = admit(&fx.state, fx.vehicle, 53.55, 9.99, None)
            .await
            .unwrap();
        assert_eq!(ping.shift_id, Some(shift.id));
        assert_eq!(ping.recorded_at, fx.state.now());
    }

    #[tokio::test]
    async fn pings_stop_being_admitted_after_shift_end() {
        let fx = Fixture::new();
        fx.allocate_today().await;
        let shift = shift::start(&fx.state, fx.driver).await.unwrap();
        admit(&fx.state, fx.vehicle, 53.55, 9.99, None)
            .await
            .unwrap();
        shift::end(&fx.state, shift.id, fx.driver).await.unwrap();

        let err = admit(&fx.state, fx.vehicle, 53.56, 9.98, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn unknown_vehicle_and_bad_coordinates_are_rejected() {
        let fx = Fixture::new();
        let err = admit(&fx.state, fx.driver, 53.55, 9.99, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = admit(&fx.state, fx.vehicle, 120.0, 9.99, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn latest_follows_recorded_time() {
        let fx = Fixture::new();
        fx.allocate_today().await;
        shift::start(&fx.state, fx.driver).await.unwrap();
        let now = fx.state.now();

        admit(&fx.state, fx.vehicle, 53.0, 9.0, Some(now))
            .await
            .unwrap();
        admit(&fx.state, fx.vehicle, 52.0, 8.0, Some(now - Duration::minutes(5)))
            .await
            .unwrap();

        let newest = latest(&fx.state, fx.vehicle).await.unwrap();
        assert_eq!(newest.latitude, 53.0);
    }
}
