use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::FleetEvent;
use crate::models::order::OrderFilter;
use crate::models::shift::{Shift, ShiftDetail, ShiftStatus};
use crate::state::AppState;
use crate::store::{StoreError, Tables};

/// Pre-declares a shift for `driver_id` on `date`.
pub async fn schedule(
    state: &AppState,
    driver_id: Uuid,
    date: NaiveDate,
) -> Result<Shift, AppError> {
    state.reference.driver(driver_id)?;
    let today = state.today();
    if date < today {
        return Err(AppError::Validation(format!(
            "shift date {date} is in the past (today is {today})"
        )));
    }

    let shift = Shift {
        id: Uuid::new_v4(),
        driver_id,
        allocation_id: None,
        date,
        status: ShiftStatus::Scheduled,
        start_time: None,
        end_time: None,
        created_at: state.now(),
    };

    let mut uow = state.store.begin().await;
    uow.put_shift(shift.clone())
        .map_err(|err| constraint_error(err, &shift))?;
    uow.commit();

    info!(shift_id = %shift.id, driver_id = %driver_id, %date, "shift scheduled");
    publish(state, &shift);
    Ok(shift)
}

/// Starts the driver's shift for the operative date.
///
/// A shift scheduled for today is activated in place; otherwise an ad hoc
/// shift is created directly in the active state. Either way the driver's
/// allocation for today is bound to it.
pub async fn start(state: &AppState, driver_id: Uuid) -> Result<Shift, AppError> {
    state.reference.driver(driver_id)?;
    let today = state.today();
    let now = state.now();

    let mut uow = state.store.begin().await;
    if let Some(active) = uow.active_shift_for_driver(driver_id) {
        return Err(AppError::Conflict(format!(
            "driver {driver_id} already has active shift {}",
            active.id
        )));
    }

    let (allocation_id, vehicle_id) = uow
        .allocation_for_driver(driver_id, today)
        .map(|allocation| (allocation.id, allocation.vehicle_id))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "driver {driver_id} has no vehicle allocated for {today}"
            ))
        })?;
    if let Some(holder) = uow.active_shift_for_vehicle(vehicle_id) {
        warn!(
            vehicle_id = %vehicle_id,
            shift_id = %holder.id,
            "shift start blocked: vehicle still on an active shift"
        );
        return Err(AppError::Conflict(format!(
            "vehicle {vehicle_id} is still in use by active shift {} of driver {}",
            holder.id, holder.driver_id
        )));
    }

    let shift = match uow.shift_for_driver_on(driver_id, today).cloned() {
        Some(scheduled) if scheduled.status == ShiftStatus::Scheduled => Shift {
            allocation_id: Some(allocation_id),
            status: ShiftStatus::Active,
            start_time: Some(now),
            ..scheduled
        },
        Some(existing) => {
            return Err(AppError::Conflict(format!(
                "driver {driver_id} already has a {} shift {} on {today}",
                existing.status, existing.id
            )));
        }
        None => Shift {
            id: Uuid::new_v4(),
            driver_id,
            allocation_id: Some(allocation_id),
            date: today,
            status: ShiftStatus::Active,
            start_time: Some(now),
            end_time: None,
            created_at: now,
        },
    };

    uow.put_shift(shift.clone())
        .map_err(|err| constraint_error(err, &shift))?;
    uow.commit();

    state.metrics.active_shifts.inc();
    info!(
        shift_id = %shift.id,
        driver_id = %driver_id,
        allocation_id = %allocation_id,
        "shift started"
    );
    publish(state, &shift);
    Ok(shift)
}

/// Ends an active shift once none of the driver's orders for the shift date
/// are still assigned or in progress and no attempt under the shift is still
/// open. Open orders are never resolved here.
pub async fn end(
    state: &AppState,
    shift_id: Uuid,
    driver_id: Uuid,
) -> Result<ShiftDetail, AppError> {
    let mut uow = state.store.begin().await;
    let shift = find(&uow, shift_id)?;

    if shift.driver_id != driver_id {
        return Err(AppError::BadRequest(format!(
            "shift {shift_id} does not belong to driver {driver_id}"
        )));
    }
    if shift.status != ShiftStatus::Active {
        return Err(AppError::BadRequest(format!(
            "shift {shift_id} is {}; only active shifts can be ended",
            shift.status
        )));
    }

    let open_orders = uow.open_orders_for(&shift);
    if !open_orders.is_empty() {
        let order_ids: Vec<Uuid> = open_orders.iter().map(|order| order.id).collect();
        warn!(
            shift_id = %shift_id,
            open_orders = order_ids.len(),
            "shift end blocked by open orders"
        );
        return Err(AppError::OpenOrders {
            shift_id,
            order_ids,
        });
    }

    let ended = Shift {
        status: ShiftStatus::Completed,
        end_time: Some(state.now()),
        ..shift
    };
    uow.put_shift(ended.clone())
        .map_err(|err| constraint_error(err, &ended))?;
    let orders = uow.orders(&orders_of(&ended));
    uow.commit();

    state.metrics.active_shifts.dec();
    info!(shift_id = %shift_id, driver_id = %driver_id, orders = orders.len(), "shift ended");
    publish(state, &ended);

    Ok(ShiftDetail {
        shift: ended,
        orders,
    })
}

pub async fn active_shift_for(
    state: &AppState,
    driver_id: Uuid,
) -> Result<Option<Shift>, AppError> {
    state.reference.driver(driver_id)?;
    let uow = state.store.begin().await;
    Ok(uow.active_shift_for_driver(driver_id).cloned())
}

pub async fn get(state: &AppState, shift_id: Uuid) -> Result<ShiftDetail, AppError> {
    let uow = state.store.begin().await;
    let shift = find(&uow, shift_id)?;
    let orders = uow.orders(&orders_of(&shift));
    Ok(ShiftDetail { shift, orders })
}

pub async fn list_for_driver(state: &AppState, driver_id: Uuid) -> Result<Vec<Shift>, AppError> {
    state.reference.driver(driver_id)?;
    Ok(state.store.begin().await.shifts_for_driver(driver_id))
}

fn find(tables: &Tables, shift_id: Uuid) -> Result<Shift, AppError> {
    tables
        .shift(shift_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("shift {shift_id} not found")))
}

fn orders_of(shift: &Shift) -> OrderFilter {
    OrderFilter {
        status: None,
        driver_id: Some(shift.driver_id),
        date: Some(shift.date),
    }
}

fn publish(state: &AppState, shift: &Shift) {
    state.publish(FleetEvent::ShiftChanged {
        shift_id: shift.id,
        driver_id: shift.driver_id,
        status: shift.status,
    });
}

fn constraint_error(err: StoreError, shift: &Shift) -> AppError {
    match err {
        StoreError::UniqueViolation("uq_shifts_driver_date") => AppError::Conflict(format!(
            "driver {} already has a shift on {}",
            shift.driver_id, shift.date
        )),
        StoreError::UniqueViolation("uq_shifts_active_driver") => AppError::Conflict(format!(
            "driver {} already has an active shift",
            shift.driver_id
        )),
        StoreError::CheckViolation("ck_shifts_active_allocation") => AppError::BadRequest(format!(
            "driver {} has no vehicle allocated for {}",
            shift.driver_id, shift.date
        )),
        other => other.into(),
    }
}
