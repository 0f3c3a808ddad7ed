//! Order state machine and its per-shift attempt history.
//!
//! ```text
//! pending --assign--> assigned --start--> in_progress --complete--> completed
//!                     assigned --assign--> assigned
//!           assigned | in_progress --fail--> failed
//! ```
//!
//! Start, complete and fail are only open to the assigned driver while that
//! driver has an active shift. Completion resolves the attempt, moves the
//! order and credits inventory inside one unit of work.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::inventory;
use crate::error::AppError;
use crate::models::event::FleetEvent;
use crate::models::order::{
    AttemptStatus, Order, OrderAttempt, OrderDetail, OrderFilter, OrderStatus,
};
use crate::models::shift::Shift;
use crate::state::AppState;
use crate::store::{StoreError, Tables};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub destination_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub driver_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// Creates an order, assigned straight away when a driver is supplied.
pub async fn create(state: &AppState, new: NewOrder) -> Result<Order, AppError> {
    state.reference.location(new.destination_id)?;
    state.reference.product(new.product_id)?;
    if new.quantity <= 0 {
        return Err(AppError::Validation(format!(
            "quantity must be > 0, got {}",
            new.quantity
        )));
    }
    match (new.driver_id, new.date) {
        (Some(driver_id), _) => {
            state.reference.driver(driver_id)?;
        }
        (None, Some(date)) => {
            return Err(AppError::Validation(format!(
                "date {date} requires a driver_id; dates are planned on assignment"
            )));
        }
        (None, None) => {}
    }

    let now = state.now();
    let (status, assigned_date) = match new.driver_id {
        Some(_) => (
            OrderStatus::Assigned,
            Some(new.date.unwrap_or_else(|| state.today())),
        ),
        None => (OrderStatus::Pending, None),
    };
    let order = Order {
        id: Uuid::new_v4(),
        destination_id: new.destination_id,
        product_id: new.product_id,
        quantity: new.quantity,
        status,
        assigned_driver_id: new.driver_id,
        assigned_date,
        created_at: now,
        updated_at: now,
    };

    let mut uow = state.store.begin().await;
    uow.put_order(order.clone())?;
    uow.commit();

    info!(order_id = %order.id, status = %order.status, "order created");
    record_transition(state, &order);
    Ok(order)
}

/// Assigns or reassigns an order that has not been started yet.
///
/// Without an explicit date a reassignment keeps the order's planned date and
/// a first assignment plans it for today.
pub async fn assign(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
    date: Option<NaiveDate>,
) -> Result<Order, AppError> {
    state.reference.driver(driver_id)?;

    let mut uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    ensure_status(&order, &[OrderStatus::Pending, OrderStatus::Assigned], "assign")?;

    let assigned = Order {
        status: OrderStatus::Assigned,
        assigned_driver_id: Some(driver_id),
        assigned_date: Some(date.or(order.assigned_date).unwrap_or_else(|| state.today())),
        updated_at: state.now(),
        ..order
    };
    uow.put_order(assigned.clone())?;
    uow.commit();

    info!(
        order_id = %order_id,
        driver_id = %driver_id,
        previous_driver = ?order.assigned_driver_id,
        "order assigned"
    );
    record_transition(state, &assigned);
    Ok(assigned)
}

/// Moves an assigned order into progress and opens an attempt under the
/// driver's active shift.
pub async fn start(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
) -> Result<OrderDetail, AppError> {
    let now = state.now();
    let mut uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    ensure_status(&order, &[OrderStatus::Assigned], "start")?;
    let shift = authorize(&uow, &order, driver_id)?;

    let attempt = OrderAttempt {
        id: Uuid::new_v4(),
        order_id,
        shift_id: shift.id,
        driver_id,
        status: AttemptStatus::InProgress,
        failure_reason: None,
        started_at: now,
        completed_at: None,
    };
    uow.put_attempt(attempt).map_err(|err| attempt_error(err, order_id, &shift))?;

    let started = Order {
        status: OrderStatus::InProgress,
        updated_at: now,
        ..order
    };
    uow.put_order(started.clone())?;
    let attempts = uow.attempts_for_order(order_id);
    uow.commit();

    info!(order_id = %order_id, shift_id = %shift.id, "order started");
    record_transition(state, &started);
    Ok(OrderDetail {
        order: started,
        attempts,
    })
}

/// Completes an in-progress order and credits its quantity to the
/// destination's inventory. Either every effect lands or none does.
pub async fn complete(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
) -> Result<OrderDetail, AppError> {
    let now = state.now();
    let mut uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    ensure_status(&order, &[OrderStatus::InProgress], "complete")?;
    let shift = authorize(&uow, &order, driver_id)?;

    let attempt = uow
        .attempt_for(order_id, shift.id)
        .filter(|attempt| attempt.status == AttemptStatus::InProgress)
        .cloned()
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "order {order_id} has no attempt in progress under shift {}",
                shift.id
            ))
        })?;
    uow.put_attempt(resolve(attempt, AttemptStatus::Completed, None, now))?;

    let completed = Order {
        status: OrderStatus::Completed,
        updated_at: now,
        ..order
    };
    uow.put_order(completed.clone())?;

    let stock = inventory::credit_on_completion(
        &mut uow,
        completed.destination_id,
        completed.product_id,
        completed.quantity,
        now,
    )?;
    let attempts = uow.attempts_for_order(order_id);
    uow.commit();

    state
        .metrics
        .inventory_credited_total
        .inc_by(completed.quantity.unsigned_abs());
    info!(
        order_id = %order_id,
        shift_id = %shift.id,
        inventory_id = %stock.id,
        credited = completed.quantity,
        stock = stock.quantity,
        "order completed"
    );
    record_transition(state, &completed);
    Ok(OrderDetail {
        order: completed,
        attempts,
    })
}

/// Fails an assigned or in-progress order. The reason is kept on the attempt
/// for the current shift; inventory is left untouched.
pub async fn fail(
    state: &AppState,
    order_id: Uuid,
    driver_id: Uuid,
    reason: &str,
) -> Result<OrderDetail, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "a failure reason is required".to_string(),
        ));
    }

    let now = state.now();
    let mut uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    ensure_status(&order, &[OrderStatus::Assigned, OrderStatus::InProgress], "fail")?;
    let shift = authorize(&uow, &order, driver_id)?;

    let attempt = match uow.attempt_for(order_id, shift.id).cloned() {
        Some(open) if open.status == AttemptStatus::InProgress => open,
        Some(resolved) => {
            return Err(AppError::Conflict(format!(
                "attempt {} for order {order_id} is already resolved",
                resolved.id
            )));
        }
        None => OrderAttempt {
            id: Uuid::new_v4(),
            order_id,
            shift_id: shift.id,
            driver_id,
            status: AttemptStatus::InProgress,
            failure_reason: None,
            started_at: now,
            completed_at: None,
        },
    };
    uow.put_attempt(resolve(
        attempt,
        AttemptStatus::Failed,
        Some(reason.to_string()),
        now,
    ))
    .map_err(|err| attempt_error(err, order_id, &shift))?;

    let failed = Order {
        status: OrderStatus::Failed,
        updated_at: now,
        ..order
    };
    uow.put_order(failed.clone())?;
    let attempts = uow.attempts_for_order(order_id);
    uow.commit();

    info!(order_id = %order_id, shift_id = %shift.id, reason, "order failed");
    record_transition(state, &failed);
    Ok(OrderDetail {
        order: failed,
        attempts,
    })
}

/// Deletes an order that has never left `pending`.
pub async fn delete(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let mut uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    ensure_status(&order, &[OrderStatus::Pending], "delete")?;
    let deleted = uow.delete_order(order_id)?;
    uow.commit();

    info!(order_id = %order_id, "order deleted");
    Ok(deleted)
}

pub async fn get(state: &AppState, order_id: Uuid) -> Result<OrderDetail, AppError> {
    let uow = state.store.begin().await;
    let order = find(&uow, order_id)?;
    let attempts = uow.attempts_for_order(order_id);
    Ok(OrderDetail { order, attempts })
}

pub async fn list(state: &AppState, filter: &OrderFilter) -> Vec<Order> {
    state.store.begin().await.orders(filter)
}

fn find(tables: &Tables, order_id: Uuid) -> Result<Order, AppError> {
    tables
        .order(order_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

fn ensure_status(order: &Order, allowed: &[OrderStatus], action: &str) -> Result<(), AppError> {
    if allowed.contains(&order.status) {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "cannot {action} order {}: current status is {}",
        order.id, order.status
    )))
}

/// The caller must be the order's driver and must be on an active shift.
fn authorize(tables: &Tables, order: &Order, driver_id: Uuid) -> Result<Shift, AppError> {
    if order.assigned_driver_id != Some(driver_id) {
        debug!(order_id = %order.id, driver_id = %driver_id, "caller is not the assigned driver");
        return Err(AppError::BadRequest(format!(
            "driver {driver_id} is not assigned to order {}",
            order.id
        )));
    }
    tables
        .active_shift_for_driver(driver_id)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("driver {driver_id} has no active shift")))
}

fn resolve(
    attempt: OrderAttempt,
    status: AttemptStatus,
    failure_reason: Option<String>,
    at: DateTime<Utc>,
) -> OrderAttempt {
    OrderAttempt {
        status,
        failure_reason,
        completed_at: Some(at),
        ..attempt
    }
}

fn attempt_error(err: StoreError, order_id: Uuid, shift: &Shift) -> AppError {
    match err {
        StoreError::UniqueViolation("uq_order_attempts_order_shift") => AppError::Conflict(format!(
            "order {order_id} already has an attempt under shift {}",
            shift.id
        )),
        other => other.into(),
    }
}

fn record_transition(state: &AppState, order: &Order) {
    let status = order.status.to_string();
    state
        .metrics
        .order_transitions_total
        .with_label_values(&[status.as_str()])
        .inc();
    state.publish(FleetEvent::OrderChanged {
        order_id: order.id,
        driver_id: order.assigned_driver_id,
        status: order.status,
    });
}
