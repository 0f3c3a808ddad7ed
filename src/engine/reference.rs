//! Reference data the coordination core only looks up: drivers, vehicles,
//! delivery locations and products.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::gps::GeoPoint;
use crate::models::reference::{Driver, Location, Product, Vehicle};

pub struct ReferenceRegistry {
    clock: Arc<dyn Clock>,
    drivers: DashMap<Uuid, Driver>,
    vehicles: DashMap<Uuid, Vehicle>,
    locations: DashMap<Uuid, Location>,
    products: DashMap<Uuid, Product>,
    registrations: DashMap<String, Uuid>,
    product_names: DashMap<String, Uuid>,
}

impl ReferenceRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            drivers: DashMap::new(),
            vehicles: DashMap::new(),
            locations: DashMap::new(),
            products: DashMap::new(),
            registrations: DashMap::new(),
            product_names: DashMap::new(),
        }
    }

    pub fn create_driver(
        &self,
        name: &str,
        license_number: Option<String>,
    ) -> Result<Driver, AppError> {
        let name = required("name", name)?;
        let driver = Driver {
            id: Uuid::new_v4(),
            name,
            license_number,
            created_at: self.clock.now(),
        };
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    pub fn create_vehicle(
        &self,
        registration: &str,
        capacity: Option<i64>,
    ) -> Result<Vehicle, AppError> {
        let registration = required("registration", registration)?;
        if capacity.is_some_and(|capacity| capacity <= 0) {
            return Err(AppError::Validation("capacity must be > 0".to_string()));
        }

        let id = Uuid::new_v4();
        claim(&self.registrations, registration.to_uppercase(), id, || {
            format!("vehicle with registration {registration} already exists")
        })?;

        let vehicle = Vehicle {
            id,
            registration,
            capacity,
            created_at: self.clock.now(),
        };
        self.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    pub fn create_location(
        &self,
        name: &str,
        position: Option<GeoPoint>,
    ) -> Result<Location, AppError> {
        let name = required("name", name)?;
        let position = position
            .map(|point| crate::geo::validate_point(point.lat, point.lng))
            .transpose()?;

        let location = Location {
            id: Uuid::new_v4(),
            name,
            position,
            created_at: self.clock.now(),
        };
        self.locations.insert(location.id, location.clone());
        Ok(location)
    }

    pub fn create_product(&self, name: &str, unit: &str) -> Result<Product, AppError> {
        let name = required("name", name)?;
        let unit = required("unit", unit)?;

        let id = Uuid::new_v4();
        claim(&self.product_names, name.to_lowercase(), id, || {
            format!("product {name} already exists")
        })?;

        let product = Product {
            id,
            name,
            unit,
            created_at: self.clock.now(),
        };
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    pub fn driver(&self, id: Uuid) -> Result<Driver, AppError> {
        self.drivers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))
    }

    pub fn vehicle(&self, id: Uuid) -> Result<Vehicle, AppError> {
        self.vehicles
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("vehicle {id} not found")))
    }

    pub fn location(&self, id: Uuid) -> Result<Location, AppError> {
        self.locations
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("location {id} not found")))
    }

    pub fn product(&self, id: Uuid) -> Result<Product, AppError> {
        self.products
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
    }

    pub fn drivers(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        drivers
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        vehicles.sort_by(|a, b| a.registration.cmp(&b.registration));
        vehicles
    }

    pub fn locations(&self) -> Vec<Location> {
        let mut locations: Vec<Location> = self
            .locations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        locations
    }

    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn claim(
    index: &DashMap<String, Uuid>,
    key: String,
    id: Uuid,
    conflict: impl FnOnce() -> String,
) -> Result<(), AppError> {
    match index.entry(key) {
        Entry::Occupied(_) => Err(AppError::Conflict(conflict())),
        Entry::Vacant(slot) => {
            slot.insert(id);
            Ok(())
        }
    }
}
