pub mod allocation;
pub mod inventory;
pub mod order;
pub mod reference;
pub mod shift;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
