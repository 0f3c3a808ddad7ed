pub mod allocation;
pub mod event;
pub mod gps;
pub mod inventory;
pub mod order;
pub mod reference;
pub mod shift;
