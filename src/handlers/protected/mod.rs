pub mod appointments;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod shop;
pub mod workers;
