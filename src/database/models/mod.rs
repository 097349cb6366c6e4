pub mod appointment;
pub mod client;
pub mod membership;
pub mod shop;
pub mod worker;

pub use appointment::Appointment;
pub use client::Client;
pub use membership::Membership;
pub use shop::Shop;
pub use worker::Worker;
