pub mod appointments;
pub mod auth;
pub mod calendar;
pub mod employees;
pub mod health;
pub mod notifications;
pub mod services;
pub mod slots;
