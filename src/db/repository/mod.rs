pub mod appointment;
pub mod employee;
pub mod notification;
pub mod service;
pub mod time_slot;

#[cfg(test)]
pub mod test_support;

pub use appointment::{AppointmentRepository, AppointmentWithContext};
pub use employee::EmployeeRepository;
pub use notification::NotificationRepository;
pub use service::ServiceRepository;
pub use time_slot::TimeSlotRepository;
