//! Database models split into separate files, re-exported so imports like
//! `use crate::db::models::*;` work across the crate.

pub mod appointment;
pub mod employee;
pub mod notification;
pub mod service;
pub mod time_slot;

pub use self::appointment::*;
pub use self::employee::*;
pub use self::notification::*;
pub use self::service::*;
pub use self::time_slot::*;
