pub mod catalog;
pub mod clock;
pub mod database;
pub mod notification;
