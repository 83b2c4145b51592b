pub mod clock;
pub mod database;
pub mod member;
pub mod notification;
pub mod plan;
pub mod voucher;
