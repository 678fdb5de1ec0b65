pub mod availability;
pub mod booking;
pub mod health;
pub mod room;
