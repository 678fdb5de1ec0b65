pub mod availability;
pub mod booking;
pub mod id;
pub mod opening_hours;
pub mod role;
pub mod room;
pub mod site;
pub mod slot;
pub mod user;
