pub mod assignments;
pub mod backup_exchange;
pub mod core;
pub mod groups;
pub mod laptops;
pub mod rooms;
pub mod session;
pub mod students;
