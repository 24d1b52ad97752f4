pub mod battery;
pub mod jump;
pub mod session;
pub mod task;
