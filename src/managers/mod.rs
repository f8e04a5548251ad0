pub mod backup;
pub mod crash;
pub mod logging;
pub mod notification;
