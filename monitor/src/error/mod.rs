mod monitor_error;

pub use monitor_error::MonitorError;

pub type Result<T> = std::result::Result<T, MonitorError>;
