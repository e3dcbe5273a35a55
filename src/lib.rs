pub mod args;
pub mod charge_limit;
pub mod client;
pub mod controller;
pub mod driver;
pub mod error;
#[cfg(target_os = "macos")]
pub mod iokit;
pub mod key;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod param;
pub mod service;

pub use charge_limit::ChargeLimit;
pub use controller::ChargeLimitController;
pub use error::{Error, Result};

pub const CHARGE_LIMIT_KEY: &[u8; 4] = b"CHWA";
pub const SERVICE_LABEL: &str = "com.github.charge_limiter";
const SERVICE_FILE: &str = "/Library/LaunchDaemons/com.github.charge_limiter.plist";
const LAUNCHCTL: &str = "/bin/launchctl";
