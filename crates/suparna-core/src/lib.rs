pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod scanner;
pub mod state;
pub mod storage;

pub use config::AppConfig;
pub use engine::{ScanEngine, ScanResult, ScanStatus};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use state::AbortHandle;
