pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod parser;
pub mod platform;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod scanner;

pub use config::Config;
pub use error::ScanError;
pub use model::{GameCandidate, Platform, ScanResult, SourceKind, StrategyReport};
pub use resolver::ExecutableResolver;
pub use scan::run_scan;
pub use scanner::{ScanContext, Scanner};
