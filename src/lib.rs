//! Ad Blockers Detector Library
//!
//! Best effort detection of an active ad blocker on the host: a known ad
//! blocking app, ad servers sinkholed by DNS or the hosts file, or a local
//! filtering proxy that truncates ad resources.
//!
//! # Quick Start
//!
//! ```no_run
//! use adblock_detector::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let detector = AdBlockersDetector::new(DetectorConfig::networked());
//!
//!     let result = detector.detect().await;
//!     if result.found {
//!         println!("Ad blocker found by {}: {}", result.method, result.primary_detail);
//!     }
//! }
//! ```
//!
//! Networking is off by default: only the installed apps and the hosts file
//! are inspected unless [`DetectorConfig::allow_networking`] is set.

pub mod config;
pub mod connectivity;
pub mod detector;
pub mod dispatch;
pub mod inventory;
pub mod net;
pub mod probes;
pub mod proxy;
pub mod registry;
pub mod types;

pub use config::DetectorConfig;
pub use connectivity::ConnectivityChecker;
pub use detector::{AdBlockersDetector, DetectorBuilder};
pub use dispatch::{DeliveryQueue, DetectionCallback, Dispatcher, WorkerDispatcher};
pub use types::{DetectionMethod, DetectionResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AdBlockersDetector, ConnectivityChecker, DeliveryQueue, DetectionCallback,
        DetectionMethod, DetectionResult, DetectorConfig, WorkerDispatcher,
    };
}
