//! Health verdict engine for Kubernetes and cloud resources
//!
//! This crate provides:
//! - Built-in health checks for well-known Kubernetes kinds
//! - A declarative condition evaluator for everything else
//! - Classifiers for AWS, Azure, GCP and MongoDB resources
//! - Prometheus metrics and structured logging for evaluations
//!
//! ```no_run
//! use health_lib::{HealthEvaluator, Resource, Settings};
//!
//! let evaluator = HealthEvaluator::new(Settings::load()?)?;
//! let pod = Resource::from_yaml("apiVersion: v1\nkind: Pod\nmetadata: {name: web}\n")?;
//! let assessment = evaluator.evaluate(&pod, None);
//! println!("{}", assessment.health);
//! # Ok::<(), health_lib::HealthError>(())
//! ```

pub mod clock;
pub mod cloud;
pub mod conditions;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod kinds;
pub mod models;
pub mod observability;
pub mod resource;
pub mod status_map;
pub mod status_name;
pub mod util;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Settings;
pub use error::{HealthError, Result};
pub use evaluator::{Assessment, HealthEvaluator, HealthOverride};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use resource::Resource;
pub use status_map::StatusMaps;
pub use status_name::health_from_status_name;
