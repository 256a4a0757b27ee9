//! The minic commander.
//!
//! Ties the mission catalog, the connection supervisor and the playback
//! scheduler together behind a single event loop. External parsers feed
//! parsed server events in through [`EventPipes`]; operators drive it through
//! a [`CommanderHandle`].
//!
//! # Example
//! ```no_run
//! # async fn example(
//! #     telemetry: std::sync::Arc<dyn minic_supervisor::TelemetryClient>,
//! #     connector: std::sync::Arc<dyn minic_supervisor::ConsoleConnector>,
//! # ) -> anyhow::Result<()> {
//! use minic_catalog::CatalogStore;
//! use minic_commander::Commander;
//! use minic_core::AppConfig;
//! use minic_supervisor::ConnectionSupervisor;
//!
//! let config = AppConfig::from_file("minic.toml")?.with_env_overrides();
//! let supervisor = ConnectionSupervisor::new(telemetry, connector, Some(config.server_settings()?));
//! let (commander, handle, _pipes) = Commander::new(CatalogStore::new(&config.catalog.path), supervisor);
//! commander.spawn();
//!
//! handle.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod commander;
pub mod error;
pub mod objects;
pub mod pilots;
pub mod router;

pub use commander::{CatalogSnapshot, Commander, CommanderHandle, CommanderStatus, EventPipes};
pub use error::{CommanderError, CommanderResult};
pub use objects::{ObjectTracker, TrackedObject};
pub use pilots::{Pilot, PilotTracker};
pub use router::{CommandRouter, FAREWELL, GREETING};
