//! crdb-catalog - service and plan catalog for a CockroachDB service broker
//!
//! Turns declarative configuration into a validated, read-only catalog of
//! services and plans. Each plan gets a lazily-connecting pool for its
//! database target and, depending on its SSL mode, temporary files holding its
//! TLS material. The files live as long as the catalog and are removed at
//! shutdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crdb_catalog::{lifecycle, CatalogConfig, CatalogSources};
//!
//! let sources = CatalogSources::default()
//!     .with_services(r#"[{"id":"crdb","name":"cockroachdb"}]"#)
//!     .with_custom_plans(
//!         r#"{"p1":{"name":"free","service":"crdb","host":"localhost","port":26257,"ssl_mode":"disable"}}"#,
//!     );
//!
//! let catalog = lifecycle::initialize(&sources, CatalogConfig::default()).unwrap();
//! let service = catalog.find_service("crdb").unwrap();
//! assert_eq!(service.plans().len(), 1);
//! lifecycle::shutdown(catalog);
//! ```

// Core error handling
pub mod error;

// Configuration blobs and settings
pub mod config;

// Data model, decoder, credentials, connections and registry
pub mod catalog;

// Startup and shutdown
pub mod lifecycle;

pub use catalog::{
    derive_plan_id, Catalog, CatalogBuilder, Plan, PlanSpec, Service, ServiceSpec, SslMode,
};
pub use config::{CatalogConfig, CatalogSource, CatalogSources};
pub use error::{CatalogError, DecodeError, LookupError, ValidationError};
