//! Catalog lifecycle
//!
//! Startup: decode services, register them, decode preconfigured and custom
//! plans, register them (preconfigured first), seal. Shutdown: remove every
//! credential file the catalog wrote.

use tracing::info;

use crate::catalog::decoder::{decode_custom_plans, decode_preconfigured_plans, decode_services};
use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::{CatalogConfig, CatalogSources};
use crate::error::{Result, ValidationError};

/// Build and seal the catalog described by `sources`.
///
/// Stops at the first error. Credential files written before the error are
/// removed when the partially built registry is dropped.
pub fn initialize(sources: &CatalogSources, config: CatalogConfig) -> Result<Catalog> {
    let services = decode_services(sources.services.as_deref())?;
    if services.is_empty() {
        return Err(ValidationError::NoServices.into());
    }

    let mut builder = CatalogBuilder::new(config);
    for service in services {
        builder.register_service(service)?;
    }

    let mut plans = decode_preconfigured_plans(sources.preconfigured_plans.as_deref())?;
    let preconfigured = plans.len();
    plans.extend(decode_custom_plans(sources.custom_plans.as_deref())?);
    if plans.is_empty() {
        return Err(ValidationError::NoPlans.into());
    }
    info!(
        "Registering {} preconfigured and {} custom plan(s)",
        preconfigured,
        plans.len() - preconfigured
    );

    for plan in plans {
        builder.register_plan(plan)?;
    }

    let catalog = builder.seal();
    info!(
        "Catalog ready: {} service(s), {} plan(s), {} credential file(s)",
        catalog.services().len(),
        catalog.plans().count(),
        catalog.tracked_files().len()
    );
    Ok(catalog)
}

/// [`initialize`] with sources and settings taken from the environment
pub fn initialize_from_env() -> Result<Catalog> {
    initialize(&CatalogSources::from_env(), CatalogConfig::default())
}

/// Tear the catalog down, removing its credential files
pub fn shutdown(catalog: Catalog) -> usize {
    let removed = catalog.release();
    info!("Catalog shut down, removed {} credential file(s)", removed);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::derive_plan_id;
    use crate::error::{CatalogError, DecodeError};
    use tempfile::TempDir;

    const SERVICES: &str = r#"[{"id":"crdb","name":"cockroachdb"}]"#;

    fn config(temp: &TempDir) -> CatalogConfig {
        CatalogConfig::with_credential_dir(temp.path())
    }

    #[test]
    fn test_services_required() {
        let temp = TempDir::new().unwrap();

        let err = initialize(&CatalogSources::default(), config(&temp)).unwrap_err();
        assert!(matches!(err, CatalogError::Decode(DecodeError::MissingServices)));

        let sources = CatalogSources::default().with_services("[]");
        let err = initialize(&sources, config(&temp)).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::NoServices)));
    }

    #[test]
    fn test_plans_required() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_preconfigured_plans("[]")
            .with_custom_plans("{}");

        let err = initialize(&sources, config(&temp)).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::NoPlans)));
    }

    #[test]
    fn test_malformed_plans_blob() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_preconfigured_plans("not json");

        let err = initialize(&sources, config(&temp)).unwrap_err();
        assert!(matches!(err, CatalogError::Decode(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_preconfigured_plans_win_name_conflicts() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_preconfigured_plans(
                r#"[{"name":"free","serviceID":"crdb","crdbHost":"pre","crdbPort":"26257","sslMode":"disable"}]"#,
            )
            .with_custom_plans(
                r#"{"a":{"name":"free","service":"crdb","host":"custom","port":26257,"ssl_mode":"disable"}}"#,
            );

        let err = initialize(&sources, config(&temp)).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(ValidationError::DuplicatePlanName(n)) if n == "free"
        ));
    }

    #[test]
    fn test_plan_order() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_preconfigured_plans(
                r#"[{"name":"zeta","serviceID":"crdb","crdbHost":"h","crdbPort":"1","sslMode":"disable"}]"#,
            )
            .with_custom_plans(
                r#"{
                    "b": {"name":"planB","service":"crdb","host":"h","port":2,"ssl_mode":"disable"},
                    "a": {"name":"planA","service":"crdb","host":"h","port":3,"ssl_mode":"disable"}
                }"#,
            );

        let catalog = initialize(&sources, config(&temp)).unwrap();
        let names: Vec<&str> = catalog.plans().map(|p| p.name()).collect();
        assert_eq!(names, ["zeta", "planA", "planB"]);
    }

    #[test]
    fn test_failed_startup_leaves_no_files() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_custom_plans(
                r#"{
                    "a": {"name":"secure","service":"crdb","host":"h","port":26257,"ssl_mode":"verify-full",
                          "ssl_client_cert":"C","ssl_client_key":"K","ssl_ca_cert":"A"},
                    "b": {"name":"broken","service":"crdb","host":"h","port":26257,"ssl_mode":"bogus"}
                }"#,
            );

        let err = initialize(&sources, config(&temp)).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(ValidationError::UnknownSslMode(_))
        ));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_shutdown_removes_files() {
        let temp = TempDir::new().unwrap();
        let sources = CatalogSources::default()
            .with_services(SERVICES)
            .with_custom_plans(
                r#"{"a":{"name":"secure","service":"crdb","host":"h","port":26257,"ssl_mode":"require",
                         "ssl_client_cert":"C","ssl_client_key":"K"}}"#,
            );

        let catalog = initialize(&sources, config(&temp)).unwrap();
        let plan = catalog
            .find_plan("crdb", &derive_plan_id("cockroachdb", "secure"))
            .unwrap();
        assert_eq!(plan.credentials().len(), 2);

        assert_eq!(shutdown(catalog), 2);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
