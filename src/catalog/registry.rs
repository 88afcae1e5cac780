//! Catalog registry
//!
//! [`CatalogBuilder`] is the building state: services and plans are validated
//! and appended in registration order. [`CatalogBuilder::seal`] hands back a
//! [`Catalog`], which only offers reads and teardown. Lookups are linear scans;
//! catalogs are operator-sized.
//!
//! Both types remove their credential files when dropped, so a startup that
//! fails halfway does not leave key material behind.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::connection::{connection_uri, is_valid_host, ssl_options, ConnectionTarget};
use super::credentials::release_files;
use super::{
    derive_plan_id, CredentialFiles, CredentialMaterializer, Plan, PlanConnection, PlanSpec,
    Service, ServiceSpec, SslMode, DEFAULT_ADMIN_USER,
};
use crate::config::CatalogConfig;
use crate::error::{LookupError, ValidationError};

fn find_service<'a>(services: &'a [Service], service_id: &str) -> Result<&'a Service, LookupError> {
    services
        .iter()
        .find(|s| s.id() == service_id)
        .ok_or_else(|| LookupError::UnknownService(service_id.to_string()))
}

fn find_plan<'a>(
    services: &'a [Service],
    service_id: &str,
    plan_id: &str,
) -> Result<&'a Plan, LookupError> {
    find_service(services, service_id)?
        .find_plan(plan_id)
        .ok_or_else(|| LookupError::UnknownPlan(plan_id.to_string()))
}

fn tracked_files<'a>(services: &'a [Service], stray: &'a [PathBuf]) -> Vec<&'a Path> {
    services
        .iter()
        .flat_map(|s| s.plans())
        .flat_map(|p| p.credentials().paths())
        .chain(stray.iter().map(PathBuf::as_path))
        .collect()
}

/// Registry in its building state
#[derive(Debug)]
pub struct CatalogBuilder {
    services: Vec<Service>,
    materializer: CredentialMaterializer,
    config: CatalogConfig,
    /// Files written for plans whose registration failed
    stray: Vec<PathBuf>,
}

impl CatalogBuilder {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            services: Vec::new(),
            materializer: CredentialMaterializer::new(&config.credential_dir),
            config,
            stray: Vec::new(),
        }
    }

    /// Validate and append a service
    pub fn register_service(&mut self, spec: ServiceSpec) -> Result<(), ValidationError> {
        if spec.id.is_empty() {
            return Err(ValidationError::MissingServiceId);
        }
        for existing in &self.services {
            if existing.name() == spec.name {
                return Err(ValidationError::DuplicateServiceName(spec.name));
            }
            if existing.id() == spec.id {
                return Err(ValidationError::DuplicateServiceId(spec.id));
            }
        }

        info!("Registered service '{}' ({})", spec.name, spec.id);
        self.services.push(Service::new(spec));
        Ok(())
    }

    /// Validate a plan, write its credential files, build its connection and
    /// append it to the owning service.
    ///
    /// Every check that does not need the filesystem runs before any file is
    /// written.
    pub fn register_plan(&mut self, mut spec: PlanSpec) -> Result<(), ValidationError> {
        if spec.service_id.is_empty() {
            return Err(ValidationError::MissingPlanServiceId(spec.name));
        }
        let service_idx = self
            .services
            .iter()
            .position(|s| s.id() == spec.service_id)
            .ok_or_else(|| ValidationError::UnknownService(spec.service_id.clone()))?;

        let service = &self.services[service_idx];
        if spec.id.is_empty() {
            spec.id = derive_plan_id(service.name(), &spec.name);
            debug!("Derived id {} for plan '{}'", spec.id, spec.name);
        }
        for existing in service.plans() {
            if existing.name() == spec.name {
                return Err(ValidationError::DuplicatePlanName(spec.name));
            }
            if existing.id() == spec.id {
                return Err(ValidationError::DuplicatePlanId(spec.id));
            }
        }
        // Plan ids are only required to be unique within their service.
        if let Some(other) = self
            .services
            .iter()
            .filter(|s| s.id() != spec.service_id)
            .find(|s| s.find_plan(&spec.id).is_some())
        {
            warn!(
                "Plan id {} ('{}') is also used by a plan of service '{}'",
                spec.id,
                spec.name,
                other.name()
            );
        }

        if spec.host.is_empty() || spec.port.is_empty() {
            return Err(ValidationError::MissingTarget(spec.name));
        }
        if !is_valid_host(&spec.host) {
            return Err(ValidationError::InvalidHost {
                plan: spec.name,
                host: spec.host,
            });
        }
        let port: u16 = spec
            .port
            .parse()
            .map_err(|_| ValidationError::InvalidPort {
                plan: spec.name.clone(),
                port: spec.port.clone(),
            })?;
        spec.port = port.to_string();

        if spec.admin_user.is_empty() {
            spec.admin_user = DEFAULT_ADMIN_USER.to_string();
        }

        let ssl_mode: SslMode = spec.ssl_mode.parse()?;

        let mut files = CredentialFiles::default();
        let connection = self
            .materializer
            .materialize(&spec.name, ssl_mode, spec.tls_material(), &mut files)
            .and_then(|()| {
                let target = ConnectionTarget {
                    host: &spec.host,
                    port,
                    user: &spec.admin_user,
                    password: "",
                    database: "",
                };
                let uri = connection_uri(&target, &ssl_options(ssl_mode, &files)).map_err(
                    |e| ValidationError::Connection {
                        plan: spec.name.clone(),
                        source: sqlx::Error::Configuration(Box::new(e)),
                    },
                )?;
                PlanConnection::open(uri, &self.config).map_err(|source| {
                    ValidationError::Connection {
                        plan: spec.name.clone(),
                        source,
                    }
                })
            });

        let connection = match connection {
            Ok(connection) => connection,
            Err(e) => {
                self.stray.extend(files.into_paths());
                return Err(e);
            }
        };

        info!(
            "Registered plan '{}' ({}) for service '{}': {}:{} sslmode={} with {} credential file(s)",
            spec.name,
            spec.id,
            self.services[service_idx].name(),
            spec.host,
            spec.port,
            ssl_mode,
            files.len()
        );
        self.services[service_idx].push_plan(Plan::new(spec, ssl_mode, connection, files));
        Ok(())
    }

    pub fn find_service(&self, service_id: &str) -> Result<&Service, LookupError> {
        find_service(&self.services, service_id)
    }

    pub fn find_plan(&self, service_id: &str, plan_id: &str) -> Result<&Plan, LookupError> {
        find_plan(&self.services, service_id, plan_id)
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Every credential file this builder is responsible for, including those
    /// left by failed registrations
    pub fn tracked_files(&self) -> Vec<&Path> {
        tracked_files(&self.services, &self.stray)
    }

    /// Finish building. The returned catalog cannot be mutated.
    pub fn seal(mut self) -> Catalog {
        Catalog {
            services: std::mem::take(&mut self.services),
            stray: std::mem::take(&mut self.stray),
        }
    }
}

impl Drop for CatalogBuilder {
    fn drop(&mut self) {
        let removed = release_files(tracked_files(&self.services, &self.stray));
        if removed > 0 {
            info!("Removed {} credential file(s) from unsealed catalog", removed);
        }
    }
}

/// Sealed, read-only catalog
#[derive(Debug)]
pub struct Catalog {
    services: Vec<Service>,
    stray: Vec<PathBuf>,
}

impl Catalog {
    /// Services in registration order
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn find_service(&self, service_id: &str) -> Result<&Service, LookupError> {
        find_service(&self.services, service_id)
    }

    pub fn find_plan(&self, service_id: &str, plan_id: &str) -> Result<&Plan, LookupError> {
        find_plan(&self.services, service_id, plan_id)
    }

    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.services.iter().flat_map(|s| s.plans())
    }

    pub fn tracked_files(&self) -> Vec<&Path> {
        tracked_files(&self.services, &self.stray)
    }

    /// Remove every credential file. Files that are already gone are skipped,
    /// so calling this again is a no-op. Returns how many files were removed.
    pub fn release(&self) -> usize {
        release_files(self.tracked_files())
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        self.release();
    }
}
