//! Error handling for the catalog registry
//!
//! Two tiers: [`DecodeError`] for blobs that do not match the expected shape,
//! and [`ValidationError`] for well-formed input that breaks a registry
//! invariant. Both surface as [`CatalogError`] and are fatal to startup; the
//! decision to terminate the process belongs to the caller.

use std::fmt;

use thiserror::Error;

use crate::config::CatalogSource;

/// Top-level error returned by catalog initialization
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Malformed or missing configuration blobs
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("SERVICES not specified")]
    MissingServices,

    #[error("Failed to decode {source_name}: {error}")]
    Malformed {
        source_name: CatalogSource,
        #[source]
        error: serde_json::Error,
    },
}

/// Registry invariant violations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("no services")]
    NoServices,

    #[error("no plans")]
    NoPlans,

    #[error("service id required")]
    MissingServiceId,

    #[error("duplicate service name '{0}'")]
    DuplicateServiceName(String),

    #[error("duplicate service id '{0}'")]
    DuplicateServiceId(String),

    #[error("serviceID required in plan '{0}'")]
    MissingPlanServiceId(String),

    #[error("unknown service ID '{0}' in plan")]
    UnknownService(String),

    #[error("duplicate plan name '{0}'")]
    DuplicatePlanName(String),

    #[error("duplicate plan id '{0}'")]
    DuplicatePlanId(String),

    #[error("plan '{0}' does not specify a CockroachDB host/port")]
    MissingTarget(String),

    #[error("plan '{plan}' has invalid host '{host}'")]
    InvalidHost { plan: String, host: String },

    #[error("plan '{plan}' has invalid port '{port}'")]
    InvalidPort { plan: String, port: String },

    #[error("unknown ssl mode '{0}'")]
    UnknownSslMode(String),

    #[error("plan '{plan}': failed to write {kind} file: {source}")]
    CredentialWrite {
        plan: String,
        kind: CredentialKind,
        #[source]
        source: std::io::Error,
    },

    #[error("plan '{plan}': failed to set up database connection: {source}")]
    Connection {
        plan: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Failures while assembling a connection URI
#[derive(Error, Debug)]
pub enum UriError {
    #[error("host '{0}' contains URI delimiters or whitespace")]
    InvalidHost(String),

    #[error("cannot set user on '{0}'")]
    Credentials(String),

    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

/// Lookup failures against a registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown service ID '{0}'")]
    UnknownService(String),

    #[error("unknown plan ID '{0}'")]
    UnknownPlan(String),
}

/// Which piece of TLS material a credential file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    ClientCert,
    ClientKey,
    CaCert,
}

impl CredentialKind {
    /// Prefix used for the temporary file name
    pub fn file_prefix(self) -> &'static str {
        match self {
            CredentialKind::ClientCert => "crdb-ssl-cert-",
            CredentialKind::ClientKey => "crdb-ssl-key-",
            CredentialKind::CaCert => "crdb-ssl-ca-",
        }
    }

    /// Connection option that references the file
    pub fn connection_option(self) -> &'static str {
        match self {
            CredentialKind::ClientCert => "sslcert",
            CredentialKind::ClientKey => "sslkey",
            CredentialKind::CaCert => "sslrootcert",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialKind::ClientCert => "client certificate",
            CredentialKind::ClientKey => "client key",
            CredentialKind::CaCert => "CA certificate",
        };
        f.write_str(name)
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, CatalogError>;
