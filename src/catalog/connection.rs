//! Connection builder
//!
//! Builds the postgres URI for a plan's database target and wraps it in a
//! lazily-connecting pool. Nothing here touches the network.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use url::Url;

use super::{CredentialFiles, SslMode};
use crate::config::CatalogConfig;
use crate::error::UriError;

/// Query options appended to the URI, kept sorted so the URI is deterministic
pub type ConnectionOptions = BTreeMap<&'static str, String>;

/// Where and as whom a plan connects
#[derive(Debug, Clone, Copy)]
pub struct ConnectionTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: &'a str,
    pub database: &'a str,
}

/// `sslmode` plus one option per credential file
pub fn ssl_options(mode: SslMode, files: &CredentialFiles) -> ConnectionOptions {
    let mut options = ConnectionOptions::new();
    options.insert("sslmode", mode.as_str().to_string());
    for (kind, path) in files.iter() {
        options.insert(kind.connection_option(), path.to_string_lossy().into_owned());
    }
    options
}

/// Whether `host` can go into a URI authority without changing the URI's
/// structure.
///
/// Anything with a `:` or a bracket must be an IPv6 literal. Other hosts may
/// not contain delimiters, `%`, whitespace or control characters; a `%2F`
/// prefix would otherwise be read back as a socket path.
pub fn is_valid_host(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    if host.contains(':') || host.starts_with('[') || host.ends_with(']') {
        let literal = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        return literal.parse::<Ipv6Addr>().is_ok();
    }
    !host.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '/' | '?' | '#' | '@' | '%' | '\\' | '[' | ']')
    })
}

/// Build a `postgresql://` URI. An empty password is left out of the URI.
pub fn connection_uri(
    target: &ConnectionTarget<'_>,
    options: &ConnectionOptions,
) -> Result<String, UriError> {
    if !is_valid_host(target.host) {
        return Err(UriError::InvalidHost(target.host.to_string()));
    }
    let host = if target.host.contains(':') && !target.host.starts_with('[') {
        format!("[{}]", target.host)
    } else {
        target.host.to_string()
    };

    let mut uri = Url::parse(&format!(
        "postgresql://{}:{}/{}",
        host, target.port, target.database
    ))?;
    set_credentials(&mut uri, target.user, target.password)?;

    if !options.is_empty() {
        let mut query = uri.query_pairs_mut();
        for (key, value) in options {
            query.append_pair(key, value);
        }
    }

    Ok(uri.to_string())
}

fn set_credentials(uri: &mut Url, user: &str, password: &str) -> Result<(), UriError> {
    let password = (!password.is_empty()).then_some(password);
    match uri
        .set_username(user)
        .and_then(|()| uri.set_password(password))
    {
        Ok(()) => Ok(()),
        Err(()) => Err(UriError::Credentials(uri.to_string())),
    }
}

/// A plan's database handle
#[derive(Debug, Clone)]
pub struct PlanConnection {
    uri: String,
    pool: PgPool,
}

impl PlanConnection {
    /// Parse `uri` and create a pool that connects on first use
    pub fn open(uri: String, config: &CatalogConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(&uri)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            // No reaper task, so pools can be built before a runtime exists.
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        Ok(Self { uri, pool })
    }

    /// URI the pool connects with. Contains no password.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Value of a query option in the URI, e.g. `sslmode`
    pub fn option(&self, key: &str) -> Option<String> {
        Url::parse(&self.uri).ok().and_then(|uri| {
            uri.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
    }
}
