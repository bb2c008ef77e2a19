//! Connection configuration.
//!
//! [`ConnectionConfig`] is a plain value object: required identity fields
//! plus optional tuning, immutable after `build()`. The core only consumes
//! the finished value and its two derived artifacts, the endpoint string
//! and the provider property bag; how a driver uses them is its own concern.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Authentication mode requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authenticator {
    /// Account password (the default).
    #[default]
    Password,
    /// Browser-based SSO.
    ExternalBrowser,
    /// Externally-provisioned OAuth token.
    OAuth,
    /// Key-pair (JWT) authentication; requires private key material.
    KeyPair,
}

impl Authenticator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "snowflake",
            Self::ExternalBrowser => "externalbrowser",
            Self::OAuth => "oauth",
            Self::KeyPair => "snowflake_jwt",
        }
    }
}

/// Preferred transport encoding for result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Json,
    Arrow,
}

impl ResultFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Arrow => "arrow",
        }
    }
}

/// Immutable connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    /// Overrides the endpoint host derived from the account.
    pub host: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub authenticator: Authenticator,
    pub client_session_keep_alive: bool,
    /// Application tag reported to the backend.
    pub application: Option<String>,
    /// Tag attached to every query issued over this connection.
    pub query_tag: Option<String>,
    pub login_timeout: Option<Duration>,
    pub network_timeout: Option<Duration>,
    pub query_timeout: Option<Duration>,
    pub result_format: ResultFormat,
    /// Arbitrary session parameters, applied after the explicit fields.
    pub session_parameters: BTreeMap<String, String>,
    pub private_key_path: Option<PathBuf>,
    pub private_key_passphrase: Option<String>,
}

impl ConnectionConfig {
    /// Start building a config from the required identity fields.
    pub fn builder(
        account: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: ConnectionConfig {
                account: account.into(),
                user: user.into(),
                password: password.into(),
                host: None,
                role: None,
                warehouse: None,
                database: None,
                schema: None,
                authenticator: Authenticator::default(),
                client_session_keep_alive: false,
                application: None,
                query_tag: None,
                login_timeout: None,
                network_timeout: None,
                query_timeout: None,
                result_format: ResultFormat::default(),
                session_parameters: BTreeMap::new(),
                private_key_path: None,
                private_key_passphrase: None,
            },
        }
    }

    /// Load a config from `SNOWBIND_*` environment variables.
    ///
    /// `SNOWBIND_ACCOUNT`, `SNOWBIND_USER` and `SNOWBIND_PASSWORD` are
    /// required; the optional fields map one-to-one (`SNOWBIND_ROLE`,
    /// `SNOWBIND_WAREHOUSE`, `SNOWBIND_DATABASE`, `SNOWBIND_SCHEMA`,
    /// `SNOWBIND_HOST`, `SNOWBIND_APPLICATION`, `SNOWBIND_QUERY_TAG`,
    /// `SNOWBIND_AUTHENTICATOR`, `SNOWBIND_KEEP_ALIVE`, `SNOWBIND_RESULT_FORMAT`,
    /// and `SNOWBIND_LOGIN_TIMEOUT` / `SNOWBIND_NETWORK_TIMEOUT` /
    /// `SNOWBIND_QUERY_TIMEOUT` in seconds).
    pub fn from_env() -> Result<ConnectionConfig, ConfigError> {
        let mut builder = ConnectionConfig::builder(
            required_env("SNOWBIND_ACCOUNT", "account")?,
            required_env("SNOWBIND_USER", "user")?,
            required_env("SNOWBIND_PASSWORD", "password")?,
        );

        if let Some(host) = optional_env("SNOWBIND_HOST")? {
            builder = builder.host(host);
        }
        if let Some(role) = optional_env("SNOWBIND_ROLE")? {
            builder = builder.role(role);
        }
        if let Some(warehouse) = optional_env("SNOWBIND_WAREHOUSE")? {
            builder = builder.warehouse(warehouse);
        }
        if let Some(database) = optional_env("SNOWBIND_DATABASE")? {
            builder = builder.database(database);
        }
        if let Some(schema) = optional_env("SNOWBIND_SCHEMA")? {
            builder = builder.schema(schema);
        }
        if let Some(application) = optional_env("SNOWBIND_APPLICATION")? {
            builder = builder.application(application);
        }
        if let Some(tag) = optional_env("SNOWBIND_QUERY_TAG")? {
            builder = builder.query_tag(tag);
        }
        if let Some(value) = optional_env("SNOWBIND_AUTHENTICATOR")? {
            builder = builder.authenticator(parse_authenticator(&value)?);
        }
        if let Some(value) = optional_env("SNOWBIND_KEEP_ALIVE")? {
            builder = builder.client_session_keep_alive(parse_bool("keep_alive", &value)?);
        }
        if let Some(value) = optional_env("SNOWBIND_RESULT_FORMAT")? {
            builder = builder.result_format(parse_result_format(&value)?);
        }
        if let Some(secs) = optional_env("SNOWBIND_LOGIN_TIMEOUT")? {
            builder = builder.login_timeout(parse_seconds("login_timeout", &secs)?);
        }
        if let Some(secs) = optional_env("SNOWBIND_NETWORK_TIMEOUT")? {
            builder = builder.network_timeout(parse_seconds("network_timeout", &secs)?);
        }
        if let Some(secs) = optional_env("SNOWBIND_QUERY_TIMEOUT")? {
            builder = builder.query_timeout(parse_seconds("query_timeout", &secs)?);
        }

        builder.build()
    }

    /// Derived connection endpoint.
    ///
    /// `https://<account>.snowflakecomputing.com/` unless a host override is
    /// set; validated as a URL either way.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let host = self
            .host
            .clone()
            .unwrap_or_else(|| format!("{}.snowflakecomputing.com", self.account));
        let url = Url::parse(&format!("https://{host}")).map_err(|e| ConfigError::InvalidValue {
            field: "host",
            message: format!("'{host}' is not a valid host: {e}"),
        })?;
        Ok(url.to_string())
    }

    /// Derived property bag handed to the connection provider.
    ///
    /// Explicit fields first, then `session_parameters`, which may override
    /// them.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("account".to_string(), self.account.clone());
        props.insert("user".to_string(), self.user.clone());
        props.insert("password".to_string(), self.password.clone());
        props.insert(
            "authenticator".to_string(),
            self.authenticator.as_str().to_string(),
        );
        props.insert(
            "client_session_keep_alive".to_string(),
            self.client_session_keep_alive.to_string(),
        );
        props.insert(
            "result_format".to_string(),
            self.result_format.as_str().to_string(),
        );

        let optional = [
            ("role", &self.role),
            ("warehouse", &self.warehouse),
            ("database", &self.database),
            ("schema", &self.schema),
            ("application", &self.application),
            ("query_tag", &self.query_tag),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                props.insert(key.to_string(), value.clone());
            }
        }

        let timeouts = [
            ("login_timeout", self.login_timeout),
            ("network_timeout", self.network_timeout),
            ("query_timeout", self.query_timeout),
        ];
        for (key, value) in timeouts {
            if let Some(value) = value {
                props.insert(key.to_string(), value.as_secs().to_string());
            }
        }

        if let Some(path) = &self.private_key_path {
            props.insert(
                "private_key_path".to_string(),
                path.display().to_string(),
            );
        }
        if let Some(passphrase) = &self.private_key_passphrase {
            props.insert("private_key_passphrase".to_string(), passphrase.clone());
        }

        props.extend(
            self.session_parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        props
    }
}

/// Builder for [`ConnectionConfig`].
#[must_use]
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.config.role = Some(role.into());
        self
    }

    pub fn warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.config.warehouse = Some(warehouse.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = Some(schema.into());
        self
    }

    pub fn authenticator(mut self, authenticator: Authenticator) -> Self {
        self.config.authenticator = authenticator;
        self
    }

    pub fn client_session_keep_alive(mut self, enabled: bool) -> Self {
        self.config.client_session_keep_alive = enabled;
        self
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.config.application = Some(application.into());
        self
    }

    pub fn query_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.query_tag = Some(tag.into());
        self
    }

    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.config.login_timeout = Some(timeout);
        self
    }

    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.config.network_timeout = Some(timeout);
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    pub fn result_format(mut self, format: ResultFormat) -> Self {
        self.config.result_format = format;
        self
    }

    pub fn session_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.config
            .session_parameters
            .insert(key.into(), value.into());
        self
    }

    pub fn private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.private_key_path = Some(path.into());
        self
    }

    pub fn private_key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.config.private_key_passphrase = Some(passphrase.into());
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<ConnectionConfig, ConfigError> {
        let config = self.config;
        if config.account.is_empty() {
            return Err(ConfigError::MissingRequired("account"));
        }
        if config.user.is_empty() {
            return Err(ConfigError::MissingRequired("user"));
        }
        if config.password.is_empty() && config.authenticator == Authenticator::Password {
            return Err(ConfigError::MissingRequired("password"));
        }
        if !config
            .account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ConfigError::InvalidValue {
                field: "account",
                message: format!("'{}' contains characters not valid in an account identifier", config.account),
            });
        }
        if config.authenticator == Authenticator::KeyPair && config.private_key_path.is_none() {
            return Err(ConfigError::MissingRequired("private_key_path"));
        }
        Ok(config)
    }
}

fn required_env(var: &str, field: &'static str) -> Result<String, ConfigError> {
    optional_env(var)?.ok_or(ConfigError::MissingRequired(field))
}

fn optional_env(var: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(var) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::LoadFailed(format!(
            "environment variable {var} is not valid unicode"
        ))),
    }
}

fn parse_seconds(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue {
            field,
            message: format!("'{value}' is not a number of seconds"),
        })
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field,
            message: format!("'{value}' is not a boolean"),
        }),
    }
}

fn parse_authenticator(value: &str) -> Result<Authenticator, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "password" | "snowflake" => Ok(Authenticator::Password),
        "externalbrowser" | "external_browser" => Ok(Authenticator::ExternalBrowser),
        "oauth" => Ok(Authenticator::OAuth),
        "keypair" | "key_pair" | "snowflake_jwt" => Ok(Authenticator::KeyPair),
        _ => Err(ConfigError::InvalidValue {
            field: "authenticator",
            message: format!("unknown authenticator '{value}'"),
        }),
    }
}

fn parse_result_format(value: &str) -> Result<ResultFormat, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Ok(ResultFormat::Json),
        "arrow" => Ok(ResultFormat::Arrow),
        _ => Err(ConfigError::InvalidValue {
            field: "result_format",
            message: format!("unknown result format '{value}'"),
        }),
    }
}
