//! Server configuration.
//!
//! [`ServerConfig::from_env`] reads:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `ZRPC_ADDRESS` | endpoint, e.g. `tcp://*:7341` | required |
//! | `ZRPC_CONNECT` | `true` to dial a broker instead of binding | `false` |
//! | `ZRPC_DIE_AFTER` | stop after this many requests | unbounded |
//! | `ZRPC_MALFORMED` | `terminate` or `reply` | `terminate` |
//!
//! `ZRPC_DIE_AFTER=0` serves zero requests. It does not mean "forever";
//! leave the variable unset for that.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::transport::Role;

/// What to do with a frame that isn't a valid request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Stop serving and return the error from `run`. The client gets no reply.
    #[default]
    Terminate,
    /// Answer with a `zrpc.protocol.*` error record and keep serving.
    Reply,
}

impl FromStr for MalformedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminate" => Ok(MalformedPolicy::Terminate),
            "reply" => Ok(MalformedPolicy::Reply),
            _ => Err(ConfigError::InvalidMalformedPolicy(s.to_string())),
        }
    }
}

/// Settings for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Endpoint to bind or connect, e.g. `tcp://*:7341`.
    pub address: String,
    /// Bind (default) or connect.
    pub role: Role,
    /// Request budget. `None` serves until stopped; `Some(0)` serves nothing.
    pub die_after: Option<u64>,
    /// Handling of frames that are not valid requests.
    pub malformed: MalformedPolicy,
}

/// Invalid or missing configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `ZRPC_ADDRESS` is unset or blank.
    #[error("ZRPC_ADDRESS is required and must not be empty")]
    MissingAddress,
    /// `ZRPC_ADDRESS` has no `scheme://` prefix.
    #[error("ZRPC_ADDRESS must look like scheme://endpoint, got {0:?}")]
    InvalidAddress(String),
    /// `ZRPC_CONNECT` is not a recognised boolean.
    #[error("ZRPC_CONNECT must be a boolean, got {0:?}")]
    InvalidConnect(String),
    /// `ZRPC_DIE_AFTER` is not a non-negative integer.
    #[error("ZRPC_DIE_AFTER must be a non-negative integer, got {0:?}")]
    InvalidDieAfter(String),
    /// `ZRPC_MALFORMED` names no known policy.
    #[error("ZRPC_MALFORMED must be `terminate` or `reply`, got {0:?}")]
    InvalidMalformedPolicy(String),
}

impl ServerConfig {
    /// A bind config for `address` with defaults for everything else.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: Role::Bind,
            die_after: None,
            malformed: MalformedPolicy::Terminate,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps variable names to
    /// values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup("ZRPC_ADDRESS")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingAddress)?;
        if !is_scheme_qualified(&address) {
            return Err(ConfigError::InvalidAddress(address));
        }

        let connect = lookup("ZRPC_CONNECT")
            .map(|value| parse_bool(&value).ok_or(ConfigError::InvalidConnect(value)))
            .transpose()?
            .unwrap_or(false);

        let die_after = lookup("ZRPC_DIE_AFTER")
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidDieAfter(value.clone()))
            })
            .transpose()?;

        let malformed = lookup("ZRPC_MALFORMED")
            .map(|value| value.parse::<MalformedPolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            address,
            role: if connect { Role::Connect } else { Role::Bind },
            die_after,
            malformed,
        })
    }
}

fn is_scheme_qualified(address: &str) -> bool {
    match address.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric())
                && !rest.is_empty()
        }
        None => false,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
