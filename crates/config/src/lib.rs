#![forbid(unsafe_code)]

mod control_plane;
mod error;
mod hypervisor;
mod inspector;
mod scan;

pub use control_plane::ControlPlane;
pub use error::Error;
pub use hypervisor::Hypervisor;
pub use inspector::Inspector;
pub use scan::Scan;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables that override file settings.
///
/// Nested keys are separated by a double underscore, e.g.
/// `STORAUDIT_CONTROL_PLANE__URL`.
pub const ENV_PREFIX: &str = "STORAUDIT_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub scan: Scan,
    pub control_plane: ControlPlane,
    pub hypervisor: Hypervisor,
    pub inspector: Inspector,
}

impl Config {
    /// Defaults overlaid with environment variables.
    pub fn new() -> Result<Self, Error> {
        Self::from_figment(Self::figment())
    }

    /// Defaults overlaid with a TOML file, then environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_owned()));
        }
        Self::from_figment(Self::figment().merge(Toml::file(path)))
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn from_figment(figment: Figment) -> Result<Self, Error> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self, Error> {
        if self.inspector.timeout.is_zero() {
            return Err(Error::InvalidValue {
                key: "inspector.timeout",
                reason: "must be at least one second".into(),
            });
        }
        if self.control_plane.query_timeout.is_zero() {
            return Err(Error::InvalidValue {
                key: "control_plane.query_timeout",
                reason: "must be at least one second".into(),
            });
        }
        if self.hypervisor.timeout.is_zero() {
            return Err(Error::InvalidValue {
                key: "hypervisor.timeout",
                reason: "must be at least one second".into(),
            });
        }
        if self.hypervisor.command_timeout.is_zero() {
            return Err(Error::InvalidValue {
                key: "hypervisor.command_timeout",
                reason: "must be at least one second".into(),
            });
        }
        self.hypervisor.concurrency = self.hypervisor.concurrency.max(1);
        self.inspector = self.inspector.clamp();
        Ok(self)
    }
}
