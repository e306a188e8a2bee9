pub mod fixture_config;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};

pub use fixture_config::{FixtureConfig, FixtureValues};
