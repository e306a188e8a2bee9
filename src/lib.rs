pub mod config;
pub mod core;
pub mod domain;
pub mod fixtures;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{FixtureConfig, FixtureValues};
pub use crate::core::{
    auth::AuthenticationProvider,
    client::{DeviceClient, ModuleClient, ReceiveMode},
    connection_string::{device_connection_string, module_connection_string},
    fake_pipeline::{CompletionStrategy, FakePipelineAdapter},
    inbox::{InboxManager, SyncInbox},
    sas_token::{sas_token, sas_token_with_policy},
};
pub use domain::model::{
    ConnectionString, EdgeEnvironment, Feature, Message, MethodRequest, MethodResponse, SasToken,
};
pub use domain::ports::{EnvironmentSource, PipelineAdapter};
pub use utils::error::{FixtureError, Result};
