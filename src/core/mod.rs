pub mod auth;
pub mod client;
pub mod connection_string;
pub mod edge_environment;
pub mod fake_pipeline;
pub mod inbox;
pub mod sas_token;

pub use crate::domain::model::{
    ConnectionString, EdgeEnvironment, Feature, Message, MethodRequest, MethodResponse, SasToken,
};
pub use crate::domain::ports::{Callback, EnvironmentSource, PipelineAdapter, PipelineHandlers};
pub use crate::utils::error::Result;
