use anyhow::Context;
use clap::Parser;
use iothub_fixtures::config::Command;
use iothub_fixtures::core::edge_environment::EDGE_ENV_VARS;
use iothub_fixtures::fixtures::{self, ConnectionStringVariant};
use iothub_fixtures::utils::logger;
use iothub_fixtures::CliConfig;
use std::collections::BTreeMap;

fn variant(gateway: bool) -> ConnectionStringVariant {
    if gateway {
        ConnectionStringVariant::ProtocolGateway
    } else {
        ConnectionStringVariant::Direct
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    let config = match cli.load_fixture_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let values = &config.fixtures;

    match &cli.command {
        Command::DeviceConnectionString { gateway } => {
            println!("{}", fixtures::device_connection_string(values, variant(*gateway)));
        }
        Command::ModuleConnectionString { gateway } => {
            println!("{}", fixtures::module_connection_string(values, variant(*gateway)));
        }
        Command::SasToken { module, policy } => {
            let mut values = values.clone();
            if let Some(policy) = policy {
                values.shared_access_key_name = Some(policy.clone());
            }
            let uri = if *module {
                iothub_fixtures::core::sas_token::module_resource_uri(
                    &values.hostname,
                    &values.device_id,
                    &values.module_id,
                )
            } else {
                iothub_fixtures::core::sas_token::device_resource_uri(
                    &values.hostname,
                    &values.device_id,
                )
            };
            let token = fixtures::sas_token_skn_string(&values, &uri).unwrap_or_else(|| {
                iothub_fixtures::sas_token(&uri, &values.signature, &values.expiry)
            });
            println!("{}", token);
        }
        Command::EdgeEnv { json } => {
            let vars = match &config.edge {
                Some(overrides) => fixtures::edge_container_env_vars_with(overrides),
                None => fixtures::edge_container_env_vars(),
            };
            if *json {
                let sorted: BTreeMap<_, _> = vars.iter().collect();
                let rendered = serde_json::to_string_pretty(&sorted)
                    .context("failed to render Edge variables")?;
                println!("{}", rendered);
            } else {
                // 固定順序輸出，方便 diff
                for name in EDGE_ENV_VARS {
                    if let Some(value) = vars.get(name) {
                        println!("{}={}", name, value);
                    }
                }
            }
        }
    }

    Ok(())
}
