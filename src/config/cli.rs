use crate::config::fixture_config::FixtureConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "iothub-fixtures")]
#[command(about = "Print IoT Hub connection strings, SAS tokens and Edge variables for tests")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML file overriding the fixture values")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Write logs as JSON lines to stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Device connection string
    DeviceConnectionString {
        #[arg(long)]
        gateway: bool,
    },
    /// Module connection string
    ModuleConnectionString {
        #[arg(long)]
        gateway: bool,
    },
    /// SAS token for the device or module resource URI
    SasToken {
        #[arg(long)]
        module: bool,
        #[arg(long, help = "Append skn=<POLICY>")]
        policy: Option<String>,
    },
    /// Fake Edge container environment
    EdgeEnv {
        #[arg(long)]
        json: bool,
    },
}

impl CliConfig {
    /// 載入並驗證 fixture 配置；未指定檔案時使用預設值
    pub fn load_fixture_config(&self) -> Result<FixtureConfig> {
        let config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading fixture config from {}", path.display());
                FixtureConfig::from_file(path)?
            }
            None => FixtureConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_subcommand_flags() {
        let cli =
            CliConfig::try_parse_from(["iothub-fixtures", "sas-token", "--module", "--policy", "p"])
                .unwrap();
        match &cli.command {
            Command::SasToken { module, policy } => {
                assert!(*module);
                assert_eq!(policy.as_deref(), Some("p"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(cli.load_fixture_config().is_ok());
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_json_logs_flag_is_global() {
        let cli = CliConfig::try_parse_from(["iothub-fixtures", "edge-env", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
    }

    #[test]
    fn test_invalid_config_file_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[fixtures]\nexpiry = \"never\"\n")
            .unwrap();

        let path = temp_file.path().to_str().unwrap();
        let cli = CliConfig::try_parse_from([
            "iothub-fixtures",
            "--config",
            path,
            "device-connection-string",
        ])
        .unwrap();
        assert!(cli.load_fixture_config().is_err());
    }
}
