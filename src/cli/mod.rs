//! # Command Line Interface
//!
//! Operator tooling for the secret managers: show which manager the current
//! environment selects, check Vault connectivity, and preview name sanitisation.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::config::{
    LoggingConfig, SecretsConfig, VaultConfig, ENV_LICENSE_ACTIVATED, ENV_SECRETS_MANAGER,
};
use crate::observability::init_logging;
use crate::secrets::{
    create_secret_manager, sanitize_secret_name, ByosVaultSecretManager, SecretsManagerType,
};
use crate::storage::{create_pool, InMemorySecretRepository, PostgresSecretRepository, SecretRepository};

const DATABASE_URL_ENV: &str = "DATABASE_URL";
const MAX_DB_CONNECTIONS: u32 = 2;

#[derive(Parser, Debug)]
#[command(name = "archestra-secrets")]
#[command(about = "Archestra secret manager tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL override (defaults to DATABASE_URL, else an in-memory store)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the selected secret manager and its diagnostics
    Info,

    /// Check that the secret store is reachable and count stored secrets
    Check,

    /// List a customer Vault folder (BYOS)
    CheckFolder {
        /// Folder path in data form, e.g. secret/data/teams/platform
        folder: String,
    },

    /// Print the name a Vault-backed manager would store
    Sanitize {
        /// Display name to sanitise
        name: String,
    },
}

/// Execute a parsed command line.
pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = SecretsConfig::from_env().context("Invalid secrets configuration")?;

    let logging = if cli.verbose {
        LoggingConfig { level: "debug".to_string(), ..config.logging.clone() }
    } else {
        config.logging.clone()
    };
    init_logging(&logging);

    match cli.command {
        Commands::Sanitize { name } => {
            println!("{}", sanitize_secret_name(&name));
        }
        Commands::Info => {
            let repository = open_repository(cli.database_url).await?;
            let manager = create_secret_manager(&config, repository);
            print_json(&manager.user_visible_debug_info())?;
        }
        Commands::Check => {
            let repository = open_repository(cli.database_url).await?;
            let manager = create_secret_manager(&config, repository);
            let report = manager
                .check_connectivity()
                .await
                .with_context(|| format!("{} connectivity check failed", manager.manager_type()))?;
            print_json(&report)?;
        }
        Commands::CheckFolder { folder } => {
            let vault = byos_vault_config(&config)?;
            let repository = open_repository(cli.database_url).await?;
            let manager = ByosVaultSecretManager::from_config(vault, repository)?;

            let secrets = manager.list_folder_secrets(&folder).await?;
            print_json(&FolderReport { folder, secret_count: secrets.len(), secrets })?;
        }
    }

    Ok(())
}

/// Vault settings for folder commands, only when BYOS Vault is the selected and
/// licensed manager.
fn byos_vault_config(config: &SecretsConfig) -> anyhow::Result<VaultConfig> {
    if config.manager != SecretsManagerType::ByosVault {
        anyhow::bail!(
            "check-folder needs {}=BYOS_VAULT (selected manager is {})",
            ENV_SECRETS_MANAGER,
            config.manager
        );
    }
    if !config.enterprise_license_activated {
        anyhow::bail!(
            "BYOS Vault requires an activated enterprise license ({} is not set)",
            ENV_LICENSE_ACTIVATED
        );
    }

    let vault = config
        .vault
        .clone()
        .context("Vault is not configured (ARCHESTRA_HASHICORP_VAULT_ADDR is unset)")?;
    vault.validate().context("Invalid Vault configuration")?;
    Ok(vault)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderReport {
    folder: String,
    secret_count: usize,
    secrets: Vec<String>,
}

async fn open_repository(database_url: Option<String>) -> anyhow::Result<Arc<dyn SecretRepository>> {
    let url = database_url.or_else(|| std::env::var(DATABASE_URL_ENV).ok()).filter(|u| !u.is_empty());

    match url {
        Some(url) => {
            let pool = create_pool(&url, MAX_DB_CONNECTIONS)
                .await
                .context("Failed to open secrets database")?;
            Ok(Arc::new(PostgresSecretRepository::new(pool)))
        }
        None => {
            debug!("No database configured, using in-memory secret repository");
            Ok(Arc::new(InMemorySecretRepository::new()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["archestra-secrets", "-v", "check-folder", "secret/data/t"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::CheckFolder { ref folder } if folder == "secret/data/t"));

        let cli = Cli::try_parse_from(["archestra-secrets", "sanitize", "my key"]).unwrap();
        assert!(matches!(cli.command, Commands::Sanitize { ref name } if name == "my key"));
    }

    #[test]
    fn test_check_folder_requires_licensed_byos() {
        let vault = VaultConfig::with_token("http://vault:8200", "root");
        let mut config = SecretsConfig {
            manager: SecretsManagerType::Db,
            enterprise_license_activated: true,
            vault: Some(vault.clone()),
            ..Default::default()
        };
        let err = byos_vault_config(&config).unwrap_err();
        assert!(err.to_string().contains("BYOS_VAULT"));

        config.manager = SecretsManagerType::Vault;
        assert!(byos_vault_config(&config).is_err());

        config.manager = SecretsManagerType::ByosVault;
        config.enterprise_license_activated = false;
        let err = byos_vault_config(&config).unwrap_err();
        assert!(err.to_string().contains("license"));

        config.enterprise_license_activated = true;
        assert_eq!(byos_vault_config(&config).unwrap(), vault);

        config.vault = None;
        assert!(byos_vault_config(&config).is_err());
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["archestra-secrets"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
