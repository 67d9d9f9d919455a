mod commands;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use commands::auth::{self, AuthCommand, AuthContext};
use commands::users::{self, UserCommand, UsersContext};
use jira_users_api::retry::RetryConfig;
use jira_users_api::ApiClient;
use jira_users_auth::{token_key, CredentialStore};
use jira_users_config::Config;
use jira_users_core::UserService;
use jira_users_output::{OutputFormat, OutputRenderer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "jira-users", version, about = "Manage Jira users from the command line", long_about = None)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.jira-users/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    #[command(flatten)]
    User(UserCommand),
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = Config::load(cli.config.as_ref())?;
    let renderer = OutputRenderer::new(cli.output);
    let store = CredentialStore::default_location()?;

    match cli.command {
        Command::User(command) => {
            let profile = resolve_active_profile(&config, cli.profile.as_deref(), &store)?;
            let ctx = UsersContext {
                service: UserService::new(build_client(&profile)?),
                renderer: &renderer,
                cancel: cancel_on_ctrl_c(),
            };
            users::execute(command, &ctx).await?
        }
        Command::Auth(command) => {
            auth::handle(
                command,
                AuthContext {
                    config: &mut config,
                    config_path: cli.config.as_deref(),
                    store: &store,
                    renderer: &renderer,
                    requested_profile: cli.profile.as_deref(),
                },
            )
            .await?
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,jira_users=debug,jira_users_api=debug,jira_users_core=debug"
    } else {
        "warn,jira_users=info,jira_users_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

/// Token that fires on Ctrl-C so in-flight requests are abandoned.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            child.cancel();
        }
    });
    token
}

pub(crate) struct ActiveProfile {
    pub name: String,
    pub base_url: String,
    pub email: Option<String>,
    pub token: String,
    pub timeout: Option<Duration>,
    pub max_retries: Option<usize>,
}

pub(crate) fn resolve_active_profile(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
) -> Result<ActiveProfile> {
    let (name, profile) = config
        .resolve_profile(requested)
        .ok_or_else(|| anyhow!("No profile configured. Run `jira-users auth login` first."))?;

    let base_url = profile
        .base_url
        .clone()
        .ok_or_else(|| anyhow!("Profile '{name}' is missing a base_url."))?;

    // Token lookup: profile env var, generic env var, config file, credential store
    let profile_env_var = format!("JIRA_USERS_TOKEN_{}", name.to_uppercase().replace('-', "_"));
    let token = non_empty_env(&profile_env_var)
        .or_else(|| non_empty_env("JIRA_API_TOKEN"))
        .or_else(|| profile.api_token.clone().filter(|t| !t.trim().is_empty()))
        .or_else(|| store.get_secret(&token_key(name)).ok().flatten())
        .ok_or_else(|| {
            anyhow!(
                "No token found for profile '{name}'. Set {profile_env_var} or run `jira-users auth login {name} --base-url <URL>`"
            )
        })?;

    Ok(ActiveProfile {
        name: name.to_string(),
        base_url,
        email: profile.email.clone(),
        token,
        timeout: profile.timeout_secs.map(Duration::from_secs),
        max_retries: profile.max_retries,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Basic auth when the profile has an email (Cloud API tokens), bearer otherwise
/// (Data Center personal access tokens).
pub(crate) fn build_client(profile: &ActiveProfile) -> Result<ApiClient> {
    let mut client = ApiClient::new(&profile.base_url)?;
    client = match &profile.email {
        Some(email) => client.with_basic_auth(email.clone(), profile.token.clone()),
        None => client.with_bearer_token(profile.token.clone()),
    };

    if let Some(timeout) = profile.timeout {
        client = client.with_timeout(timeout);
    }
    if let Some(max_attempts) = profile.max_retries {
        client = client.with_retry_config(RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        });
    }

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_users_config::Profile;

    fn config_with(profile: Profile) -> Config {
        let mut config = Config::default();
        config.profiles.insert("ci-bot".to_string(), profile);
        config
    }

    fn empty_store() -> CredentialStore {
        CredentialStore::new("/nonexistent/jira-users/credentials")
    }

    #[test]
    fn test_resolve_uses_config_token() {
        let config = config_with(Profile {
            base_url: Some("https://example.atlassian.net".to_string()),
            email: Some("bot@example.com".to_string()),
            api_token: Some("from-config".to_string()),
            timeout_secs: Some(5),
            max_retries: Some(1),
        });

        let profile = resolve_active_profile(&config, None, &empty_store()).unwrap();
        assert_eq!(profile.name, "ci-bot");
        assert_eq!(profile.timeout, Some(Duration::from_secs(5)));
        assert!(build_client(&profile).is_ok());
    }

    #[test]
    fn test_resolve_requires_base_url() {
        let config = config_with(Profile::default());
        let err = resolve_active_profile(&config, None, &empty_store())
            .err()
            .unwrap();
        assert!(err.to_string().contains("missing a base_url"));
    }

    #[test]
    fn test_resolve_without_profiles() {
        let err = resolve_active_profile(&Config::default(), None, &empty_store())
            .err()
            .unwrap();
        assert!(err.to_string().contains("auth login"));
    }
}
