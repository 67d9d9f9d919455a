use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use jira_users_auth::{token_key, CredentialStore};
use jira_users_config::Config;
use jira_users_core::UserService;
use jira_users_output::OutputRenderer;
use serde::Serialize;
use url::Url;

use crate::{build_client, resolve_active_profile};

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Add or update a profile and store its API token
    Login(LoginArgs),
    /// Remove stored credentials (and optionally the profile)
    Logout(LogoutArgs),
    /// List configured profiles
    List,
    /// Check that the active profile can authenticate
    Test,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Profile name to create or update
    pub name: String,
    /// Jira base URL (e.g. https://example.atlassian.net)
    #[arg(long)]
    pub base_url: String,
    /// Account email for basic auth; omit to use the token as a bearer token
    #[arg(long)]
    pub email: Option<String>,
    /// API token (falls back to an interactive prompt)
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Mark this profile as the default one
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LogoutArgs {
    /// Profile to remove credentials for
    pub name: String,
    /// Remove the profile from the config entirely
    #[arg(long)]
    pub remove_profile: bool,
}

pub struct AuthContext<'a> {
    pub config: &'a mut Config,
    pub config_path: Option<&'a Path>,
    pub store: &'a CredentialStore,
    pub renderer: &'a OutputRenderer,
    pub requested_profile: Option<&'a str>,
}

pub async fn handle(command: AuthCommand, ctx: AuthContext<'_>) -> Result<()> {
    match command {
        AuthCommand::Login(args) => login(args, ctx),
        AuthCommand::Logout(args) => logout(args, ctx),
        AuthCommand::List => list_profiles(ctx),
        AuthCommand::Test => test_auth(ctx).await,
    }
}

fn login(args: LoginArgs, ctx: AuthContext<'_>) -> Result<()> {
    if args.name.trim().is_empty() {
        return Err(anyhow!("Profile name cannot be empty"));
    }

    let base_url = Url::parse(&args.base_url)
        .with_context(|| format!("Invalid Jira base URL: {}", args.base_url))?;

    let token = match args.token {
        Some(token) if !token.trim().is_empty() => token.trim().to_owned(),
        _ => read_token_from_stdin().context("Failed to read token from prompt")?,
    };
    if token.is_empty() {
        return Err(anyhow!("API token cannot be empty"));
    }

    let profile = ctx.config.profiles.entry(args.name.clone()).or_default();
    profile.base_url = Some(base_url.to_string());
    profile.email = args.email;
    profile.api_token = None;

    if args.default || ctx.config.default_profile.is_none() {
        ctx.config.default_profile = Some(args.name.clone());
    }

    ctx.store
        .set_secret(&token_key(&args.name), &token)
        .context("Failed to store API token")?;

    ctx.config
        .save(ctx.config_path)
        .context("Unable to persist configuration file")?;

    tracing::info!(profile = %args.name, base_url = %base_url, "Profile saved");
    Ok(())
}

fn logout(args: LogoutArgs, ctx: AuthContext<'_>) -> Result<()> {
    if ctx.config.profile(&args.name).is_none() {
        return Err(anyhow!("Profile '{}' does not exist", args.name));
    }

    let removed = ctx
        .store
        .delete_secret(&token_key(&args.name))
        .context("Failed to delete stored token")?;

    if args.remove_profile {
        ctx.config.remove_profile(&args.name);
    }

    ctx.config
        .save(ctx.config_path)
        .context("Unable to persist configuration file")?;

    tracing::info!(profile = %args.name, token_removed = removed, "Credentials removed");
    Ok(())
}

fn list_profiles(ctx: AuthContext<'_>) -> Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        name: &'a str,
        base_url: &'a str,
        email: &'a str,
        has_token: bool,
        is_default: bool,
    }

    let mut rows = Vec::new();
    for (name, profile) in &ctx.config.profiles {
        rows.push(Row {
            name,
            base_url: profile.base_url.as_deref().unwrap_or(""),
            email: profile.email.as_deref().unwrap_or(""),
            has_token: profile.api_token.is_some()
                || ctx.store.get_secret(&token_key(name))?.is_some(),
            is_default: ctx.config.default_profile.as_deref() == Some(name.as_str()),
        });
    }

    if rows.is_empty() {
        tracing::info!("No profiles configured yet. Use `jira-users auth login` to add one.");
        return Ok(());
    }

    ctx.renderer.render(&rows)
}

async fn test_auth(ctx: AuthContext<'_>) -> Result<()> {
    let profile = resolve_active_profile(ctx.config, ctx.requested_profile, ctx.store)?;
    let service = UserService::new(build_client(&profile)?);

    eprintln!("Testing authentication for profile '{}'...", profile.name);
    match service.get_self().await {
        Ok(me) => {
            eprintln!("{} Authentication successful", "✓".green());
            eprintln!("   Base URL: {}", profile.base_url);
            eprintln!(
                "   User: {}",
                me.display_name
                    .as_deref()
                    .or(me.identifier())
                    .unwrap_or("unknown")
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{} Authentication failed: {}", "✗".red(), err);
            if let Some(hint) = err.suggestion() {
                eprintln!("   {hint}");
            }
            Err(err.into())
        }
    }
}

fn read_token_from_stdin() -> Result<String> {
    use std::io::{self, Write};

    eprint!("Enter API token: ");
    io::stderr().flush().context("Failed to flush stderr")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    Ok(line.trim().to_owned())
}
