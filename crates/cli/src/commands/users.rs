use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Args, Subcommand};
use colored::Colorize;
use jira_users_core::{collect_pages, User, UserSearch, UserSearchPager, UserService};
use jira_users_output::{OutputFormat, OutputRenderer};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub struct UsersContext<'a> {
    pub service: UserService,
    pub renderer: &'a OutputRenderer,
    pub cancel: CancellationToken,
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Fetch a user by username or account ID
    Get(GetArgs),
    /// Show the user the credentials belong to
    Me,
    /// Create a user
    Create(CreateArgs),
    /// Delete a user
    Delete(DeleteArgs),
    /// List the groups a user belongs to
    Groups(GroupsArgs),
    /// Search users by username, name or email
    Find(FindArgs),
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("identity").required(true).args(["username", "account_id"])))]
pub struct GetArgs {
    /// Legacy username (Jira Server / Data Center)
    #[arg(long)]
    pub username: Option<String>,
    /// Atlassian account ID
    #[arg(long)]
    pub account_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Email address of the new user
    #[arg(long)]
    pub email: String,
    /// Display name
    #[arg(long)]
    pub display_name: Option<String>,
    /// Username (Jira Server / Data Center)
    #[arg(long)]
    pub name: Option<String>,
    /// Initial password
    #[arg(long, env = "JIRA_USERS_NEW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Application access to grant (repeatable, e.g. jira-software)
    #[arg(long = "application-key")]
    pub application_keys: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Username of the user to delete
    #[arg(long)]
    pub username: String,
    /// Confirm the deletion
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GroupsArgs {
    /// Username whose groups to list
    #[arg(long)]
    pub username: String,
}

#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    /// Text matched against username, name and email
    pub property: String,
    /// Maximum number of users per request
    #[arg(long)]
    pub max_results: Option<u32>,
    /// Index of the first result
    #[arg(long, conflicts_with = "all")]
    pub start_at: Option<u32>,
    /// Include active users
    #[arg(long)]
    pub active: Option<bool>,
    /// Include inactive users
    #[arg(long)]
    pub inactive: Option<bool>,
    /// Fetch every page of results
    #[arg(long)]
    pub all: bool,
    /// Stop after this many users (with --all)
    #[arg(long, requires = "all")]
    pub limit: Option<usize>,
}

impl FindArgs {
    fn search(&self) -> UserSearch {
        let mut search = UserSearch::new();
        if let Some(max) = self.max_results {
            search = search.max_results(max);
        }
        if let Some(start) = self.start_at {
            search = search.start_at(start);
        }
        if let Some(active) = self.active {
            search = search.include_active(active);
        }
        if let Some(inactive) = self.inactive {
            search = search.include_inactive(inactive);
        }
        search
    }
}

const DEFAULT_PAGE_SIZE: u32 = 50;

pub async fn execute(command: UserCommand, ctx: &UsersContext<'_>) -> Result<()> {
    match command {
        UserCommand::Get(args) => get_user(ctx, args).await,
        UserCommand::Me => show_self(ctx).await,
        UserCommand::Create(args) => create_user(ctx, args).await,
        UserCommand::Delete(args) => delete_user(ctx, &args.username, args.force).await,
        UserCommand::Groups(args) => list_groups(ctx, &args.username).await,
        UserCommand::Find(args) => find_users(ctx, args).await,
    }
}

async fn get_user(ctx: &UsersContext<'_>, args: GetArgs) -> Result<()> {
    let user = match (args.username.as_deref(), args.account_id.as_deref()) {
        (Some(username), _) => ctx
            .service
            .get_with_context(&ctx.cancel, username)
            .await
            .with_context(|| format!("Failed to fetch user {username}"))?,
        (None, Some(account_id)) => ctx
            .service
            .get_by_account_id_with_context(&ctx.cancel, account_id)
            .await
            .with_context(|| format!("Failed to fetch user {account_id}"))?,
        (None, None) => return Err(anyhow!("Pass --username or --account-id")),
    };

    ctx.renderer.render(&user)
}

async fn show_self(ctx: &UsersContext<'_>) -> Result<()> {
    let me = ctx
        .service
        .get_self_with_context(&ctx.cancel)
        .await
        .context("Failed to fetch the current user")?;

    ctx.renderer.render(&me)
}

async fn create_user(ctx: &UsersContext<'_>, args: CreateArgs) -> Result<()> {
    let user = User {
        name: args.name,
        password: args.password,
        email_address: Some(args.email),
        display_name: args.display_name,
        application_keys: (!args.application_keys.is_empty()).then_some(args.application_keys),
        ..Default::default()
    };

    let created = ctx
        .service
        .create_with_context(&ctx.cancel, &user)
        .await
        .context("Failed to create user")?;

    tracing::info!(
        id = created.identifier().unwrap_or(""),
        "User created successfully"
    );
    ctx.renderer.render(&created)
}

async fn delete_user(ctx: &UsersContext<'_>, username: &str, force: bool) -> Result<()> {
    if !force {
        eprintln!("{} About to delete user: {}", "warning:".yellow().bold(), username);
        eprintln!("Use --force to confirm deletion");
        return Ok(());
    }

    let status = ctx
        .service
        .delete_with_context(&ctx.cancel, username)
        .await
        .with_context(|| format!("Failed to delete user {username}"))?;

    tracing::debug!(status = status.as_u16(), "Delete acknowledged");
    eprintln!("{} Deleted user {}", "✓".green(), username);
    Ok(())
}

async fn list_groups(ctx: &UsersContext<'_>, username: &str) -> Result<()> {
    let groups = ctx
        .service
        .get_groups_with_context(&ctx.cancel, username)
        .await
        .with_context(|| format!("Failed to list groups for {username}"))?;

    if groups.is_empty() {
        tracing::info!(username, "User is not a member of any group");
        return Ok(());
    }

    ctx.renderer.render(&groups)
}

async fn find_users(ctx: &UsersContext<'_>, args: FindArgs) -> Result<()> {
    let search = args.search();

    let users = if args.all {
        let page_size = args.max_results.unwrap_or(DEFAULT_PAGE_SIZE);
        let pager = UserSearchPager::new(&ctx.service, args.property.clone(), search)
            .with_context(ctx.cancel.clone());
        collect_pages(&pager, page_size, args.limit)
            .await
            .with_context(|| format!("Failed to search users matching '{}'", args.property))?
    } else {
        ctx.service
            .find_with_context(&ctx.cancel, &args.property, &search)
            .await
            .with_context(|| format!("Failed to search users matching '{}'", args.property))?
    };

    if users.is_empty() {
        tracing::info!(property = %args.property, "No users matched");
        return Ok(());
    }

    render_users(ctx.renderer, &users)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Row<'a> {
    account_id: &'a str,
    name: &'a str,
    display_name: &'a str,
    email_address: &'a str,
    /// Left empty when the server did not report it.
    active: Option<bool>,
}

fn summary_rows(users: &[User]) -> Vec<Row<'_>> {
    users
        .iter()
        .map(|user| Row {
            account_id: user.account_id.as_deref().unwrap_or(""),
            name: user.name.as_deref().unwrap_or(""),
            display_name: user.display_name.as_deref().unwrap_or(""),
            email_address: user.email_address.as_deref().unwrap_or(""),
            active: user.active,
        })
        .collect()
}

/// Full records for structured formats, a compact summary otherwise.
fn render_users(renderer: &OutputRenderer, users: &[User]) -> Result<()> {
    match renderer.format() {
        OutputFormat::Json | OutputFormat::Yaml => renderer.render(&users),
        _ => renderer.render(&summary_rows(users)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_args() -> FindArgs {
        FindArgs {
            property: "jdoe".to_string(),
            max_results: None,
            start_at: None,
            active: None,
            inactive: None,
            all: false,
            limit: None,
        }
    }

    #[test]
    fn test_find_args_without_flags() {
        assert!(find_args().search().is_empty());
    }

    #[test]
    fn test_find_args_to_search() {
        let args = FindArgs {
            max_results: Some(10),
            active: Some(true),
            inactive: Some(false),
            ..find_args()
        };

        assert_eq!(
            args.search().query("jdoe"),
            vec![
                ("username", "jdoe"),
                ("maxResults", "10"),
                ("includeActive", "true"),
                ("includeInactive", "false"),
            ]
        );
    }

    #[test]
    fn test_summary_keeps_unknown_active_empty() {
        let users = vec![
            User {
                account_id: Some("abc".to_string()),
                active: Some(false),
                ..User::default()
            },
            User {
                account_id: Some("def".to_string()),
                ..User::default()
            },
        ];

        let renderer = OutputRenderer::new(OutputFormat::Csv);
        let mut out = Vec::new();
        renderer.write(&mut out, &summary_rows(&users)).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "accountId,active,displayName,emailAddress,name");
        assert_eq!(lines[1], "abc,false,,,");
        assert_eq!(lines[2], "def,,,,");
    }
}
