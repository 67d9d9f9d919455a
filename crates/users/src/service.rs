use jira_users_api::{ApiClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, UserError};
use crate::model::{User, UserGroup};
use crate::search::UserSearch;

const USER_ENDPOINT: &str = "/rest/api/2/user";
const USER_GROUPS_ENDPOINT: &str = "/rest/api/2/user/groups";
const USER_SEARCH_ENDPOINT: &str = "/rest/api/2/user/search";
const MYSELF_ENDPOINT: &str = "/rest/api/2/myself";

/// Operations on the Jira `user` resource.
///
/// Each `*_with_context` method issues exactly one request and forwards the
/// token to the client. The plain variants use a token that never fires.
#[derive(Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Fetches a user by legacy username.
    ///
    /// Jira Cloud removed username lookups for privacy reasons; prefer
    /// [`UserService::get_by_account_id_with_context`] there.
    pub async fn get_with_context(&self, ctx: &CancellationToken, username: &str) -> Result<User> {
        debug!(username, "Fetching user by username");
        self.fetch(ctx, "get user", USER_ENDPOINT, &[("username", username)])
            .await
    }

    pub async fn get(&self, username: &str) -> Result<User> {
        self.get_with_context(&CancellationToken::new(), username)
            .await
    }

    pub async fn get_by_account_id_with_context(
        &self,
        ctx: &CancellationToken,
        account_id: &str,
    ) -> Result<User> {
        debug!(account_id, "Fetching user by account id");
        self.fetch(
            ctx,
            "get user by account id",
            USER_ENDPOINT,
            &[("accountId", account_id)],
        )
        .await
    }

    pub async fn get_by_account_id(&self, account_id: &str) -> Result<User> {
        self.get_by_account_id_with_context(&CancellationToken::new(), account_id)
            .await
    }

    /// Creates a user and returns the representation Jira sends back.
    ///
    /// The body is read and decoded here rather than by the client so that an
    /// unreadable body and a malformed one surface as different errors.
    pub async fn create_with_context(&self, ctx: &CancellationToken, user: &User) -> Result<User> {
        let request = self.build(ctx, Method::POST, USER_ENDPOINT, &[], Some(user))?;
        let response = self
            .client
            .send(request)
            .await
            .map_err(UserError::api("create user"))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| UserError::ReadBody { source })?;
        let created: User = serde_json::from_slice(&body)
            .map_err(|source| UserError::DecodeBody { status, source })?;

        info!(
            account_id = created.account_id.as_deref().unwrap_or(""),
            name = created.name.as_deref().unwrap_or(""),
            "User created"
        );
        Ok(created)
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        self.create_with_context(&CancellationToken::new(), user)
            .await
    }

    /// Deletes a user. Jira answers `204 No Content`; the status is returned
    /// for callers that want to check it.
    pub async fn delete_with_context(
        &self,
        ctx: &CancellationToken,
        username: &str,
    ) -> Result<StatusCode> {
        let request = self.build(
            ctx,
            Method::DELETE,
            USER_ENDPOINT,
            &[("username", username)],
            None,
        )?;
        let response = self
            .client
            .send(request)
            .await
            .map_err(UserError::api("delete user"))?;

        info!(username, status = response.status().as_u16(), "User deleted");
        Ok(response.status())
    }

    pub async fn delete(&self, username: &str) -> Result<StatusCode> {
        self.delete_with_context(&CancellationToken::new(), username)
            .await
    }

    /// Groups the user belongs to, in the order Jira returns them.
    pub async fn get_groups_with_context(
        &self,
        ctx: &CancellationToken,
        username: &str,
    ) -> Result<Vec<UserGroup>> {
        debug!(username, "Fetching user groups");
        let groups: Option<Vec<UserGroup>> = self
            .fetch(
                ctx,
                "get user groups",
                USER_GROUPS_ENDPOINT,
                &[("username", username)],
            )
            .await?;
        Ok(groups.unwrap_or_default())
    }

    pub async fn get_groups(&self, username: &str) -> Result<Vec<UserGroup>> {
        self.get_groups_with_context(&CancellationToken::new(), username)
            .await
    }

    /// The user the client is authenticated as.
    pub async fn get_self_with_context(&self, ctx: &CancellationToken) -> Result<User> {
        debug!("Fetching current user");
        self.fetch(ctx, "get current user", MYSELF_ENDPOINT, &[])
            .await
    }

    pub async fn get_self(&self) -> Result<User> {
        self.get_self_with_context(&CancellationToken::new())
            .await
    }

    /// Searches users by username, name or email. Matching is done by Jira.
    pub async fn find_with_context(
        &self,
        ctx: &CancellationToken,
        property: &str,
        search: &UserSearch,
    ) -> Result<Vec<User>> {
        let query = search.query(property);
        debug!(property, params = query.len(), "Searching users");
        let users: Option<Vec<User>> = self
            .fetch(ctx, "find users", USER_SEARCH_ENDPOINT, &query)
            .await?;
        Ok(users.unwrap_or_default())
    }

    pub async fn find(&self, property: &str, search: &UserSearch) -> Result<Vec<User>> {
        self.find_with_context(&CancellationToken::new(), property, search)
            .await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &CancellationToken,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.build(ctx, Method::GET, path, query, None)?;
        self.client
            .execute(request)
            .await
            .map_err(UserError::api(operation))
    }

    fn build(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&User>,
    ) -> Result<jira_users_api::ApiRequest> {
        self.client
            .new_request(ctx, method, path, query, body)
            .map_err(UserError::Request)
    }
}
