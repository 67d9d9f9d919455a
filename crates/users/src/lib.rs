//! Typed client for the Jira `user` REST resource (`/rest/api/2/user`).
//!
//! ```ignore
//! use jira_users_api::ApiClient;
//! use jira_users_core::{UserSearch, UserService};
//!
//! let client = ApiClient::new("https://example.atlassian.net")?
//!     .with_basic_auth("admin@example.com", token);
//! let users = UserService::new(client);
//!
//! let me = users.get_self().await?;
//! let matches = users
//!     .find("jdoe", &UserSearch::new().max_results(10).include_active(true))
//!     .await?;
//! ```

pub mod error;
pub mod model;
pub mod pagination;
pub mod search;
pub mod service;

pub use error::{Result, UserError};
pub use model::{AccountType, AvatarUrls, User, UserGroup};
pub use pagination::{collect_pages, Paginator, UserSearchPager};
pub use search::UserSearch;
pub use service::UserService;
