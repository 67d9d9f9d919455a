use serde::{Deserialize, Serialize};

/// A Jira account.
///
/// Every field is optional: Jira omits what the caller may not see, and a
/// missing key is kept distinct from an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    /// Legacy username. Deprecated by Jira Cloud in favour of `account_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Legacy user key. Deprecated by Jira Cloud in favour of `account_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Client-side only; never read from nor written to JSON.
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_urls: Option<AvatarUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_keys: Option<Vec<String>>,
}

impl User {
    /// Best identifier available for display: account id, then legacy name, then key.
    pub fn identifier(&self) -> Option<&str> {
        self.account_id
            .as_deref()
            .or(self.name.as_deref())
            .or(self.key.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }
}

/// Avatar URLs keyed by pixel size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUrls {
    #[serde(rename = "16x16", default, skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    #[serde(rename = "24x24", default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(rename = "32x32", default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(rename = "48x48", default, skip_serializing_if = "Option::is_none")]
    pub xlarge: Option<String>,
}

/// Kind of account. Values Jira adds later are kept as [`AccountType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    Atlassian,
    App,
    Customer,
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Atlassian => "atlassian",
            AccountType::App => "app",
            AccountType::Customer => "customer",
            AccountType::Other(other) => other,
        }
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "atlassian" => AccountType::Atlassian,
            "app" => AccountType::App,
            "customer" => AccountType::Customer,
            _ => AccountType::Other(value),
        }
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group the user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_user() {
        let user: User = serde_json::from_value(json!({
            "self": "https://example.atlassian.net/rest/api/2/user?accountId=abc",
            "accountId": "abc",
            "accountType": "atlassian",
            "emailAddress": "jane@example.com",
            "avatarUrls": {
                "16x16": "https://avatar/16",
                "24x24": "https://avatar/24",
                "32x32": "https://avatar/32",
                "48x48": "https://avatar/48"
            },
            "displayName": "Jane Doe",
            "active": true,
            "timeZone": "Europe/Berlin",
            "locale": "en_US",
            "applicationKeys": ["jira-software", "jira-core"]
        }))
        .unwrap();

        assert_eq!(user.account_id.as_deref(), Some("abc"));
        assert_eq!(user.account_type, Some(AccountType::Atlassian));
        assert_eq!(user.time_zone.as_deref(), Some("Europe/Berlin"));
        let avatars = user.avatar_urls.as_ref().unwrap();
        assert_eq!(avatars.small.as_deref(), Some("https://avatar/16"));
        assert_eq!(avatars.xlarge.as_deref(), Some("https://avatar/48"));
        assert_eq!(
            user.application_keys,
            Some(vec!["jira-software".to_string(), "jira-core".to_string()])
        );
        assert!(user.is_active());
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let user: User = serde_json::from_value(json!({"displayName": "Bot"})).unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Bot"));
        assert!(user.active.is_none());
        assert!(user.application_keys.is_none());
        assert!(user.avatar_urls.is_none());
    }

    #[test]
    fn test_empty_values_are_not_absent() {
        let user: User = serde_json::from_value(json!({
            "emailAddress": "",
            "active": false,
            "applicationKeys": []
        }))
        .unwrap();

        assert_eq!(user.email_address.as_deref(), Some(""));
        assert_eq!(user.active, Some(false));
        assert_eq!(user.application_keys, Some(vec![]));

        let encoded = serde_json::to_value(&user).unwrap();
        assert_eq!(
            encoded,
            json!({"emailAddress": "", "active": false, "applicationKeys": []})
        );
    }

    #[test]
    fn test_password_is_never_serialized() {
        let user = User {
            name: Some("jdoe".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };

        let encoded = serde_json::to_string(&user).unwrap();
        assert!(!encoded.contains("password"));
        assert!(!encoded.contains("secret"));
        assert_eq!(encoded, r#"{"name":"jdoe"}"#);
    }

    #[test]
    fn test_password_is_never_decoded() {
        let user: User =
            serde_json::from_value(json!({"name": "jdoe", "password": "leaked"})).unwrap();
        assert!(user.password.is_none());
    }

    #[test]
    fn test_unknown_account_type_is_preserved() {
        let user: User = serde_json::from_value(json!({"accountType": "robot"})).unwrap();
        assert_eq!(
            user.account_type,
            Some(AccountType::Other("robot".to_string()))
        );
        let encoded = serde_json::to_value(&user).unwrap();
        assert_eq!(encoded["accountType"], "robot");
    }

    #[test]
    fn test_identifier_prefers_account_id() {
        let legacy = User {
            name: Some("jdoe".to_string()),
            key: Some("JIRAUSER1".to_string()),
            ..Default::default()
        };
        assert_eq!(legacy.identifier(), Some("jdoe"));

        let cloud = User {
            account_id: Some("abc".to_string()),
            ..legacy
        };
        assert_eq!(cloud.identifier(), Some("abc"));
        assert_eq!(User::default().identifier(), None);
    }

    #[test]
    fn test_decode_groups() {
        let groups: Vec<UserGroup> = serde_json::from_value(json!([
            {"name": "jira-users", "self": "https://example/group?groupname=jira-users"},
            {"name": "admins"}
        ]))
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name.as_deref(), Some("jira-users"));
        assert!(groups[1].self_url.is_none());
    }
}
