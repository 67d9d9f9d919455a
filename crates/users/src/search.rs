/// Optional parameters for a user search.
///
/// Parameters are sent in the order they were first set; setting one again
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSearch {
    params: Vec<(&'static str, String)>,
}

impl UserSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of users to return.
    pub fn max_results(self, max_results: u32) -> Self {
        self.set("maxResults", max_results.to_string())
    }

    /// Index of the first user to return (pagination offset).
    pub fn start_at(self, start_at: u32) -> Self {
        self.set("startAt", start_at.to_string())
    }

    pub fn include_active(self, active: bool) -> Self {
        self.set("includeActive", active.to_string())
    }

    pub fn include_inactive(self, inactive: bool) -> Self {
        self.set("includeInactive", inactive.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Full query for `property`: `username` first, then the options.
    pub fn query<'a>(&'a self, property: &'a str) -> Vec<(&'a str, &'a str)> {
        std::iter::once(("username", property))
            .chain(self.params.iter().map(|(name, value)| (*name, value.as_str())))
            .collect()
    }

    fn set(mut self, name: &'static str, value: String) -> Self {
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_options_only_username() {
        let search = UserSearch::new();
        assert!(search.is_empty());
        assert_eq!(search.query("jdoe"), vec![("username", "jdoe")]);
    }

    #[test]
    fn test_options_follow_call_order() {
        let search = UserSearch::new()
            .include_inactive(false)
            .start_at(20)
            .max_results(10)
            .include_active(true);

        assert_eq!(
            search.query("jdoe"),
            vec![
                ("username", "jdoe"),
                ("includeInactive", "false"),
                ("startAt", "20"),
                ("maxResults", "10"),
                ("includeActive", "true"),
            ]
        );
    }

    #[test]
    fn test_repeated_option_overwrites_in_place() {
        let search = UserSearch::new()
            .max_results(10)
            .include_active(true)
            .max_results(25);

        assert_eq!(search.get("maxResults"), Some("25"));
        assert_eq!(
            search.query("jdoe"),
            vec![
                ("username", "jdoe"),
                ("maxResults", "25"),
                ("includeActive", "true"),
            ]
        );
    }

    #[test]
    fn test_get_missing() {
        assert_eq!(UserSearch::new().start_at(5).get("maxResults"), None);
    }
}
