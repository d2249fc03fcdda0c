//! Core types for CiProbe

use serde::{Deserialize, Serialize};
use std::fmt;

/// API grouping an entity belongs to on the build server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Projects,
    BuildTypes,
    Users,
}

impl Category {
    /// All categories, in cleanup order.
    ///
    /// Build configurations go before the projects that own them.
    pub const ALL: [Category; 3] = [Category::BuildTypes, Category::Projects, Category::Users];

    /// REST collection path relative to the server root
    pub fn path(&self) -> &'static str {
        match self {
            Category::Projects => "/app/rest/projects",
            Category::BuildTypes => "/app/rest/buildTypes",
            Category::Users => "/app/rest/users",
        }
    }

    /// Member of a collection response that holds the matching entities
    pub fn collection_key(&self) -> &'static str {
        match self {
            Category::Projects => "project",
            Category::BuildTypes => "buildType",
            Category::Users => "user",
        }
    }

    /// Locator that finds an entity of this category by its name
    pub fn name_locator(&self, name: &str) -> String {
        match self {
            Category::Users => format!("username:{}", name),
            _ => format!("name:{}", name),
        }
    }

    /// Locator for an identity string.
    ///
    /// Bare ids become `id:<id>`, identities that already are locators pass through.
    pub fn identity_locator(&self, identity: &str) -> String {
        if identity.contains(':') {
            identity.to_string()
        } else {
            format!("id:{}", identity)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Projects => "projects",
            Category::BuildTypes => "build_types",
            Category::Users => "users",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locators() {
        assert_eq!(Category::Users.name_locator("alice"), "username:alice");
        assert_eq!(Category::Projects.name_locator("Demo"), "name:Demo");
        assert_eq!(Category::Projects.identity_locator("proj_1"), "id:proj_1");
        assert_eq!(Category::Users.identity_locator("username:bob"), "username:bob");
        assert_eq!(Category::BuildTypes.collection_key(), "buildType");
    }

    #[test]
    fn test_cleanup_order_covers_every_category() {
        assert_eq!(Category::ALL.len(), 3);
        assert_eq!(Category::ALL[0], Category::BuildTypes);
    }
}
