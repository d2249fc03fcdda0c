//! Models of the build server's REST resources
//!
//! Field names serialize to the server's camelCase JSON names. Every field a
//! schema declares must also appear in the serialized default instance, so
//! optional values serialize as `null` instead of being skipped.

use serde::{Deserialize, Serialize};

use crate::schema::{Entity, Field, Model, ModelSchema};
use crate::types::Category;

/// Locator of the server's root project
pub const ROOT_PROJECT: &str = "_Root";

/// Project, as sent to and returned by `/app/rest/projects`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Option<String>,
    pub name: Option<String>,
    pub locator: Option<String>,
    pub parent_project: Option<ParentProject>,
    pub copy_all_associated_settings: Option<bool>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            locator: None,
            parent_project: None,
            copy_all_associated_settings: Some(true),
        }
    }
}

impl Model for Project {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("project")
            .field(Field::text("id").param().random())
            .field(Field::text("name").param().random())
            .field(Field::text("locator").optional())
            .field(Field::model::<ParentProject>("parentProject").optional())
            .field(Field::flag("copyAllAssociatedSettings").optional())
    }
}

impl Entity for Project {
    const CATEGORY: Category = Category::Projects;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentProject {
    pub locator: Option<String>,
}

impl Default for ParentProject {
    fn default() -> Self {
        Self {
            locator: Some(ROOT_PROJECT.to_string()),
        }
    }
}

impl Model for ParentProject {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("parentProject").field(Field::text("locator"))
    }
}

/// Build configuration, `/app/rest/buildTypes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildType {
    pub id: Option<String>,
    pub name: Option<String>,
    pub project: Option<Project>,
    pub steps: Option<Steps>,
}

impl Model for BuildType {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("buildType")
            .field(Field::text("id").param().random())
            .field(Field::text("name").param().random())
            .field(Field::model::<Project>("project"))
            .field(Field::model::<Steps>("steps").optional())
    }
}

impl Entity for BuildType {
    const CATEGORY: Category = Category::BuildTypes;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Steps {
    pub count: Option<i64>,
    pub step: Option<Vec<Step>>,
}

impl Model for Steps {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("steps")
            .field(Field::number("count").optional())
            .field(Field::model_list::<Step>("step"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub step_type: Option<String>,
    pub properties: Option<Properties>,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            step_type: Some("simpleRunner".to_string()),
            properties: None,
        }
    }
}

impl Model for Step {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("step")
            .field(Field::text("id").optional())
            .field(Field::text("name").random())
            .field(Field::text("type"))
            .field(Field::model::<Properties>("properties").optional())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub count: Option<i64>,
    pub property: Option<Vec<Property>>,
}

impl Model for Properties {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("properties")
            .field(Field::number("count").optional())
            .field(Field::model_list::<Property>("property"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

impl Model for Property {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("property")
            .field(Field::text("name").param())
            .field(Field::text("value").param())
    }
}

/// User account, `/app/rest/users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Roles>,
}

impl Model for User {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("user")
            .field(Field::number("id").optional())
            .field(Field::text("username").param().random())
            .field(Field::text("password").param().random())
            .field(Field::text("email").optional())
            .field(Field::model::<Roles>("roles"))
    }
}

impl Entity for User {
    const CATEGORY: Category = Category::Users;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roles {
    pub role: Option<Vec<Role>>,
}

impl Roles {
    pub fn single(role: Role) -> Self {
        Self {
            role: Some(vec![role]),
        }
    }
}

impl Model for Roles {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("roles").field(Field::model_list::<Role>("role"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: Option<String>,
    pub scope: Option<String>,
}

impl Role {
    /// Global system administrator
    pub fn system_admin() -> Self {
        Self::default()
    }

    /// Role granted on a single project
    pub fn in_project(role_id: impl Into<String>, project_id: &str) -> Self {
        Self {
            role_id: Some(role_id.into()),
            scope: Some(format!("p:{}", project_id)),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self {
            role_id: Some("SYSTEM_ADMIN".to_string()),
            scope: Some("g".to_string()),
        }
    }
}

impl Model for Role {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("role")
            .field(Field::text("roleId").param())
            .field(Field::text("scope").param())
    }
}

/// One of each top-level entity a test usually needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub project: Project,
    pub build_type: BuildType,
    pub user: User,
}

impl Model for TestData {
    fn schema() -> ModelSchema {
        ModelSchema::of::<Self>("testData")
            .field(Field::model::<Project>("project"))
            .field(Field::model::<BuildType>("buildType"))
            .field(Field::model::<User>("user"))
    }
}
