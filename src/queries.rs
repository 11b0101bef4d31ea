//! GraphQL operations issued by the route guards.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::gateway::{FetchPolicy, QueryRequest};

pub const GET_ORGS: &str = r#"query getOrgs {
  getOrgs {
    id
    name
  }
}"#;

pub const GET_ROLE_IN_PROJECT: &str = r#"query roleInProject($specId: ID!) {
  roleInProject(specId: $specId)
}"#;

pub const CHECK_INVITATION: &str = r#"query checkInvitation($id: ID!) {
  checkInvitation(id: $id)
}"#;

/// Organizations the caller belongs to. Served from the cache when possible.
pub fn get_orgs() -> QueryRequest {
    QueryRequest {
        operation: "getOrgs",
        query: GET_ORGS,
        variables: json!({}),
        fetch_policy: FetchPolicy::CacheFirst,
    }
}

pub fn role_in_project(spec_id: &str) -> QueryRequest {
    QueryRequest {
        operation: "roleInProject",
        query: GET_ROLE_IN_PROJECT,
        variables: json!({ "specId": spec_id }),
        fetch_policy: FetchPolicy::NetworkOnly,
    }
}

pub fn check_invitation(id: &str) -> QueryRequest {
    QueryRequest {
        operation: "checkInvitation",
        query: CHECK_INVITATION,
        variables: json!({ "id": id }),
        fetch_policy: FetchPolicy::NetworkOnly,
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetOrgsData {
    #[serde(rename = "getOrgs", default)]
    pub get_orgs: Option<Vec<Organization>>,
}

#[derive(Debug, Deserialize)]
pub struct RoleInProjectData {
    #[serde(rename = "roleInProject", default)]
    pub role_in_project: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInvitationData {
    #[serde(rename = "checkInvitation", default)]
    pub check_invitation: Option<Value>,
}

/// Whether a GraphQL scalar answer counts as "present": null, false, "" and 0 do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
