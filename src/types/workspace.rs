// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::types::error::{EmptyFieldSnafu, Error, InvalidNameSnafu};
use k8s_openapi::api::rbac::v1 as rbacv1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::Display;

pub mod rbac;
pub mod state;

const MAX_SUBDOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Which workspace a provisioning run belongs to. Only used for attribution in logs and errors.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceIdentity {
    pub workspace_id: String,
    pub namespace: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceAccountSpec {
    #[serde(rename = "serviceAccountName", default)]
    pub name: String,
}

/// Permission rules a role is created with when it is missing.
///
/// The rules are passed through unchanged; an existing role is never patched to match them.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct RoleTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<rbacv1::PolicyRule>,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleKind {
    #[strum(to_string = "Role")]
    Role,

    #[strum(to_string = "ClusterRole")]
    ClusterRole,
}

/// The role a binding points at.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleTarget {
    pub kind: RoleKind,
    pub name: String,
}

impl RoleTarget {
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleKind::Role,
            name: name.into(),
        }
    }

    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleKind::ClusterRole,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RoleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RoleKind::Role => write!(f, "{}", self.name),
            RoleKind::ClusterRole => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Desired authorization state of one workspace namespace.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRbac {
    #[serde(flatten)]
    pub identity: WorkspaceIdentity,

    #[serde(flatten)]
    pub service_account: ServiceAccountSpec,

    /// Declared roles, keyed by name. Keys are unique so duplicates collapse into one role.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, RoleTemplate>,

    /// Existing cluster roles granted to the account through namespaced bindings.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cluster_roles: BTreeSet<String>,
}

impl WorkspaceRbac {
    pub fn new(
        workspace_id: impl Into<String>,
        namespace: impl Into<String>,
        service_account_name: impl Into<String>,
    ) -> Self {
        Self {
            identity: WorkspaceIdentity {
                workspace_id: workspace_id.into(),
                namespace: namespace.into(),
            },
            service_account: ServiceAccountSpec {
                name: service_account_name.into(),
            },
            ..Default::default()
        }
    }

    pub fn with_role(mut self, name: impl Into<String>, template: RoleTemplate) -> Self {
        self.roles.insert(name.into(), template);
        self
    }

    pub fn with_cluster_role(mut self, name: impl Into<String>) -> Self {
        self.cluster_roles.insert(name.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.identity.namespace
    }

    pub fn workspace_id(&self) -> &str {
        &self.identity.workspace_id
    }

    pub fn service_account_name(&self) -> &str {
        &self.service_account.name
    }

    pub fn role_targets(&self) -> impl Iterator<Item = RoleTarget> + '_ {
        self.roles.keys().map(RoleTarget::role)
    }

    pub fn cluster_role_targets(&self) -> impl Iterator<Item = RoleTarget> + '_ {
        self.cluster_roles.iter().map(RoleTarget::cluster_role)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.workspace_id().is_empty() {
            return EmptyFieldSnafu {
                field: "workspaceId",
            }
            .fail();
        }

        validate_name("namespace", self.namespace(), MAX_LABEL_LEN, false)?;
        validate_name(
            "serviceAccountName",
            self.service_account_name(),
            MAX_SUBDOMAIN_LEN,
            true,
        )?;

        for role in self.roles.keys() {
            validate_path_segment("role", role)?;
        }
        for role in &self.cluster_roles {
            validate_path_segment("clusterRole", role)?;
        }

        Ok(())
    }
}

/// RFC 1123 label (`allow_dots == false`) or subdomain check.
fn validate_name(field: &str, value: &str, max_len: usize, allow_dots: bool) -> Result<(), Error> {
    if value.is_empty() {
        return EmptyFieldSnafu { field }.fail();
    }

    let invalid = |message: String| {
        InvalidNameSnafu {
            field,
            value,
            message,
        }
        .fail()
    };

    if value.len() > max_len {
        return invalid(format!("must be no more than {max_len} characters"));
    }

    let bytes = value.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return invalid("must start and end with an alphanumeric character".to_owned());
    }

    if let Some(c) = value.chars().find(|c| {
        !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || (allow_dots && *c == '.'))
    }) {
        return invalid(format!("contains invalid character '{c}'"));
    }

    Ok(())
}

/// Role names only need to be usable as a URL path segment.
fn validate_path_segment(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return EmptyFieldSnafu { field }.fail();
    }

    if value == "." || value == ".." || value.contains(['/', '%']) {
        return InvalidNameSnafu {
            field,
            value,
            message: "may not be '.' or '..' and may not contain '/' or '%'",
        }
        .fail();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_targets_collapse_duplicates() {
        let rbac = WorkspaceRbac::new("ws", "ns", "sa")
            .with_role("role-foo", RoleTemplate::default())
            .with_role("role-foo", RoleTemplate::default())
            .with_role("role-bar", RoleTemplate::default());

        let targets: Vec<_> = rbac.role_targets().collect();
        assert_eq!(
            targets,
            vec![RoleTarget::role("role-bar"), RoleTarget::role("role-foo")]
        );
    }

    #[test]
    fn test_role_target_display() {
        assert_eq!(RoleTarget::role("edit").to_string(), "edit");
        assert_eq!(
            RoleTarget::cluster_role("view").to_string(),
            "ClusterRole/view"
        );
    }

    #[test]
    fn test_validate_accepts_reference_workspace() {
        let rbac = crate::tests::create_test_workspace(&["role-foo"]);
        assert!(rbac.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let rbac = WorkspaceRbac::new("", "ns", "sa");
        assert!(matches!(rbac.validate(), Err(Error::EmptyField { .. })));

        let rbac = WorkspaceRbac::new("ws", "ns", "");
        match rbac.validate() {
            Err(Error::EmptyField { field }) => assert_eq!(field, "serviceAccountName"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        // Uppercase is not allowed in object names
        let rbac = WorkspaceRbac::new("ws", "testNamespace", "sa");
        assert!(matches!(rbac.validate(), Err(Error::InvalidName { .. })));

        // Namespaces are labels, dots are not allowed
        let rbac = WorkspaceRbac::new("ws", "team.dev", "sa");
        assert!(matches!(rbac.validate(), Err(Error::InvalidName { .. })));

        let rbac = WorkspaceRbac::new("ws", "ns", "sa").with_role("a/b", RoleTemplate::default());
        assert!(matches!(rbac.validate(), Err(Error::InvalidName { .. })));

        let rbac = WorkspaceRbac::new("ws", "ns", "sa").with_cluster_role("..");
        assert!(matches!(rbac.validate(), Err(Error::InvalidName { .. })));

        let rbac = WorkspaceRbac::new("ws", "ns", "a".repeat(254));
        assert!(matches!(rbac.validate(), Err(Error::InvalidName { .. })));
    }

    #[test]
    fn test_validate_length_limits() {
        let rbac = WorkspaceRbac::new("ws", "a".repeat(63), "sa");
        assert!(rbac.validate().is_ok());

        let rbac = WorkspaceRbac::new("ws", "a".repeat(64), "sa");
        match rbac.validate() {
            Err(Error::InvalidName { field, .. }) => assert_eq!(field, "namespace"),
            other => panic!("unexpected result: {other:?}"),
        }

        let rbac = WorkspaceRbac::new("ws", "ns", format!("{}.{}", "a".repeat(126), "b".repeat(126)));
        assert!(rbac.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_role_names_outside_rfc1123() {
        let rbac = WorkspaceRbac::new("ws", "ns", "sa").with_role("role-A", RoleTemplate::default());
        assert!(rbac.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_system_cluster_roles() {
        let rbac = WorkspaceRbac::new("ws", "ns", "sa").with_cluster_role("system:aggregate-to-view");
        assert!(rbac.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = r#"
workspaceId: workspace123
namespace: test-namespace
serviceAccountName: workspace-sa
roles:
  role-foo:
    rules:
      - apiGroups: [""]
        resources: ["pods"]
        verbs: ["get", "list"]
  role-bar: {}
clusterRoles: [view]
"#;
        let rbac: WorkspaceRbac = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(rbac.workspace_id(), "workspace123");
        assert_eq!(rbac.namespace(), "test-namespace");
        assert_eq!(rbac.service_account_name(), "workspace-sa");
        assert_eq!(rbac.roles.len(), 2);
        assert_eq!(rbac.roles["role-foo"].rules.len(), 1);
        assert_eq!(rbac.roles["role-foo"].rules[0].verbs, vec!["get", "list"]);
        assert!(rbac.roles["role-bar"].rules.is_empty());
        assert!(rbac.cluster_roles.contains("view"));
    }
}
