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

//! Loading the desired workspace authorization state from a YAML file and command-line flags.

use crate::types::workspace::{RoleTemplate, WorkspaceRbac};
use snafu::futures::TryFutureExt;
use snafu::{ResultExt, Snafu};
use std::path::{Path, PathBuf};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read config file '{}': {}", path.display(), source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse config file '{}': {}", path.display(), source))]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
}

/// Values given on the command line (or through the environment) win over the file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Workspace the run is attributed to
    #[arg(long, env = "WORKSPACE_ID")]
    pub workspace_id: Option<String>,

    /// Target namespace
    #[arg(long, env = "WORKSPACE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Name of the workspace service account
    #[arg(long, env = "WORKSPACE_SERVICE_ACCOUNT")]
    pub service_account: Option<String>,

    /// Additional role to provision with an empty rule template (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Existing cluster role to bind to the service account (repeatable)
    #[arg(long = "cluster-role")]
    pub cluster_roles: Vec<String>,
}

impl Overrides {
    pub fn apply(self, mut rbac: WorkspaceRbac) -> WorkspaceRbac {
        if let Some(workspace_id) = self.workspace_id {
            rbac.identity.workspace_id = workspace_id;
        }
        if let Some(namespace) = self.namespace {
            rbac.identity.namespace = namespace;
        }
        if let Some(service_account) = self.service_account {
            rbac.service_account.name = service_account;
        }
        for role in self.roles {
            // keep the file's template when the role is declared there too
            rbac.roles.entry(role).or_insert_with(RoleTemplate::default);
        }
        rbac.cluster_roles.extend(self.cluster_roles);
        rbac
    }
}

pub fn from_yaml(path: &Path, contents: &str) -> Result<WorkspaceRbac, Error> {
    serde_yaml_ng::from_str(contents).context(ParseSnafu { path })
}

pub async fn load(path: &Path) -> Result<WorkspaceRbac, Error> {
    let contents = tokio::fs::read_to_string(path)
        .context(ReadSnafu { path })
        .await?;
    from_yaml(path, &contents)
}

/// Loads `path` when given, otherwise starts from an empty state, then applies `overrides`.
pub async fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<WorkspaceRbac, Error> {
    let rbac = match path {
        Some(path) => load(path).await?,
        None => WorkspaceRbac::default(),
    };
    Ok(overrides.apply(rbac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::workspace::RoleTarget;

    const CONFIG: &str = r#"
workspaceId: workspace123
namespace: test-namespace
serviceAccountName: workspace-sa
roles:
  role-foo:
    rules:
      - apiGroups: ["apps"]
        resources: ["deployments"]
        verbs: ["get", "list", "watch"]
"#;

    #[test]
    fn test_from_yaml() {
        let rbac = from_yaml(Path::new("workspace.yaml"), CONFIG).unwrap();

        assert_eq!(rbac.workspace_id(), "workspace123");
        assert_eq!(
            rbac.role_targets().collect::<Vec<_>>(),
            vec![RoleTarget::role("role-foo")]
        );
        assert!(rbac.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_reports_path() {
        let err = from_yaml(Path::new("broken.yaml"), "roles: [").unwrap_err();

        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let rbac = from_yaml(Path::new("workspace.yaml"), CONFIG).unwrap();
        let overrides = Overrides {
            namespace: Some("other-namespace".to_string()),
            service_account: Some("builder".to_string()),
            roles: vec!["role-foo".to_string(), "role-bar".to_string()],
            cluster_roles: vec!["view".to_string()],
            ..Default::default()
        };

        let rbac = overrides.apply(rbac);

        assert_eq!(rbac.workspace_id(), "workspace123");
        assert_eq!(rbac.namespace(), "other-namespace");
        assert_eq!(rbac.service_account_name(), "builder");
        assert_eq!(rbac.roles.len(), 2);
        // the file template survives a repeated --role
        assert_eq!(rbac.roles["role-foo"].rules.len(), 1);
        assert!(rbac.roles["role-bar"].rules.is_empty());
        assert!(rbac.cluster_roles.contains("view"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/workspace.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Read { .. }));
    }

    #[tokio::test]
    async fn test_resolve_without_file() {
        let overrides = Overrides {
            workspace_id: Some("ws".to_string()),
            namespace: Some("ns".to_string()),
            service_account: Some("sa".to_string()),
            roles: vec!["edit".to_string()],
            ..Default::default()
        };

        let rbac = resolve(None, overrides).await.unwrap();

        assert!(rbac.validate().is_ok());
        assert_eq!(rbac.role_targets().count(), 1);
    }
}
