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

use super::{BatchOutcome, Presence, check_or_create};
use crate::context::{self, NamespaceClient};
use crate::types::workspace::WorkspaceRbac;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Ensures every declared role exists, one independent attempt per role.
///
/// Existing roles are never patched, even when their rules differ from the template.
/// A failing role does not stop the others.
pub async fn check_or_create_roles<C: NamespaceClient>(
    client: &C,
    rbac: &WorkspaceRbac,
) -> BatchOutcome {
    let results = join_all(rbac.role_targets().map(move |target| async move {
        let result = check_or_create_role(client, rbac, &target.name).await;
        (target, result)
    }))
    .await;

    results.into_iter().collect()
}

async fn check_or_create_role<C: NamespaceClient>(
    client: &C,
    rbac: &WorkspaceRbac,
    name: &str,
) -> Result<(), context::Error> {
    let presence = check_or_create(client, &rbac.new_role(name), rbac.namespace())
        .await
        .inspect_err(|e| {
            warn!(
                workspace = rbac.workspace_id(),
                namespace = rbac.namespace(),
                role = name,
                "failed to ensure role: {e}"
            )
        })?;

    match presence {
        Presence::Existed => debug!(
            workspace = rbac.workspace_id(),
            namespace = rbac.namespace(),
            role = name,
            "role already exists, leaving it untouched"
        ),
        Presence::Created => info!(
            workspace = rbac.workspace_id(),
            namespace = rbac.namespace(),
            role = name,
            "role created"
        ),
        Presence::CreatedConcurrently => warn!(
            workspace = rbac.workspace_id(),
            namespace = rbac.namespace(),
            role = name,
            "role was created concurrently by another actor"
        ),
    }

    Ok(())
}
