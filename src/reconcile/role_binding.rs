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

use super::BatchOutcome;
use crate::context::{self, NamespaceClient};
use crate::types::workspace::{RoleTarget, WorkspaceRbac};
use futures::future::join_all;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Ensures, for every target, that some binding in the namespace grants it to the workspace
/// service account.
///
/// Bindings are matched by role reference and subject, not by name. Extra bindings that
/// already grant the same role are kept as they are.
pub async fn check_or_create_role_bindings<C, I>(
    client: &C,
    rbac: &WorkspaceRbac,
    targets: I,
) -> BatchOutcome
where
    C: NamespaceClient,
    I: IntoIterator<Item = RoleTarget>,
{
    let results = join_all(targets.into_iter().map(move |target| async move {
        let result = check_or_create_role_binding(client, rbac, &target)
            .await
            .inspect_err(|e| {
                warn!(
                    workspace = rbac.workspace_id(),
                    namespace = rbac.namespace(),
                    role = %target,
                    "failed to ensure role binding: {e}"
                )
            });
        (target, result)
    }))
    .await;

    results.into_iter().collect()
}

async fn check_or_create_role_binding<C: NamespaceClient>(
    client: &C,
    rbac: &WorkspaceRbac,
    target: &RoleTarget,
) -> Result<(), context::Error> {
    let ns = rbac.namespace();
    let existing = client.list::<rbacv1::RoleBinding>(ns).await?;

    if let Some(binding) = existing.iter().find(|b| rbac.binding_grants(b, target)) {
        debug!(
            workspace = rbac.workspace_id(),
            namespace = ns,
            role = %target,
            binding = %binding.name_any(),
            "role binding already exists"
        );
        return Ok(());
    }

    let name = rbac.role_binding_name(target);
    let binding = if existing.iter().any(|b| b.name_any() == name) {
        warn!(
            workspace = rbac.workspace_id(),
            namespace = ns,
            role = %target,
            binding = %name,
            "binding name is taken by an unrelated binding, letting the server pick a name"
        );
        rbac.new_generated_role_binding(target)
    } else {
        rbac.new_role_binding(target)
    };

    match client.create(&binding, ns).await {
        Ok(created) => {
            info!(
                workspace = rbac.workspace_id(),
                namespace = ns,
                role = %target,
                binding = %created.name_any(),
                "role binding created"
            );
            Ok(())
        }
        Err(e) if e.is_already_exists() => resolve_conflict(client, rbac, target).await,
        Err(e) => Err(e),
    }
}

/// The templated name was claimed between our list and our create. Either the other actor
/// created an equivalent binding or the name now belongs to something unrelated.
async fn resolve_conflict<C: NamespaceClient>(
    client: &C,
    rbac: &WorkspaceRbac,
    target: &RoleTarget,
) -> Result<(), context::Error> {
    let ns = rbac.namespace();
    let existing = client.list::<rbacv1::RoleBinding>(ns).await?;

    if existing.iter().any(|b| rbac.binding_grants(b, target)) {
        warn!(
            workspace = rbac.workspace_id(),
            namespace = ns,
            role = %target,
            "role binding was created concurrently by another actor"
        );
        return Ok(());
    }

    let created = client
        .create(&rbac.new_generated_role_binding(target), ns)
        .await?;
    info!(
        workspace = rbac.workspace_id(),
        namespace = ns,
        role = %target,
        binding = %created.name_any(),
        "role binding created under a generated name"
    );
    Ok(())
}
