// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{Presence, check_or_create};
use crate::context::{self, NamespaceClient};
use crate::types::workspace::WorkspaceRbac;
use tracing::{debug, info};

/// Makes sure the workspace service account exists. At most one create call is made.
pub async fn check_or_create_service_account<C: NamespaceClient>(
    client: &C,
    rbac: &WorkspaceRbac,
) -> Result<(), context::Error> {
    let presence = check_or_create(client, &rbac.new_service_account(), rbac.namespace()).await?;

    match presence {
        Presence::Existed => debug!(
            workspace = rbac.workspace_id(),
            namespace = rbac.namespace(),
            "service account {} already exists",
            rbac.service_account_name()
        ),
        Presence::Created | Presence::CreatedConcurrently => info!(
            workspace = rbac.workspace_id(),
            namespace = rbac.namespace(),
            "service account {} is ready ({presence})",
            rbac.service_account_name()
        ),
    }

    Ok(())
}
