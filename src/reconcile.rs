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

use crate::context::{NamespaceClient, NamespacedObject};
use crate::types::workspace::state::ProvisioningState;
use crate::types::workspace::{RoleTarget, WorkspaceRbac};
use crate::{context, types};
use kube::ResourceExt;
use snafu::Snafu;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strum::Display;
use tracing::{debug, error, info};

pub mod role;
pub mod role_binding;
pub mod service_account;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display(
        "failed to ensure service account '{}' in namespace '{}': {}",
        name,
        namespace,
        source
    ))]
    ServiceAccount {
        name: String,
        namespace: String,
        source: context::Error,
    },

    #[snafu(transparent)]
    Provisioning { source: ProvisioningFailure },

    #[snafu(transparent)]
    Types { source: types::error::Error },
}

impl Error {
    /// The credentials in use lack permission for some required operation.
    pub fn is_forbidden(&self) -> bool {
        match self {
            Error::ServiceAccount { source, .. } => source.is_forbidden(),
            Error::Provisioning { source } => source.is_forbidden(),
            Error::Types { .. } => false,
        }
    }
}

/// How a name-identified object came to be present.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Presence {
    #[strum(serialize = "existed")]
    Existed,

    #[strum(serialize = "created")]
    Created,

    /// Our create lost a race against another actor creating the same name.
    #[strum(serialize = "created concurrently")]
    CreatedConcurrently,
}

/// Creates `resource` unless an object with its name already exists. Never modifies an
/// existing object.
pub(crate) async fn check_or_create<C, K>(
    client: &C,
    resource: &K,
    namespace: &str,
) -> Result<Presence, context::Error>
where
    C: NamespaceClient,
    K: NamespacedObject,
{
    let name = resource.name_any();

    match client.get::<K>(&name, namespace).await {
        Ok(_) => Ok(Presence::Existed),
        Err(e) if e.is_not_found() => match client.create(resource, namespace).await {
            Ok(_) => Ok(Presence::Created),
            Err(e) if e.is_already_exists() => Ok(Presence::CreatedConcurrently),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Per-role results of one fan-out stage.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: BTreeSet<RoleTarget>,
    pub failed: BTreeMap<RoleTarget, context::Error>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.keys().map(ToString::to_string).collect()
    }

    pub fn is_forbidden(&self) -> bool {
        self.failed.values().any(context::Error::is_forbidden)
    }
}

impl FromIterator<(RoleTarget, Result<(), context::Error>)> for BatchOutcome {
    fn from_iter<T: IntoIterator<Item = (RoleTarget, Result<(), context::Error>)>>(
        iter: T,
    ) -> Self {
        let mut outcome = BatchOutcome::default();
        for (target, result) in iter {
            match result {
                Ok(()) => {
                    outcome.succeeded.insert(target);
                }
                Err(e) => {
                    outcome.failed.insert(target, e);
                }
            }
        }
        outcome
    }
}

/// A provisioning run that could not ensure every role or binding.
///
/// Carries what was ensured alongside what failed and why, so callers can report the
/// exact roles that need attention.
#[derive(Debug)]
pub struct ProvisioningFailure {
    pub workspace_id: String,
    pub namespace: String,
    /// The last stage the run entered before failing.
    pub stage: ProvisioningState,
    pub roles: BatchOutcome,
    pub bindings: BatchOutcome,
}

impl ProvisioningFailure {
    pub fn failed_roles(&self) -> Vec<String> {
        self.roles.failed_names()
    }

    pub fn failed_bindings(&self) -> Vec<String> {
        self.bindings.failed_names()
    }

    pub fn is_forbidden(&self) -> bool {
        self.roles.is_forbidden() || self.bindings.is_forbidden()
    }
}

impl fmt::Display for ProvisioningFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provisioning of workspace '{}' in namespace '{}' failed during {}",
            self.workspace_id, self.namespace, self.stage
        )?;

        for (label, outcome) in [("role", &self.roles), ("role binding", &self.bindings)] {
            for (target, cause) in &outcome.failed {
                write!(f, "; {label} '{target}': {cause}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for ProvisioningFailure {}

/// Provisions the service account, roles and role bindings of one workspace namespace.
///
/// Every step only adds what is missing, so `prepare` can be called again after a partial
/// or failed run.
pub struct WorkspaceServiceAccount<C> {
    client: C,
    rbac: WorkspaceRbac,
    state: ProvisioningState,
}

impl<C: NamespaceClient> WorkspaceServiceAccount<C> {
    pub fn new(client: C, rbac: WorkspaceRbac) -> Result<Self, Error> {
        rbac.validate()?;
        Ok(Self {
            client,
            rbac,
            state: ProvisioningState::NotStarted,
        })
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    pub fn rbac(&self) -> &WorkspaceRbac {
        &self.rbac
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn transition(&mut self, state: ProvisioningState) {
        debug!(
            workspace = self.rbac.workspace_id(),
            namespace = self.rbac.namespace(),
            "provisioning state {} -> {}",
            self.state,
            state
        );
        self.state = state;
    }

    pub async fn prepare(&mut self) -> Result<(), Error> {
        let ns = self.rbac.namespace().to_owned();

        // 1. The account first, bindings refer to it
        self.transition(ProvisioningState::AccountEnsuring);
        if let Err(source) =
            service_account::check_or_create_service_account(&self.client, &self.rbac).await
        {
            error!(
                workspace = self.rbac.workspace_id(),
                namespace = %ns,
                "service account stage failed: {source}"
            );
            self.transition(ProvisioningState::Failed);
            return Err(Error::ServiceAccount {
                name: self.rbac.service_account_name().to_owned(),
                namespace: ns,
                source,
            });
        }

        // 2. Roles
        self.transition(ProvisioningState::RolesEnsuring);
        let roles = role::check_or_create_roles(&self.client, &self.rbac).await;

        if roles.is_forbidden() {
            return Err(self.fail(roles, BatchOutcome::default()));
        }

        // 3. Bindings, only for roles that exist now
        self.transition(ProvisioningState::BindingsEnsuring);
        let targets: Vec<RoleTarget> = roles
            .succeeded
            .iter()
            .cloned()
            .chain(self.rbac.cluster_role_targets())
            .collect();
        let bindings =
            role_binding::check_or_create_role_bindings(&self.client, &self.rbac, targets).await;

        if !roles.is_success() || !bindings.is_success() {
            return Err(self.fail(roles, bindings));
        }

        info!(
            workspace = self.rbac.workspace_id(),
            namespace = %ns,
            "provisioned service account {} with {} role(s) and {} cluster role(s)",
            self.rbac.service_account_name(),
            self.rbac.roles.len(),
            self.rbac.cluster_roles.len()
        );
        self.transition(ProvisioningState::Complete);
        Ok(())
    }

    fn fail(&mut self, roles: BatchOutcome, bindings: BatchOutcome) -> Error {
        let failure = ProvisioningFailure {
            workspace_id: self.rbac.workspace_id().to_owned(),
            namespace: self.rbac.namespace().to_owned(),
            stage: self.state,
            roles,
            bindings,
        };
        error!(
            workspace = self.rbac.workspace_id(),
            namespace = self.rbac.namespace(),
            failed_roles = ?failure.failed_roles(),
            failed_bindings = ?failure.failed_bindings(),
            "{failure}"
        );
        self.transition(ProvisioningState::Failed);
        Error::Provisioning { source: failure }
    }
}
