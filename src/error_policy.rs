// Copyright 2024 RustFS Team
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

use crate::reconcile::Error;
use std::time::Duration;

const RETRY_AFTER: Duration = Duration::from_secs(5);

/// What the caller should do with a failed provisioning run. Provisioning itself never retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Likely transient, running again may converge.
    Retry(Duration),

    /// Retrying cannot help until permissions or configuration change.
    AwaitChange,
}

pub fn error_policy(error: &Error) -> Disposition {
    if error.is_forbidden() || matches!(error, Error::Types { .. }) {
        Disposition::AwaitChange
    } else {
        Disposition::Retry(RETRY_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::{Disposition, error_policy};
    use crate::reconcile::WorkspaceServiceAccount;
    use crate::tests::{FakeCluster, Failure, create_test_workspace};
    use crate::types::workspace::WorkspaceRbac;
    use k8s_openapi::api::core::v1 as corev1;
    use k8s_openapi::api::rbac::v1 as rbacv1;
    use std::time::Duration;

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let cluster = FakeCluster::default();
        cluster.fail_create::<rbacv1::Role>("role-foo", Failure::Transport);
        let mut provisioner =
            WorkspaceServiceAccount::new(&cluster, create_test_workspace(&["role-foo"])).unwrap();

        let err = provisioner.prepare().await.unwrap_err();

        assert_eq!(error_policy(&err), Disposition::Retry(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_forbidden_waits_for_change() {
        let cluster = FakeCluster::default();
        cluster.fail_create::<corev1::ServiceAccount>("workspace-sa", Failure::Forbidden);
        let mut provisioner =
            WorkspaceServiceAccount::new(&cluster, create_test_workspace(&["role-foo"])).unwrap();

        let err = provisioner.prepare().await.unwrap_err();

        assert_eq!(error_policy(&err), Disposition::AwaitChange);
    }

    #[test]
    fn test_invalid_configuration_waits_for_change() {
        let cluster = FakeCluster::default();
        let err = WorkspaceServiceAccount::new(&cluster, WorkspaceRbac::default())
            .err()
            .unwrap();

        assert_eq!(error_policy(&err), Disposition::AwaitChange);
    }
}
