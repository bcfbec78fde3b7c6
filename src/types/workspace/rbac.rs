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

use super::{RoleKind, RoleTarget, WorkspaceRbac};
use k8s_openapi::Resource as _;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

impl WorkspaceRbac {
    /// Templated binding name: `<account>-<role>`, or `<account>-cluster-<role>` for cluster roles.
    pub fn role_binding_name(&self, target: &RoleTarget) -> String {
        match target.kind {
            RoleKind::Role => format!("{}-{}", self.service_account_name(), target.name),
            RoleKind::ClusterRole => {
                format!("{}-cluster-{}", self.service_account_name(), target.name)
            }
        }
    }

    pub fn new_service_account(&self) -> corev1::ServiceAccount {
        corev1::ServiceAccount {
            metadata: metav1::ObjectMeta {
                name: Some(self.service_account_name().to_owned()),
                namespace: Some(self.namespace().to_owned()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// A role named `name` carrying the declared template rules (none if the role is undeclared).
    pub fn new_role(&self, name: &str) -> rbacv1::Role {
        let rules = self
            .roles
            .get(name)
            .map(|template| template.rules.clone())
            .filter(|rules| !rules.is_empty());

        rbacv1::Role {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(self.namespace().to_owned()),
                ..Default::default()
            },
            rules,
        }
    }

    pub fn new_role_binding(&self, target: &RoleTarget) -> rbacv1::RoleBinding {
        self.role_binding(
            target,
            metav1::ObjectMeta {
                name: Some(self.role_binding_name(target)),
                namespace: Some(self.namespace().to_owned()),
                ..Default::default()
            },
        )
    }

    /// Same binding as [`Self::new_role_binding`], named by the API server from a
    /// `<templated name>-` prefix. Used when the templated name belongs to an unrelated binding.
    pub fn new_generated_role_binding(&self, target: &RoleTarget) -> rbacv1::RoleBinding {
        self.role_binding(
            target,
            metav1::ObjectMeta {
                generate_name: Some(format!("{}-", self.role_binding_name(target))),
                namespace: Some(self.namespace().to_owned()),
                ..Default::default()
            },
        )
    }

    fn role_binding(&self, target: &RoleTarget, metadata: metav1::ObjectMeta) -> rbacv1::RoleBinding {
        rbacv1::RoleBinding {
            metadata,
            subjects: Some(vec![rbacv1::Subject {
                kind: corev1::ServiceAccount::KIND.to_owned(),
                namespace: Some(self.namespace().to_owned()),
                name: self.service_account_name().to_owned(),
                ..Default::default()
            }]),
            role_ref: rbacv1::RoleRef {
                api_group: rbacv1::Role::GROUP.to_owned(),
                kind: target.kind.to_string(),
                name: target.name.clone(),
            },
        }
    }

    /// Whether `binding` already grants `target` to this workspace's service account.
    ///
    /// Matching is by content, never by binding name. A subject without a namespace is taken
    /// to live in the binding's own namespace.
    pub fn binding_grants(&self, binding: &rbacv1::RoleBinding, target: &RoleTarget) -> bool {
        let role_ref = &binding.role_ref;
        if role_ref.api_group != rbacv1::Role::GROUP
            || role_ref.kind != target.kind.to_string()
            || role_ref.name != target.name
        {
            return false;
        }

        let binding_ns = binding
            .metadata
            .namespace
            .as_deref()
            .unwrap_or(self.namespace());

        binding.subjects.iter().flatten().any(|subject| {
            subject.kind == corev1::ServiceAccount::KIND
                && subject.name == self.service_account_name()
                && subject.namespace.as_deref().unwrap_or(binding_ns) == self.namespace()
        })
    }
}
