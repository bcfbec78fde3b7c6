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

use strum::Display;

/// Progress of a single provisioning run.
///
/// NotStarted -> AccountEnsuring -> RolesEnsuring -> BindingsEnsuring -> Complete,
/// with Failed reachable from every ensuring state.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum ProvisioningState {
    #[strum(serialize = "NotStarted")]
    #[default]
    NotStarted,

    #[strum(serialize = "AccountEnsuring")]
    AccountEnsuring,

    #[strum(serialize = "RolesEnsuring")]
    RolesEnsuring,

    #[strum(serialize = "BindingsEnsuring")]
    BindingsEnsuring,

    #[strum(serialize = "Complete")]
    Complete,

    #[strum(serialize = "Failed")]
    Failed,
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}
