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

use crate::context::Context;
use crate::error_policy::{Disposition, error_policy};
use crate::reconcile::WorkspaceServiceAccount;
use crate::types::workspace::WorkspaceRbac;
use kube::Client;
use std::pin::Pin;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod context;
pub mod error_policy;
pub mod reconcile;
pub mod types;


pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();
}

/// Provisions the workspace once against the cluster of the current kube context.
pub async fn run(rbac: WorkspaceRbac) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::try_default().await?;
    let mut provisioner = WorkspaceServiceAccount::new(Context::new(client), rbac)?;

    match provisioner.prepare().await {
        Ok(()) => {
            info!(
                workspace = provisioner.rbac().workspace_id(),
                "provisioning {}",
                provisioner.state()
            );
            Ok(())
        }
        Err(e) => {
            match error_policy(&e) {
                Disposition::Retry(after) => {
                    warn!("provisioning failed, it is safe to run again in {after:?}: {e}")
                }
                Disposition::AwaitChange => {
                    error!("provisioning failed, check the permissions and configuration: {e}")
                }
            }
            Err(e.into())
        }
    }
}

/// Writes the objects a first provisioning run would create as a multi-document YAML stream.
pub async fn render(
    rbac: WorkspaceRbac,
    file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    rbac.validate()?;

    let mut documents = vec![serde_yaml_ng::to_string(&rbac.new_service_account())?];
    for name in rbac.roles.keys() {
        documents.push(serde_yaml_ng::to_string(&rbac.new_role(name))?);
    }
    for target in rbac.role_targets().chain(rbac.cluster_role_targets()) {
        documents.push(serde_yaml_ng::to_string(&rbac.new_role_binding(&target))?);
    }

    let mut writer: Pin<Box<dyn AsyncWrite + Send>> = if let Some(file) = file {
        Box::pin(
            tokio::fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(file)
                .await?,
        )
    } else {
        Box::pin(tokio::io::stdout())
    };

    writer
        .write_all(documents.join("---\n").as_bytes())
        .await?;
    writer.flush().await?;

    Ok(())
}
