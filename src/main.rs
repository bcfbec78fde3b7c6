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

use clap::{Parser, Subcommand};
use shadow_rs::shadow;
use std::path::PathBuf;
use workspace_rbac::config::{Overrides, resolve};
use workspace_rbac::{init_tracing, render, run};

shadow!(build);

#[derive(Parser)]
#[command(name = "workspace-rbac")]
#[command(about = "Workspace service account and RBAC provisioner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the service account, roles and role bindings of a workspace exist
    Provision {
        /// Workspace RBAC file in YAML
        #[arg(short, long, env = "WORKSPACE_RBAC_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Output the objects provisioning would create in YAML
    Render {
        /// Workspace RBAC file in YAML
        #[arg(short, long, env = "WORKSPACE_RBAC_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Optional output path. If not set, the output will be written to stdout.
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Print build information
    Version {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Provision { config, overrides } => {
            init_tracing();
            let rbac = resolve(config.as_deref(), overrides).await?;
            run(rbac).await?;
        }
        Commands::Render {
            config,
            overrides,
            file,
        } => {
            let rbac = resolve(config.as_deref(), overrides).await?;
            render(rbac, file).await?;
        }
        Commands::Version {} => {
            println!(
                "{} {} ({} {}, built {} with {})",
                build::PROJECT_NAME,
                build::PKG_VERSION,
                build::BRANCH,
                build::SHORT_COMMIT,
                build::BUILD_TIME,
                build::RUST_VERSION
            );
        }
    }

    Ok(())
}
