// ABOUTME: Dependency installer: packages, container runtime proxy config, and runtime group.
// ABOUTME: The proxy config is written before any package so the runtime starts with it.

use crate::error::DependencySetupError;
use crate::host::{Accounts, HostFs, PackageManager};
use crate::settings::Settings;
use crate::state::ProxyConfig;
use crate::templates::render_docker_proxy_config;
use std::sync::Arc;

const PROXY_CONFIG_MODE: u32 = 0o644;

pub struct DependencyInstaller {
    settings: Settings,
    packages: Arc<dyn PackageManager>,
    accounts: Arc<dyn Accounts>,
    fs: Arc<dyn HostFs>,
}

impl DependencyInstaller {
    pub fn new(
        settings: Settings,
        packages: Arc<dyn PackageManager>,
        accounts: Arc<dyn Accounts>,
        fs: Arc<dyn HostFs>,
    ) -> Self {
        Self {
            settings,
            packages,
            accounts,
            fs,
        }
    }

    /// Install the package set and let the service user reach the container runtime.
    ///
    /// Safe to re-run: installed packages, an existing group, and existing
    /// membership all succeed silently.
    pub async fn install_dependencies(
        &self,
        proxy: Option<&ProxyConfig>,
    ) -> Result<(), DependencySetupError> {
        self.packages
            .update()
            .await
            .map_err(DependencySetupError::Update)?;

        if let Some(proxy) = proxy {
            self.write_proxy_config(proxy).await?;
        }

        for package in &self.settings.packages {
            self.packages
                .install(package)
                .await
                .map_err(|e| DependencySetupError::Install {
                    package: package.clone(),
                    source: e,
                })?;
        }

        let user = &self.settings.user;
        let group = &self.settings.runtime_group;
        let runtime_group_error = |e| DependencySetupError::RuntimeGroup {
            user: user.clone(),
            group: group.clone(),
            source: e,
        };
        self.accounts
            .ensure_group(group)
            .await
            .map_err(runtime_group_error)?;
        self.accounts
            .add_user_to_group(user, group)
            .await
            .map_err(runtime_group_error)?;

        tracing::info!(packages = ?self.settings.packages, %group, "Dependencies installed");
        Ok(())
    }

    async fn write_proxy_config(&self, proxy: &ProxyConfig) -> Result<(), DependencySetupError> {
        let path = &self.settings.docker_daemon_config;
        let contents =
            render_docker_proxy_config(proxy).map_err(DependencySetupError::RenderProxyConfig)?;
        let io_error = |e| DependencySetupError::ProxyConfig {
            path: path.clone(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent).await.map_err(io_error)?;
        }
        self.fs
            .write_file(path, &contents, PROXY_CONFIG_MODE)
            .await
            .map_err(io_error)?;

        tracing::info!(path = %path.display(), "Wrote container runtime proxy config");
        Ok(())
    }
}
