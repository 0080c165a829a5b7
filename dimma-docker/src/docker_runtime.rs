//! Container runtime implementation using bollard

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, KillContainerOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::Docker;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use dimma_core::container::{ContainerRuntime, ContainerSpec, CPU_PERIOD_US, DATA_MOUNT};
use dimma_core::error::{DimmaError, DimmaResult};

/// Container runtime backed by the local Docker daemon
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local daemon and verify it answers.
    pub async fn connect() -> DimmaResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| runtime_error("connect", e))?;
        docker.ping().await.map_err(|e| DimmaError::ContainerRuntime {
            operation: "ping".to_string(),
            details: format!("Docker not available: {}. Is Docker running?", e),
        })?;
        Ok(Self { docker })
    }
}

fn runtime_error(operation: &str, e: bollard::errors::Error) -> DimmaError {
    DimmaError::ContainerRuntime {
        operation: operation.to_string(),
        details: e.to_string(),
    }
}

/// Translate a [`ContainerSpec`] into the daemon-side container config.
fn container_config(spec: &ContainerSpec) -> ContainerConfig<String> {
    let host_config = bollard::models::HostConfig {
        binds: Some(vec![format!(
            "{}:{}:rw",
            spec.scratch_dir.display(),
            DATA_MOUNT
        )]),
        memory: Some((spec.memory_limit_mb * 1024 * 1024) as i64),
        cpu_quota: Some(spec.cpu_quota_us),
        cpu_period: Some(CPU_PERIOD_US),
        ..Default::default()
    };

    ContainerConfig {
        image: Some(spec.image.clone()),
        cmd: Some(spec.cmd.clone()),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run_container(&self, spec: &ContainerSpec) -> DimmaResult<String> {
        let create_opts = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(create_opts), container_config(spec))
            .await
            .map_err(|e| runtime_error("create", e))?;
        let id = response.id;
        debug!("Created container {} for '{}'", &id[..12], spec.name);

        if let Err(e) = self
            .docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await
        {
            // Do not leave the created container behind on a failed start.
            if let Err(remove_err) = self
                .docker
                .remove_container(
                    &id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await
            {
                warn!(
                    "Failed to remove container {} after start failure: {}",
                    &id[..12],
                    remove_err
                );
            }
            return Err(runtime_error("start", e));
        }

        info!("Started container {} for '{}'", &id[..12], spec.name);
        Ok(id)
    }

    async fn wait_container(&self, container_id: &str) -> DimmaResult<i64> {
        let mut wait = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions<String>>);
        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exit statuses surface as wait errors carrying the code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(runtime_error("wait", e)),
            None => Err(DimmaError::ContainerRuntime {
                operation: "wait".to_string(),
                details: format!("wait stream for {} ended without a status", container_id),
            }),
        }
    }

    async fn kill_container(&self, container_id: &str) -> DimmaResult<()> {
        self.docker
            .kill_container(container_id, None::<KillContainerOptions<String>>)
            .await
            .map_err(|e| runtime_error("kill", e))
    }

    async fn remove_container(&self, container_id: &str) -> DimmaResult<()> {
        self.docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| runtime_error("remove", e))
    }
}
