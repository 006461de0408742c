//! Airflow image pull, build and push.

use super::ContainerRuntime;
use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Pull `registry-url/repository:tag`.
pub async fn pull_airflow_image(runtime: &dyn ContainerRuntime, config: &Config) -> Result<()> {
    let image = config.airflow_image_ref();
    tracing::info!("Pulling {}...", image);
    runtime.pull_image(&image).await?;
    Ok(())
}

/// Build context for a Dockerfile path: its parent directory.
pub fn build_context(dockerfile: &Path) -> Result<PathBuf> {
    if !dockerfile.is_file() {
        return Err(Error::Build(format!(
            "--dockerfile path to Dockerfile is invalid: {}",
            dockerfile.display()
        )));
    }
    let parent = dockerfile
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(parent.to_path_buf())
}

/// Build the Airflow image and push it to the private registry.
///
/// Every environment override is passed as a build argument. The image is
/// built as `image`, re-tagged `registry-url/repository:tag`, then pushed.
pub async fn build_and_push(runtime: &dyn ContainerRuntime, config: &Config, dockerfile: &Path) -> Result<()> {
    if !config.private_registry_flag {
        return Err(Error::Build(
            "private-registry-flag is false; images are only built and pushed to a private registry"
                .to_string(),
        ));
    }

    let context = build_context(dockerfile)?;
    let repository = config.airflow_repository();
    let target = config.airflow_image_ref();

    tracing::info!("Building {} from {}...", config.image, context.display());
    runtime
        .build_image(&context, &config.environment_overrides, &config.image)
        .await
        .map_err(|e| Error::Build(e.to_string()))?;

    runtime
        .tag_image(&config.image, &target)
        .await
        .map_err(|e| Error::Build(e.to_string()))?;

    tracing::info!("Pushing {}...", target);
    runtime
        .push_image(&repository, &config.tag)
        .await
        .map_err(|e| Error::Build(e.to_string()))?;

    Ok(())
}
