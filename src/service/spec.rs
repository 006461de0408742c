use std::collections::BTreeMap;

/// Bind mount of a host path into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
}

impl VolumeMount {
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

/// Published port, `host:container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

impl PortBinding {
    pub fn same(port: u16) -> Self {
        Self {
            host: port,
            container: port,
        }
    }
}

/// Everything needed to start one container. Built once per launch and not
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    image: String,
    name: String,
    environment: BTreeMap<String, String>,
    volumes: Vec<VolumeMount>,
    ports: Vec<PortBinding>,
    command: Vec<String>,
    detach: bool,
    auto_remove: bool,
}

impl LaunchSpec {
    pub fn builder(image: impl Into<String>, name: impl Into<String>) -> LaunchSpecBuilder {
        LaunchSpecBuilder {
            spec: LaunchSpec {
                image: image.into(),
                name: name.into(),
                environment: BTreeMap::new(),
                volumes: Vec::new(),
                ports: Vec::new(),
                command: Vec::new(),
                detach: true,
                auto_remove: true,
            },
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn volumes(&self) -> &[VolumeMount] {
        &self.volumes
    }

    pub fn ports(&self) -> &[PortBinding] {
        &self.ports
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn detach(&self) -> bool {
        self.detach
    }

    pub fn auto_remove(&self) -> bool {
        self.auto_remove
    }

    /// Arguments for `docker`, starting with `run`.
    pub fn to_docker_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        if self.detach {
            args.push("-d".to_string());
        }
        if self.auto_remove {
            args.push("--rm".to_string());
        }
        args.push("--name".to_string());
        args.push(self.name.clone());

        for (key, value) in &self.environment {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        for volume in &self.volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}:rw", volume.host_path, volume.container_path));
        }
        for port in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port.host, port.container));
        }

        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

pub struct LaunchSpecBuilder {
    spec: LaunchSpec,
}

impl LaunchSpecBuilder {
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.environment.insert(key.into(), value.into());
        self
    }

    pub fn envs<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in entries {
            self.spec.environment.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn volumes(mut self, volumes: Vec<VolumeMount>) -> Self {
        self.spec.volumes = volumes;
        self
    }

    pub fn port(mut self, binding: PortBinding) -> Self {
        self.spec.ports.push(binding);
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn detach(mut self, detach: bool) -> Self {
        self.spec.detach = detach;
        self
    }

    pub fn build(self) -> LaunchSpec {
        self.spec
    }
}

/// Apply custom mounts over the defaults. A custom mount targeting the same
/// container path as a default replaces it.
pub fn merge_mounts(defaults: Vec<VolumeMount>, custom: &[VolumeMount]) -> Vec<VolumeMount> {
    let mut merged: Vec<VolumeMount> = defaults
        .into_iter()
        .filter(|d| !custom.iter().any(|c| c.container_path == d.container_path))
        .collect();
    for mount in custom {
        merged.retain(|m| m.container_path != mount.container_path);
        merged.push(mount.clone());
    }
    merged
}
