//! Writes the rendered balancer configuration and reloads the service.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use fleetscale_core::BalancerConfig;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{BalancerError, BalancerResult};
use crate::template::{BalancerTarget, render};

pub struct Balancer {
    config: BalancerConfig,
}

impl Balancer {
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// How long to let new instances boot before refreshing.
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.config.settle_secs)
    }

    /// Render, install, and reload.
    pub async fn refresh(&self, targets: &[BalancerTarget]) -> BalancerResult<()> {
        let template = tokio::fs::read_to_string(&self.config.template)
            .await
            .map_err(|source| BalancerError::Template {
                path: self.config.template.clone(),
                source,
            })?;

        let rendered = render(&template, targets).map_err(|source| BalancerError::Render {
            path: self.config.template.clone(),
            source,
        })?;
        install(&self.config.output, rendered.into_bytes()).await?;
        info!(output = ?self.config.output, backends = targets.len(), "balancer config written");

        self.reload().await
    }

    async fn reload(&self) -> BalancerResult<()> {
        let command = self.config.reload_command.join(" ");
        let Some((program, args)) = self.config.reload_command.split_first() else {
            return Err(BalancerError::Reload {
                command,
                status: "no program configured".to_string(),
            });
        };

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| BalancerError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BalancerError::Reload {
                command,
                status: status.to_string(),
            });
        }

        info!(%command, "balancer reloaded");
        Ok(())
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory.
async fn install(path: &Path, contents: Vec<u8>) -> BalancerResult<()> {
    let target = path.to_path_buf();
    let len = contents.len();
    tokio::task::spawn_blocking(move || write_atomic(&target, &contents))
        .await
        .map_err(std::io::Error::other)
        .and_then(|written| written)
        .map_err(|source| BalancerError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(?path, bytes = len, "file installed");
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path, reload_command: &[&str]) -> BalancerConfig {
        BalancerConfig {
            template: dir.join("haproxy.cfg.tmpl"),
            output: dir.join("haproxy.cfg"),
            reload_command: reload_command.iter().map(|s| s.to_string()).collect(),
            settle_secs: 0,
        }
    }

    #[tokio::test]
    async fn refresh_writes_rendered_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("haproxy.cfg.tmpl"),
            "{% for t in targets %}\nserver s{{ loop.index }} {{ t.address }}:80\n{% endfor %}\n",
        )
        .unwrap();

        let balancer = Balancer::new(config(dir.path(), &["true"]));
        balancer
            .refresh(&[
                BalancerTarget::new("app01", "10.0.0.1"),
                BalancerTarget::new("app02", "10.0.0.2"),
            ])
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("haproxy.cfg")).unwrap();
        assert_eq!(written, "server s1 10.0.0.1:80\nserver s2 10.0.0.2:80\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n != "haproxy.cfg" && n != "haproxy.cfg.tmpl")
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn failing_reload_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("haproxy.cfg.tmpl"), "").unwrap();

        let balancer = Balancer::new(config(dir.path(), &["false"]));
        let err = balancer.refresh(&[]).await.unwrap_err();
        assert!(matches!(err, BalancerError::Reload { .. }));
    }

    #[tokio::test]
    async fn refresh_replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("haproxy.cfg.tmpl"), "# {{ count }} backends\n").unwrap();
        std::fs::write(dir.path().join("haproxy.cfg"), "stale\n").unwrap();

        let balancer = Balancer::new(config(dir.path(), &["true"]));
        balancer
            .refresh(&[BalancerTarget::new("app01", "10.0.0.1")])
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("haproxy.cfg")).unwrap();
        assert_eq!(written, "# 1 backends\n");
    }

    #[tokio::test]
    async fn broken_template_is_reported_without_touching_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("haproxy.cfg.tmpl"), "{% for t in targets %}\n").unwrap();
        std::fs::write(dir.path().join("haproxy.cfg"), "previous\n").unwrap();

        let balancer = Balancer::new(config(dir.path(), &["true"]));
        let err = balancer.refresh(&[]).await.unwrap_err();
        assert!(matches!(err, BalancerError::Render { .. }));

        let kept = std::fs::read_to_string(dir.path().join("haproxy.cfg")).unwrap();
        assert_eq!(kept, "previous\n");
    }

    #[tokio::test]
    async fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let balancer = Balancer::new(config(dir.path(), &["true"]));
        let err = balancer.refresh(&[]).await.unwrap_err();
        assert!(matches!(err, BalancerError::Template { .. }));
    }

    #[test]
    fn settle_comes_from_config() {
        let mut cfg = config(Path::new("/tmp"), &["true"]);
        cfg.settle_secs = 30;
        assert_eq!(Balancer::new(cfg).settle(), Duration::from_secs(30));
    }
}
