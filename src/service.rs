use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use askama::Template;
use async_fs::OpenOptions;
use async_process::Command;
use futures_lite::{future, AsyncWriteExt};
use thiserror::Error;

use crate::charge_limit::ChargeLimit;
use crate::{LAUNCHCTL, SERVICE_FILE, SERVICE_LABEL};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to render service descriptor: {0}")]
    Render(#[from] askama::Error),

    #[error("`{command}` exited with {status}: {output}")]
    ServiceManager {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("launchctl did not {action} {label}: {output}")]
    NotApplied {
        label: String,
        action: &'static str,
        output: String,
    },

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    Unchanged,
}

/// Keeps a boot-time command that reapplies the charge limit.
pub trait Persistence {
    fn is_persisted(&self) -> Result<bool, PersistError>;

    /// Registers or deregisters the saved command. Deregistering also removes it.
    fn set_persisted(&self, enable: bool) -> Result<Transition, PersistError>;

    /// Rewrites the saved command so it applies `limit`.
    fn update_persisted_command(&self, limit: ChargeLimit) -> Result<(), PersistError>;
}

#[derive(Debug, Clone)]
pub struct LaunchdConfig {
    pub label: String,
    pub descriptor_path: PathBuf,
    pub launchctl: PathBuf,
    pub program: PathBuf,
}

impl LaunchdConfig {
    /// Default locations, saving a command that runs the current executable.
    pub fn for_current_exe() -> io::Result<Self> {
        Ok(Self::with_program(std::env::current_exe()?))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            label: SERVICE_LABEL.to_owned(),
            descriptor_path: PathBuf::from(SERVICE_FILE),
            launchctl: PathBuf::from(LAUNCHCTL),
            program: program.into(),
        }
    }
}

#[derive(Template)]
#[template(path = "launchd.plist", escape = "html")]
pub struct ServiceDescriptor<'a> {
    label: &'a str,
    run_at_load: bool,
    program_arguments: Vec<String>,
}

/// launchd backed [`Persistence`].
///
/// File and process work is async and driven to completion on the calling
/// thread, so every trait call is a single blocking step.
#[derive(Debug, Clone)]
pub struct LaunchdService {
    config: LaunchdConfig,
}

impl LaunchdService {
    pub fn new(config: LaunchdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LaunchdConfig {
        &self.config
    }

    pub fn descriptor(&self, limit: ChargeLimit) -> Result<ServiceDescriptor<'_>, PersistError> {
        Ok(ServiceDescriptor {
            label: &self.config.label,
            run_at_load: true,
            program_arguments: vec![
                utf8_path(&self.config.program)?.to_owned(),
                "write".to_owned(),
                limit.to_string(),
            ],
        })
    }

    async fn launchctl(&self, args: &[&str]) -> Result<String, PersistError> {
        let output = Command::new(&self.config.launchctl)
            .args(args)
            .output()
            .await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim().to_owned();
        if !output.status.success() {
            return Err(PersistError::ServiceManager {
                command: format!("{} {}", self.config.launchctl.display(), args.join(" ")),
                status: output.status,
                output: text,
            });
        }
        Ok(text)
    }

    async fn toggle(&self, enable: bool) -> Result<String, PersistError> {
        let path = utf8_path(&self.config.descriptor_path)?;
        let verb = if enable { "load" } else { "unload" };
        let output = self.launchctl(&[verb, path]).await?;
        if !output.is_empty() {
            tracing::warn!(%output, "launchctl {verb}");
        }
        Ok(output)
    }

    async fn remove_descriptor(&self) -> Result<bool, PersistError> {
        match async_fs::remove_file(&self.config.descriptor_path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

impl Persistence for LaunchdService {
    fn is_persisted(&self) -> Result<bool, PersistError> {
        let listing = future::block_on(self.launchctl(&["list"]))?;
        Ok(listing_contains(&listing, &self.config.label))
    }

    /// `launchctl load`/`unload` may exit 0 on failure, so the listing is
    /// checked again afterwards. Disabling also removes a descriptor left
    /// behind by an earlier failed load.
    fn set_persisted(&self, enable: bool) -> Result<Transition, PersistError> {
        if self.is_persisted()? == enable {
            if !enable && future::block_on(self.remove_descriptor())? {
                tracing::info!(
                    path = %self.config.descriptor_path.display(),
                    "removed stale descriptor"
                );
                return Ok(Transition::Changed);
            }
            return Ok(Transition::Unchanged);
        }
        let output = future::block_on(self.toggle(enable))?;
        if self.is_persisted()? != enable {
            return Err(PersistError::NotApplied {
                label: self.config.label.clone(),
                action: if enable { "register" } else { "deregister" },
                output,
            });
        }
        if !enable {
            future::block_on(self.remove_descriptor())?;
        }
        tracing::info!(label = %self.config.label, enable, "persistence toggled");
        Ok(Transition::Changed)
    }

    fn update_persisted_command(&self, limit: ChargeLimit) -> Result<(), PersistError> {
        let descriptor = self.descriptor(limit)?;
        future::block_on(save_descriptor(&descriptor, &self.config.descriptor_path))?;
        tracing::info!(path = %self.config.descriptor_path.display(), %limit, "saved boot command");
        Ok(())
    }
}

fn utf8_path(path: &Path) -> Result<&str, PersistError> {
    path.to_str()
        .ok_or_else(|| PersistError::NonUtf8Path(path.to_path_buf()))
}

/// `launchctl list` prints `PID Status Label` rows.
fn listing_contains(listing: &str, label: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().last() == Some(label))
}

async fn save_descriptor(
    descriptor: &ServiceDescriptor<'_>,
    dest_path: &Path,
) -> Result<(), PersistError> {
    let rendered = descriptor.render()?;
    let mut file_out = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(dest_path)
        .await?;
    file_out.write_all(rendered.as_bytes()).await?;
    file_out.sync_data().await?;
    Ok(())
}
