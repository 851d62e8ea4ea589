//! Version-control collaborator: rendered zone files are committed and pushed
//! to a configuration repository before the staged rows are cleared.

use std::path::PathBuf;
use std::process::Output;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Commit everything in the working copy and push it to the remote.
    async fn push(&self) -> anyhow::Result<()>;

    /// Discard local changes and return to the remote head.
    async fn reset(&self) -> anyhow::Result<()>;

    /// Whether the working copy has uncommitted changes.
    async fn is_dirty(&self) -> anyhow::Result<bool>;
}

/// Git working copy driven through the `git` binary.
pub struct GitWorkingCopy {
    dir: PathBuf,
    remote: String,
    branch: String,
    author_name: String,
    author_email: String,
}

impl GitWorkingCopy {
    pub fn new(
        dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
    ) -> Self {
        GitWorkingCopy {
            dir: dir.into(),
            remote: remote.into(),
            branch: branch.into(),
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> anyhow::Result<Output> {
        let output = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&self.dir)
            .args(args)
            .output()
            .await
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

#[async_trait]
impl VersionControl for GitWorkingCopy {
    async fn push(&self) -> anyhow::Result<()> {
        self.git(&["add", "-A"]).await?;

        if self.is_dirty().await? {
            let message = format!("zone update at {}", Utc::now().to_rfc3339());
            self.git(&[
                "-c",
                &format!("user.name={}", self.author_name),
                "-c",
                &format!("user.email={}", self.author_email),
                "commit",
                "-m",
                &message,
            ])
            .await?;
        } else {
            warn!("working copy clean, nothing to commit");
        }

        self.git(&["push", &self.remote, &self.branch]).await?;
        info!(remote = %self.remote, branch = %self.branch, "zone files pushed");
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        self.git(&["fetch", &self.remote]).await?;
        self.git(&[
            "reset",
            "--hard",
            &format!("{}/{}", self.remote, self.branch),
        ])
        .await?;
        Ok(())
    }

    async fn is_dirty(&self) -> anyhow::Result<bool> {
        let output = self.git(&["status", "--porcelain"]).await?;
        Ok(!output.stdout.is_empty())
    }
}

/// Stand-in used when the output directory is not a git working copy, e.g.
/// local development against a scratch directory.
pub struct NoVersionControl;

#[async_trait]
impl VersionControl for NoVersionControl {
    async fn push(&self) -> anyhow::Result<()> {
        warn!("version control disabled, skipping push");
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn is_dirty(&self) -> anyhow::Result<bool> {
        Ok(false)
    }
}
