use crate::config::SyncConfig;
use crate::packs::AssetTree;
use crate::utils::{run_command_at, stream_command_at};
use anyhow::Context;
use std::path::PathBuf;

pub struct Git {
    path: PathBuf,
}

impl Git {
    /// Tries to figure out if `git` is installed.
    pub fn lookup() -> Option<Self> {
        which::which("git").ok().map(|path| Self { path })
    }

    fn program(&self) -> &str {
        self.path.to_str().unwrap_or("git")
    }
}

/// Clones the asset repository into the work dir, or hard resets an
/// existing checkout to the tip of the configured branch.
pub fn fetch_latest_tree(git: &Git, config: &SyncConfig) -> anyhow::Result<AssetTree> {
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("cannot create {}", config.work_dir.display()))?;

    let checkout = config.checkout_dir();
    let git = git.program();
    let branch = config.git_branch.as_str();
    if !checkout.join(".git").exists() {
        tracing::info!("Git repo does not exist, cloning {}", config.git_url);
        // Stream so that the user sees clone progress.
        stream_command_at(
            [git, "clone", &config.git_url, "git_repo"],
            &config.work_dir,
        )
        .context("cannot clone asset repository")?;
    } else {
        tracing::info!("Syncing repo");
        run_command_at([git, "fetch"], &checkout).context("cannot fetch asset repository")?;
        tracing::info!("Go to repo origin/{branch}");
        run_command_at([git, "reset", "--hard", &format!("origin/{branch}")], &checkout)
            .context("cannot reset checkout")?;
    }

    tracing::info!("Checking out {branch}");
    run_command_at([git, "checkout", branch], &checkout)
        .with_context(|| format!("cannot check out {branch}"))?;
    let head = run_command_at([git, "rev-parse", "HEAD"], &checkout)?;
    tracing::info!("Assets at {head}");

    Ok(AssetTree::new(checkout))
}
