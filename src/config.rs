use anyhow::Context;
use std::path::{Path, PathBuf};

/// Contents of `sticker-sync.toml`. Every value can be overridden from the
/// command line or the environment, see [`ConfigOverrides`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// Directory holding the checkout and the state files.
    pub work_dir: Option<PathBuf>,
    /// Repository containing the sticker images.
    pub git_url: Option<String>,
    pub git_branch: Option<String>,
    /// Telegram user that owns the sticker sets.
    pub owner_id: Option<i64>,
    /// Prefix of every sticker set name.
    pub set_name: Option<String>,
    pub set_title: Option<String>,
}

impl ConfigFile {
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let config = toml::to_string_pretty(self).context("cannot serialize config")?;
        std::fs::write(path, config).context("cannot write config")?;
        Ok(())
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<ConfigFile> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot load config file from {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&data).context("cannot load config as TOML")?;
    Ok(config)
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    #[clap(long, env = "REPO")]
    pub work_dir: Option<PathBuf>,
    #[clap(long, env = "GITREPO")]
    pub git_url: Option<String>,
    #[clap(long, env = "GITBRANCH")]
    pub git_branch: Option<String>,
    #[clap(long, env = "OWNER")]
    pub owner_id: Option<i64>,
    #[clap(long, env = "SSNAME")]
    pub set_name: Option<String>,
    #[clap(long, env = "SSTITLE")]
    pub set_title: Option<String>,
    /// Bot API token. Never stored in the config file.
    #[clap(long, env = "TG_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,
}

/// Everything a sync run needs, resolved once at startup.
#[derive(Clone)]
pub struct SyncConfig {
    pub work_dir: PathBuf,
    pub git_url: String,
    pub git_branch: String,
    pub owner_id: i64,
    pub set_name: String,
    pub set_title: String,
    pub bot_token: String,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("work_dir", &self.work_dir)
            .field("git_url", &self.git_url)
            .field("git_branch", &self.git_branch)
            .field("owner_id", &self.owner_id)
            .field("set_name", &self.set_name)
            .field("set_title", &self.set_title)
            .finish_non_exhaustive()
    }
}

impl SyncConfig {
    pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let work_dir = match overrides.work_dir.or(file.work_dir) {
            Some(dir) => dir,
            None => default_work_dir()?,
        };
        Ok(Self {
            work_dir,
            git_url: required(overrides.git_url.or(file.git_url), "git_url", "GITREPO")?,
            git_branch: overrides
                .git_branch
                .or(file.git_branch)
                .unwrap_or_else(default_branch),
            owner_id: required(overrides.owner_id.or(file.owner_id), "owner_id", "OWNER")?,
            set_name: required(overrides.set_name.or(file.set_name), "set_name", "SSNAME")?,
            set_title: required(overrides.set_title.or(file.set_title), "set_title", "SSTITLE")?,
            bot_token: required(overrides.bot_token, "bot_token", "TG_TOKEN")?,
        })
    }

    /// Where the asset repository is checked out.
    pub fn checkout_dir(&self) -> PathBuf {
        self.work_dir.join("git_repo")
    }
}

fn required<T>(value: Option<T>, key: &str, env: &str) -> anyhow::Result<T> {
    value.ok_or_else(|| {
        anyhow::anyhow!("`{key}` is not configured (set it in the config file or via {env})")
    })
}

fn default_branch() -> String {
    String::from("main")
}

fn default_work_dir() -> anyhow::Result<PathBuf> {
    directories::ProjectDirs::from("", "", "sticker-sync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("cannot determine a default work directory, set REPO")
}
