use anyhow::Context;
use clap::Parser;
use sticker_sync::config::{ConfigFile, ConfigOverrides, SyncConfig, load_config};
use sticker_sync::git::{Git, fetch_latest_tree};
use sticker_sync::packs::{AssetTree, Pack, discover_packs};
use sticker_sync::sync::{PackSyncError, StickerSync};
use sticker_sync::telegram::TelegramClient;
use sticker_sync::utils::prompt;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "sticker-sync.toml";

#[derive(clap::Parser)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::Parser)]
enum Command {
    /// Initialize a config file in the current directory.
    Init,
    /// Fetch the asset repository and make every sticker set match its pack.
    Sync {
        #[clap(long, default_value(DEFAULT_CONFIG_PATH))]
        config_path: PathBuf,
        #[clap(flatten)]
        overrides: ConfigOverrides,
        /// Use the existing checkout as it is.
        #[clap(long)]
        no_fetch: bool,
        /// Only sync the given packs. Can be repeated.
        #[clap(long = "pack")]
        packs: Vec<String>,
        /// Start tracking sets without a state file without asking.
        #[clap(long, short)]
        yes: bool,
        #[clap(long, short)]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match args.cmd {
        Command::Init => {
            let config = ConfigFile {
                work_dir: None,
                git_url: Some("<asset-repository-url>".to_string()),
                git_branch: Some("main".to_string()),
                owner_id: Some(0),
                set_name: Some("<set-name>".to_string()),
                set_title: Some("<set-title>".to_string()),
            };
            config
                .write(Path::new(DEFAULT_CONFIG_PATH))
                .context("cannot write config")?;
            println!("Created config file at {DEFAULT_CONFIG_PATH}");
            println!("The bot token is read from the TG_TOKEN environment variable");
        }
        Command::Sync {
            config_path,
            overrides,
            no_fetch,
            packs,
            yes,
            verbose,
        } => {
            init_logging(verbose);
            let config = load_sync_config(&config_path, overrides)?;
            let failed = sync(&config, no_fetch, &packs, yes)?;
            if !failed.is_empty() {
                eprintln!("Failed packs: {}", failed.join(", "));
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_sync_config(path: &Path, overrides: ConfigOverrides) -> anyhow::Result<SyncConfig> {
    let file = if path.is_file() {
        load_config(path)?
    } else {
        tracing::debug!("{} not found, using command line and environment only", path.display());
        ConfigFile::default()
    };
    SyncConfig::resolve(file, overrides)
        .context("incomplete configuration. Run the `init` command to create a config file.")
}

/// Returns the names of the packs that failed.
fn sync(
    config: &SyncConfig,
    no_fetch: bool,
    only: &[String],
    yes: bool,
) -> anyhow::Result<Vec<String>> {
    let tree = if no_fetch {
        AssetTree::new(config.checkout_dir())
    } else {
        let git = Git::lookup().context("git not found in PATH")?;
        fetch_latest_tree(&git, config)?
    };

    let api = TelegramClient::new(&config.bot_token).context("cannot create Telegram client")?;
    let sync = StickerSync::new(config, &api, tree)?;

    tracing::info!("Loading pack locations");
    let mut packs = discover_packs(sync.tree(), &config.set_title)?;
    if !only.is_empty() {
        packs.retain(|pack| only.contains(&pack.name));
    }

    let confirm = |pack: &Pack| {
        yes || prompt(
            &format!(
                "Pack `{}` has no state file, its set will be purged. Continue anyway?",
                pack.name
            ),
            false,
        )
    };

    let mut failed = vec![];
    for pack in &packs {
        tracing::info!("Syncing pack {}", pack.name);
        match sync.sync_pack(pack, &confirm) {
            Ok(report) => {
                tracing::info!(
                    "{}: {} kept, {} added, {} removed, {} unknown deleted{}",
                    pack.name,
                    report.retained,
                    report.added,
                    report.removed,
                    report.swept,
                    if report.created { ", set created" } else { "" }
                );
                if !report.failed.is_empty() {
                    for failure in &report.failed {
                        tracing::warn!("{}: {}: {}", pack.name, failure.asset_id, failure.reason);
                    }
                    failed.push(pack.name.clone());
                }
            }
            Err(PackSyncError::Declined) => {
                eprintln!("Not continuing without a state file for {}", pack.name);
                std::process::exit(1);
            }
            Err(PackSyncError::SyncFailed(error)) => {
                tracing::error!("{}: {error:?}", pack.name);
                failed.push(pack.name.clone());
            }
        }
    }
    Ok(failed)
}
