use crate::definitions::{Definition, parse_definitions};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Name of the pack built from the plain image directory.
pub const ROOT_PACK: &str = "main";

/// Checked out asset repository.
#[derive(Debug, Clone)]
pub struct AssetTree {
    root: PathBuf,
}

impl AssetTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One definition file per pack.
    pub fn packs_dir(&self) -> PathBuf {
        self.root.join("telegram_packs")
    }

    /// Source images; their names make up the root pack.
    pub fn svg_dir(&self) -> PathBuf {
        self.root.join("svg")
    }

    /// Rendered stickers, `<asset id>.png`.
    pub fn png_dir(&self) -> PathBuf {
        self.root.join("png").join("512")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PackSource {
    /// Every file name in the directory is a definition.
    ImageDir(PathBuf),
    DefinitionFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pack {
    pub name: String,
    pub title: String,
    source: PackSource,
}

impl Pack {
    /// `{base}_{pack}_by_{bot}`, the name of the remote set.
    pub fn set_name(&self, base_name: &str, bot_username: &str) -> String {
        format!("{base_name}_{}_by_{bot_username}", self.name)
    }

    pub fn load_definitions(&self) -> anyhow::Result<Vec<Definition>> {
        let text = match &self.source {
            PackSource::ImageDir(dir) => image_names(dir)?.join("\n"),
            PackSource::DefinitionFile(path) => std::fs::read_to_string(path)
                .with_context(|| format!("cannot read definitions from {}", path.display()))?,
        };
        let definitions = parse_definitions(&text)
            .with_context(|| format!("cannot load definitions of pack {}", self.name))?;
        tracing::info!("Loaded {} definitions for {}", definitions.len(), self.name);
        Ok(definitions)
    }
}

/// The root pack followed by one pack per definition file, sorted by name.
pub fn discover_packs(tree: &AssetTree, set_title: &str) -> anyhow::Result<Vec<Pack>> {
    let mut packs = vec![Pack {
        name: ROOT_PACK.to_string(),
        title: format!("{set_title} Stickers!"),
        source: PackSource::ImageDir(tree.svg_dir()),
    }];

    let packs_dir = tree.packs_dir();
    let mut files = files_in(&packs_dir)?;
    files.sort();
    for file in files {
        let Some(file_name) = file.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!("skipping pack file with non UTF-8 name {}", file.display());
            continue;
        };
        let name = file_name.strip_suffix(".txt").unwrap_or(file_name).to_string();
        packs.push(Pack {
            title: format!("{set_title} {}!", capitalize(&name)),
            name,
            source: PackSource::DefinitionFile(file),
        });
    }
    Ok(packs)
}

fn files_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

fn image_names(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut names: Vec<String> = files_in(dir)?
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .map(|name| name.strip_suffix(".svg").unwrap_or(name).to_string())
        .collect();
    names.sort();
    Ok(names)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
