//! Font resources for the rendering engine.
//!
//! Font names MUST match the names used in templates exactly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logical font name, file name, and whether it is the fallback font.
pub const FONT_CATALOG: &[(&str, &str, bool)] = &[
    ("Roboto", "Roboto-Regular.ttf", true),
    ("Montserrat", "Montserrat-Regular.ttf", false),
    ("Crimson Text", "CrimsonText-Regular.ttf", false),
    ("Archivo Black", "ArchivoBlack-Regular.ttf", false),
    ("Kaushan Script", "KaushanScript-Regular.ttf", false),
    ("Engagement", "Engagement-Regular.ttf", false),
    ("Pacifico", "Pacifico-Regular.ttf", false),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FontAsset {
    pub path: PathBuf,
    pub fallback: bool,
}

/// Static map of logical font name to font file.
#[derive(Debug, Clone, Default)]
pub struct FontMap {
    fonts: Arc<BTreeMap<String, FontAsset>>,
}

impl FontMap {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, FontAsset)>,
    {
        Self {
            fonts: Arc::new(entries.into_iter().collect()),
        }
    }

    /// Load the catalog fonts found in `dir`. Missing files are skipped.
    pub fn load(dir: &Path) -> Self {
        let mut fonts = BTreeMap::new();

        for (name, file, fallback) in FONT_CATALOG {
            let path = dir.join(file);
            if path.is_file() {
                fonts.insert(
                    name.to_string(),
                    FontAsset {
                        path,
                        fallback: *fallback,
                    },
                );
            } else {
                log::warn!("Font '{}' not found at {}, skipping", name, path.display());
            }
        }

        log::info!("Loaded {} font(s) from {}", fonts.len(), dir.display());
        Self {
            fonts: Arc::new(fonts),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FontAsset> {
        self.fonts.get(name)
    }

    /// Font used for fields without an explicit `fontName`.
    pub fn fallback(&self) -> Option<&str> {
        self.fonts
            .iter()
            .find(|(_, asset)| asset.fallback)
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    /// Distinct directories holding the font files, for `--font-path`.
    pub fn font_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .fonts
            .values()
            .filter_map(|asset| asset.path.parent().map(Path::to_path_buf))
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
