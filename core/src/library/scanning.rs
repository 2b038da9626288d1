//! Content directory scanning
//!
//! A scan re-derives the whole title list from what is on disk right now.
//! Anything that cannot be turned into a title is skipped, and a directory
//! that cannot be read yields no titles.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::Title;

/// Which file extensions count as content and as artwork.
///
/// Extensions are stored lowercase without a leading dot and compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRules {
    content: Vec<String>,
    artwork: String,
}

impl ExtensionRules {
    pub fn new<I, S>(content: I, artwork: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            content: content
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
            artwork: normalize_extension(artwork),
        }
    }

    pub fn artwork_extension(&self) -> &str {
        &self.artwork
    }

    pub fn is_content(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.content.contains(&ext))
    }

    pub fn is_artwork(&self, path: &Path) -> bool {
        !self.artwork.is_empty() && extension_of(path).is_some_and(|ext| ext == self.artwork)
    }

    /// Whether a change to `path` can affect the library.
    pub fn is_relevant(&self, path: &Path) -> bool {
        self.is_content(path) || self.is_artwork(path)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Scans `dir` and returns its titles sorted by id.
pub(super) fn scan_dir(dir: &Path, rules: &ExtensionRules) -> Vec<Title> {
    let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Library directory does not exist: {}", dir.display());
            return vec![];
        }
        Err(e) => {
            tracing::warn!("Cannot read library directory {}: {}", dir.display(), e);
            return vec![];
        }
    };

    let mut titles: Vec<Title> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            build_title(&dir, entry.path(), rules)
        })
        .collect();

    sort_titles(&mut titles);
    tracing::info!("Scanned {}: {} titles", dir.display(), titles.len());
    titles
}

fn build_title(dir: &Path, path: PathBuf, rules: &ExtensionRules) -> Option<Title> {
    if !rules.is_content(&path) {
        return None;
    }

    let metadata = fs::metadata(&path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    if let Err(e) = fs::File::open(&path) {
        tracing::warn!("Skipping unreadable file {}: {}", path.display(), e);
        return None;
    }

    let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
        tracing::warn!("Skipping file with non UTF-8 name: {}", path.display());
        return None;
    };
    let id = id.to_string();

    let artwork = dir.join(format!("{}.{}", id, rules.artwork_extension()));
    let artwork_path = artwork.is_file().then_some(artwork);

    tracing::debug!("Found title: {} (artwork: {})", id, artwork_path.is_some());
    Some(Title::new(id, path, artwork_path))
}

/// Sorts by id, case-insensitive. Equal ids keep their listing order.
pub(super) fn sort_titles(titles: &mut [Title]) {
    titles.sort_by_key(|title| title.id.to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules() -> ExtensionRules {
        ExtensionRules::new(["sfc", "smc", "fig", "swc"], "png")
    }

    fn title(id: &str) -> Title {
        Title::new(id, PathBuf::from(format!("/roms/{}.sfc", id)), None)
    }

    #[test]
    fn test_rules_normalize_extensions() {
        let rules = ExtensionRules::new([".SFC", " smc ", ""], ".PNG");
        assert!(rules.is_content(Path::new("game.sfc")));
        assert!(rules.is_content(Path::new("game.SMC")));
        assert!(rules.is_artwork(Path::new("game.png")));
        assert!(!rules.is_content(Path::new("game")));
        assert_eq!(rules.artwork_extension(), "png");
    }

    #[test]
    fn test_rules_relevance() {
        let rules = rules();
        assert!(rules.is_relevant(Path::new("/roms/Game.sfc")));
        assert!(rules.is_relevant(Path::new("/roms/Game.PNG")));
        assert!(!rules.is_relevant(Path::new("/roms/Game.srm")));
        assert!(!rules.is_relevant(Path::new("/roms/notes.txt")));
        assert!(!rules.is_relevant(Path::new("/roms/.sfc.swp")));
    }

    #[test]
    fn test_sort_is_case_insensitive() {
        let mut titles = vec![title("zelda"), title("Mario"), title("actraiser")];
        sort_titles(&mut titles);
        let ids: Vec<&str> = titles.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["actraiser", "Mario", "zelda"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut titles = vec![
            Title::new("game", PathBuf::from("/roms/game.smc"), None),
            title("beta"),
            Title::new("GAME", PathBuf::from("/roms/GAME.sfc"), None),
        ];
        sort_titles(&mut titles);

        assert_eq!(titles[0].id, "beta");
        assert_eq!(titles[1].content_path, PathBuf::from("/roms/game.smc"));
        assert_eq!(titles[2].content_path, PathBuf::from("/roms/GAME.sfc"));
    }

    #[test]
    fn test_label_replaces_underscores() {
        let t = title("Super_Mario_World");
        assert_eq!(t.label, "Super Mario World");
        assert_eq!(t.id, "Super_Mario_World");
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let titles = scan_dir(Path::new("/nonexistent/path/that/does/not/exist"), &rules());
        assert!(titles.is_empty());
    }

    #[test]
    fn test_scan_file_instead_of_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir.sfc");
        fs::write(&file, b"rom").unwrap();

        assert!(scan_dir(&file, &rules()).is_empty());
    }

    #[test]
    fn test_scan_skips_directories_with_content_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("folder.sfc")).unwrap();
        fs::write(temp_dir.path().join("real.sfc"), b"rom").unwrap();

        let titles = scan_dir(temp_dir.path(), &rules());
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].id, "real");
    }

    #[test]
    fn test_scan_ignores_artwork_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("game.sfc"), b"rom").unwrap();
        fs::create_dir(temp_dir.path().join("game.png")).unwrap();

        let titles = scan_dir(temp_dir.path(), &rules());
        assert_eq!(titles.len(), 1);
        assert!(!titles[0].has_artwork());
    }

    #[test]
    fn test_scan_paths_are_absolute() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("game.sfc"), b"rom").unwrap();
        fs::write(temp_dir.path().join("game.png"), b"png").unwrap();

        let titles = scan_dir(temp_dir.path(), &rules());
        assert!(titles[0].content_path.is_absolute());
        assert_eq!(
            titles[0].artwork_path.as_deref(),
            Some(temp_dir.path().join("game.png").as_path())
        );
    }
}
