// reviewer-core/src/playlists.rs

//! Mood name → playlist lookup used by the music tool.

use crate::config::PlaylistEntry;
use crate::errors::ToolError;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub uri: String,
    pub display_name: String,
}

/// Built-in moods, overridable from `[music.playlists]`.
const BUILTIN_PLAYLISTS: &[(&str, &str, &str)] = &[
    ("focus", "spotify:playlist:37i9dQZF1DWZeKCadgRdKQ", "Deep Focus"),
    ("relax", "spotify:playlist:37i9dQZF1DWU0ScTcjJBdj", "Relax & Unwind"),
    ("energize", "spotify:playlist:37i9dQZF1DX3rxVfibe1L0", "Mood Booster"),
    ("chill", "spotify:playlist:37i9dQZF1DX4WYpdgoIcn6", "Chill Hits"),
    ("work", "spotify:playlist:37i9dQZF1DWZk0frd3wbHL", "Productive Morning"),
];

/// Immutable after construction; shared read-only by the music tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistCatalog {
    entries: BTreeMap<String, Playlist>,
}

impl PlaylistCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN_PLAYLISTS
            .iter()
            .map(|(mood, uri, name)| {
                (
                    mood.to_string(),
                    Playlist {
                        uri: uri.to_string(),
                        display_name: name.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Built-in catalog with configured entries layered on top, keyed by mood.
    pub fn with_overrides(overrides: &HashMap<String, PlaylistEntry>) -> Self {
        let mut catalog = Self::builtin();
        for (mood, entry) in overrides {
            catalog.entries.insert(
                mood.clone(),
                Playlist {
                    uri: entry.uri.clone(),
                    display_name: entry.name.clone(),
                },
            );
        }
        catalog
    }

    pub fn resolve(&self, mood: &str) -> Result<&Playlist, ToolError> {
        self.entries.get(mood).ok_or_else(|| ToolError::UnknownMood {
            mood: mood.to_string(),
            available: self.moods().into_iter().map(str::to_string).collect(),
        })
    }

    /// Mood names in sorted order.
    pub fn moods(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for PlaylistCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_moods() {
        let catalog = PlaylistCatalog::builtin();
        assert_eq!(catalog.moods(), vec!["chill", "energize", "focus", "relax", "work"]);
        assert_eq!(catalog.resolve("focus").unwrap().display_name, "Deep Focus");
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "focus".to_string(),
            PlaylistEntry {
                uri: "spotify:playlist:mine".to_string(),
                name: "My Focus".to_string(),
            },
        );
        overrides.insert(
            "coding".to_string(),
            PlaylistEntry {
                uri: "spotify:playlist:code".to_string(),
                name: "Coding Mode".to_string(),
            },
        );
        let catalog = PlaylistCatalog::with_overrides(&overrides);

        let focus = catalog.resolve("focus").unwrap();
        assert_eq!(focus.uri, "spotify:playlist:mine");
        assert_eq!(focus.display_name, "My Focus");
        assert_eq!(catalog.resolve("coding").unwrap().display_name, "Coding Mode");
        // Untouched defaults survive.
        assert_eq!(catalog.resolve("chill").unwrap().display_name, "Chill Hits");
        assert_eq!(catalog.moods().len(), 6);
    }

    #[test]
    fn test_unknown_mood_is_an_error() {
        let catalog = PlaylistCatalog::builtin();
        match catalog.resolve("sleepy") {
            Err(ToolError::UnknownMood { mood, available }) => {
                assert_eq!(mood, "sleepy");
                assert!(available.contains(&"relax".to_string()));
            }
            other => panic!("expected UnknownMood, got {:?}", other),
        }
    }
}
