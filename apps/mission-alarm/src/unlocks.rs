//! Hidden pages unlocked by keywords in task text.

use std::collections::BTreeSet;

/// A page that stays hidden until a task mentions its keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Mp3Player,
    Mp4Player,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::Mp3Player, Feature::Mp4Player];

    /// Keyword that unlocks the page (matched ignoring case).
    pub fn keyword(&self) -> &'static str {
        match self {
            Feature::Mp3Player => "mp3",
            Feature::Mp4Player => "mp4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feature::Mp3Player => "MP3 Player",
            Feature::Mp4Player => "MP4 Player",
        }
    }
}

/// Set of unlocked features.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unlocks {
    features: BTreeSet<Feature>,
}

impl Unlocks {
    /// Features whose keyword occurs in `text`.
    pub fn scan(text: &str) -> Self {
        let text = text.to_lowercase();
        Self {
            features: Feature::ALL
                .into_iter()
                .filter(|f| text.contains(f.keyword()))
                .collect(),
        }
    }

    /// Scan every text and merge the results.
    pub fn scan_all<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut unlocks = Self::default();
        for text in texts {
            unlocks.merge(&Self::scan(text));
        }
        unlocks
    }

    /// Add every feature of `other`. Returns the newly unlocked ones.
    pub fn merge(&mut self, other: &Unlocks) -> Vec<Feature> {
        other
            .features
            .iter()
            .copied()
            .filter(|f| self.features.insert(*f))
            .collect()
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.features.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
