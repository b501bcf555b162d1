use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Glyph shown for a mood label that is not in the table.
pub const DEFAULT_EMOJI: &str = "😊";

/// Glyph shown for a student who has never checked in.
pub const NO_DATA_EMOJI: &str = "❓";

/// The twelve moods a student can pick from, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Ecstatic,
    Inspired,
    Calm,
    Good,
    Numb,
    Worried,
    Lethargic,
    Grumpy,
    Sad,
    Stressed,
    Angry,
}

const MOOD_TABLE: [(Mood, &str, &str); 12] = [
    (Mood::Happy, "happy", "😊"),
    (Mood::Ecstatic, "ecstatic", "😄"),
    (Mood::Inspired, "inspired", "✨"),
    (Mood::Calm, "calm", "😌"),
    (Mood::Good, "good", "👍"),
    (Mood::Numb, "numb", "😐"),
    (Mood::Worried, "worried", "😟"),
    (Mood::Lethargic, "lethargic", "😴"),
    (Mood::Grumpy, "grumpy", "😠"),
    (Mood::Sad, "sad", "😢"),
    (Mood::Stressed, "stressed", "😰"),
    (Mood::Angry, "angry", "😡"),
];

/// Moods that flag a student for follow-up on the teacher dashboard.
pub const LOW_MOODS: [Mood; 4] = [Mood::Sad, Mood::Stressed, Mood::Angry, Mood::Worried];

impl Mood {
    pub const ALL: [Mood; 12] = [
        Mood::Happy,
        Mood::Ecstatic,
        Mood::Inspired,
        Mood::Calm,
        Mood::Good,
        Mood::Numb,
        Mood::Worried,
        Mood::Lethargic,
        Mood::Grumpy,
        Mood::Sad,
        Mood::Stressed,
        Mood::Angry,
    ];

    pub fn as_str(self) -> &'static str {
        MOOD_TABLE[self as usize].1
    }

    pub fn emoji(self) -> &'static str {
        MOOD_TABLE[self as usize].2
    }

    pub fn is_low(self) -> bool {
        LOW_MOODS.contains(&self)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mood: {0}")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        MOOD_TABLE
            .iter()
            .find(|(_, label, _)| label.eq_ignore_ascii_case(needle))
            .map(|(mood, _, _)| *mood)
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

/// A mood as stored. Rows written by other tools can carry labels outside
/// the table; those still count and display [`DEFAULT_EMOJI`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoodLabel {
    Known(Mood),
    Other(String),
}

impl MoodLabel {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Mood>() {
            Ok(mood) => MoodLabel::Known(mood),
            Err(_) => MoodLabel::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MoodLabel::Known(mood) => mood.as_str(),
            MoodLabel::Other(label) => label,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MoodLabel::Known(mood) => mood.emoji(),
            MoodLabel::Other(_) => DEFAULT_EMOJI,
        }
    }

    pub fn known(&self) -> Option<Mood> {
        match self {
            MoodLabel::Known(mood) => Some(*mood),
            MoodLabel::Other(_) => None,
        }
    }

    pub fn is_low(&self) -> bool {
        self.known().is_some_and(Mood::is_low)
    }
}

impl From<Mood> for MoodLabel {
    fn from(mood: Mood) -> Self {
        MoodLabel::Known(mood)
    }
}

impl PartialEq<Mood> for MoodLabel {
    fn eq(&self, other: &Mood) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MoodLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MoodLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MoodLabel::parse(&raw))
    }
}
