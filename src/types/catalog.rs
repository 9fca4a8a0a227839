use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fixed category table; each category admits only its own genres.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "FICTION",
        &[
            "Fantasy",
            "Mystery",
            "Romance",
            "Adventure",
            "Horror",
            "Science-Fiction",
            "Drama",
            "Comedy",
            "Thriller",
            "Historical Fiction",
            "Action",
        ],
    ),
    (
        "NON-FICTION",
        &[
            "Biography",
            "History",
            "Self-Help",
            "Science",
            "Philosophy",
            "Religion",
            "Politics",
            "Art Criticism",
        ],
    ),
    (
        "POETRY",
        &[
            "Epic",
            "Lyric",
            "Narrative",
            "Free Verse",
            "Verse",
            "Prose",
            "Epistolary",
        ],
    ),
    (
        "DRAMA / PLAYS",
        &[
            "Tragedy",
            "Comedy",
            "Modern Drama",
            "Historical Drama",
            "Surreal",
        ],
    ),
    (
        "COMICS / GRAPHIC NOVELS",
        &[
            "Superhero",
            "Manga",
            "Graphic Memoir",
            "Graphic Novel",
            "Single-issue Comic",
            "Annual-issue",
        ],
    ),
    (
        "CHILDREN'S BOOKS",
        &[
            "Picture Books",
            "Middle Grade",
            "Fairytale",
            "Religious picture book",
            "Anthologies",
        ],
    ),
    (
        "YOUNG ADULT (YA)",
        &[
            "Fantasy",
            "Romance",
            "Dystopian",
            "Drama",
            "Vampires",
            "High-School Drama",
        ],
    ),
];

/// Genres allowed for `category`, or `None` for an unknown category.
pub fn genres_for(category: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, genres)| *genres)
}

pub fn is_valid_genre(category: &str, genre: &str) -> bool {
    genres_for(category).is_some_and(|genres| genres.contains(&genre))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingStatus {
    CurrentlyReading,
    Completed,
    Paused,
    Dropped,
    PlanToRead,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 5] = [
        ReadingStatus::CurrentlyReading,
        ReadingStatus::Completed,
        ReadingStatus::Paused,
        ReadingStatus::Dropped,
        ReadingStatus::PlanToRead,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReadingStatus::CurrentlyReading => "Currently Reading",
            ReadingStatus::Completed => "Completed",
            ReadingStatus::Paused => "Paused",
            ReadingStatus::Dropped => "Dropped",
            ReadingStatus::PlanToRead => "Plan to Read",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reading status `{}`", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ReadingStatus {
    type Err = UnknownStatus;

    /// Accepts the canonical labels and the older spellings found in stored rows
    /// ("read", "bookmark", "reading", ...), ignoring case and separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "currentlyreading" | "reading" => Ok(ReadingStatus::CurrentlyReading),
            "completed" | "read" | "finished" => Ok(ReadingStatus::Completed),
            "paused" | "onhold" => Ok(ReadingStatus::Paused),
            "dropped" => Ok(ReadingStatus::Dropped),
            "plantoread" | "bookmark" | "bookmarked" => Ok(ReadingStatus::PlanToRead),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for ReadingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ReadingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lenient parse for stored values: unknown labels are dropped rather than failing the row.
pub fn parse_stored_status(raw: Option<&str>) -> Option<ReadingStatus> {
    raw.and_then(|s| s.parse().ok())
}
