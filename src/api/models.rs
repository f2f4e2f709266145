//! Wire models for the lesson backend

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Processing status of a lesson, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Nothing downloaded yet
    #[default]
    NotStarted,
    /// Fetching the source video
    Downloading,
    /// Speech-to-text in progress
    Transcribing,
    /// Translations and shadowing guides being generated
    GeneratingAi,
    /// Ready to practice
    Ready,
    /// Detail lookup failed
    NotFound,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Downloading => "downloading",
            Self::Transcribing => "transcribing",
            Self::GeneratingAi => "generating_ai",
            Self::Ready => "ready",
            Self::NotFound => "not_found",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "downloading" => Some(Self::Downloading),
            "transcribing" => Some(Self::Transcribing),
            "generating_ai" => Some(Self::GeneratingAi),
            "ready" => Some(Self::Ready),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }

    /// Badge text shown next to a lesson
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT DOWNLOADED",
            Self::Downloading => "DOWNLOADING",
            Self::Transcribing => "TRANSCRIBING",
            Self::GeneratingAi => "GENERATING AI",
            Self::Ready => "READY",
            Self::NotFound => "NOT FOUND",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// One of the three pipeline stages the backend is working through
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::Transcribing | Self::GeneratingAi
        )
    }
}

/// Display band derived from a lesson's level tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    Beginner,
    Intermediate,
    Advanced,
    Unknown,
}

/// A lesson summary as listed by `GET /api/lessons`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Identifier, unique within its category
    #[serde(rename = "lesson")]
    pub id: String,

    pub title: String,

    /// Difficulty tag such as "A1", "B2", "A2-B1" or "??"
    #[serde(default)]
    pub level: String,

    /// Duration in seconds
    #[serde(default)]
    pub duration: u64,

    /// Free text naming where the video came from
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub url: Option<String>,

    /// User-controlled completion flag
    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub status: LessonStatus,
}

impl Lesson {
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    pub fn is_processing(&self) -> bool {
        self.status.is_processing()
    }

    /// First whitespace-delimited token of the source label
    pub fn source_tag(&self) -> &str {
        self.source.split_whitespace().next().unwrap_or("")
    }

    pub fn level_band(&self) -> LevelBand {
        if self.level.starts_with('A') {
            LevelBand::Beginner
        } else if self.level.starts_with('B') {
            LevelBand::Intermediate
        } else if self.level == "??" {
            LevelBand::Unknown
        } else {
            LevelBand::Advanced
        }
    }

    /// Duration as "4m 7s"
    pub fn duration_label(&self) -> String {
        format!("{}m {}s", self.duration / 60, self.duration % 60)
    }
}

/// Lessons grouped by category, in the order the backend sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonSnapshot {
    categories: Vec<(String, Vec<Lesson>)>,
}

impl LessonSnapshot {
    /// Build a snapshot from `(category, lessons)` pairs.
    ///
    /// A category repeated in the input is merged into its first
    /// occurrence, and a lesson id already seen in an earlier category is
    /// dropped, so every lesson sits in exactly one bucket.
    pub fn new(groups: Vec<(String, Vec<Lesson>)>) -> Self {
        let mut categories: Vec<(String, Vec<Lesson>)> = Vec::with_capacity(groups.len());
        let mut seen = std::collections::HashSet::new();

        for (category, lessons) in groups {
            let slot = match categories.iter().position(|(name, _)| *name == category) {
                Some(pos) => pos,
                None => {
                    categories.push((category, Vec::new()));
                    categories.len() - 1
                }
            };

            for lesson in lessons {
                if seen.insert(lesson.id.clone()) {
                    categories[slot].1.push(lesson);
                }
            }
        }

        Self { categories }
    }

    /// Category names in server order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    /// Lessons of one category, in server order
    pub fn lessons_in(&self, category: &str) -> &[Lesson] {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, lessons)| lessons.as_slice())
            .unwrap_or(&[])
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Lesson])> {
        self.categories
            .iter()
            .map(|(name, lessons)| (name.as_str(), lessons.as_slice()))
    }

    /// Every lesson with the category it belongs to
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Lesson)> {
        self.groups()
            .flat_map(|(category, lessons)| lessons.iter().map(move |l| (category, l)))
    }

    /// Find a lesson by id across all categories
    pub fn find(&self, lesson_id: &str) -> Option<(&str, &Lesson)> {
        self.iter().find(|(_, lesson)| lesson.id == lesson_id)
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|(_, lessons)| lessons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'de> Deserialize<'de> for LessonSnapshot {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = LessonSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to lesson list")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((category, lessons)) = map.next_entry::<String, Vec<Lesson>>()? {
                    groups.push((category, lessons));
                }
                Ok(LessonSnapshot::new(groups))
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

impl Serialize for LessonSnapshot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, lessons) in &self.categories {
            map.serialize_entry(category, lessons)?;
        }
        map.end()
    }
}

/// One timed line of a lesson transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Position in the transcript
    #[serde(rename = "id", default)]
    pub index: usize,

    /// Start time in seconds, inclusive
    pub start: f64,

    /// End time in seconds, inclusive
    pub end: f64,

    /// Source-language text
    #[serde(rename = "en")]
    pub text: String,

    /// Target-language translation
    #[serde(rename = "vi", default)]
    pub translation: String,

    /// Pronunciation / shadowing guide
    #[serde(default, deserialize_with = "empty_as_none")]
    pub guide: Option<String>,
}

impl TranscriptSegment {
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
            translation: String::new(),
            guide: None,
        }
    }

    /// Whether `time` falls inside this segment, bounds included
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Check that segments are ordered, non-overlapping and have `start <= end`.
///
/// Returns the index of the first offending segment.
pub fn validate_transcript(segments: &[TranscriptSegment]) -> std::result::Result<(), usize> {
    for (i, segment) in segments.iter().enumerate() {
        if segment.start > segment.end {
            return Err(i);
        }
        if i > 0 && segment.start < segments[i - 1].end {
            return Err(i);
        }
    }
    Ok(())
}

/// Payload of `GET /api/lesson/{category}/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDetail {
    pub status: LessonStatus,

    #[serde(default)]
    pub video_url: Option<String>,

    #[serde(default)]
    pub transcript: Option<Vec<TranscriptSegment>>,
}

impl LessonDetail {
    pub fn with_status(status: LessonStatus) -> Self {
        Self {
            status,
            video_url: None,
            transcript: None,
        }
    }

    pub fn not_found() -> Self {
        Self::with_status(LessonStatus::NotFound)
    }
}

/// Body of `POST /api/add-lesson`
#[derive(Debug, Clone, Serialize)]
pub struct AddLessonRequest {
    pub url: String,
    pub category: String,
}

/// Response of `POST /api/add-lesson`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddLessonResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub lesson_id: Option<String>,
}

/// Body of `POST /api/start-lesson`
#[derive(Debug, Clone, Serialize)]
pub struct StartLessonRequest {
    pub category: String,
    pub lesson_id: String,
}

/// Body of `POST /api/done`
#[derive(Debug, Clone, Serialize)]
pub struct DoneRequest {
    pub lesson_id: String,
    pub done: bool,
}

/// Error body the backend sends with a non-2xx status
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_server_order() {
        let json = r#"{
            "technology": [
                {"lesson": "b", "title": "B", "level": "B2", "duration": 61, "source": "TED Talk", "status": "ready", "done": true},
                {"lesson": "a", "title": "A", "level": "B2", "duration": 5, "source": "WIRED"}
            ],
            "business": [
                {"lesson": "c", "title": "C", "level": "B1", "duration": 0, "source": "HBR", "status": "generating_ai"}
            ]
        }"#;

        let snapshot: LessonSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.categories().collect::<Vec<_>>(), ["technology", "business"]);
        let ids: Vec<_> = snapshot.iter().map(|(_, l)| l.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);

        let (_, a) = snapshot.find("a").unwrap();
        assert_eq!(a.status, LessonStatus::NotStarted);
        assert!(!a.done);
        assert_eq!(snapshot.find("c").unwrap().0, "business");
    }

    #[test]
    fn duplicate_lessons_land_in_one_category() {
        let lesson = |id: &str| Lesson {
            id: id.to_string(),
            title: id.to_uppercase(),
            level: "A1".to_string(),
            duration: 0,
            source: String::new(),
            url: None,
            done: false,
            status: LessonStatus::NotStarted,
        };

        let snapshot = LessonSnapshot::new(vec![
            ("x".to_string(), vec![lesson("1"), lesson("2")]),
            ("y".to_string(), vec![lesson("2"), lesson("3")]),
            ("x".to_string(), vec![lesson("4")]),
        ]);

        assert_eq!(snapshot.categories().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(snapshot.lessons_in("x").len(), 3);
        assert_eq!(snapshot.lessons_in("y").len(), 1);
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn lesson_display_helpers() {
        let mut lesson: Lesson = serde_json::from_str(
            r#"{"lesson": "x", "title": "X", "level": "??", "duration": 247, "source": "Custom upload"}"#,
        )
        .unwrap();

        assert_eq!(lesson.source_tag(), "Custom");
        assert_eq!(lesson.duration_label(), "4m 7s");
        assert_eq!(lesson.level_band(), LevelBand::Unknown);

        lesson.level = "A2-B1".to_string();
        assert_eq!(lesson.level_band(), LevelBand::Beginner);
        lesson.level = "C1".to_string();
        assert_eq!(lesson.level_band(), LevelBand::Advanced);
    }

    #[test]
    fn detail_parses_enriched_transcript() {
        let json = r#"{
            "status": "ready",
            "video_url": "http://localhost:8000/media/custom/x/video.mp4",
            "transcript": [
                {"start": 0.0, "end": 2.5, "text": "Hello", "id": 0, "en": "Hello", "vi": "Xin chao", "guide": "heh-LOH"},
                {"start": 2.5, "end": 4.0, "text": "Bye", "id": 1, "en": "Bye", "vi": "...", "guide": ""}
            ]
        }"#;

        let detail: LessonDetail = serde_json::from_str(json).unwrap();
        let transcript = detail.transcript.unwrap();
        assert_eq!(transcript[0].text, "Hello");
        assert_eq!(transcript[0].translation, "Xin chao");
        assert_eq!(transcript[0].guide.as_deref(), Some("heh-LOH"));
        assert_eq!(transcript[1].guide, None);
        assert_eq!(transcript[1].index, 1);
        assert!(validate_transcript(&transcript).is_ok());
    }

    #[test]
    fn processing_detail_has_no_transcript() {
        let detail: LessonDetail = serde_json::from_str(r#"{"status": "transcribing"}"#).unwrap();
        assert!(detail.status.is_processing());
        assert!(detail.transcript.is_none());
    }

    #[test]
    fn validate_flags_overlap_and_inverted_ranges() {
        let ok = [
            TranscriptSegment::new(0, 0.0, 5.0, "a"),
            TranscriptSegment::new(1, 5.0, 9.0, "b"),
        ];
        assert!(validate_transcript(&ok).is_ok());

        let overlap = [
            TranscriptSegment::new(0, 0.0, 5.0, "a"),
            TranscriptSegment::new(1, 4.0, 9.0, "b"),
        ];
        assert_eq!(validate_transcript(&overlap), Err(1));

        let inverted = [TranscriptSegment::new(0, 3.0, 1.0, "a")];
        assert_eq!(validate_transcript(&inverted), Err(0));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            LessonStatus::NotStarted,
            LessonStatus::Downloading,
            LessonStatus::Transcribing,
            LessonStatus::GeneratingAi,
            LessonStatus::Ready,
            LessonStatus::NotFound,
        ] {
            assert_eq!(LessonStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LessonStatus::from_str("queued"), None);
    }
}
