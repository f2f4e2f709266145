//! CLI command implementations

use anyhow::{Context, Result};

use crate::api::{build_api, Lesson, LessonApi, LessonStatus, TranscriptSegment};
use crate::cli::args::ConfigCommand;
use crate::config::Settings;
use crate::lifecycle::snapshot::{category_label, progress};
use crate::lifecycle::{CommandOutcome, LessonFilter, LifecycleTracker, PracticeState};
use crate::playback::{CommandSpeech, SpeechChannel, Utterance, Voice};

fn tracker(settings: &Settings) -> Result<LifecycleTracker> {
    let api = build_api(settings)?;
    Ok(LifecycleTracker::from_settings(api, settings))
}

/// List lessons grouped by category
pub async fn list_lessons(
    settings: &Settings,
    category: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let tracker = tracker(settings)?;
    let snapshot = tracker
        .store()
        .refresh()
        .await
        .with_context(|| format!("Failed to connect to server at {}", settings.api_base()))?;

    let stats = progress(&snapshot);
    let filter = LessonFilter::new(category, search.unwrap_or_default());
    let groups = filter.apply(&snapshot);

    if groups.is_empty() {
        println!("No lessons found");
        return Ok(());
    }

    println!("{} / {} COMPLETED", stats.done, stats.total);

    for (category, lessons) in groups {
        println!();
        println!("== {} ({} lessons) ==", category_label(category), lessons.len());
        for lesson in lessons {
            println!("  {}", lesson_row(lesson));
        }
    }

    Ok(())
}

/// Import a new lesson
pub async fn add_lesson(settings: &Settings, url: &str, category: Option<String>) -> Result<()> {
    let tracker = tracker(settings)?;
    let category = category.unwrap_or_else(|| settings.server.default_category.clone());

    match tracker.request_add(url, &category).await {
        CommandOutcome::Skipped => {
            println!("Nothing to add: the URL is empty");
        }
        CommandOutcome::Accepted { lesson_id } => {
            match lesson_id {
                Some(id) => println!("Lesson added as {}/{}. Processing started.", category, id),
                None => println!("Lesson added! Processing started."),
            }
        }
        CommandOutcome::Failed(message) => {
            anyhow::bail!("Error: {}", message);
        }
    }

    Ok(())
}

/// Start processing a lesson, optionally following it to the end
pub async fn start_lesson(settings: &Settings, category: &str, id: &str, follow: bool) -> Result<()> {
    let tracker = tracker(settings)?;

    match tracker.request_start(category, id).await {
        CommandOutcome::Failed(message) => anyhow::bail!("{}", message),
        _ => println!("Started processing {}/{}", category, id),
    }

    if follow {
        follow_lesson(&tracker, category, id).await?;
    }

    Ok(())
}

/// Poll a lesson until it leaves the processing pipeline
pub async fn watch_lesson(settings: &Settings, category: &str, id: &str) -> Result<()> {
    let tracker = tracker(settings)?;
    follow_lesson(&tracker, category, id).await
}

async fn follow_lesson(tracker: &LifecycleTracker, category: &str, id: &str) -> Result<()> {
    let mut stream = tracker.watch_lesson(category, id);
    let mut last: Option<PracticeState> = None;

    while let Some(state) = stream.changed().await {
        if last.as_ref() != Some(&state) {
            let (headline, detail) = state.describe();
            println!("{:<20} {}", headline, detail);
            last = Some(state);
        }
    }

    match stream.state() {
        PracticeState::Ready { transcript, .. } => {
            println!(
                "Lesson ready: {} segments. Practice with `fluency tui`.",
                transcript.len()
            );
        }
        PracticeState::Processing(status) => {
            anyhow::bail!(
                "Lost contact with the server while the lesson was {}",
                status.as_str()
            );
        }
        PracticeState::NotReady | PracticeState::Loading => {
            println!("This lesson has not been generated yet.");
        }
    }

    Ok(())
}

/// Set or clear a lesson's completed flag
pub async fn mark_done(settings: &Settings, id: &str, undo: bool) -> Result<()> {
    let tracker = tracker(settings)?;
    tracker
        .store()
        .refresh()
        .await
        .with_context(|| format!("Failed to connect to server at {}", settings.api_base()))?;

    match tracker.toggle_done(id, !undo).await {
        CommandOutcome::Failed(message) => anyhow::bail!("{}", message),
        _ if undo => println!("Marked {} as not completed", id),
        _ => println!("Marked {} as completed", id),
    }

    Ok(())
}

/// Print a lesson's transcript
pub async fn show_transcript(
    settings: &Settings,
    category: &str,
    id: &str,
    translation: bool,
    guide: bool,
) -> Result<()> {
    let api = build_api(settings)?;
    let detail = api
        .lesson_detail(category, id)
        .await
        .with_context(|| format!("Failed to fetch lesson {}/{}", category, id))?;

    match PracticeState::from_detail(&detail) {
        PracticeState::Ready { transcript, .. } => {
            print!("{}", render_transcript(&transcript, translation, guide));
        }
        state => {
            let (headline, detail) = state.describe();
            println!("{}: {}", headline, detail);
        }
    }

    Ok(())
}

/// Speak a sentence and wait for the synthesizer to finish
pub async fn say(settings: &Settings, text: &str) -> Result<()> {
    let speech = CommandSpeech::from_settings(settings);
    let voice = Voice::from_settings(settings);

    speech.cancel();
    speech
        .speak(&Utterance {
            text: text.to_string(),
            rate: voice.rate,
            language: voice.language,
        })
        .context("Text-to-speech failed. Is espeak-ng installed? See practice.speech_command")?;

    tokio::task::spawn_blocking(move || speech.wait()).await??;
    Ok(())
}

/// Handle config subcommands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(settings)?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

// Helper functions

fn lesson_row(lesson: &Lesson) -> String {
    let marker = if lesson.done {
        "✓"
    } else {
        status_marker(lesson.status)
    };

    let badge = if lesson.done {
        "COMPLETED"
    } else {
        lesson.status.label()
    };

    format!(
        "{} {:<32} {:<6} {:>8}  {:<12} {}",
        marker,
        truncate(&lesson.title, 32),
        lesson.level,
        lesson.duration_label(),
        truncate(lesson.source_tag(), 12),
        badge
    )
}

fn status_marker(status: LessonStatus) -> &'static str {
    match status {
        LessonStatus::NotStarted => "○",
        LessonStatus::Downloading | LessonStatus::Transcribing | LessonStatus::GeneratingAi => "◐",
        LessonStatus::Ready => "●",
        LessonStatus::NotFound => "✗",
    }
}

fn render_transcript(segments: &[TranscriptSegment], translation: bool, guide: bool) -> String {
    let mut output = String::new();

    for segment in segments {
        output.push_str(&format!(
            "[{}] {}\n",
            format_timestamp(segment.start),
            segment.text
        ));
        if translation && !segment.translation.is_empty() {
            output.push_str(&format!("        {}\n", segment.translation));
        }
        if guide {
            if let Some(text) = &segment.guide {
                output.push_str(&format!("        ♪ {}\n", text));
            }
        }
    }

    output
}

pub(crate) fn format_timestamp(secs: f64) -> String {
    let total_secs = secs.max(0.0) as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_switch_to_hours() {
        assert_eq!(format_timestamp(65.4), "01:05");
        assert_eq!(format_timestamp(3725.0), "01:02:05");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Café society", 20), "Café society");
        assert_eq!(truncate("Ça va très bien merci", 8), "Ça va...");
    }

    #[test]
    fn transcript_includes_optional_lines() {
        let mut segment = TranscriptSegment::new(0, 62.0, 64.0, "How are you?");
        segment.translation = "Ban khoe khong?".to_string();
        segment.guide = Some("how-ar-YOO".to_string());

        let plain = render_transcript(std::slice::from_ref(&segment), false, false);
        assert_eq!(plain, "[01:02] How are you?\n");

        let full = render_transcript(&[segment], true, true);
        assert!(full.contains("Ban khoe khong?"));
        assert!(full.contains("♪ how-ar-YOO"));
    }
}
