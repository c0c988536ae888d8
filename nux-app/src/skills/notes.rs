//! `notes` skill: spoken notes kept in a JSON file.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use nux_core::{CommandResult, NuxError, Skill, SkillContext, SkillMetadata};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

const LIST_COUNT: usize = 5;
const LIST_PHRASES: &[&str] = &["list notes", "show notes", "read notes", "my notes"];
const TAKE_PHRASES: &[&str] = &["note", "remember", "remind me", "write down"];
/// Lead-in words dropped before the note body.
const LEAD_INS: &[&str] = &["note", "remember", "remind me", "write down", "that", "to"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

pub struct NotesSkill {
    path: PathBuf,
    notes: Mutex<Vec<Note>>,
}

impl NotesSkill {
    /// Load notes from `path`; a missing file starts empty.
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let notes = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parsing notes file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading notes file {}", path.display()))
            }
        };
        Ok(Self {
            path,
            notes: Mutex::new(notes),
        })
    }

    pub fn count(&self) -> usize {
        self.notes.lock().len()
    }

    fn save(&self, note_text: &str) -> nux_core::Result<Note> {
        let now = Utc::now();
        let note = Note {
            id: now.format("%Y%m%d%H%M%S%3f").to_string(),
            text: note_text.to_string(),
            timestamp: now,
        };

        let mut notes = self.notes.lock();
        let mut updated = notes.clone();
        updated.push(note.clone());
        let json = serde_json::to_string_pretty(&updated).map_err(anyhow::Error::from)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        *notes = updated;
        info!(id = %note.id, "note saved");
        Ok(note)
    }

    fn recent(&self, count: usize) -> Vec<Note> {
        let mut notes = self.notes.lock().clone();
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        notes.truncate(count);
        notes
    }
}

impl Skill for NotesSkill {
    fn describe(&self) -> SkillMetadata {
        SkillMetadata::new(
            "notes",
            "1.0.0",
            "NuxAI Team",
            "Take quick voice notes and reminders",
            &["note", "remember", "remind me", "write down"],
        )
    }

    fn execute(&self, command: &str, _ctx: &SkillContext) -> nux_core::Result<CommandResult> {
        let lower = command.to_lowercase();

        if LIST_PHRASES.iter().any(|p| lower.contains(p)) {
            let notes = self.recent(LIST_COUNT);
            if notes.is_empty() {
                return Ok(CommandResult::ok("No notes found")
                    .with_speak("You don't have any notes yet"));
            }
            let listing = notes
                .iter()
                .map(|n| format!("- {}", n.text))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(CommandResult::ok(listing)
                .with_speak(format!("You have {} recent notes", notes.len())));
        }

        if TAKE_PHRASES.iter().any(|p| lower.contains(p)) {
            let text = extract_note_text(command);
            if text.is_empty() {
                return Err(NuxError::handler("What should the note say?"));
            }
            self.save(&text)?;
            return Ok(CommandResult::ok(format!("Note saved: {text}"))
                .with_speak("I've saved that note"));
        }

        Err(NuxError::handler("Could not understand note command"))
    }

    fn initialize(&self) -> nux_core::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Text after the first trigger and any lead-in words that follow it,
/// original casing kept.
fn extract_note_text(command: &str) -> String {
    let words: Vec<&str> = command.split_whitespace().collect();
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let lead_at = |i: usize| -> Option<usize> {
        LEAD_INS.iter().find_map(|lead| {
            let lead: Vec<&str> = lead.split_whitespace().collect();
            let end = i + lead.len();
            (end <= lower.len() && lower[i..end].iter().zip(&lead).all(|(w, l)| w == l))
                .then_some(lead.len())
        })
    };

    let Some(mut start) = (0..lower.len()).find(|&i| {
        TAKE_PHRASES
            .iter()
            .any(|t| lower[i..].join(" ").starts_with(t))
    }) else {
        return command.trim().to_string();
    };
    while let Some(len) = lead_at(start) {
        start += len;
    }
    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("nux-notes-{tag}-{}", std::process::id()))
            .join("notes.json")
    }

    #[test]
    fn lead_in_words_are_stripped() {
        assert_eq!(extract_note_text("Remember to Buy milk"), "Buy milk");
        assert_eq!(extract_note_text("write down call the bank"), "call the bank");
        assert_eq!(extract_note_text("remember to go to the store"), "go to the store");
        assert_eq!(extract_note_text("please remind me that rent is due"), "rent is due");
        assert_eq!(extract_note_text("note"), "");
    }

    #[test]
    fn take_then_list_notes() {
        let path = scratch("list");
        let skill = NotesSkill::open(path.clone()).expect("open");
        let ctx = SkillContext::default();

        let empty = skill.execute("show notes", &ctx).expect("list");
        assert_eq!(empty.speak.as_deref(), Some("You don't have any notes yet"));

        let saved = skill.execute("remember to water the plants", &ctx).expect("take");
        assert_eq!(saved.result_text(), "Note saved: water the plants");

        let listed = skill.execute("list notes", &ctx).expect("list");
        assert_eq!(listed.result_text(), "- water the plants");
        assert_eq!(listed.speak.as_deref(), Some("You have 1 recent notes"));

        // Persisted: a fresh instance sees the same note.
        let reopened = NotesSkill::open(path.clone()).expect("reopen");
        assert_eq!(reopened.count(), 1);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn empty_note_is_a_failure() {
        let skill = NotesSkill::open(scratch("empty")).expect("open");
        let err = skill
            .execute("note", &SkillContext::default())
            .expect_err("empty note");
        assert_eq!(err.to_string(), "What should the note say?");
    }

    #[test]
    fn failed_write_keeps_note_out_of_listing() {
        // The notes path is a directory, so the write fails.
        let dir = std::env::temp_dir().join(format!("nux-notes-unwritable-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("dir");
        let skill = NotesSkill {
            path: dir.clone(),
            notes: Mutex::new(Vec::new()),
        };
        let ctx = SkillContext::default();

        assert!(skill.execute("remember to pay rent", &ctx).is_err());
        assert_eq!(skill.count(), 0);
        let listed = skill.execute("list notes", &ctx).expect("list");
        assert_eq!(listed.result_text(), "No notes found");

        let _ = fs::remove_dir_all(&dir);
    }
}
