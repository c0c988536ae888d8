//! Skills compiled into the `nux` binary.

pub mod developer;
pub mod notes;

use std::path::PathBuf;

use nux_core::{Skill, SkillLoader};

pub use developer::DeveloperSkill;
pub use notes::NotesSkill;

/// Loader for the built-in skills.
pub struct BuiltinSkills {
    /// Where `notes.json` lives.
    pub data_dir: PathBuf,
    /// Working directory for developer commands.
    pub workspace_dir: PathBuf,
}

impl SkillLoader for BuiltinSkills {
    fn source(&self) -> &str {
        "builtin"
    }

    fn load(&self) -> anyhow::Result<Vec<Box<dyn Skill>>> {
        let notes = NotesSkill::open(self.data_dir.join("notes.json"))?;
        let developer = DeveloperSkill::new(self.workspace_dir.clone());
        Ok(vec![Box::new(notes), Box::new(developer)])
    }
}
