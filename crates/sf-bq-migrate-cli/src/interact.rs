//! Terminal prompts and the external editor.

use std::io::Write;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use sf_bq_migrate::{Choice, EditorLauncher, Interaction, MigrateError, Result};

/// Interactive checkpoints rendered as a terminal select menu.
pub struct TerminalInteraction;

impl Interaction for TerminalInteraction {
    fn choose(&mut self, prompt: &str, choices: &[Choice]) -> Result<Choice> {
        println!("\n{prompt}\n");
        let labels: Vec<&str> = choices.iter().map(|c| c.label()).collect();
        let index = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Next action")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(|e| match e {
                dialoguer::Error::IO(io) => MigrateError::Io(io),
            })?;
        Ok(choices[index])
    }
}

/// Launches `$EDITOR` (falling back to `vi`) on a temp file.
pub struct ShellEditor;

impl EditorLauncher for ShellEditor {
    fn edit(&self, text: &str) -> Result<String> {
        let mut file = tempfile::Builder::new().suffix(".sql").tempfile()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
        let status = std::process::Command::new(&editor)
            .arg(file.path())
            .status()
            .map_err(|e| MigrateError::Editor(format!("failed to launch {editor}: {e}")))?;
        if !status.success() {
            return Err(MigrateError::Editor(format!("{editor} exited with {status}")));
        }
        Ok(std::fs::read_to_string(file.path())?)
    }
}
