//! The `settings` subcommands, which locate, print and edit the user's `settings.toml`.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Ways of inspecting or changing the program settings
#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Open `settings.toml` in a text editor, creating it first if needed
    Edit,
    /// Print where `settings.toml` is looked for
    Path,
    /// Print the settings a run would use once defaults are filled in
    Show,
    /// Print a `settings.toml` with every setting commented out
    DumpDefault,
}

impl SettingsCommand {
    /// Run the subcommand
    pub fn execute(self) -> Result<()> {
        let file_path = get_settings_file_path();
        match self {
            Self::Edit => {
                if create_settings_file(&file_path)? {
                    println!("Created {}", file_path.display());
                }
                println!("Opening {} in the editor", file_path.display());
                edit::edit_file(&file_path)
                    .with_context(|| format!("Could not edit {}", file_path.display()))?;
            }
            Self::Path => println!("{}", file_path.display()),
            Self::Show => print!("{}", settings_as_toml(&Settings::load()?)?),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
        }

        Ok(())
    }
}

/// Write the commented-out defaults to `file_path` unless a settings file is already there.
///
/// Returns whether a new file was written.
fn create_settings_file(file_path: &Path) -> Result<bool> {
    if file_path.is_file() {
        return Ok(false);
    }

    if let Some(config_dir) = file_path.parent() {
        fs::create_dir_all(config_dir).with_context(|| {
            format!("Could not create configuration folder {}", config_dir.display())
        })?;
    }
    fs::write(file_path, Settings::default_file_contents())
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(true)
}

fn settings_as_toml(settings: &Settings) -> Result<String> {
    toml::to_string(settings).context("Could not convert the settings to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_settings_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config").join("settings.toml");
        assert!(create_settings_file(&file_path).unwrap());
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            Settings::default_file_contents()
        );

        // A user's own file is kept
        fs::write(&file_path, "log_level = \"debug\"\n").unwrap();
        assert!(!create_settings_file(&file_path).unwrap());
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "log_level = \"debug\"\n"
        );
    }

    #[test]
    fn test_settings_as_toml() {
        let settings = Settings {
            overwrite: true,
            ..Settings::default()
        };
        let toml = settings_as_toml(&settings).unwrap();
        assert!(toml.contains("log_level = \"info\""));
        assert!(toml.contains("overwrite = true"));
        assert!(toml.contains("write_profiles = true"));
    }
}
