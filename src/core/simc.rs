use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::{CharacterConfig, Config};
use crate::error::{Result, SimwatchError};

use super::mailer::Mailer;

/// Seam for the run-and-notify pipeline, so the decision engine can be
/// exercised in tests without invoking simc or a mail transport.
#[async_trait]
pub trait ChangePipeline: Send + Sync {
    /// Run the analysis for one changed character and send the notification.
    async fn run(&self, identity: &str, character: &CharacterConfig, diff: &str) -> Result<()>;
}

/// The real pipeline: writes `<identity>.simc` into the configuration
/// directory, runs the simc executable from there, checks that
/// `<identity>.html` was produced, and hands everything to the mailer.
pub struct SimcPipeline {
    simc_path: PathBuf,
    confdir: PathBuf,
    region: String,
    global_options: BTreeMap<String, toml::Value>,
    mailer: Mailer,
}

impl SimcPipeline {
    pub fn new(config: &Config, confdir: PathBuf, mailer: Mailer) -> Self {
        Self {
            simc_path: config.simc_path.clone(),
            confdir,
            region: config.region.clone(),
            global_options: config.global_options.clone(),
            mailer,
        }
    }

    /// The simc input script: the armory line for the character, the merged
    /// option set as sorted `key=value` lines, and the output directive.
    fn input_script(&self, identity: &str, character: &CharacterConfig) -> String {
        let mut script = format!(
            "\"armory={},{},{}\"\n",
            self.region, character.realm, character.name
        );
        let mut options = self.global_options.clone();
        options.extend(character.options.clone());
        for (key, value) in &options {
            script.push_str(&format!("{}={}\n", key, option_value(value)));
        }
        script.push_str(&format!("html={}.html\n", identity));
        script
    }
}

/// Option values render bare: strings unquoted, numbers and booleans as
/// their literal tokens.
fn option_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ChangePipeline for SimcPipeline {
    async fn run(&self, identity: &str, character: &CharacterConfig, diff: &str) -> Result<()> {
        if !self.simc_path.exists() {
            return Err(SimwatchError::Simc(format!(
                "simc path {} does not exist",
                self.simc_path.display()
            )));
        }

        let simc_file = self.confdir.join(format!("{}.simc", identity));
        let html_file = self.confdir.join(format!("{}.html", identity));
        std::fs::write(&simc_file, self.input_script(identity, character))?;

        debug!(
            "Running: {} {}",
            self.simc_path.display(),
            simc_file.display()
        );
        let start = Instant::now();
        let output = Command::new(&self.simc_path)
            .arg(&simc_file)
            .current_dir(&self.confdir)
            .output()
            .await
            .map_err(|e| {
                SimwatchError::Simc(format!(
                    "failed to run {}: {}",
                    self.simc_path.display(),
                    e
                ))
            })?;
        let duration = start.elapsed();

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(SimwatchError::Simc(format!(
                "simc exited with {}: {}",
                output.status,
                combined.trim()
            )));
        }
        if !html_file.exists() {
            return Err(SimwatchError::Simc(
                "simc finished but the HTML report was not found on disk".to_string(),
            ));
        }
        debug!(
            "Ran simc, generated {} in {:?}",
            html_file.display(),
            duration
        );

        self.mailer
            .send_report(
                identity,
                character.email.as_slice(),
                diff,
                &html_file,
                duration,
                &combined,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_config(simc_path: &Path) -> Config {
        Config {
            simc_path: simc_path.to_path_buf(),
            region: "us".to_string(),
            armory_url: None,
            global_options: BTreeMap::from([
                ("threads".to_string(), toml::Value::Integer(5)),
                ("iterations".to_string(), toml::Value::Integer(10000)),
            ]),
            characters: vec![toml::Value::String("unused".to_string())],
            smtp: None,
        }
    }

    fn test_character() -> CharacterConfig {
        let entry: toml::Value = toml::from_str(
            r#"
realm = "Area 52"
name = "nameone"
email = "you@example.com"

[options]
threads = 2
fight_style = "LightMovement"
"#,
        )
        .unwrap();
        CharacterConfig::from_entry(&entry).unwrap()
    }

    fn test_pipeline(simc_path: &Path, confdir: &Path) -> SimcPipeline {
        SimcPipeline::new(
            &test_config(simc_path),
            confdir.to_path_buf(),
            Mailer::new(None, true).unwrap(),
        )
    }

    #[test]
    fn test_input_script_shape() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir.path().join("simc"), dir.path());
        let script = pipeline.input_script("nameone@Area52", &test_character());
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(
            lines,
            vec![
                "\"armory=us,Area 52,nameone\"",
                "fight_style=LightMovement",
                "iterations=10000",
                "threads=2",
                "html=nameone@Area52.html",
            ]
        );
    }

    #[test]
    fn test_character_options_override_global() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir.path().join("simc"), dir.path());
        let script = pipeline.input_script("nameone@Area52", &test_character());
        assert!(script.contains("threads=2\n"));
        assert!(!script.contains("threads=5\n"));
    }

    #[test]
    fn test_option_value_rendering() {
        assert_eq!(
            option_value(&toml::Value::String("LightMovement".to_string())),
            "LightMovement"
        );
        assert_eq!(option_value(&toml::Value::Integer(5)), "5");
        assert_eq!(option_value(&toml::Value::Boolean(true)), "true");
    }

    #[tokio::test]
    async fn test_missing_executable_aborts_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(&dir.path().join("no-such-simc"), dir.path());
        let err = pipeline
            .run("nameone@Area52", &test_character(), "diff")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        // no input script was staged
        assert!(!dir.path().join("nameone@Area52.simc").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let simc = dir.path().join("simc");
        std::fs::write(&simc, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&simc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let pipeline = test_pipeline(&simc, dir.path());
        let err = pipeline
            .run("nameone@Area52", &test_character(), "diff")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("simc exited with"));
        assert!(msg.contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_report_is_an_error() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let simc = dir.path().join("simc");
        std::fs::write(&simc, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&simc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let pipeline = test_pipeline(&simc, dir.path());
        let err = pipeline
            .run("nameone@Area52", &test_character(), "diff")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTML report was not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_in_dry_run_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let simc = dir.path().join("simc");
        // writes the expected report next to itself, as simc does with html=
        std::fs::write(
            &simc,
            "#!/bin/sh\necho report > \"nameone@Area52.html\"\necho done\n",
        )
        .unwrap();
        std::fs::set_permissions(&simc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let pipeline = test_pipeline(&simc, dir.path());
        pipeline
            .run("nameone@Area52", &test_character(), "diff")
            .await
            .unwrap();
        assert!(dir.path().join("nameone@Area52.simc").exists());
        assert!(dir.path().join("nameone@Area52.html").exists());
    }
}
