use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SimwatchError};

/// Settings file name inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.toml";

const SAMPLE_CONF: &str = r#"###############################################################
# example simwatch configuration file
# all file paths are relative to this file
###############################################################

# path to the simc executable
simc_path = "/usr/bin/simc"

# armory region used both for API lookups and simc armory= lines
region = "us"

# options added to every character's simc input
[global_options]
threads = 5

[[characters]]
realm = "realmname"
name = "charname"
email = "you@example.com"

[characters.options]
fight_style = "LightMovement"

[[characters]]
realm = "realmname"
name = "othercharacter"
email = ["you@example.com", "someone@example.com"]

# Uncomment to send mail through an authenticated relay instead of
# local SMTP. An application-specific password is highly recommended.
# [smtp]
# username = "you@gmail.com"
# password = "app-specific-password"
# relay = "smtp.gmail.com"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the simc executable
    pub simc_path: PathBuf,

    /// Armory region, used for both API lookups and simc `armory=` lines
    #[serde(default = "default_region")]
    pub region: String,

    /// Override for the armory API base URL (derived from `region` when unset)
    #[serde(default)]
    pub armory_url: Option<String>,

    /// Options added to every character's simc input
    #[serde(default)]
    pub global_options: BTreeMap<String, toml::Value>,

    /// Character entries, kept raw here and validated one at a time so a
    /// malformed entry skips that character rather than failing the whole load
    pub characters: Vec<toml::Value>,

    /// SMTP credentials; when present mail goes through the authenticated
    /// relay, otherwise through local SMTP on port 25
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub username: String,
    pub password: String,

    /// Relay hostname for the authenticated transport
    #[serde(default = "default_relay")]
    pub relay: String,
}

fn default_region() -> String {
    "us".to_string()
}

fn default_relay() -> String {
    "smtp.gmail.com".to_string()
}

/// One validated character entry from the settings file
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    pub realm: String,
    pub name: String,

    /// Destination address(es); a single string is treated as a one-element list
    #[serde(default)]
    pub email: Addresses,

    /// Per-character options, merged over the global ones
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Addresses {
    One(String),
    Many(Vec<String>),
}

impl Default for Addresses {
    fn default() -> Self {
        Addresses::Many(Vec::new())
    }
}

impl Addresses {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Addresses::One(addr) => std::slice::from_ref(addr),
            Addresses::Many(addrs) => addrs.as_slice(),
        }
    }
}

impl CharacterConfig {
    /// Validate one raw character entry. A missing `name` or `realm`, or an
    /// entry that is not a table at all, fails here and only skips that
    /// character.
    pub fn from_entry(entry: &toml::Value) -> Result<Self> {
        entry
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| SimwatchError::Config(e.to_string()))
    }
}

impl Config {
    /// Load configuration from `<confdir>/settings.toml`
    pub fn load(confdir: &Path) -> Result<Self> {
        let path = confdir.join(SETTINGS_FILE);
        if !path.exists() {
            return Err(SimwatchError::Config(format!(
                "configuration file {} does not exist; run with --genconfig to generate an example one",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| SimwatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.characters.is_empty() {
            return Err(SimwatchError::Config(
                "settings must define a characters list with at least one character".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the sample settings file, creating the configuration directory
    /// if needed. Returns the path written.
    pub fn generate_sample(confdir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(confdir)?;
        let path = confdir.join(SETTINGS_FILE);
        std::fs::write(&path, SAMPLE_CONF)?;
        Ok(path)
    }
}
