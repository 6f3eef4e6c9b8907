use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{CharacterConfig, Config};
use crate::error::Result;

use super::armory::{ArmoryClient, HttpArmoryClient};
use super::differ;
use super::identity::character_id;
use super::mailer::Mailer;
use super::normalizer;
use super::simc::{ChangePipeline, SimcPipeline};
use super::store::SnapshotStore;

/// The fixed change message for a character seen for the first time; no diff
/// is computed in that case.
pub const NOT_IN_CACHE_MESSAGE: &str = "Character not in cache (has not been seen before).";

/// Per-character change decision engine: validate, fetch, compare against the
/// snapshot store, trigger the pipeline on change, commit the fresh record.
/// Strictly sequential; the store is persisted once after the full pass.
pub struct Engine {
    config: Config,
    no_stat: bool,
    store: SnapshotStore,
    armory: Box<dyn ArmoryClient>,
    pipeline: Box<dyn ChangePipeline>,
}

impl Engine {
    pub fn new(confdir: &Path, dry_run: bool, no_stat: bool) -> Result<Self> {
        let confdir: PathBuf = confdir.to_path_buf();
        let config = Config::load(&confdir)?;
        debug!("Loaded settings for {} characters", config.characters.len());
        let store = SnapshotStore::open(&confdir)?;
        let armory = Box::new(HttpArmoryClient::new(
            &config.region,
            config.armory_url.as_deref(),
        ));
        let mailer = Mailer::new(config.smtp.clone(), dry_run)?;
        let pipeline = Box::new(SimcPipeline::new(&config, confdir, mailer));
        Ok(Self::from_parts(config, no_stat, store, armory, pipeline))
    }

    fn from_parts(
        config: Config,
        no_stat: bool,
        store: SnapshotStore,
        armory: Box<dyn ArmoryClient>,
        pipeline: Box<dyn ChangePipeline>,
    ) -> Self {
        Self {
            config,
            no_stat,
            store,
            armory,
            pipeline,
        }
    }

    /// One pass over the configured character list. Per-character failures
    /// are logged and skipped; the pass itself only fails on a store persist
    /// error at the end.
    pub async fn run(&mut self) -> Result<()> {
        let entries = self.config.characters.clone();
        for entry in &entries {
            let character = match CharacterConfig::from_entry(entry) {
                Ok(character) => character,
                Err(e) => {
                    warn!("Character configuration not valid, skipping: {}", e);
                    continue;
                }
            };
            let identity = character_id(&character.name, &character.realm);
            debug!("Doing character: {}", identity);

            let raw = match self
                .armory
                .fetch_character(&character.realm, &character.name)
                .await
            {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    warn!("Character {} not found on the armory; skipping.", identity);
                    continue;
                }
                Err(e) => {
                    error!("Error fetching character {}: {}", identity, e);
                    continue;
                }
            };
            let record = match normalizer::scrub_fetched(raw) {
                Ok(record) => record,
                Err(e) => {
                    error!("Skipping character {}: {}", identity, e);
                    continue;
                }
            };

            match self.detect_changes(&identity, &record) {
                Some(diff) => {
                    // a pipeline failure is logged but never blocks the
                    // commit below, so a broken simc install doesn't make the
                    // same diff fire again every run
                    if let Err(e) = self.pipeline.run(&identity, &character, &diff).await {
                        error!("ERROR: {}", e);
                    }
                }
                None => info!("Character {} has no changes, skipping.", identity),
            }

            self.store.record(&identity, record);
        }
        self.store.persist()?;
        info!("Done with all characters.");
        Ok(())
    }

    /// Decide whether a freshly fetched (already scrubbed) record counts as
    /// changed. Comparison happens on the compare-stripped forms; the caller
    /// commits the full scrubbed record regardless of the outcome here.
    fn detect_changes(&self, identity: &str, record: &Value) -> Option<String> {
        let Some(cached) = self.store.get(identity) else {
            debug!("character not in cache: {}", identity);
            return Some(NOT_IN_CACHE_MESSAGE.to_string());
        };
        let old = normalizer::strip_for_compare(cached, true, self.no_stat);
        let new = normalizer::strip_for_compare(record, true, self.no_stat);
        if old == new {
            debug!(
                "character identical in cache and on the armory: {}",
                identity
            );
            return None;
        }
        debug!(
            "character has differences between cache and the armory: {}",
            identity
        );
        Some(differ::diff_text(&old, &new))
    }
}
