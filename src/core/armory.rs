use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Sub-resources always requested with the base record. Level and faction
/// arrive in the base payload without being named.
const REQUIRED_FIELDS: &[&str] = &["appearance", "items", "professions"];

/// Sub-resources the armory serves unreliably; fetched best-effort and
/// silently absent on failure.
const BEST_EFFORT_FIELDS: &[&str] = &["stats", "talents"];

/// Boundary to the remote character-data API. The engine only ever sees this
/// trait, which keeps the decision logic testable without a network.
#[async_trait]
pub trait ArmoryClient: Send + Sync {
    /// Fetch a character's raw record; `Ok(None)` means the character does
    /// not exist on the armory.
    async fn fetch_character(&self, realm: &str, name: &str) -> Result<Option<Value>>;
}

pub struct HttpArmoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArmoryClient {
    pub fn new(region: &str, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://{}.api.blizzard.com/wow/character", region));
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn character_url(&self, realm: &str, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, realm, name)
    }

    async fn get_with_fields(
        &self,
        realm: &str,
        name: &str,
        fields: &[&str],
    ) -> Result<Option<Value>> {
        let response = self
            .client
            .get(self.character_url(realm, name))
            .query(&[("fields", fields.join(","))])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record = response.error_for_status()?.json().await?;
        Ok(Some(record))
    }

    /// Best-effort fetch of one optional sub-resource. Any failure, including
    /// the field missing from the response, is reported as absence.
    async fn best_effort_field(&self, realm: &str, name: &str, field: &str) -> Option<Value> {
        match self.get_with_fields(realm, name, &[field]).await {
            Ok(Some(mut record)) => record.as_object_mut().and_then(|obj| obj.remove(field)),
            Ok(None) => None,
            Err(e) => {
                debug!(
                    "best-effort fetch of '{}' failed for {}/{}: {}",
                    field, realm, name, e
                );
                None
            }
        }
    }
}

#[async_trait]
impl ArmoryClient for HttpArmoryClient {
    async fn fetch_character(&self, realm: &str, name: &str) -> Result<Option<Value>> {
        let Some(mut record) = self.get_with_fields(realm, name, REQUIRED_FIELDS).await? else {
            return Ok(None);
        };
        for field in BEST_EFFORT_FIELDS {
            if let Some(value) = self.best_effort_field(realm, name, field).await {
                if let Some(obj) = record.as_object_mut() {
                    obj.insert(field.to_string(), value);
                }
            }
        }
        Ok(Some(record))
    }
}
