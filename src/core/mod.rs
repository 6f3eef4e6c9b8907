mod armory;
mod differ;
mod engine;
mod identity;
mod mailer;
mod normalizer;
mod simc;
mod store;

pub use armory::{ArmoryClient, HttpArmoryClient};
pub use differ::{diff, diff_text, render, DiffEntry, PathSeg};
pub use engine::{Engine, NOT_IN_CACHE_MESSAGE};
pub use identity::character_id;
pub use mailer::Mailer;
pub use normalizer::{scrub_fetched, strip_for_compare};
pub use simc::{ChangePipeline, SimcPipeline};
pub use store::{SnapshotStore, SNAPSHOT_FILE};
