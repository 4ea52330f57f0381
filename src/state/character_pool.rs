use poise::serenity_prelude::{ChannelId, MessageId, UserId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};

/// A claimable character. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default = "unknown_region")]
    pub region: String,
}

impl Character {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}

fn unknown_region() -> String {
    "Unknown".to_string()
}

/// Where the welcome post for an assignment lives, so it can be retracted later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// A character held by a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Discord user ID (snowflake as string)
    #[serde(rename = "id", default)]
    pub member_id: String,

    /// Display name at the time of the claim
    #[serde(rename = "display_name", default)]
    pub member_display_name: String,

    #[serde(rename = "name", alias = "nombre")]
    pub character_name: String,

    #[serde(rename = "region", default = "unknown_region")]
    pub character_region: String,

    #[serde(default)]
    pub welcome_message_ref: Option<WelcomeRef>,
}

impl Assignment {
    /// The bare character this assignment holds
    pub fn character(&self) -> Character {
        Character::new(&self.character_name, &self.character_region)
    }
}

/// The persisted pool: who holds what, and what is left
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterPool {
    #[serde(default, alias = "disponibles")]
    pub available: Vec<Character>,

    /// Map of Discord ID (as string) to assignment
    #[serde(default, alias = "asignados", deserialize_with = "deserialize_assigned")]
    pub assigned: BTreeMap<String, Assignment>,
}

/// Older files stored only `{name, region}` per member; the map key fills in the id.
fn deserialize_assigned<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Assignment>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut assigned = BTreeMap::<String, Assignment>::deserialize(deserializer)?;
    for (key, assignment) in assigned.iter_mut() {
        if assignment.member_id.is_empty() {
            assignment.member_id = key.clone();
        }
    }
    Ok(assigned)
}

impl CharacterPool {
    pub fn new(available: Vec<Character>) -> Self {
        let mut pool = Self {
            available,
            assigned: BTreeMap::new(),
        };
        pool.dedup_available();
        pool
    }

    /// Drop repeated names from `available`, keeping the first occurrence
    fn dedup_available(&mut self) {
        let mut seen = HashSet::new();
        self.available.retain(|c| {
            let fresh = seen.insert(c.name.clone());
            if !fresh {
                warn!("Dropping duplicate character '{}' from pool", c.name);
            }
            fresh
        });
    }

    /// Available characters sorted by name; this is the order members pick from
    pub fn sorted_available(&self) -> Vec<Character> {
        let mut sorted = self.available.clone();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.available.iter().any(|c| c.name == name)
    }

    pub fn find_assignment(&self, member_id: UserId) -> Option<&Assignment> {
        self.assigned.get(&member_id.to_string())
    }

    /// Move a character from `available` to `assigned`
    pub fn allocate(
        &mut self,
        member_id: UserId,
        display_name: &str,
        character_name: &str,
    ) -> Result<Assignment> {
        if let Some(existing) = self.find_assignment(member_id) {
            return Err(BotError::AlreadyAssigned {
                member_id: member_id.to_string(),
                character: existing.character_name.clone(),
            });
        }

        let position = self
            .available
            .iter()
            .position(|c| c.name == character_name)
            .ok_or_else(|| BotError::CharacterTaken {
                name: character_name.to_string(),
            })?;
        let character = self.available.remove(position);

        let assignment = Assignment {
            member_id: member_id.to_string(),
            member_display_name: display_name.to_string(),
            character_name: character.name,
            character_region: character.region,
            welcome_message_ref: None,
        };
        self.assigned
            .insert(assignment.member_id.clone(), assignment.clone());
        Ok(assignment)
    }

    /// Move a member's character back into `available`
    pub fn release(&mut self, member_id: UserId) -> Option<Assignment> {
        let assignment = self.assigned.remove(&member_id.to_string())?;
        if !self.is_available(&assignment.character_name) {
            self.available.push(assignment.character());
        }
        Some(assignment)
    }

    /// Record where the welcome post went. Returns false if the member no longer holds anything.
    pub fn attach_welcome(&mut self, member_id: UserId, welcome: WelcomeRef) -> bool {
        match self.assigned.get_mut(&member_id.to_string()) {
            Some(assignment) => {
                assignment.welcome_message_ref = Some(welcome);
                true
            }
            None => false,
        }
    }
}

/// Transactional, file-backed pool store.
///
/// Every operation runs read-file → mutate → write-file under one guard, so
/// allocations and releases are totally ordered. A failed mutation is never
/// written back.
pub struct PoolStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl PoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Open the store, seeding it from `seed_path` when no state file exists yet
    pub async fn open(path: impl Into<PathBuf>, seed_path: Option<&Path>) -> Result<Self> {
        let store = Self::new(path);

        let exists = tokio::fs::try_exists(&store.path)
            .await
            .map_err(|e| BotError::StateLoad {
                path: store.path.display().to_string(),
                source: e,
            })?;
        if exists {
            let pool = store.snapshot().await?;
            info!(
                "Loaded character pool: {} available, {} assigned",
                pool.available.len(),
                pool.assigned.len()
            );
            return Ok(store);
        }

        let seed = match seed_path {
            Some(seed_path) => load_seed(seed_path).await?,
            None => Vec::new(),
        };
        info!(
            "Creating character pool at {} with {} characters",
            store.path.display(),
            seed.len()
        );
        store.write(&CharacterPool::new(seed)).await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold the guard so tests can queue transactions behind it
    #[cfg(test)]
    pub async fn hold(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.guard.lock().await
    }

    /// Read the current pool under the guard
    pub async fn snapshot(&self) -> Result<CharacterPool> {
        let _guard = self.guard.lock().await;
        self.read().await
    }

    /// Run a read-modify-write transaction. The pool is only written if `f` succeeds.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut CharacterPool) -> Result<T>,
    {
        let _guard = self.guard.lock().await;
        let mut pool = self.read().await?;
        let value = f(&mut pool)?;
        self.write(&pool).await?;
        Ok(value)
    }

    /// Claim a character for a member. `still_onboarding` is evaluated under the
    /// guard; if it returns false the claim is cancelled and nothing is written.
    pub async fn allocate<F>(
        &self,
        member_id: UserId,
        display_name: &str,
        character_name: &str,
        still_onboarding: F,
    ) -> Result<Assignment>
    where
        F: FnOnce() -> bool,
    {
        let assignment = self
            .transaction(|pool| {
                if !still_onboarding() {
                    return Err(BotError::SessionCancelled);
                }
                pool.allocate(member_id, display_name, character_name)
            })
            .await?;
        info!(
            "Allocated '{}' to {} ({})",
            assignment.character_name, display_name, member_id
        );
        Ok(assignment)
    }

    pub async fn release(&self, member_id: UserId) -> Result<Option<Assignment>> {
        let _guard = self.guard.lock().await;
        let mut pool = self.read().await?;
        let Some(assignment) = pool.release(member_id) else {
            debug!("No assignment to release for {}", member_id);
            return Ok(None);
        };
        self.write(&pool).await?;
        info!(
            "Released '{}' held by {} ({})",
            assignment.character_name, assignment.member_display_name, member_id
        );
        Ok(Some(assignment))
    }

    pub async fn attach_welcome(&self, member_id: UserId, welcome: WelcomeRef) -> Result<bool> {
        let _guard = self.guard.lock().await;
        let mut pool = self.read().await?;
        if !pool.attach_welcome(member_id, welcome) {
            return Ok(false);
        }
        self.write(&pool).await?;
        Ok(true)
    }

    async fn read(&self) -> Result<CharacterPool> {
        let path = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| BotError::StateLoad {
                path: path.clone(),
                source: e,
            })?;
        serde_json::from_str(&content).map_err(|e| BotError::StateParse { path, source: e })
    }

    /// Write to a temp file first, then rename for atomicity
    async fn write(&self, pool: &CharacterPool) -> Result<()> {
        let path = self.path.display().to_string();
        let content = serde_json::to_string_pretty(pool)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StateSave { path, source: e })?;

        Ok(())
    }
}

/// Load the initial character list (`[{name, region}]`)
async fn load_seed(path: &Path) -> Result<Vec<Character>> {
    let path_str = path.display().to_string();
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path_str,
            source: e,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No character seed at {}, starting with an empty pool", path_str);
            Ok(Vec::new())
        }
        Err(e) => Err(BotError::ConfigLoad {
            path: path_str,
            source: e,
        }),
    }
}

/// Shared pool store type
pub type SharedPoolStore = Arc<PoolStore>;

pub fn create_shared_pool_store(store: PoolStore) -> SharedPoolStore {
    Arc::new(store)
}
