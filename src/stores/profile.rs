//! The single user profile, persisted under the `profile` key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{BmiCategory, Profile, ProfileInput};
use crate::storage::{KeyValueStore, generate_id, keys};
use crate::Result;

/// Profile plus export timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileExport {
    pub profile: Option<Profile>,
    pub exported_at: DateTime<Utc>,
}

pub struct ProfileStore {
    kv: Arc<dyn KeyValueStore>,
    profile: Option<Profile>,
}

impl ProfileStore {
    pub fn init(kv: Arc<dyn KeyValueStore>) -> Self {
        let profile = match kv.get::<Profile>(keys::PROFILE) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "stored profile unreadable, ignoring it");
                None
            }
        };
        Self { kv, profile }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }

    /// Replace the profile with `input`, keeping the existing id and
    /// creation time.
    pub fn save_profile(&mut self, input: &ProfileInput) -> Result<Profile> {
        let now = Utc::now();
        let mut profile = Profile {
            id: self
                .profile
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_else(|| generate_id("user", "profile")),
            nickname: String::new(),
            birth_date: None,
            gender: None,
            height: None,
            weight: None,
            created_at: self.profile.as_ref().map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };
        input.apply(&mut profile);
        self.commit(profile)
    }

    /// Merge `patch` into the existing profile. `Ok(None)` when there is no
    /// profile yet.
    pub fn update_profile(&mut self, patch: &ProfileInput) -> Result<Option<Profile>> {
        let Some(mut profile) = self.profile.clone() else {
            return Ok(None);
        };
        patch.apply(&mut profile);
        profile.updated_at = Utc::now();
        self.commit(profile).map(Some)
    }

    fn commit(&mut self, profile: Profile) -> Result<Profile> {
        self.kv
            .set(keys::PROFILE, &profile)
            .map_err(|e| e.into_persistence("save profile"))?;
        tracing::info!(id = %profile.id, "profile saved");
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    pub fn clear_profile(&mut self) -> Result<()> {
        self.kv
            .remove(keys::PROFILE)
            .map_err(|e| e.into_persistence("clear profile"))?;
        self.profile = None;
        Ok(())
    }

    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        self.profile.as_ref().and_then(|p| p.age(today))
    }

    pub fn bmi(&self) -> Option<f64> {
        self.profile.as_ref().and_then(Profile::bmi)
    }

    pub fn bmi_status(&self) -> BmiCategory {
        BmiCategory::from_bmi(self.bmi())
    }

    pub fn export(&self) -> ProfileExport {
        ProfileExport {
            profile: self.profile.clone(),
            exported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::storage::MemoryKeyValueStore;

    fn input() -> ProfileInput {
        ProfileInput {
            nickname: Some("Ana".to_string()),
            birth_date: Some(parse_date("1990-05-01").unwrap()),
            height: Some(165.0),
            weight: Some(60.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_keeps_identity() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut store = ProfileStore::init(kv.clone());
        assert!(!store.has_profile());

        let first = store.save_profile(&input()).unwrap();
        let second = store
            .save_profile(&ProfileInput {
                nickname: Some("Bo".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.nickname, "Bo");
        assert_eq!(second.height, None);

        let reloaded = ProfileStore::init(kv);
        assert_eq!(reloaded.profile().unwrap().nickname, "Bo");
    }

    #[test]
    fn test_update_merges_and_requires_profile() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut store = ProfileStore::init(kv);
        let patch = ProfileInput {
            weight: Some(58.0),
            ..Default::default()
        };
        assert!(store.update_profile(&patch).unwrap().is_none());

        store.save_profile(&input()).unwrap();
        let updated = store.update_profile(&patch).unwrap().unwrap();
        assert_eq!(updated.weight, Some(58.0));
        assert_eq!(updated.height, Some(165.0));
    }

    #[test]
    fn test_derived_values() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let mut store = ProfileStore::init(kv);
        assert_eq!(store.bmi_status(), BmiCategory::Unknown);

        store.save_profile(&input()).unwrap();
        assert_eq!(store.age(parse_date("2026-10-18").unwrap()), Some(36));
        assert_eq!(store.bmi(), Some(22.0));
        assert_eq!(store.bmi_status(), BmiCategory::Normal);

        store.clear_profile().unwrap();
        assert!(store.profile().is_none());
        assert!(store.export().profile.is_none());
    }
}
