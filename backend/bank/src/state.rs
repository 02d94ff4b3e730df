use serde::{Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use crate::{
    ledger::computed_balance,
    models::{AuditEntry, Contest, Settings, User},
    store::{AUDIT_LOG_KEY, CONTESTS_KEY, SETTINGS_KEY, Store, StoreError, USERS_KEY},
};

/// Everything the platform persists, loaded once and passed around explicitly.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct AppState {
    pub users: Vec<User>,
    pub contests: Vec<Contest>,
    pub settings: Settings,
    pub audit_log: Vec<AuditEntry>,
}

impl AppState {
    pub fn load<S: Store>(store: &S) -> Result<Self, StoreError> {
        let mut state = Self {
            users: read(store, USERS_KEY)?.unwrap_or_default(),
            contests: read(store, CONTESTS_KEY)?.unwrap_or_default(),
            settings: read(store, SETTINGS_KEY)?.unwrap_or_default(),
            audit_log: read(store, AUDIT_LOG_KEY)?.unwrap_or_default(),
        };

        let repaired = state.migrate();
        if repaired > 0 {
            info!("Migrated {repaired} documents on load");
        }

        Ok(state)
    }

    pub fn save<S: Store>(&self, store: &mut S) -> Result<(), StoreError> {
        write(store, USERS_KEY, &self.users)?;
        write(store, CONTESTS_KEY, &self.contests)?;
        write(store, SETTINGS_KEY, &self.settings)?;
        write(store, AUDIT_LOG_KEY, &self.audit_log)?;

        Ok(())
    }

    pub fn user(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|user| user.email == email)
    }

    pub fn user_mut(&mut self, email: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.email == email)
    }

    pub fn contest(&self, id: &str) -> Option<&Contest> {
        self.contests.iter().find(|contest| contest.id == id)
    }

    pub fn contest_mut(&mut self, id: &str) -> Option<&mut Contest> {
        self.contests.iter_mut().find(|contest| contest.id == id)
    }

    /// Load time fixes for documents written by older builds. Returns how many
    /// records were touched.
    fn migrate(&mut self) -> usize {
        let mut repaired = 0;

        for user in &mut self.users {
            let expected = computed_balance(&user.transactions);

            if user.wallet_balance != expected {
                warn!(
                    "Balance of {} was {}, ledger says {expected}",
                    user.email, user.wallet_balance
                );
                user.wallet_balance = expected;
                repaired += 1;
            }
        }

        for contest in &mut self.contests {
            let before = contest.participants.len();

            let mut seen = Vec::with_capacity(before);
            contest.participants.retain(|email| {
                if seen.contains(email) {
                    false
                } else {
                    seen.push(email.clone());
                    true
                }
            });

            if contest.participants.len() != before {
                warn!("Removed duplicate participants from contest {}", contest.id);
                repaired += 1;
            }
        }

        repaired
    }
}

fn read<S: Store, T: DeserializeOwned>(store: &S, key: &str) -> Result<Option<T>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

fn write<S: Store, T: Serialize>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })?;

    store.put(key, raw)
}
