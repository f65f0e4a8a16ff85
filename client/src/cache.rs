//! Persistent key-value cache: bearer token, serialized current user, the
//! per-user deal list, and the in-progress creation draft.
//!
//! The cache is a read-side warm start, not a write-through queue: every
//! writer overwrites its key wholesale, and logout clears the whole store.

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::models::{Deal, User};
use crate::wizard::DealDraft;

const TOKEN_KEY: &str = "sol_escrow";
const USER_KEY: &str = "escrow_user";
const DRAFT_KEY: &str = "dealFormData";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cached_data (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(CacheStore { conn })
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cached_data (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cached_data WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn
            .execute("DELETE FROM cached_data WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── session ─────────────────────────────────────────────────────────

    pub fn save_token(&self, token: &str) -> Result<(), CacheError> {
        self.put(TOKEN_KEY, token)
    }

    pub fn load_token(&self) -> Result<Option<String>, CacheError> {
        self.get(TOKEN_KEY)
    }

    pub fn save_user(&self, user: &User) -> Result<(), CacheError> {
        self.put(USER_KEY, &serde_json::to_string(user)?)
    }

    pub fn load_user(&self) -> Result<Option<User>, CacheError> {
        match self.get(USER_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    // ── deal list ───────────────────────────────────────────────────────

    fn deals_key(user_id: &str) -> String {
        format!("{user_id}_deals")
    }

    pub fn put_deals(&self, user_id: &str, deals: &[Deal]) -> Result<(), CacheError> {
        self.put(&Self::deals_key(user_id), &serde_json::to_string(deals)?)
    }

    pub fn deals(&self, user_id: &str) -> Result<Vec<Deal>, CacheError> {
        match self.get(&Self::deals_key(user_id))? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    // ── creation draft ──────────────────────────────────────────────────

    pub fn save_draft(&self, draft: &DealDraft) -> Result<(), CacheError> {
        self.put(DRAFT_KEY, &serde_json::to_string(draft)?)
    }

    /// A draft that fails to parse is dropped, like any corrupted resume
    /// state.
    pub fn load_draft(&self) -> Result<Option<DealDraft>, CacheError> {
        match self.get(DRAFT_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(draft) => Ok(Some(draft)),
                Err(e) => {
                    log::warn!("discarding corrupted deal draft: {e}");
                    self.delete(DRAFT_KEY)?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn clear_draft(&self) -> Result<(), CacheError> {
        self.delete(DRAFT_KEY)
    }

    /// Wholesale wipe on logout: token, user, deal lists, draft.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM cached_data", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DealStatus;
    use chrono::Utc;

    fn sample_deal(id: &str) -> Deal {
        Deal {
            id: id.into(),
            title: "Logo design".into(),
            description: String::new(),
            price: 120.0,
            currency: "USDC".into(),
            user_id: "u1".into(),
            secure_id: "SD-2".into(),
            duration: 7,
            deliverables: vec![],
            files: vec![],
            images: vec![],
            progress_status: DealStatus::AwaitingApproval,
            request_expiry_date: None,
            created_at: Utc::now(),
            from: None,
            to: None,
        }
    }

    #[test]
    fn token_round_trip() {
        let cache = CacheStore::open_in_memory().unwrap();
        assert!(cache.load_token().unwrap().is_none());
        cache.save_token("jwt-abc").unwrap();
        assert_eq!(cache.load_token().unwrap().as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn deals_are_keyed_per_user() {
        let cache = CacheStore::open_in_memory().unwrap();
        cache.put_deals("u1", &[sample_deal("d1")]).unwrap();
        cache.put_deals("u2", &[sample_deal("d2")]).unwrap();

        let u1 = cache.deals("u1").unwrap();
        assert_eq!(u1.len(), 1);
        assert_eq!(u1[0].id, "d1");
        assert_eq!(cache.deals("u2").unwrap()[0].id, "d2");
        assert!(cache.deals("u3").unwrap().is_empty());
    }

    #[test]
    fn put_deals_overwrites_wholesale() {
        let cache = CacheStore::open_in_memory().unwrap();
        cache
            .put_deals("u1", &[sample_deal("d1"), sample_deal("d2")])
            .unwrap();
        cache.put_deals("u1", &[sample_deal("d3")]).unwrap();

        let deals = cache.deals("u1").unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].id, "d3");
    }

    #[test]
    fn clear_all_removes_everything() {
        let cache = CacheStore::open_in_memory().unwrap();
        cache.save_token("jwt").unwrap();
        cache.put_deals("u1", &[sample_deal("d1")]).unwrap();
        cache.clear_all().unwrap();
        assert!(cache.load_token().unwrap().is_none());
        assert!(cache.deals("u1").unwrap().is_empty());
    }
}
