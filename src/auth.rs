use chrono::{Local, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::Role;

/// The authenticated identity and the role derived for it at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub recruiter_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub signed_in_at: NaiveDateTime,
}

/// Produces `salt$sha256(salt:password)` in hex.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::thread_rng().r#gen();
    let salt = hex::encode(salt);
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(stored: &str, password: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, hash)) => digest(salt, password) == hash,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Password sign-in. The role is the stored one, except that only `director_email`
/// can hold the Director role.
pub fn sign_in(db: &Database, email: &str, password: &str, director_email: &str) -> Result<Session> {
    let invalid = || AppError::PermissionDenied("invalid email or password".to_string());

    let Some((recruiter, stored_hash)) = db.get_credentials(email.trim())? else {
        warn!(email, "sign-in for unknown address");
        return Err(invalid());
    };
    if !verify_password(&stored_hash, password) {
        warn!(email, "sign-in with wrong password");
        return Err(invalid());
    }

    let role = Role::resolve(recruiter.role, &recruiter.email, director_email);
    info!(recruiter_id = recruiter.id, %role, "signed in");
    Ok(Session {
        recruiter_id: recruiter.id,
        name: recruiter.name,
        email: recruiter.email,
        role,
        signed_in_at: Local::now().naive_local(),
    })
}

/// Keeps the current session on disk between CLI invocations.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Loads the saved session and re-checks it against the recruiter row:
    /// name, email and role come from the database, and the role goes through
    /// the same Director rule as sign-in. A session whose account is gone is dropped.
    pub fn restore(&self, db: &Database, director_email: &str) -> Result<Option<Session>> {
        let Some(saved) = self.load()? else {
            return Ok(None);
        };
        let Some(recruiter) = db.get_recruiter(saved.recruiter_id)? else {
            warn!(recruiter_id = saved.recruiter_id, "saved session for a removed account");
            return Ok(None);
        };
        let role = Role::resolve(recruiter.role, &recruiter.email, director_email);
        if role != saved.role {
            warn!(recruiter_id = recruiter.id, saved = %saved.role, %role, "saved role no longer holds");
        }
        Ok(Some(Session {
            recruiter_id: recruiter.id,
            name: recruiter.name,
            email: recruiter.email,
            role,
            signed_in_at: saved.signed_in_at,
        }))
    }

    pub fn require(&self, db: &Database, director_email: &str) -> Result<Session> {
        self.restore(db, director_email)?.ok_or(AppError::NotSignedIn)
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<bool> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;

    #[test]
    fn test_hash_round_trip_and_salting() {
        let a = hash_password("hunter2");
        let b = hash_password("hunter2");
        assert_ne!(a, b);
        assert!(verify_password(&a, "hunter2"));
        assert!(!verify_password(&a, "hunter3"));
        assert!(!verify_password("garbage", "hunter2"));
    }

    #[test]
    fn test_sign_in_derives_director_from_configured_email() {
        let f = fixture();
        f.db
            .insert_recruiter("Lee", "lee@agency.test", Role::Recruiter, &hash_password("pw"))
            .unwrap();

        let session = sign_in(&f.db, "lee@agency.test", "pw", "lee@agency.test").unwrap();
        assert_eq!(session.role, Role::Director);

        let session = sign_in(&f.db, "lee@agency.test", "pw", "someone@else.test").unwrap();
        assert_eq!(session.role, Role::Recruiter);
    }

    #[test]
    fn test_sign_in_rejects_bad_credentials() {
        let f = fixture();
        f.db
            .insert_recruiter("Lee", "lee@agency.test", Role::Recruiter, &hash_password("pw"))
            .unwrap();
        assert!(matches!(
            sign_in(&f.db, "lee@agency.test", "wrong", ""),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            sign_in(&f.db, "nobody@agency.test", "pw", ""),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_session_store_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(&dir.path().join("nested/session.json"));
        assert_eq!(store.load().unwrap(), None);

        let session = Session {
            recruiter_id: 7,
            name: "Rita".to_string(),
            email: "rita@agency.test".to_string(),
            role: Role::Manager,
            signed_in_at: Local::now().naive_local(),
        };
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_restored_session_rechecks_role() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(&dir.path().join("session.json"));
        assert!(matches!(
            store.require(&f.db, "dana@agency.test"),
            Err(AppError::NotSignedIn)
        ));

        let forged = Session {
            recruiter_id: f.recruiter_id,
            name: "Rita".to_string(),
            email: "rita@agency.test".to_string(),
            role: Role::Director,
            signed_in_at: Local::now().naive_local(),
        };
        store.save(&forged).unwrap();
        let restored = store.require(&f.db, "dana@agency.test").unwrap();
        assert_eq!(restored.role, Role::Recruiter);
        assert_eq!(restored.signed_in_at, forged.signed_in_at);

        let director = Session {
            recruiter_id: f.director_id,
            email: "dana@agency.test".to_string(),
            role: Role::Director,
            ..forged.clone()
        };
        store.save(&director).unwrap();
        assert_eq!(store.require(&f.db, "dana@agency.test").unwrap().role, Role::Director);
        // Configured director moved to someone else.
        assert_eq!(store.require(&f.db, "lee@agency.test").unwrap().role, Role::Manager);
        assert_eq!(store.require(&f.db, "dana@agency.test").unwrap().name, "Dana");

        f.db.execute_batch(&format!("DELETE FROM recruiters WHERE id = {}", f.director_id))
            .unwrap();
        assert_eq!(store.restore(&f.db, "dana@agency.test").unwrap(), None);
    }
}
