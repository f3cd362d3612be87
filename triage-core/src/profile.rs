use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Display profile of the person running the dashboard. The only state the
/// system persists, together with the banner flag below; the analysis
/// pipeline never reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub initials: String,
}

pub fn initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "??".into(),
        [single] => single.chars().take(2).collect::<String>().to_uppercase(),
        [first, second, ..] => {
            let mut out = String::new();
            out.extend(first.chars().next());
            out.extend(second.chars().next());
            out.to_uppercase()
        }
    }
}

pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    if local.is_empty() {
        return "User".into();
    }

    local
        .split(['.', '_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct ProfileStore {
    db_path: Arc<PathBuf>,
}

impl ProfileStore {
    pub fn open(path: &str) -> Result<Self, String> {
        let db_path = PathBuf::from(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                name TEXT NOT NULL,
                email TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS flags (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            ",
        )
        .map_err(|e| e.to_string())?;

        Ok(Self {
            db_path: Arc::new(db_path),
        })
    }

    pub fn load(&self) -> Result<Option<UserProfile>, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let row = conn
            .query_row(
                "SELECT name, email FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| e.to_string())?;

        Ok(row.map(|(name, email)| {
            let initials = initials(&name);
            UserProfile {
                name,
                email,
                initials,
            }
        }))
    }

    /// Initials are derived, never stored.
    pub fn save(&self, name: &str, email: &str) -> Result<UserProfile, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO profile (id, name, email) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = ?1, email = ?2",
            params![name, email],
        )
        .map_err(|e| e.to_string())?;

        Ok(UserProfile {
            name: name.to_string(),
            email: email.to_string(),
            initials: initials(name),
        })
    }

    pub fn clear(&self) -> Result<(), String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM profile WHERE id = 1", [])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn banner_dismissed(&self) -> Result<bool, String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        let value = conn
            .query_row(
                "SELECT value FROM flags WHERE key = 'banner_dismissed'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        Ok(value.unwrap_or(0) != 0)
    }

    pub fn set_banner_dismissed(&self, dismissed: bool) -> Result<(), String> {
        let conn = Connection::open(&*self.db_path).map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO flags (key, value) VALUES ('banner_dismissed', ?1)
             ON CONFLICT(key) DO UPDATE SET value = ?1",
            params![i64::from(dismissed)],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_path(name: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        format!("/tmp/triage-tests/{name}-{nanos}.db")
    }

    #[test]
    fn initials_from_names() {
        assert_eq!(initials("Ada Lovelace"), "AL");
        assert_eq!(initials("ada"), "AD");
        assert_eq!(initials(""), "??");
        assert_eq!(initials("Grace Brewster Murray Hopper"), "GB");
    }

    #[test]
    fn name_from_email_local_part() {
        assert_eq!(name_from_email("ada.lovelace@example.com"), "Ada Lovelace");
        assert_eq!(name_from_email("grace_hopper@example.com"), "Grace Hopper");
        assert_eq!(name_from_email(""), "User");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = ProfileStore::open(&db_path("profile-roundtrip")).expect("open");
        assert_eq!(store.load().expect("load"), None);

        let saved = store.save("Ada Lovelace", "ada@example.com").expect("save");
        assert_eq!(saved.initials, "AL");

        let loaded = store.load().expect("load").expect("profile");
        assert_eq!(loaded, saved);

        store.save("Grace Hopper", "grace@example.com").expect("save");
        let replaced = store.load().expect("load").expect("profile");
        assert_eq!(replaced.name, "Grace Hopper");

        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn banner_flag_defaults_off() {
        let store = ProfileStore::open(&db_path("banner")).expect("open");
        assert!(!store.banner_dismissed().expect("read"));

        store.set_banner_dismissed(true).expect("set");
        assert!(store.banner_dismissed().expect("read"));

        store.set_banner_dismissed(false).expect("set");
        assert!(!store.banner_dismissed().expect("read"));
    }
}
