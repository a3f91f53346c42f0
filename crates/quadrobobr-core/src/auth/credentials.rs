use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use crate::config::APP_NAME;

use super::store::SessionStore;

/// Session slots kept in the OS keychain, one entry per slot.
///
/// Entries are written in the order given. If a later one fails, the earlier
/// slots get their previous values back, so callers put the slot that
/// signals "signed in" last.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(APP_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve value from keychain"),
        }
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let previous = entries
            .iter()
            .map(|&(key, _)| self.get(key))
            .collect::<Result<Vec<_>>>()?;
        write_or_restore(
            entries,
            &previous,
            |key, value| self.set(key, value),
            |key| self.delete(key),
        )
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.delete(key) {
                warn!(key = %key, error = %e, "Failed to remove keychain entry");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Write `entries` in order. On failure, slots already written are put back
/// to `previous` (deleted where there was nothing) and the error returned.
fn write_or_restore(
    entries: &[(&str, &str)],
    previous: &[Option<String>],
    set: impl Fn(&str, &str) -> Result<()>,
    delete: impl Fn(&str) -> Result<()>,
) -> Result<()> {
    for (i, &(key, value)) in entries.iter().enumerate() {
        if let Err(e) = set(key, value) {
            for (&(written, _), old) in entries[..i].iter().zip(previous) {
                let restored = match old {
                    Some(old) => set(written, old.as_str()),
                    None => delete(written),
                };
                if let Err(rollback) = restored {
                    warn!(key = %written, error = %rollback, "Failed to roll back keychain entry");
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory slots where writes to `failing` always fail.
    struct Slots {
        map: RefCell<BTreeMap<String, String>>,
        failing: &'static str,
    }

    impl Slots {
        fn new(seed: &[(&str, &str)], failing: &'static str) -> Self {
            let map = seed
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Self {
                map: RefCell::new(map),
                failing,
            }
        }

        fn previous(&self, entries: &[(&str, &str)]) -> Vec<Option<String>> {
            entries
                .iter()
                .map(|&(k, _)| self.map.borrow().get(k).cloned())
                .collect()
        }

        fn write(&self, entries: &[(&str, &str)]) -> Result<()> {
            let previous = self.previous(entries);
            write_or_restore(
                entries,
                &previous,
                |key, value| {
                    if key == self.failing {
                        anyhow::bail!("keychain locked");
                    }
                    self.map.borrow_mut().insert(key.to_string(), value.to_string());
                    Ok(())
                },
                |key| {
                    self.map.borrow_mut().remove(key);
                    Ok(())
                },
            )
        }

        fn get(&self, key: &str) -> Option<String> {
            self.map.borrow().get(key).cloned()
        }
    }

    #[test]
    fn test_failed_relogin_restores_previous_profile() {
        let slots = Slots::new(&[("admin", "old-profile"), ("token", "old-token")], "token");

        let result = slots.write(&[("admin", "new-profile"), ("token", "new-token")]);

        assert!(result.is_err());
        assert_eq!(slots.get("admin").as_deref(), Some("old-profile"));
        assert_eq!(slots.get("token").as_deref(), Some("old-token"));
    }

    #[test]
    fn test_failed_first_login_leaves_no_profile() {
        let slots = Slots::new(&[], "token");

        assert!(slots.write(&[("admin", "profile"), ("token", "tok")]).is_err());
        assert_eq!(slots.get("admin"), None);
        assert_eq!(slots.get("token"), None);
    }

    #[test]
    fn test_successful_write_replaces_every_slot() {
        let slots = Slots::new(&[("admin", "old-profile")], "none");

        slots
            .write(&[("admin", "new-profile"), ("token", "tok")])
            .expect("write should succeed");
        assert_eq!(slots.get("admin").as_deref(), Some("new-profile"));
        assert_eq!(slots.get("token").as_deref(), Some("tok"));
    }
}
