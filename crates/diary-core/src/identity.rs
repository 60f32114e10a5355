//! Per-installation device identity.
//!
//! One UUID v4 per installation, minted lazily on first access and
//! persisted under a fixed key in durable key-value storage. It is
//! never regenerated unless the user explicitly wipes local data; an
//! old identifier and its replacement are never linked.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{DiaryError, Result};

/// Fixed key the device identifier is persisted under.
pub const DEVICE_ID_KEY: &str = "device_id";

/// Durable key-value persistence seam for identity material.
///
/// The SQLite store implements this over its `meta` table; tests can
/// substitute an in-memory map.
pub trait IdentityVault: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Issues and persists the stable per-installation identifier.
pub struct DeviceIdentity {
    vault: Arc<dyn IdentityVault>,
}

impl DeviceIdentity {
    pub fn new(vault: Arc<dyn IdentityVault>) -> Self {
        Self { vault }
    }

    /// The persisted device identifier, minting and persisting a fresh
    /// UUID v4 on first call. Idempotent across process restarts.
    ///
    /// # Errors
    ///
    /// Storage I/O failure only; fatal to the caller, since nothing can
    /// proceed without an identity.
    pub fn device_id(&self) -> Result<Uuid> {
        if let Some(value) = self.vault.get(DEVICE_ID_KEY)? {
            return Uuid::parse_str(&value).map_err(|e| {
                DiaryError::Storage(format!("Invalid persisted device id: {}", e))
            });
        }

        let minted = Uuid::new_v4();
        self.vault.put(DEVICE_ID_KEY, &minted.to_string())?;
        Ok(minted)
    }

    /// Pure UUID v4 generator for record ids. No storage side effect.
    pub fn generate_record_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Clear the persisted identifier. Used only by the explicit
    /// "erase local data" flow; the next `device_id` call mints a new,
    /// unrelated identifier.
    pub fn reset(&self) -> Result<()> {
        self.vault.delete(DEVICE_ID_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryVault {
        map: Mutex<HashMap<String, String>>,
    }

    impl IdentityVault for MemoryVault {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.map.lock().unwrap().get(key).cloned())
        }

        fn put(&self, key: &str, value: &str) -> Result<()> {
            self.map
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.map.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn test_device_id_is_stable() {
        let identity = DeviceIdentity::new(Arc::new(MemoryVault::default()));
        let first = identity.device_id().unwrap();
        let second = identity.device_id().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_mints_unrelated_id() {
        let identity = DeviceIdentity::new(Arc::new(MemoryVault::default()));
        let before = identity.device_id().unwrap();
        identity.reset().unwrap();
        let after = identity.device_id().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let identity = DeviceIdentity::new(Arc::new(MemoryVault::default()));
        let a = identity.generate_record_id();
        let b = identity.generate_record_id();
        assert_ne!(a, b);
    }
}
