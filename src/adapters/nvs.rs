//! Non-volatile storage adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`].  The backing store
//! is an in-memory map standing in for the controller's EEPROM; the board
//! support crate swaps in a flash-backed map with the same key layout.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Namespace isolation: each subsystem uses its own namespace prefix.
//! - Profiles are stored one blob per slot under the `profiles` namespace.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::ControllerConfig;
use crate::profile::Profile;

const CONFIG_NAMESPACE: &str = "ospid";
const CONFIG_KEY: &str = "ctrlcfg";
const PROFILE_NAMESPACE: &str = "profiles";

/// Number of stored profile slots.
pub const PROFILE_SLOTS: u8 = 3;
/// Largest blob a single key may hold.
pub const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    pub fn new() -> Self {
        info!("NvsAdapter: in-memory backend");
        Self {
            store: RefCell::new(HashMap::new()),
        }
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    fn profile_key(slot: u8) -> String {
        format!("slot{}", slot)
    }

    /// Persist a profile into `slot` (0-based).
    pub fn save_profile(&mut self, slot: u8, profile: &Profile) -> Result<(), ConfigError> {
        if slot >= PROFILE_SLOTS {
            return Err(ConfigError::ValidationFailed("profile slot out of range"));
        }
        let bytes = postcard::to_allocvec(profile).map_err(|_| ConfigError::IoError)?;
        self.write(PROFILE_NAMESPACE, &Self::profile_key(slot), &bytes)?;
        info!("NvsAdapter: profile '{}' saved to slot {}", profile.name(), slot);
        Ok(())
    }

    /// Load the profile in `slot`; `NotFound` if the slot is empty.
    pub fn load_profile(&self, slot: u8) -> Result<Profile, ConfigError> {
        if slot >= PROFILE_SLOTS {
            return Err(ConfigError::ValidationFailed("profile slot out of range"));
        }
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = self.read(PROFILE_NAMESPACE, &Self::profile_key(slot), &mut buf)?;
        postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        if let Some(bytes) = self.store.borrow().get(&key) {
            let cfg: ControllerConfig =
                postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
            if let Err(e) = cfg.validate() {
                warn!("NvsAdapter: stored config invalid ({e})");
                return Err(ConfigError::Corrupted);
            }
            info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
            Ok(cfg)
        } else {
            info!("NvsAdapter: no stored config, using defaults");
            Ok(ControllerConfig::default())
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        self.store.borrow_mut().insert(key, bytes);
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let composite = Self::composite_key(namespace, key);
        match self.store.borrow().get(&composite) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().remove(&composite);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow().contains_key(&composite)
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}
