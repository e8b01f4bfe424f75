//! Fuzz target: stored configuration blob
//!
//! Writes arbitrary bytes where the controller config lives and loads
//! it back.  Loading must never panic, and anything it accepts must be a
//! valid configuration that survives a save/load cycle.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use ospid::adapters::nvs::NvsAdapter;
use ospid::app::ports::{ConfigPort, StoragePort};

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::new();
    if nvs.write("ospid", "ctrlcfg", data).is_err() {
        return;
    }

    if let Ok(cfg) = nvs.load() {
        assert!(cfg.validate().is_ok(), "load accepted an invalid config");
        let fresh = NvsAdapter::new();
        fresh.save(&cfg).expect("valid config must save");
        assert_eq!(fresh.load().ok(), Some(cfg));
    }
});
