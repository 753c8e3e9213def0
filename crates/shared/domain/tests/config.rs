use serde_json::json;
use veneer_domain::config::{BusConfig, StorageCompression, VeneerConfig};
use veneer_domain::constants::DEFAULT_NAMESPACE;

#[test]
fn config_defaults_are_sane() {
    let cfg = VeneerConfig::default();
    assert_eq!(cfg.namespace, DEFAULT_NAMESPACE);
    assert!(cfg.storage.data_dir.is_none());
    assert_eq!(cfg.storage.compression, StorageCompression::None);
    assert!(cfg.flags.is_empty());
    assert_eq!(cfg.log.level, "info");
    assert!(cfg.log.console && cfg.log.dir.is_none());

    let bus = BusConfig::default();
    assert!(bus.relay);
    assert_eq!(bus.tap_capacity, 128);
}

#[test]
fn config_deserializes() {
    let raw = json!({
        "namespace": "ao3",
        "storage": { "data_dir": "/tmp/veneer", "compression": "lz4" },
        "bus": { "relay": false },
        "log": { "level": "debug", "json": true },
        "flags": { "ui:showMenuButton": false, "mod:SaveScroll:enabled": true }
    });

    let cfg: VeneerConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.namespace, "ao3");
    assert_eq!(cfg.storage.data_dir.as_deref(), Some(std::path::Path::new("/tmp/veneer")));
    assert_eq!(cfg.storage.compression, StorageCompression::Lz4);
    assert!(!cfg.bus.relay);
    assert_eq!(cfg.bus.tap_capacity, 128);
    assert_eq!(cfg.log.level, "debug");
    assert!(cfg.log.json && cfg.log.console);
    assert_eq!(cfg.flags.get("mod:SaveScroll:enabled"), Some(&json!(true)));
}

#[test]
fn config_is_cheap_to_clone_and_copy_on_write() {
    let base = VeneerConfig::default();
    let mut tweaked = base.clone();
    tweaked.namespace = "other".to_owned();

    assert_eq!(base.namespace, DEFAULT_NAMESPACE);
    assert_eq!(tweaked.namespace, "other");
}
