//! Synthesizes the two text artifacts mounted into every broker container:
//! `server.properties` and `log4j.properties`.

use std::collections::BTreeMap;

use crate::constants::{self, ports, BROKER_CONF_DEFAULTS, LOG_CONF_DEFAULTS};
use crate::crds::KafkaClusterSpec;

/// Merge the default broker configuration with user overrides and computed
/// runtime values.
///
/// Known keys take the user's value when present; unknown user keys pass
/// through verbatim so operators can set broker options this crate does not
/// model. `log.dirs` is always system-derived from the disk count, and a
/// two-listener bind block is injected only when the user set no `listeners`
/// key themselves.
pub fn merge_broker_config(
    user: &BTreeMap<String, String>,
    disks: i32,
) -> BTreeMap<String, String> {
    let mut conf: BTreeMap<String, String> = BTreeMap::new();

    for (key, default) in BROKER_CONF_DEFAULTS.iter() {
        let value = user.get(*key).map(String::as_str).unwrap_or(default);
        conf.insert(key.to_string(), value.to_string());
    }
    for (key, value) in user {
        if !BROKER_CONF_DEFAULTS.contains_key(key.as_str()) {
            conf.insert(key.clone(), value.clone());
        }
    }

    let dirs: Vec<String> = (0..disks)
        .map(|i| format!("{}/{}{i}", constants::DATA_PATH, constants::DISK_PREFIX))
        .collect();
    conf.insert("log.dirs".to_string(), dirs.join(","));

    if !conf.contains_key("listeners") {
        conf.insert(
            "listeners".to_string(),
            format!(
                "{}://0.0.0.0:{},{}://0.0.0.0:{}",
                ports::INTERNAL_NAME,
                ports::INTERNAL,
                ports::EXTERNAL_NAME,
                ports::EXTERNAL
            ),
        );
        conf.insert(
            "inter.broker.listener.name".to_string(),
            ports::INTERNAL_NAME.to_string(),
        );
        conf.insert(
            "listener.security.protocol.map".to_string(),
            format!(
                "{}:PLAINTEXT,{}:PLAINTEXT",
                ports::INTERNAL_NAME,
                ports::EXTERNAL_NAME
            ),
        );
    }

    conf
}

/// Render the merged broker configuration as `server.properties` text.
pub fn broker_properties(spec: &KafkaClusterSpec) -> String {
    render_properties(&merge_broker_config(&spec.conf, spec.disk_count()))
}

/// Render the fixed `log4j.properties` template.
pub fn log_properties() -> String {
    let conf: BTreeMap<String, String> = LOG_CONF_DEFAULTS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    render_properties(&conf)
}

/// One `key=value` line per entry, sorted by key so the output is
/// reproducible across passes.
fn render_properties(conf: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in conf {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: &str) -> KafkaClusterSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_log_dirs_one_entry_per_disk() {
        for disks in 1..=5 {
            let conf = merge_broker_config(&BTreeMap::new(), disks);
            let dirs: Vec<&str> = conf["log.dirs"].split(',').collect();
            assert_eq!(dirs.len(), disks as usize);
            for (i, dir) in dirs.iter().enumerate() {
                assert_eq!(*dir, format!("/opt/kafka/data/disk{i}"));
            }
        }
    }

    #[test]
    fn test_user_override_replaces_known_key() {
        let user = BTreeMap::from([("num.io.threads".to_string(), "16".to_string())]);
        let conf = merge_broker_config(&user, 1);
        assert_eq!(conf["num.io.threads"], "16");
        assert_eq!(conf["num.network.threads"], "3");
    }

    #[test]
    fn test_unknown_user_key_passes_through() {
        let user = BTreeMap::from([(
            "auto.create.topics.enable".to_string(),
            "false".to_string(),
        )]);
        let conf = merge_broker_config(&user, 1);
        assert_eq!(conf["auto.create.topics.enable"], "false");
    }

    #[test]
    fn test_log_dirs_is_always_system_derived() {
        let user = BTreeMap::from([("log.dirs".to_string(), "/tmp/elsewhere".to_string())]);
        let conf = merge_broker_config(&user, 2);
        assert_eq!(conf["log.dirs"], "/opt/kafka/data/disk0,/opt/kafka/data/disk1");
    }

    #[test]
    fn test_listeners_injected_when_absent() {
        let conf = merge_broker_config(&BTreeMap::new(), 2);
        assert_eq!(
            conf["listeners"],
            "internal://0.0.0.0:9092,external://0.0.0.0:9093"
        );
        assert_eq!(conf["inter.broker.listener.name"], "internal");
        assert_eq!(
            conf["listener.security.protocol.map"],
            "internal:PLAINTEXT,external:PLAINTEXT"
        );
    }

    #[test]
    fn test_user_listeners_not_overwritten() {
        let user = BTreeMap::from([(
            "listeners".to_string(),
            "PLAINTEXT://0.0.0.0:9094".to_string(),
        )]);
        let conf = merge_broker_config(&user, 1);
        assert_eq!(conf["listeners"], "PLAINTEXT://0.0.0.0:9094");
        assert!(!conf.contains_key("inter.broker.listener.name"));
        // Security map stays at the full default from the table.
        assert!(conf["listener.security.protocol.map"].contains("SASL_SSL"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let user = BTreeMap::from([
            ("num.io.threads".to_string(), "16".to_string()),
            ("compression.type".to_string(), "zstd".to_string()),
        ]);
        let merged = merge_broker_config(&user, 3);
        let remerged = merge_broker_config(&merged, 3);
        assert_eq!(merged, remerged);
    }

    #[test]
    fn test_rendering_is_sorted_and_line_per_key() {
        let json = r#"{"version":"3.6.1","image":{"repository":"kafka"},"resource":{"disks":2}}"#;
        let text = broker_properties(&spec(json));

        assert!(text.contains("log.dirs=/opt/kafka/data/disk0,/opt/kafka/data/disk1\n"));
        assert!(text.contains("listeners=internal://0.0.0.0:9092,external://0.0.0.0:9093\n"));

        let keys: Vec<&str> = text
            .lines()
            .map(|l| l.split_once('=').unwrap().0)
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_log_properties_template() {
        let text = log_properties();
        assert!(text.contains("log4j.rootLogger=INFO, stdout, kafkaAppender\n"));
        assert!(text.contains("log4j.appender.kafkaAppender.File=${kafka.logs.dir}/server.log\n"));
    }
}
