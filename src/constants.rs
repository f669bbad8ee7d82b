use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Label keys applied to every resource derived from a KafkaCluster.
///
/// These double as the selector for observing owned Pods, so they must stay
/// stable for the lifetime of a cluster.
pub mod labels {
    pub const CLUSTER: &str = "cluster";
    pub const APP: &str = "app";
}

/// Label values.
pub mod values {
    pub const CLUSTER_SIGN: &str = "kafka";
}

/// Finalizer name for graceful cleanup.
pub const FINALIZER: &str = "kafka.nineinfra.tech/operator-cleanup";

/// Name suffixes for derived resources. Every object name is
/// `{cluster}-kafka{suffix}`.
pub const NAME_SUFFIX: &str = "-kafka";
pub const CONFIG_NAME_SUFFIX: &str = "-config";
pub const HEADLESS_SVC_NAME_SUFFIX: &str = "-headless";

/// Filesystem layout inside the broker container.
pub const CONF_PATH: &str = "/opt/kafka/conf";
pub const DATA_PATH: &str = "/opt/kafka/data";
pub const LOG_PATH: &str = "/opt/kafka/logs";

/// ConfigMap keys, which are also the file names the broker reads.
pub const BROKER_CONFIG_FILE: &str = "server.properties";
pub const LOG_CONFIG_FILE: &str = "log4j.properties";

/// Per-disk volume name prefix (`disk0`, `disk1`, ...).
pub const DISK_PREFIX: &str = "disk";

/// Name of the log-scratch volume and its PVC template.
pub const LOG_VOLUME_NAME: &str = "log";

/// Listener ports.
pub mod ports {
    pub const INTERNAL_NAME: &str = "internal";
    pub const INTERNAL: i32 = 9092;
    pub const EXTERNAL_NAME: &str = "external";
    pub const EXTERNAL: i32 = 9093;
}

/// Default resource values.
pub mod defaults {
    /// Effective replica count when the spec value is zero or even.
    pub const REPLICAS: i32 = 3;

    /// Effective disk count when the spec value is zero.
    pub const DISKS: i32 = 1;

    pub const STORAGE_CLASS: &str = "nineinfra-default";
    pub const DATA_VOLUME_SIZE: &str = "50Gi";
    pub const LOG_VOLUME_SIZE: &str = "5Gi";

    /// Time given to brokers to let clients disconnect before the container
    /// is stopped.
    pub const TERMINATION_GRACE_SECS: i64 = 30;

    pub const CLUSTER_DOMAIN_KEY: &str = "clusterDomain";
    pub const CLUSTER_DOMAIN: &str = "cluster.local";

    /// Requeue intervals in seconds.
    pub const REQUEUE_READY_SECS: u64 = 60;
    pub const REQUEUE_NOT_READY_SECS: u64 = 10;
    pub const REQUEUE_UPGRADE_FAILED_SECS: u64 = 300;
}

/// Probe timing constants. Readiness and liveness share values today but are
/// kept separate so they can diverge without touching the builders.
pub mod probes {
    pub const READINESS_INITIAL_DELAY_SECS: i32 = 40;
    pub const READINESS_PERIOD_SECS: i32 = 10;
    pub const READINESS_TIMEOUT_SECS: i32 = 10;
    pub const READINESS_FAILURE_THRESHOLD: i32 = 10;
    pub const READINESS_SUCCESS_THRESHOLD: i32 = 1;

    pub const LIVENESS_INITIAL_DELAY_SECS: i32 = 40;
    pub const LIVENESS_PERIOD_SECS: i32 = 10;
    pub const LIVENESS_TIMEOUT_SECS: i32 = 10;
    pub const LIVENESS_FAILURE_THRESHOLD: i32 = 10;
    pub const LIVENESS_SUCCESS_THRESHOLD: i32 = 1;
}

/// Default broker configuration. User overrides replace values for known
/// keys; unknown user keys pass through verbatim. `log.dirs` and, when the
/// user sets no listener, the listener block are computed at synthesis time.
pub static BROKER_CONF_DEFAULTS: LazyLock<BTreeMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        BTreeMap::from([
            ("broker.id", "-1"),
            (
                "listener.security.protocol.map",
                "PLAINTEXT:PLAINTEXT,SSL:SSL,SASL_PLAINTEXT:SASL_PLAINTEXT,SASL_SSL:SASL_SSL",
            ),
            ("num.network.threads", "3"),
            ("num.io.threads", "8"),
            ("socket.send.buffer.bytes", "102400"),
            ("socket.receive.buffer.bytes", "102400"),
            ("socket.request.max.bytes", "104857600"),
            ("num.partitions", "1"),
            ("num.recovery.threads.per.data.dir", "1"),
            ("offsets.topic.replication.factor", "1"),
            ("transaction.state.log.replication.factor", "1"),
            ("transaction.state.log.min.isr", "1"),
            ("log.flush.interval.messages", "10000"),
            ("log.flush.interval.ms", "1000"),
            ("log.retention.hours", "168"),
            ("log.segment.bytes", "1073741824"),
            ("log.retention.check.interval.ms", "300000"),
            ("zookeeper.connection.timeout.ms", "18000"),
            ("group.initial.rebalance.delay.ms", "0"),
        ])
    });

/// Default log4j configuration. Fixed template with no cluster-specific
/// inputs.
pub static LOG_CONF_DEFAULTS: LazyLock<BTreeMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        BTreeMap::from([
            ("log4j.rootLogger", "INFO, stdout, kafkaAppender"),
            ("log4j.appender.stdout", "org.apache.log4j.ConsoleAppender"),
            (
                "log4j.appender.stdout.layout",
                "org.apache.log4j.PatternLayout",
            ),
            (
                "log4j.appender.stdout.layout.ConversionPattern",
                "[%d] %p %m (%c)%n",
            ),
            (
                "log4j.appender.kafkaAppender",
                "org.apache.log4j.DailyRollingFileAppender",
            ),
            (
                "log4j.appender.kafkaAppender.DatePattern",
                "'.'yyyy-MM-dd-HH",
            ),
            (
                "log4j.appender.kafkaAppender.File",
                "${kafka.logs.dir}/server.log",
            ),
            (
                "log4j.appender.kafkaAppender.layout",
                "org.apache.log4j.PatternLayout",
            ),
            (
                "log4j.appender.kafkaAppender.layout.ConversionPattern",
                "[%d] %p %m (%c)%n",
            ),
        ])
    });
