// Data model for one collection cycle
//
// A cycle builds a fresh tree of ClusterRecord -> ServiceRecord through five
// sequential enrichment passes (discovery, description, task listing,
// resource resolution, task-definition inspection) and drops it after
// emission. Nothing here survives across cycles.

use std::fmt;

/// How a service's tasks are launched.
///
/// `Fargate` is serverless-billed (per-task memory/CPU totals matter),
/// `Ec2` runs on cluster-owned hosts (the host instance type matters).
/// Anything else the API reports (e.g. "EXTERNAL") is carried through
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    Fargate,
    Ec2,
    Other(String),
}

impl LaunchMode {
    /// Maps the API's launch type string into a mode.
    pub fn from_api(value: &str) -> Self {
        match value {
            "FARGATE" => LaunchMode::Fargate,
            "EC2" => LaunchMode::Ec2,
            other => LaunchMode::Other(other.to_string()),
        }
    }

    /// The wire representation, identical to what the API reported.
    pub fn as_str(&self) -> &str {
        match self {
            LaunchMode::Fargate => "FARGATE",
            LaunchMode::Ec2 => "EC2",
            LaunchMode::Other(value) => value,
        }
    }

    /// True for services running on cluster-owned EC2 hosts.
    pub fn is_host_based(&self) -> bool {
        matches!(self, LaunchMode::Ec2)
    }
}

impl Default for LaunchMode {
    /// An undescribed service has no launch mode yet.
    fn default() -> Self {
        LaunchMode::Other(String::new())
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queueing configuration read from a service's task definition.
///
/// Zero means "not configured"; configured values are emitted, zeros are
/// omitted from the output line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueConfig {
    /// Request timeout in seconds (env key MT_REQUEST_TIMEOUT)
    pub timeout_secs: i64,

    /// Workers per model (env key TS_DEFAULT_WORKERS_PER_MODEL)
    pub default_workers_per_model: i64,

    /// Job queue size (env key TS_JOB_QUEUE_SIZE)
    pub queue_size: i64,
}

/// One service's fully joined metrics record.
///
/// Counts and the nine derived duration fields are populated together by
/// [`ServiceRecord::apply_counts`]. The classification tag gates emission:
/// a record with an empty tag is never written.
#[derive(Debug, Clone, Default)]
pub struct ServiceRecord {
    /// Classification tag (tag key "Service"); empty = undetermined
    pub service_tag: String,
    pub service_name: String,
    pub service_arn: String,

    /// Task ARNs listed for this service (capped at 100 by the API)
    pub task_arns: Vec<String>,

    /// Task-definition ARNs of the described tasks, in order, duplicates kept
    pub task_definitions: Vec<String>,

    /// CloudFormation stack name of the owning cluster
    pub stack_name: String,

    pub launch_mode: LaunchMode,

    /// Summed task memory (MiB), populated for non-EC2 services only
    pub fargate_memory: i64,

    /// Summed task CPU units, populated for non-EC2 services only
    pub fargate_vcpu: i64,

    /// Host instance type, populated for EC2 services only
    pub ec2_instance_type: String,

    pub desired_tasks: i64,
    pub running_tasks: i64,
    pub pending_tasks: i64,

    // Derived duration fields: minutes = count, seconds = count * 60,
    // milliseconds = count * 60_000.
    pub desired_task_minutes: i64,
    pub running_task_minutes: i64,
    pub pending_task_minutes: i64,
    pub desired_task_seconds: i64,
    pub running_task_seconds: i64,
    pub pending_task_seconds: i64,
    pub desired_task_ms: i64,
    pub running_task_ms: i64,
    pub pending_task_ms: i64,

    pub queue_config: QueueConfig,

    /// Cost placeholder, always 0.0 until a pricing source exists
    pub cost_per_minute: f64,
}

const SECONDS_PER_MINUTE: i64 = 60;
const MILLIS_PER_SECOND: i64 = 1000;

impl ServiceRecord {
    /// Sets the three raw task counts and all nine derived duration fields
    /// by direct multiplication.
    pub fn apply_counts(&mut self, desired: i64, running: i64, pending: i64) {
        self.desired_tasks = desired;
        self.running_tasks = running;
        self.pending_tasks = pending;
        self.desired_task_minutes = desired;
        self.running_task_minutes = running;
        self.pending_task_minutes = pending;
        self.desired_task_seconds = desired * SECONDS_PER_MINUTE;
        self.running_task_seconds = running * SECONDS_PER_MINUTE;
        self.pending_task_seconds = pending * SECONDS_PER_MINUTE;
        self.desired_task_ms = desired * SECONDS_PER_MINUTE * MILLIS_PER_SECOND;
        self.running_task_ms = running * SECONDS_PER_MINUTE * MILLIS_PER_SECOND;
        self.pending_task_ms = pending * SECONDS_PER_MINUTE * MILLIS_PER_SECOND;
    }

    /// The task definition that stands in for every task of this service.
    ///
    /// All tasks of a service are assumed to share one configuration, so
    /// only the first listed definition is ever inspected. The assumption
    /// is not verified.
    pub fn representative_task_definition(&self) -> Option<&str> {
        self.task_definitions.first().map(String::as_str)
    }
}

/// One cluster and the services discovered in it during this cycle.
#[derive(Debug, Clone, Default)]
pub struct ClusterRecord {
    pub cluster_arn: String,

    /// Service ARNs in API-returned order
    pub service_arns: Vec<String>,

    /// One record per described service, in `service_arns` order
    pub services: Vec<ServiceRecord>,
}

impl ClusterRecord {
    pub fn new(cluster_arn: String) -> Self {
        ClusterRecord {
            cluster_arn,
            ..Default::default()
        }
    }
}

/// Derives the human-readable cluster name from its ARN by taking
/// everything after the first `/`. An ARN without a `/` yields an empty
/// name.
pub fn cluster_name(cluster_arn: &str) -> &str {
    cluster_arn
        .split_once('/')
        .map_or("", |(_, tail)| tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_derive_exact_duration_fields() {
        let mut record = ServiceRecord::default();
        record.apply_counts(3, 2, 1);

        assert_eq!(record.desired_tasks, 3);
        assert_eq!(record.desired_task_minutes, 3);
        assert_eq!(record.desired_task_seconds, 180);
        assert_eq!(record.desired_task_ms, 180_000);

        assert_eq!(record.running_tasks, 2);
        assert_eq!(record.running_task_minutes, 2);
        assert_eq!(record.running_task_seconds, 120);
        assert_eq!(record.running_task_ms, 120_000);

        assert_eq!(record.pending_tasks, 1);
        assert_eq!(record.pending_task_minutes, 1);
        assert_eq!(record.pending_task_seconds, 60);
        assert_eq!(record.pending_task_ms, 60_000);
    }

    #[test]
    fn zero_counts_stay_zero() {
        let mut record = ServiceRecord::default();
        record.apply_counts(0, 0, 0);
        assert_eq!(record.desired_task_ms, 0);
        assert_eq!(record.running_task_seconds, 0);
        assert_eq!(record.pending_task_minutes, 0);
    }

    #[test]
    fn representative_task_definition_is_the_first_listed() {
        let mut record = ServiceRecord::default();
        assert_eq!(record.representative_task_definition(), None);

        record.task_definitions = vec!["def-a".to_string(), "def-b".to_string()];
        assert_eq!(record.representative_task_definition(), Some("def-a"));
    }

    #[test]
    fn cluster_name_strips_arn_prefix() {
        assert_eq!(
            cluster_name("arn:aws:ecs:us-east-1:123456789012:cluster/prod"),
            "prod"
        );
        assert_eq!(cluster_name("no-slash-here"), "");
        assert_eq!(cluster_name("trailing/"), "");
        assert_eq!(cluster_name("a/b/c"), "b/c");
    }

    #[test]
    fn launch_mode_round_trips_api_strings() {
        assert_eq!(LaunchMode::from_api("FARGATE"), LaunchMode::Fargate);
        assert_eq!(LaunchMode::from_api("EC2"), LaunchMode::Ec2);
        assert_eq!(
            LaunchMode::from_api("EXTERNAL"),
            LaunchMode::Other("EXTERNAL".to_string())
        );
        assert_eq!(LaunchMode::from_api("EXTERNAL").as_str(), "EXTERNAL");
        assert!(LaunchMode::Ec2.is_host_based());
        assert!(!LaunchMode::Fargate.is_host_based());
    }
}
