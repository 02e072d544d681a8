// Metrics emitter - one JSON object per qualifying service, one per line
//
// This is the downstream interface of the collector: newline-delimited
// JSON on stdout, ready for a log shipper. Diagnostics go through tracing
// (on stderr), so the two streams never mix. Emission is gated on the
// classification tag: services without one are silently dropped.

use std::io::Write;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{cluster_name, ClusterRecord, LaunchMode, ServiceRecord};

/// UTC with microsecond precision and a literal `Z`,
/// e.g. `2024-05-01T12:00:00.123456Z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Errors that can occur while writing metric lines.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to encode metrics line: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write metrics line: {0}")]
    Io(#[from] std::io::Error),
}

/// The emitted wire shape. Field names and their order are the contract
/// with the downstream log pipeline; conditional fields are omitted
/// entirely rather than written as zero/empty.
#[derive(Debug, Serialize)]
struct ServiceMetricsLine<'a> {
    #[serde(rename = "serviceTag")]
    service_tag: &'a str,
    #[serde(rename = "clusterName")]
    cluster_name: &'a str,
    #[serde(rename = "cloudFormationStackName")]
    cloud_formation_stack_name: &'a str,
    #[serde(rename = "containerType")]
    container_type: &'a str,

    // Present iff containerType == "FARGATE"
    #[serde(rename = "FarGateMemory", skip_serializing_if = "Option::is_none")]
    fargate_memory: Option<i64>,
    #[serde(rename = "FarGatevCPU", skip_serializing_if = "Option::is_none")]
    fargate_vcpu: Option<i64>,

    // Present iff containerType == "EC2"
    #[serde(rename = "EC2InstanceType", skip_serializing_if = "Option::is_none")]
    ec2_instance_type: Option<&'a str>,

    #[serde(rename = "desiredTasks")]
    desired_tasks: i64,
    #[serde(rename = "runningTasks")]
    running_tasks: i64,
    #[serde(rename = "pendingTasks")]
    pending_tasks: i64,
    #[serde(rename = "desiredTaskMinutes")]
    desired_task_minutes: i64,
    #[serde(rename = "runningTaskMinutes")]
    running_task_minutes: i64,
    #[serde(rename = "pendingTaskMinutes")]
    pending_task_minutes: i64,
    #[serde(rename = "desiredTaskSeconds")]
    desired_task_seconds: i64,
    #[serde(rename = "runningTaskSeconds")]
    running_task_seconds: i64,
    #[serde(rename = "pendingTaskSeconds")]
    pending_task_seconds: i64,
    #[serde(rename = "desiredTaskMS")]
    desired_task_ms: i64,
    #[serde(rename = "runningTaskMS")]
    running_task_ms: i64,
    #[serde(rename = "pendingTaskMS")]
    pending_task_ms: i64,

    // Present iff nonzero
    #[serde(rename = "timeoutSecs", skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<i64>,
    #[serde(rename = "defaultWorkersPerModel", skip_serializing_if = "Option::is_none")]
    default_workers_per_model: Option<i64>,
    #[serde(rename = "queueSize", skip_serializing_if = "Option::is_none")]
    queue_size: Option<i64>,

    #[serde(rename = "serviceCostPerMinute")]
    service_cost_per_minute: f64,
    #[serde(rename = "dateTime1")]
    date_time: String,
}

impl<'a> ServiceMetricsLine<'a> {
    fn from_record(cluster: &'a str, service: &'a ServiceRecord) -> Self {
        let (fargate_memory, fargate_vcpu) = match service.launch_mode {
            LaunchMode::Fargate => (Some(service.fargate_memory), Some(service.fargate_vcpu)),
            _ => (None, None),
        };
        let ec2_instance_type = match service.launch_mode {
            LaunchMode::Ec2 => Some(service.ec2_instance_type.as_str()),
            _ => None,
        };

        let nonzero = |value: i64| if value != 0 { Some(value) } else { None };

        ServiceMetricsLine {
            service_tag: &service.service_tag,
            cluster_name: cluster,
            cloud_formation_stack_name: &service.stack_name,
            container_type: service.launch_mode.as_str(),
            fargate_memory,
            fargate_vcpu,
            ec2_instance_type,
            desired_tasks: service.desired_tasks,
            running_tasks: service.running_tasks,
            pending_tasks: service.pending_tasks,
            desired_task_minutes: service.desired_task_minutes,
            running_task_minutes: service.running_task_minutes,
            pending_task_minutes: service.pending_task_minutes,
            desired_task_seconds: service.desired_task_seconds,
            running_task_seconds: service.running_task_seconds,
            pending_task_seconds: service.pending_task_seconds,
            desired_task_ms: service.desired_task_ms,
            running_task_ms: service.running_task_ms,
            pending_task_ms: service.pending_task_ms,
            timeout_secs: nonzero(service.queue_config.timeout_secs),
            default_workers_per_model: nonzero(service.queue_config.default_workers_per_model),
            queue_size: nonzero(service.queue_config.queue_size),
            service_cost_per_minute: service.cost_per_minute,
            date_time: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Writes service metrics as newline-delimited JSON to any sink.
///
/// Production hands it a locked stdout; tests hand it a buffer.
pub struct MetricsEmitter<W: Write> {
    writer: W,
}

impl<W: Write> MetricsEmitter<W> {
    pub fn new(writer: W) -> Self {
        MetricsEmitter { writer }
    }

    /// Emits one line per service with a non-empty classification tag,
    /// preserving cluster and service order. Returns the number of lines
    /// written.
    pub fn emit(&mut self, clusters: &[ClusterRecord]) -> Result<usize, EmitError> {
        let mut written = 0;

        for cluster in clusters {
            let name = cluster_name(&cluster.cluster_arn);

            for service in &cluster.services {
                if service.service_tag.is_empty() {
                    debug!(
                        cluster = name,
                        service = %service.service_name,
                        "service has no classification tag, dropped from emission"
                    );
                    continue;
                }

                let line = ServiceMetricsLine::from_record(name, service);
                serde_json::to_writer(&mut self.writer, &line)?;
                self.writer.write_all(b"\n")?;
                written += 1;
            }
        }

        self.writer.flush()?;
        Ok(written)
    }
}
