// API boundary - typed access to the compute orchestration and compute
// instance services
//
// The pipeline never talks to the AWS SDK directly. It sees two traits,
// constructed once at startup and passed in explicitly, so every stage can
// be exercised against an in-memory fake and no ambient client state
// exists anywhere.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::LaunchMode;

pub mod aws;

/// Errors produced at the API boundary.
///
/// Every variant is handled the same way by the pipeline: the call's
/// result is treated as empty, a warning is logged, and the cycle
/// continues. Keeping the variants distinct makes the log lines say what
/// actually went wrong.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The remote call itself failed (network, auth, throttling, ...)
    #[error("{operation} call failed: {message}")]
    Call {
        operation: &'static str,
        message: String,
    },

    /// The call succeeded but a field this collector requires was absent
    #[error("response is missing required field '{0}'")]
    MissingField(&'static str),

    /// The call succeeded but a field could not be interpreted
    #[error("response field '{0}' is malformed")]
    Malformed(&'static str),
}

impl ApiError {
    pub fn call(operation: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Call {
            operation,
            message: err.to_string(),
        }
    }
}

/// A key/value tag attached to a cluster, service, or task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

/// One described service, already stripped to the fields the pipeline
/// consumes. Event history never crosses this boundary.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub service_name: String,
    pub service_arn: String,
    pub launch_mode: LaunchMode,
    pub desired_count: i64,
    pub running_count: i64,
    pub pending_count: i64,
    pub tags: Vec<ResourceTag>,
}

/// One described task: its resource envelope and the definition it runs.
#[derive(Debug, Clone)]
pub struct TaskDescription {
    /// Task memory in MiB
    pub memory: i64,

    /// Task CPU units
    pub cpu: i64,

    pub task_definition_arn: String,
}

/// A container environment variable from a task definition.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

/// The slice of a container definition the inspector looks at.
#[derive(Debug, Clone, Default)]
pub struct ContainerSummary {
    pub environment: Vec<EnvironmentVariable>,
}

/// A described task definition: its container definitions, in order.
#[derive(Debug, Clone, Default)]
pub struct TaskDefinitionDescription {
    pub containers: Vec<ContainerSummary>,
}

/// The compute orchestration surface (ECS).
///
/// Operations mirror the underlying API one to one; list operations are
/// capped at 100 results by the service and this collector does not
/// paginate past that cap.
#[async_trait]
pub trait OrchestrationApi: Send + Sync {
    /// All cluster ARNs in the account/region.
    async fn list_clusters(&self) -> Result<Vec<String>, ApiError>;

    /// Service ARNs of one cluster, capped at 100.
    async fn list_services(&self, cluster: &str) -> Result<Vec<String>, ApiError>;

    /// Describes up to 10 services of one cluster, tags included.
    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<Vec<ServiceDescription>, ApiError>;

    /// Tags of one cluster (used for the CloudFormation stack name).
    async fn cluster_tags(&self, cluster: &str) -> Result<Vec<ResourceTag>, ApiError>;

    /// Task ARNs of one service, filtered by launch mode, capped at 100.
    async fn list_tasks(
        &self,
        cluster: &str,
        service_name: &str,
        launch_mode: &LaunchMode,
    ) -> Result<Vec<String>, ApiError>;

    /// Describes the given tasks of one cluster.
    async fn describe_tasks(
        &self,
        cluster: &str,
        tasks: &[String],
    ) -> Result<Vec<TaskDescription>, ApiError>;

    /// Container-instance ARNs attached to one cluster.
    async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>, ApiError>;

    /// Resolves container-instance ARNs to their EC2 instance IDs.
    async fn describe_container_instances(
        &self,
        cluster: &str,
        container_instances: &[String],
    ) -> Result<Vec<String>, ApiError>;

    /// Describes one task definition.
    async fn describe_task_definition(
        &self,
        task_definition: &str,
    ) -> Result<TaskDefinitionDescription, ApiError>;
}

/// The compute instance surface (EC2).
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Instance type strings for the given instance IDs, in response order.
    async fn describe_instance_types(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<String>, ApiError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory API fakes for pipeline tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    /// Canned-response orchestration API.
    ///
    /// Operations listed in `fail` return a call error; everything else is
    /// served from the maps. `describe_services` additionally records the
    /// size of every batch it receives so tests can assert the chunking
    /// behavior.
    #[derive(Default)]
    pub struct MockOrchestration {
        pub clusters: Vec<String>,
        /// cluster ARN -> service ARNs
        pub services: HashMap<String, Vec<String>>,
        /// service ARN -> description
        pub descriptions: HashMap<String, ServiceDescription>,
        /// cluster ARN -> tags
        pub tags: HashMap<String, Vec<ResourceTag>>,
        /// service name -> task ARNs
        pub tasks: HashMap<String, Vec<String>>,
        /// task ARN -> description
        pub task_descriptions: HashMap<String, TaskDescription>,
        /// cluster ARN -> container-instance ARNs
        pub container_instances: HashMap<String, Vec<String>>,
        /// cluster ARN -> EC2 instance IDs
        pub instance_ids: HashMap<String, Vec<String>>,
        /// task-definition ARN -> description
        pub task_definitions: HashMap<String, TaskDefinitionDescription>,
        /// operation names forced to fail
        pub fail: HashSet<&'static str>,
        pub describe_batches: Mutex<Vec<usize>>,
    }

    impl MockOrchestration {
        fn check(&self, operation: &'static str) -> Result<(), ApiError> {
            if self.fail.contains(operation) {
                Err(ApiError::call(operation, "forced failure"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl OrchestrationApi for MockOrchestration {
        async fn list_clusters(&self) -> Result<Vec<String>, ApiError> {
            self.check("ListClusters")?;
            Ok(self.clusters.clone())
        }

        async fn list_services(&self, cluster: &str) -> Result<Vec<String>, ApiError> {
            self.check("ListServices")?;
            Ok(self.services.get(cluster).cloned().unwrap_or_default())
        }

        async fn describe_services(
            &self,
            _cluster: &str,
            services: &[String],
        ) -> Result<Vec<ServiceDescription>, ApiError> {
            self.check("DescribeServices")?;
            self.describe_batches.lock().unwrap().push(services.len());
            Ok(services
                .iter()
                .filter_map(|arn| self.descriptions.get(arn).cloned())
                .collect())
        }

        async fn cluster_tags(&self, cluster: &str) -> Result<Vec<ResourceTag>, ApiError> {
            self.check("DescribeClusters")?;
            Ok(self.tags.get(cluster).cloned().unwrap_or_default())
        }

        async fn list_tasks(
            &self,
            _cluster: &str,
            service_name: &str,
            _launch_mode: &LaunchMode,
        ) -> Result<Vec<String>, ApiError> {
            self.check("ListTasks")?;
            Ok(self.tasks.get(service_name).cloned().unwrap_or_default())
        }

        async fn describe_tasks(
            &self,
            _cluster: &str,
            tasks: &[String],
        ) -> Result<Vec<TaskDescription>, ApiError> {
            self.check("DescribeTasks")?;
            Ok(tasks
                .iter()
                .filter_map(|arn| self.task_descriptions.get(arn).cloned())
                .collect())
        }

        async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>, ApiError> {
            self.check("ListContainerInstances")?;
            Ok(self
                .container_instances
                .get(cluster)
                .cloned()
                .unwrap_or_default())
        }

        async fn describe_container_instances(
            &self,
            cluster: &str,
            _container_instances: &[String],
        ) -> Result<Vec<String>, ApiError> {
            self.check("DescribeContainerInstances")?;
            Ok(self.instance_ids.get(cluster).cloned().unwrap_or_default())
        }

        async fn describe_task_definition(
            &self,
            task_definition: &str,
        ) -> Result<TaskDefinitionDescription, ApiError> {
            self.check("DescribeTaskDefinition")?;
            self.task_definitions
                .get(task_definition)
                .cloned()
                .ok_or(ApiError::MissingField("taskDefinition"))
        }
    }

    /// Canned-response compute API.
    #[derive(Default)]
    pub struct MockCompute {
        pub instance_types: Vec<String>,
        pub fail: bool,
    }

    #[async_trait]
    impl ComputeApi for MockCompute {
        async fn describe_instance_types(
            &self,
            _instance_ids: &[String],
        ) -> Result<Vec<String>, ApiError> {
            if self.fail {
                return Err(ApiError::call("DescribeInstances", "forced failure"));
            }
            Ok(self.instance_types.clone())
        }
    }
}
