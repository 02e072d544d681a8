// AWS SDK implementations of the API boundary
//
// This is the only module that knows about the SDK's shapes. Responses are
// mapped into the typed structs of the parent module right here, so absent
// required fields surface as ApiError::MissingField instead of faulting
// deeper in the pipeline, and service event history is dropped at the edge.

use aws_config::SdkConfig;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{ClusterField, LaunchType, ServiceField, TaskDefinitionField, TaskField};
use async_trait::async_trait;

use crate::model::LaunchMode;

use super::{
    ApiError, ComputeApi, ContainerSummary, EnvironmentVariable, OrchestrationApi, ResourceTag,
    ServiceDescription, TaskDefinitionDescription, TaskDescription,
};

/// Both list surfaces cap a single response at 100 entries. Known
/// limitation: clusters with more than 100 services or tasks are truncated.
const LIST_LIMIT: i32 = 100;

/// ECS-backed orchestration API.
pub struct EcsApi {
    client: aws_sdk_ecs::Client,
}

impl EcsApi {
    pub fn new(config: &SdkConfig) -> Self {
        EcsApi {
            client: aws_sdk_ecs::Client::new(config),
        }
    }
}

#[async_trait]
impl OrchestrationApi for EcsApi {
    async fn list_clusters(&self) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_clusters()
            .send()
            .await
            .map_err(|e| ApiError::call("ListClusters", DisplayErrorContext(&e)))?;

        Ok(output.cluster_arns.unwrap_or_default())
    }

    async fn list_services(&self, cluster: &str) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_services()
            .cluster(cluster)
            .max_results(LIST_LIMIT)
            .send()
            .await
            .map_err(|e| ApiError::call("ListServices", DisplayErrorContext(&e)))?;

        Ok(output.service_arns.unwrap_or_default())
    }

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<Vec<ServiceDescription>, ApiError> {
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .set_services(Some(services.to_vec()))
            .include(ServiceField::Tags)
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeServices", DisplayErrorContext(&e)))?;

        output
            .services
            .unwrap_or_default()
            .into_iter()
            .map(map_service)
            .collect()
    }

    async fn cluster_tags(&self, cluster: &str) -> Result<Vec<ResourceTag>, ApiError> {
        let output = self
            .client
            .describe_clusters()
            .clusters(cluster)
            .include(ClusterField::Tags)
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeClusters", DisplayErrorContext(&e)))?;

        let cluster = output
            .clusters
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(ApiError::MissingField("clusters"))?;

        Ok(map_tags(cluster.tags))
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        service_name: &str,
        launch_mode: &LaunchMode,
    ) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_tasks()
            .cluster(cluster)
            .service_name(service_name)
            .launch_type(LaunchType::from(launch_mode.as_str()))
            .max_results(LIST_LIMIT)
            .send()
            .await
            .map_err(|e| ApiError::call("ListTasks", DisplayErrorContext(&e)))?;

        Ok(output.task_arns.unwrap_or_default())
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        tasks: &[String],
    ) -> Result<Vec<TaskDescription>, ApiError> {
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(tasks.to_vec()))
            .include(TaskField::Tags)
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeTasks", DisplayErrorContext(&e)))?;

        output
            .tasks
            .unwrap_or_default()
            .into_iter()
            .map(map_task)
            .collect()
    }

    async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_container_instances()
            .cluster(cluster)
            .send()
            .await
            .map_err(|e| ApiError::call("ListContainerInstances", DisplayErrorContext(&e)))?;

        Ok(output.container_instance_arns.unwrap_or_default())
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        container_instances: &[String],
    ) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .describe_container_instances()
            .cluster(cluster)
            .set_container_instances(Some(container_instances.to_vec()))
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeContainerInstances", DisplayErrorContext(&e)))?;

        output
            .container_instances
            .unwrap_or_default()
            .into_iter()
            .map(|instance| {
                instance
                    .ec2_instance_id
                    .ok_or(ApiError::MissingField("ec2InstanceId"))
            })
            .collect()
    }

    async fn describe_task_definition(
        &self,
        task_definition: &str,
    ) -> Result<TaskDefinitionDescription, ApiError> {
        let output = self
            .client
            .describe_task_definition()
            .task_definition(task_definition)
            .include(TaskDefinitionField::Tags)
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeTaskDefinition", DisplayErrorContext(&e)))?;

        let definition = output
            .task_definition
            .ok_or(ApiError::MissingField("taskDefinition"))?;

        let containers = definition
            .container_definitions
            .unwrap_or_default()
            .into_iter()
            .map(|container| ContainerSummary {
                environment: container
                    .environment
                    .unwrap_or_default()
                    .into_iter()
                    .map(|pair| EnvironmentVariable {
                        name: pair.name.unwrap_or_default(),
                        value: pair.value.unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        Ok(TaskDefinitionDescription { containers })
    }
}

/// EC2-backed compute API.
pub struct Ec2Api {
    client: aws_sdk_ec2::Client,
}

impl Ec2Api {
    pub fn new(config: &SdkConfig) -> Self {
        Ec2Api {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait]
impl ComputeApi for Ec2Api {
    async fn describe_instance_types(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| ApiError::call("DescribeInstances", DisplayErrorContext(&e)))?;

        let mut instance_types = Vec::new();
        for reservation in output.reservations.unwrap_or_default() {
            for instance in reservation.instances.unwrap_or_default() {
                let instance_type = instance
                    .instance_type
                    .ok_or(ApiError::MissingField("instanceType"))?;
                instance_types.push(instance_type.as_str().to_string());
            }
        }

        Ok(instance_types)
    }
}

fn map_tags(tags: Option<Vec<aws_sdk_ecs::types::Tag>>) -> Vec<ResourceTag> {
    tags.unwrap_or_default()
        .into_iter()
        .map(|tag| ResourceTag {
            key: tag.key.unwrap_or_default(),
            value: tag.value.unwrap_or_default(),
        })
        .collect()
}

/// Maps one described service, dropping its event history at the boundary.
fn map_service(service: aws_sdk_ecs::types::Service) -> Result<ServiceDescription, ApiError> {
    let launch_type = service
        .launch_type
        .ok_or(ApiError::MissingField("launchType"))?;

    Ok(ServiceDescription {
        service_name: service
            .service_name
            .ok_or(ApiError::MissingField("serviceName"))?,
        service_arn: service
            .service_arn
            .ok_or(ApiError::MissingField("serviceArn"))?,
        launch_mode: LaunchMode::from_api(launch_type.as_str()),
        desired_count: i64::from(service.desired_count),
        running_count: i64::from(service.running_count),
        pending_count: i64::from(service.pending_count),
        tags: map_tags(service.tags),
    })
}

fn map_task(task: aws_sdk_ecs::types::Task) -> Result<TaskDescription, ApiError> {
    let memory = task
        .memory
        .ok_or(ApiError::MissingField("memory"))?
        .parse()
        .map_err(|_| ApiError::Malformed("memory"))?;

    let cpu = task
        .cpu
        .ok_or(ApiError::MissingField("cpu"))?
        .parse()
        .map_err(|_| ApiError::Malformed("cpu"))?;

    Ok(TaskDescription {
        memory,
        cpu,
        task_definition_arn: task
            .task_definition_arn
            .ok_or(ApiError::MissingField("taskDefinitionArn"))?,
    })
}
