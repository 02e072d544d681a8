// Task resolver pass - task listings, resource totals, host instance types
//
// Step A lists task ARNs per service. Step B describes those tasks and,
// for serverless-billed services, sums their memory/CPU into the service
// record; task-definition ARNs are collected for every service either
// way. Step C resolves the underlying host instance type of an EC2
// cluster through the container-instance chain.

use tracing::warn;

use crate::api::{ComputeApi, OrchestrationApi};
use crate::model::ClusterRecord;

/// Step A: fills each service's task ARN list (capped at 100 by the API).
/// A failed listing leaves the list empty and the cycle moves on.
pub async fn resolve_task_arns(api: &dyn OrchestrationApi, clusters: &mut [ClusterRecord]) {
    for cluster in clusters.iter_mut() {
        for service in &mut cluster.services {
            let listed = api
                .list_tasks(&cluster.cluster_arn, &service.service_name, &service.launch_mode)
                .await;
            match listed {
                Ok(task_arns) => service.task_arns = task_arns,
                Err(e) => {
                    warn!(
                        cluster = %cluster.cluster_arn,
                        service = %service.service_name,
                        "task listing failed: {e}"
                    );
                }
            }
        }
    }
}

/// Step B: describes each service's tasks and folds the results into the
/// record. Services without task ARNs are skipped entirely.
pub async fn resolve_task_resources(api: &dyn OrchestrationApi, clusters: &mut [ClusterRecord]) {
    for cluster in clusters.iter_mut() {
        for service in &mut cluster.services {
            if service.task_arns.is_empty() {
                continue;
            }

            let tasks = match api.describe_tasks(&cluster.cluster_arn, &service.task_arns).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(
                        cluster = %cluster.cluster_arn,
                        service = %service.service_name,
                        "task description failed: {e}"
                    );
                    continue;
                }
            };

            if service.launch_mode.is_host_based() {
                // Host-based billing is per instance, not per task; only the
                // definitions are of interest here.
                for task in tasks {
                    service.task_definitions.push(task.task_definition_arn);
                }
            } else {
                let mut memory = 0;
                let mut cpu = 0;
                for task in tasks {
                    memory += task.memory;
                    cpu += task.cpu;
                    service.task_definitions.push(task.task_definition_arn);
                }
                service.fargate_memory = memory;
                service.fargate_vcpu = cpu;
            }
        }
    }
}

/// Step C: resolves the host instance type of an EC2 cluster.
///
/// Chain: list container instances -> describe them into EC2 instance IDs
/// -> describe those instances into type strings. The first type in the
/// flattened result stands for the whole cluster; hosts are assumed
/// homogeneous and this is not verified. Any failure or an empty chain
/// yields an empty string.
pub async fn resolve_cluster_instance_type(
    orchestration: &dyn OrchestrationApi,
    compute: &dyn ComputeApi,
    cluster_arn: &str,
) -> String {
    let container_instances = match orchestration.list_container_instances(cluster_arn).await {
        Ok(arns) => arns,
        Err(e) => {
            warn!(cluster = %cluster_arn, "container instance listing failed: {e}");
            return String::new();
        }
    };
    if container_instances.is_empty() {
        return String::new();
    }

    let instance_ids = match orchestration
        .describe_container_instances(cluster_arn, &container_instances)
        .await
    {
        Ok(ids) => ids,
        Err(e) => {
            warn!(cluster = %cluster_arn, "container instance description failed: {e}");
            return String::new();
        }
    };
    if instance_ids.is_empty() {
        return String::new();
    }

    let instance_types = match compute.describe_instance_types(&instance_ids).await {
        Ok(types) => types,
        Err(e) => {
            warn!(cluster = %cluster_arn, "instance type lookup failed: {e}");
            return String::new();
        }
    };

    // Representative pick: first type stands for the group.
    instance_types.first().cloned().unwrap_or_default()
}
