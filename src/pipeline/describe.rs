// Service descriptor pass - turns service ARNs into provisional records
//
// Per cluster this pass resolves the CloudFormation stack name once,
// describes the services in batches of at most 10, and builds one
// ServiceRecord per description: classification tag, identity, launch
// mode, counts plus the nine derived duration fields, and - for EC2
// clusters - the host instance type resolved once and shared by every
// EC2 service in the cluster.

use tracing::warn;

use crate::api::{ComputeApi, OrchestrationApi, ServiceDescription};
use crate::model::{ClusterRecord, ServiceRecord};

use super::batch::{chunked, DESCRIBE_BATCH_LIMIT};
use super::tasks::resolve_cluster_instance_type;

/// Tag key whose value classifies a service; services without it are
/// dropped at emission time.
const SERVICE_TAG_KEY: &str = "Service";

/// Tag key CloudFormation stamps on resources it owns.
const STACK_NAME_TAG_KEY: &str = "aws:cloudformation:stack-name";

/// Runs the descriptor pass over every cluster record.
pub async fn describe_cluster_services(
    orchestration: &dyn OrchestrationApi,
    compute: &dyn ComputeApi,
    clusters: &mut [ClusterRecord],
) {
    for cluster in clusters.iter_mut() {
        let stack_name = resolve_stack_name(orchestration, &cluster.cluster_arn).await;

        let mut descriptions: Vec<ServiceDescription> = Vec::new();
        for chunk in chunked(&cluster.service_arns, DESCRIBE_BATCH_LIMIT) {
            match orchestration
                .describe_services(&cluster.cluster_arn, chunk)
                .await
            {
                Ok(mut described) => descriptions.append(&mut described),
                Err(e) => {
                    warn!(
                        cluster = %cluster.cluster_arn,
                        "service description failed for a batch of {}: {e}",
                        chunk.len()
                    );
                }
            }
        }

        // Resolved lazily on the first EC2 service, then shared by every
        // EC2 service in the cluster.
        let mut host_instance_type: Option<String> = None;

        for description in descriptions {
            let mut service = ServiceRecord {
                service_tag: classification_tag(&description),
                service_name: description.service_name,
                service_arn: description.service_arn,
                stack_name: stack_name.clone(),
                ..Default::default()
            };

            if description.launch_mode.is_host_based() {
                if host_instance_type.is_none() {
                    host_instance_type = Some(
                        resolve_cluster_instance_type(
                            orchestration,
                            compute,
                            &cluster.cluster_arn,
                        )
                        .await,
                    );
                }
                service.ec2_instance_type = host_instance_type.clone().unwrap_or_default();
            }

            service.launch_mode = description.launch_mode;
            service.apply_counts(
                description.desired_count,
                description.running_count,
                description.pending_count,
            );

            cluster.services.push(service);
        }
    }
}

/// Extracts the classification tag; a missing key leaves it empty.
fn classification_tag(description: &ServiceDescription) -> String {
    description
        .tags
        .iter()
        .find(|tag| tag.key == SERVICE_TAG_KEY)
        .map(|tag| tag.value.clone())
        .unwrap_or_default()
}

/// Resolves the owning stack name from the cluster's tags, once per
/// cluster. Failure or an absent tag yields an empty name.
async fn resolve_stack_name(api: &dyn OrchestrationApi, cluster_arn: &str) -> String {
    match api.cluster_tags(cluster_arn).await {
        Ok(tags) => tags
            .into_iter()
            .find(|tag| tag.key == STACK_NAME_TAG_KEY)
            .map(|tag| tag.value)
            .unwrap_or_default(),
        Err(e) => {
            warn!(cluster = %cluster_arn, "stack name lookup failed: {e}");
            String::new()
        }
    }
}
