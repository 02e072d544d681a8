// Cluster and service discovery - the first two passes of a cycle
//
// Discovery failures never abort the cycle: a failed cluster listing
// yields an empty cycle, a failed service listing yields a cluster record
// with no services. Degraded data, not a dead collector.

use tracing::{debug, warn};

use crate::api::OrchestrationApi;
use crate::model::ClusterRecord;

/// Lists every cluster ARN in the account/region.
pub async fn discover_clusters(api: &dyn OrchestrationApi) -> Vec<String> {
    match api.list_clusters().await {
        Ok(cluster_arns) => {
            debug!("discovered {} cluster(s)", cluster_arns.len());
            cluster_arns
        }
        Err(e) => {
            warn!("cluster discovery failed, collecting nothing this cycle: {e}");
            Vec::new()
        }
    }
}

/// Creates one [`ClusterRecord`] per cluster with its service ARN list.
///
/// The service listing is capped at 100 entries per cluster by the API;
/// clusters beyond that are truncated, not paginated.
pub async fn discover_services(
    api: &dyn OrchestrationApi,
    cluster_arns: Vec<String>,
) -> Vec<ClusterRecord> {
    let mut clusters = Vec::with_capacity(cluster_arns.len());

    for cluster_arn in cluster_arns {
        let service_arns = match api.list_services(&cluster_arn).await {
            Ok(service_arns) => {
                debug!(
                    cluster = %cluster_arn,
                    "discovered {} service(s)",
                    service_arns.len()
                );
                service_arns
            }
            Err(e) => {
                warn!(cluster = %cluster_arn, "service listing failed: {e}");
                Vec::new()
            }
        };

        let mut record = ClusterRecord::new(cluster_arn);
        record.service_arns = service_arns;
        clusters.push(record);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::api::mock::MockOrchestration;

    #[tokio::test]
    async fn failed_cluster_listing_degrades_to_empty() {
        let mut api = MockOrchestration::default();
        api.clusters = vec!["arn:cluster/a".to_string()];
        api.fail.insert("ListClusters");

        assert!(discover_clusters(&api).await.is_empty());
    }

    #[tokio::test]
    async fn failed_service_listing_keeps_the_cluster_record() {
        let mut api = MockOrchestration::default();
        api.clusters = vec!["arn:cluster/a".to_string(), "arn:cluster/b".to_string()];
        api.services = HashMap::from([(
            "arn:cluster/b".to_string(),
            vec!["arn:service/b1".to_string()],
        )]);
        api.fail.insert("ListServices");

        let cluster_arns = discover_clusters(&api).await;
        let clusters = discover_services(&api, cluster_arns).await;

        assert_eq!(clusters.len(), 2);
        assert!(clusters[0].service_arns.is_empty());
        assert!(clusters[1].service_arns.is_empty());
    }

    #[tokio::test]
    async fn clusters_and_services_keep_api_order() {
        let mut api = MockOrchestration::default();
        api.clusters = vec!["arn:cluster/b".to_string(), "arn:cluster/a".to_string()];
        api.services = HashMap::from([(
            "arn:cluster/b".to_string(),
            vec!["arn:service/2".to_string(), "arn:service/1".to_string()],
        )]);

        let clusters = discover_services(&api, discover_clusters(&api).await).await;

        assert_eq!(clusters[0].cluster_arn, "arn:cluster/b");
        assert_eq!(clusters[1].cluster_arn, "arn:cluster/a");
        assert_eq!(
            clusters[0].service_arns,
            vec!["arn:service/2".to_string(), "arn:service/1".to_string()]
        );
    }
}
