// Collection pipeline - five sequential enrichment passes per cycle
//
// discovery -> service description -> task listing -> resource/host-type
// resolution -> task-definition inspection. Everything runs strictly
// sequentially: one in-flight call at a time, clusters in API order,
// services in list order. A failed call degrades its own data and the
// cycle keeps going.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ComputeApi, OrchestrationApi};
use crate::model::ClusterRecord;

pub mod batch;
mod describe;
mod discovery;
mod task_definition;
mod tasks;

/// The collection pipeline with its injected API dependencies.
///
/// Constructed once at startup; `collect` builds a fresh record tree
/// every time it is called and returns it for emission.
pub struct Pipeline {
    orchestration: Arc<dyn OrchestrationApi>,
    compute: Arc<dyn ComputeApi>,
}

impl Pipeline {
    pub fn new(orchestration: Arc<dyn OrchestrationApi>, compute: Arc<dyn ComputeApi>) -> Self {
        Pipeline {
            orchestration,
            compute,
        }
    }

    /// Runs one full collection cycle and returns the joined records.
    pub async fn collect(&self) -> Vec<ClusterRecord> {
        let orchestration = self.orchestration.as_ref();

        let cluster_arns = discovery::discover_clusters(orchestration).await;
        let mut clusters = discovery::discover_services(orchestration, cluster_arns).await;

        describe::describe_cluster_services(orchestration, self.compute.as_ref(), &mut clusters)
            .await;
        tasks::resolve_task_arns(orchestration, &mut clusters).await;
        tasks::resolve_task_resources(orchestration, &mut clusters).await;
        task_definition::inspect_task_definitions(orchestration, &mut clusters).await;

        debug!(
            clusters = clusters.len(),
            services = clusters.iter().map(|c| c.services.len()).sum::<usize>(),
            "collection cycle assembled"
        );

        clusters
    }
}
