// Task definition inspector - queueing configuration from container env
//
// Only the representative (first) task definition of a service is
// described; all tasks of a service are assumed to share one
// configuration. Every container definition's environment is scanned and
// the last value seen per key wins.

use tracing::warn;

use crate::api::{OrchestrationApi, TaskDefinitionDescription};
use crate::model::{ClusterRecord, QueueConfig};

const REQUEST_TIMEOUT_KEY: &str = "MT_REQUEST_TIMEOUT";
const DEFAULT_WORKERS_KEY: &str = "TS_DEFAULT_WORKERS_PER_MODEL";
const QUEUE_SIZE_KEY: &str = "TS_JOB_QUEUE_SIZE";

/// Fills each service's queue configuration from its representative task
/// definition. Services without task definitions keep the zero defaults,
/// as does any service whose lookup or value parsing fails.
pub async fn inspect_task_definitions(
    api: &dyn OrchestrationApi,
    clusters: &mut [ClusterRecord],
) {
    for cluster in clusters.iter_mut() {
        for service in &mut cluster.services {
            let Some(task_definition) = service.representative_task_definition() else {
                continue;
            };
            let task_definition = task_definition.to_string();

            match api.describe_task_definition(&task_definition).await {
                Ok(description) => match parse_queue_config(&description) {
                    Ok(config) => service.queue_config = config,
                    Err(key) => {
                        warn!(
                            service = %service.service_name,
                            task_definition = %task_definition,
                            key,
                            "non-numeric queue configuration value, keeping defaults"
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        service = %service.service_name,
                        task_definition = %task_definition,
                        "task definition lookup failed: {e}"
                    );
                }
            }
        }
    }
}

/// Scans every container definition's environment for the three
/// recognized keys. Parsing is all-or-nothing: one non-numeric value
/// fails the whole inspection and the caller keeps the zero defaults.
fn parse_queue_config(
    description: &TaskDefinitionDescription,
) -> Result<QueueConfig, &'static str> {
    let mut timeout_raw: Option<&str> = None;
    let mut workers_raw: Option<&str> = None;
    let mut queue_raw: Option<&str> = None;

    for container in &description.containers {
        for variable in &container.environment {
            match variable.name.as_str() {
                REQUEST_TIMEOUT_KEY => timeout_raw = Some(&variable.value),
                DEFAULT_WORKERS_KEY => workers_raw = Some(&variable.value),
                QUEUE_SIZE_KEY => queue_raw = Some(&variable.value),
                _ => {}
            }
        }
    }

    Ok(QueueConfig {
        timeout_secs: parse_value(timeout_raw, REQUEST_TIMEOUT_KEY)?,
        default_workers_per_model: parse_value(workers_raw, DEFAULT_WORKERS_KEY)?,
        queue_size: parse_value(queue_raw, QUEUE_SIZE_KEY)?,
    })
}

fn parse_value(raw: Option<&str>, key: &'static str) -> Result<i64, &'static str> {
    match raw {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| key),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::api::mock::MockOrchestration;
    use crate::api::{ContainerSummary, EnvironmentVariable};
    use crate::model::ServiceRecord;

    fn env(name: &str, value: &str) -> EnvironmentVariable {
        EnvironmentVariable {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn definition_with(environment: Vec<EnvironmentVariable>) -> TaskDefinitionDescription {
        TaskDefinitionDescription {
            containers: vec![ContainerSummary { environment }],
        }
    }

    fn clusters_with_definitions(definitions: Vec<String>) -> Vec<ClusterRecord> {
        let mut cluster = ClusterRecord::new("arn:cluster/prod".to_string());
        cluster.services.push(ServiceRecord {
            service_name: "web".to_string(),
            task_definitions: definitions,
            ..Default::default()
        });
        vec![cluster]
    }

    #[tokio::test]
    async fn recognized_keys_are_parsed_into_the_record() {
        let mut api = MockOrchestration::default();
        api.task_definitions = HashMap::from([(
            "def-a".to_string(),
            definition_with(vec![
                env("MT_REQUEST_TIMEOUT", "30"),
                env("TS_DEFAULT_WORKERS_PER_MODEL", "4"),
                env("TS_JOB_QUEUE_SIZE", "100"),
                env("UNRELATED", "ignored"),
            ]),
        )]);

        let mut clusters = clusters_with_definitions(vec!["def-a".to_string()]);
        inspect_task_definitions(&api, &mut clusters).await;

        let config = &clusters[0].services[0].queue_config;
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.default_workers_per_model, 4);
        assert_eq!(config.queue_size, 100);
    }

    #[tokio::test]
    async fn last_matching_value_wins_across_containers() {
        let description = TaskDefinitionDescription {
            containers: vec![
                ContainerSummary {
                    environment: vec![env("TS_JOB_QUEUE_SIZE", "5")],
                },
                ContainerSummary {
                    environment: vec![env("TS_JOB_QUEUE_SIZE", "9")],
                },
            ],
        };

        let config = parse_queue_config(&description).unwrap();
        assert_eq!(config.queue_size, 9);
    }

    #[tokio::test]
    async fn non_numeric_value_fails_the_whole_inspection() {
        let mut api = MockOrchestration::default();
        api.task_definitions = HashMap::from([(
            "def-a".to_string(),
            definition_with(vec![
                env("MT_REQUEST_TIMEOUT", "30"),
                env("TS_JOB_QUEUE_SIZE", "not-a-number"),
            ]),
        )]);

        let mut clusters = clusters_with_definitions(vec!["def-a".to_string()]);
        inspect_task_definitions(&api, &mut clusters).await;

        // All three keep their defaults, including the one that parsed.
        assert_eq!(clusters[0].services[0].queue_config, QueueConfig::default());
    }

    #[tokio::test]
    async fn only_the_first_definition_is_described() {
        let mut api = MockOrchestration::default();
        api.task_definitions = HashMap::from([
            (
                "def-first".to_string(),
                definition_with(vec![env("TS_JOB_QUEUE_SIZE", "7")]),
            ),
            (
                "def-second".to_string(),
                definition_with(vec![env("TS_JOB_QUEUE_SIZE", "99")]),
            ),
        ]);

        let mut clusters =
            clusters_with_definitions(vec!["def-first".to_string(), "def-second".to_string()]);
        inspect_task_definitions(&api, &mut clusters).await;

        assert_eq!(clusters[0].services[0].queue_config.queue_size, 7);
    }

    #[tokio::test]
    async fn absent_keys_stay_at_zero() {
        let mut api = MockOrchestration::default();
        api.task_definitions = HashMap::from([(
            "def-a".to_string(),
            definition_with(vec![env("TS_JOB_QUEUE_SIZE", "12")]),
        )]);

        let mut clusters = clusters_with_definitions(vec!["def-a".to_string()]);
        inspect_task_definitions(&api, &mut clusters).await;

        let config = &clusters[0].services[0].queue_config;
        assert_eq!(config.timeout_secs, 0);
        assert_eq!(config.default_workers_per_model, 0);
        assert_eq!(config.queue_size, 12);
    }

    #[tokio::test]
    async fn lookup_failure_keeps_defaults() {
        let mut api = MockOrchestration::default();
        api.fail.insert("DescribeTaskDefinition");

        let mut clusters = clusters_with_definitions(vec!["def-a".to_string()]);
        inspect_task_definitions(&api, &mut clusters).await;

        assert_eq!(clusters[0].services[0].queue_config, QueueConfig::default());
    }
}
