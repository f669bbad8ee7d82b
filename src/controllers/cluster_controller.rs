//! Reconciliation loop for the KafkaCluster custom resource.
//!
//! Each pass converges the derived objects in a fixed order (ConfigMap,
//! workload, client Service, headless Service) and then recomputes the
//! status from observed pods. Convergence is fetch-then-update:
//! cluster-owned fields are copied from the live object so a replace never
//! fights the API server, and a replace is skipped entirely when the live
//! object already matches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Service};
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::finalizer::{finalizer, Event as FinalizerEvent};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::constants::{self, defaults, ports};
use crate::crds::{KafkaCluster, KafkaClusterStatus, UPDATING_CLUSTER_REASON};
use crate::error::{OperatorError, Result};
use crate::metrics;
use crate::resources::{
    common, configmap_builder, service_builder, statefulset_builder,
};

pub struct Context {
    pub client: Client,
}

/// Run the controller until the watch stream ends.
pub async fn run(client: Client) {
    let clusters: Api<KafkaCluster> = Api::all(client.clone());
    let context = Arc::new(Context {
        client: client.clone(),
    });

    info!("starting KafkaCluster controller");

    Controller::new(clusters, watcher::Config::default())
        .owns(
            Api::<StatefulSet>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<Service>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(
            Api::<ConfigMap>::all(client.clone()),
            watcher::Config::default(),
        )
        // Pods are owned by the StatefulSet, not the cluster, so readiness
        // changes are mapped back through the cluster label instead.
        .watches(
            Api::<Pod>::all(client.clone()),
            watcher::Config::default().labels(&format!(
                "{}={}",
                constants::labels::APP,
                constants::values::CLUSTER_SIGN
            )),
            |pod| {
                let namespace = pod.namespace()?;
                let cluster = pod.labels().get(constants::labels::CLUSTER)?.clone();
                Some(ObjectRef::new(&cluster).within(&namespace))
            },
        )
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(name = %object.name, "reconciled"),
                Err(err) => error!(%err, "reconciliation failed"),
            }
        })
        .await;
}

async fn reconcile(cluster: Arc<KafkaCluster>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());
    let api: Api<KafkaCluster> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, constants::FINALIZER, cluster, |event| async {
        match event {
            FinalizerEvent::Apply(cluster) => apply(cluster, ctx.clone()).await,
            FinalizerEvent::Cleanup(cluster) => cleanup(cluster, ctx.clone()).await,
        }
    })
    .await
    .map_err(|err| OperatorError::Finalizer(err.to_string()))
}

async fn apply(cluster: Arc<KafkaCluster>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());

    if cluster
        .status
        .as_ref()
        .map(|s| s.is_upgrade_failed())
        .unwrap_or(false)
    {
        warn!(%name, "cluster is marked upgrade-failed, holding off");
        metrics::record_reconciliation("upgrade_failed");
        return Ok(Action::requeue(Duration::from_secs(
            defaults::REQUEUE_UPGRADE_FAILED_SECS,
        )));
    }

    reconcile_config_map(&cluster, &ctx, &namespace).await?;
    reconcile_workload(&cluster, &ctx, &namespace).await?;
    reconcile_service(
        &cluster,
        &ctx,
        &namespace,
        service_builder::build_client_service(&cluster),
    )
    .await?;
    reconcile_service(
        &cluster,
        &ctx,
        &namespace,
        service_builder::build_headless_service(&cluster),
    )
    .await?;
    let ready = reconcile_status(&cluster, &ctx, &namespace).await?;

    metrics::record_reconciliation("apply");
    metrics::observe_reconcile_duration(start.elapsed().as_secs_f64());

    let requeue = if ready {
        defaults::REQUEUE_READY_SECS
    } else {
        defaults::REQUEUE_NOT_READY_SECS
    };
    Ok(Action::requeue(Duration::from_secs(requeue)))
}

/// Cleanup on deletion. Everything derived carries an owner reference, so
/// garbage collection handles the sub-resources.
async fn cleanup(cluster: Arc<KafkaCluster>, _ctx: Arc<Context>) -> Result<Action> {
    info!(name = %cluster.name_any(), "cluster deleted, owned resources are garbage-collected");
    Ok(Action::await_change())
}

fn error_policy(cluster: Arc<KafkaCluster>, err: &OperatorError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation("error");
    let backoff = if err.is_transient() { 5 } else { 60 };
    warn!(name = %cluster.name_any(), %err, backoff, "requeueing after error");
    Action::requeue(Duration::from_secs(backoff))
}

async fn reconcile_config_map(
    cluster: &KafkaCluster,
    ctx: &Context,
    namespace: &str,
) -> Result<()> {
    let desired = configmap_builder::build_config_map(cluster);
    let cm_name = desired.name_any();
    let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);

    match api.get_opt(&cm_name).await? {
        None => {
            info!(name = %cm_name, "creating ConfigMap");
            api.create(&PostParams::default(), &desired).await?;
        }
        Some(existing) if existing.data != desired.data => {
            info!(name = %cm_name, "updating ConfigMap");
            let mut updated = desired;
            updated.metadata.resource_version = existing.metadata.resource_version;
            api.replace(&cm_name, &PostParams::default(), &updated)
                .await?;
        }
        Some(_) => debug!(name = %cm_name, "ConfigMap up to date"),
    }
    Ok(())
}

/// The StatefulSet is created once and then left alone. Rolling config or
/// image changes into running brokers is the upgrade flow's job, not a
/// blind replace.
async fn reconcile_workload(cluster: &KafkaCluster, ctx: &Context, namespace: &str) -> Result<()> {
    let desired = statefulset_builder::build_stateful_set(cluster)?;
    let sts_name = desired.name_any();
    let api: Api<StatefulSet> = Api::namespaced(ctx.client.clone(), namespace);

    match api.get_opt(&sts_name).await? {
        None => {
            info!(name = %sts_name, "creating StatefulSet");
            api.create(&PostParams::default(), &desired).await?;
        }
        Some(_) => debug!(name = %sts_name, "StatefulSet exists, leaving it in place"),
    }
    Ok(())
}

async fn reconcile_service(
    cluster: &KafkaCluster,
    ctx: &Context,
    namespace: &str,
    desired: Service,
) -> Result<()> {
    let svc_name = desired.name_any();
    let api: Api<Service> = Api::namespaced(ctx.client.clone(), namespace);

    match api.get_opt(&svc_name).await? {
        None => {
            info!(name = %svc_name, cluster = %cluster.name_any(), "creating Service");
            api.create(&PostParams::default(), &desired).await?;
        }
        Some(existing) if service_needs_update(&existing, &desired) => {
            info!(name = %svc_name, "updating Service");
            let mut updated = desired;
            updated.metadata.resource_version = existing.metadata.resource_version;
            // ClusterIP is immutable once allocated.
            if let (Some(spec), Some(existing_spec)) = (updated.spec.as_mut(), existing.spec) {
                spec.cluster_ip = existing_spec.cluster_ip;
                spec.cluster_ips = existing_spec.cluster_ips;
            }
            api.replace(&svc_name, &PostParams::default(), &updated)
                .await?;
        }
        Some(_) => debug!(name = %svc_name, "Service up to date"),
    }
    Ok(())
}

/// A Service needs a replace only when the fields this controller owns
/// drift from the desired shape: named port numbers, selector, and type.
///
/// The comparison normalizes what admission fills in on the live object
/// (`type: ClusterIP`, `protocol: TCP`, `targetPort` mirroring `port`), so
/// a converged Service never reads as drifted.
fn service_needs_update(existing: &Service, desired: &Service) -> bool {
    let (Some(existing_spec), Some(desired_spec)) = (&existing.spec, &desired.spec) else {
        return true;
    };

    fn named_ports(spec: &k8s_openapi::api::core::v1::ServiceSpec) -> Vec<(Option<&str>, i32)> {
        spec.ports
            .iter()
            .flatten()
            .map(|p| (p.name.as_deref(), p.port))
            .collect()
    }
    fn service_type(spec: &k8s_openapi::api::core::v1::ServiceSpec) -> &str {
        spec.type_.as_deref().unwrap_or("ClusterIP")
    }

    named_ports(existing_spec) != named_ports(desired_spec)
        || existing_spec.selector != desired_spec.selector
        || service_type(existing_spec) != service_type(desired_spec)
}

/// Recompute status from observed pods and patch it if anything changed.
/// Returns whether the cluster is ready.
async fn reconcile_status(cluster: &KafkaCluster, ctx: &Context, namespace: &str) -> Result<bool> {
    let name = cluster.name_any();
    let api: Api<KafkaCluster> = Api::namespaced(ctx.client.clone(), namespace);

    // Work from the latest copy so the patch does not clobber a newer status.
    let latest = api.get(&name).await?;

    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), namespace);
    let params = ListParams::default().labels(&common::label_selector(&name));
    let pod_list = pods.list(&params).await?;

    let previous = latest.status.clone().unwrap_or_default();
    let status = desired_status(&latest, &pod_list.items);

    if status != previous {
        let patch = serde_json::json!({ "status": status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
    }
    Ok(status.is_ready())
}

/// Pure status computation: membership, readiness, endpoints, and version
/// tracking derived from the cluster spec and its observed pods.
fn desired_status(cluster: &KafkaCluster, pods: &[Pod]) -> KafkaClusterStatus {
    let mut status = cluster.status.clone().unwrap_or_default();
    status.init();

    let mut ready = Vec::new();
    let mut unready = Vec::new();
    for pod in pods {
        let pod_name = pod.name_any();
        if pod_is_ready(pod) {
            ready.push(pod_name);
        } else {
            unready.push(pod_name);
        }
    }
    ready.sort();
    unready.sort();

    let expected = cluster.spec.effective_replicas();
    status.replicas = expected;
    status.ready_replicas = ready.len() as i32;
    let all_ready = unready.is_empty() && ready.len() as i32 == expected;
    status.members = crate::crds::MembersStatus { ready, unready };
    status.set_pods_ready(all_ready);

    let service_host = common::full_service_name(cluster);
    status.internal_client_endpoint = format!("{service_host}:{}", ports::INTERNAL);
    status.external_client_endpoint = format!("{service_host}:{}", ports::EXTERNAL);

    let target = cluster.spec.resolved_image().tag;
    status.target_version = target.clone();

    if status.current_version.is_empty() {
        if all_ready {
            status.current_version = target;
        }
    } else if status.current_version != target {
        // Spec moved to a new version while the cluster runs an old one.
        // The upgrade completes once every member is ready again.
        if all_ready {
            status.clear_upgrading();
            status.current_version = target;
        } else {
            status.set_upgrading(
                UPDATING_CLUSTER_REASON,
                &format!("{}/{expected}", status.ready_replicas),
            );
        }
    } else if status.is_upgrading() {
        if all_ready {
            status.clear_upgrading();
        } else {
            status.update_progress(
                UPDATING_CLUSTER_REASON,
                &format!("{}/{expected}", status.ready_replicas),
            );
        }
    }

    status
}

fn pod_is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}
