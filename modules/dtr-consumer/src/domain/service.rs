//! Discovery and negotiation orchestration.
//!
//! One discovery call walks `cache lookup → (miss) registry discovery →
//! registry access negotiation → registry query → per-asset negotiation →
//! submodel fetch`. The per-asset negotiation step is the only concurrency
//! point with ordering requirements: distinct assets negotiate in parallel
//! under a bounded pool, and each asset's fetches start as soon as its own
//! negotiation completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aas_core::{encode_id, AssetLink, ShellDescriptor, SubmodelDescriptor};
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::instrument;

use crate::config::ConsumerConfig;

use super::cache::{RegistryCache, RegistryEntry};
use super::discovery::{
    DiscoveredSubmodel, RegistryLookup, RegistryRef, SemanticIdKey, ShellDiscovery,
    ShellsDiscovery, SubmodelStatus, SubmodelsDiscovery,
};
use super::error::ConsumerError;
use super::governance::{Governance, OdrlPolicy};
use super::ports::{CatalogFilter, ConnectorClient, EndpointAccess};

/// Orchestrates registry discovery, caching and submodel retrieval for
/// remote business partners.
pub struct DtrDiscoveryService {
    connector: Arc<dyn ConnectorClient>,
    cache: Arc<dyn RegistryCache>,
    config: ConsumerConfig,
}

/// A submodel queued for retrieval after governance triage.
struct PendingFetch {
    submodel_id: String,
    asset_id: String,
    connector_url: String,
    href: String,
    policies: Vec<OdrlPolicy>,
}

/// All submodels riding on one distinct asset; negotiated exactly once.
struct AssetPlan {
    asset_id: String,
    connector_url: String,
    policies: Vec<OdrlPolicy>,
    submodels: Vec<(String, String)>,
}

type FetchResults = Vec<(String, Result<serde_json::Value, String>)>;

impl DtrDiscoveryService {
    pub fn new(
        connector: Arc<dyn ConnectorClient>,
        cache: Arc<dyn RegistryCache>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            connector,
            cache,
            config,
        }
    }

    /// Known registries of a partner, discovering and caching them on a
    /// cache miss. Expired cache entries count as misses.
    ///
    /// # Errors
    /// Propagates discovery-service failures. Individual catalog fetch
    /// failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn registries(&self, partner_bpn: &str) -> Result<Vec<RegistryEntry>, ConsumerError> {
        let cached = self.cache.get(partner_bpn);
        if !cached.is_empty() {
            tracing::debug!(count = cached.len(), "serving registries from cache");
            return Ok(cached);
        }

        tracing::info!("no cached registries, discovering");
        let connectors = self.connector.discover(partner_bpn).await?;
        if connectors.is_empty() {
            tracing::warn!("no connectors found for registry discovery");
            return Ok(Vec::new());
        }

        let filter = self.registry_filter();
        let catalogs: Vec<_> = stream::iter(connectors)
            .map(|connector_url| {
                let connector = self.connector.clone();
                let filter = filter.clone();
                let partner = partner_bpn.to_owned();
                async move {
                    let result = connector
                        .fetch_catalog(&partner, &connector_url, &filter)
                        .await;
                    (connector_url, result)
                }
            })
            .buffer_unordered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut found = Vec::new();
        for (connector_url, result) in catalogs {
            let datasets = match result {
                Ok(datasets) => datasets,
                Err(e) => {
                    tracing::warn!(connector = %connector_url, error = %e, "catalog fetch failed during registry discovery");
                    continue;
                }
            };
            for dataset in datasets {
                if dataset.dataset_type.as_deref() != Some(self.config.registry_type.as_str()) {
                    continue;
                }
                let entry = RegistryEntry {
                    connector_url: connector_url.clone(),
                    asset_id: dataset.asset_id,
                    policies: dataset.policies,
                };
                self.cache.put(partner_bpn, entry.clone());
                found.push(entry);
            }
        }
        tracing::info!(count = found.len(), "registry discovery complete");
        Ok(found)
    }

    /// Look up shells by asset link across all of the partner's registries.
    ///
    /// All query keys must match (conjunctive). A failing registry is
    /// reported in the per-registry outcomes, evicted from the cache, and
    /// does not abort the others.
    ///
    /// # Errors
    /// `NoRegistries` when the partner has no discoverable registry.
    #[instrument(skip(self, query, policies))]
    pub async fn discover_shells(
        &self,
        partner_bpn: &str,
        query: &[AssetLink],
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<ShellsDiscovery, ConsumerError> {
        let registries = self.registries(partner_bpn).await?;
        if registries.is_empty() {
            return Err(ConsumerError::no_registries(partner_bpn));
        }

        let mut shells = Vec::new();
        let mut lookups = Vec::new();
        for registry in registries {
            let registry_ref = RegistryRef {
                connector_url: registry.connector_url.clone(),
                asset_id: registry.asset_id.clone(),
            };
            match self
                .lookup_registry_shells(partner_bpn, &registry, query, policies)
                .await
            {
                Ok(found) => {
                    lookups.push(RegistryLookup {
                        registry: registry_ref,
                        shells_found: found.len(),
                        error: None,
                    });
                    shells.extend(found);
                }
                Err(e) => {
                    // An unreachable registry is dropped from the cache so
                    // the next call rediscovers instead of retrying a dead
                    // connection.
                    self.cache.remove(partner_bpn, &registry.asset_id);
                    lookups.push(RegistryLookup {
                        registry: registry_ref,
                        shells_found: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(ShellsDiscovery {
            shells,
            registries: lookups,
        })
    }

    /// Fetch one shell descriptor, trying each known registry until one
    /// serves it.
    ///
    /// # Errors
    /// `NoRegistries` or `ShellNotFound`.
    #[instrument(skip(self, policies))]
    pub async fn discover_shell(
        &self,
        partner_bpn: &str,
        shell_id: &str,
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<ShellDiscovery, ConsumerError> {
        let registries = self.registries(partner_bpn).await?;
        if registries.is_empty() {
            return Err(ConsumerError::no_registries(partner_bpn));
        }

        for registry in registries {
            match self
                .fetch_shell(partner_bpn, &registry, shell_id, policies)
                .await
            {
                Ok(shell) => {
                    return Ok(ShellDiscovery {
                        shell,
                        registry: RegistryRef {
                            connector_url: registry.connector_url,
                            asset_id: registry.asset_id,
                        },
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        connector = %registry.connector_url,
                        error = %e,
                        "registry did not serve the shell"
                    );
                }
            }
        }
        Err(ConsumerError::shell_not_found(partner_bpn, shell_id))
    }

    /// Discover a shell and retrieve its submodel payloads.
    ///
    /// Submodels are grouped by their underlying asset; each distinct asset
    /// is negotiated exactly once, in parallel, and a submodel's fetch
    /// starts as soon as its asset's negotiation completes. A submodel
    /// whose semantic id is ungoverned is reported `not_requested` and
    /// never attempted; negotiation and fetch failures are isolated per
    /// submodel. The optional deadline aborts in-flight work and reports
    /// the incomplete entries as errors.
    ///
    /// # Errors
    /// `NoRegistries` or `ShellNotFound`; per-submodel failures are data,
    /// not errors.
    #[instrument(skip(self, policies, governance))]
    pub async fn discover_submodels(
        &self,
        partner_bpn: &str,
        shell_id: &str,
        policies: Option<&[OdrlPolicy]>,
        governance: &Governance,
        deadline: Option<Duration>,
    ) -> Result<SubmodelsDiscovery, ConsumerError> {
        let discovered = self.discover_shell(partner_bpn, shell_id, policies).await?;
        let descriptors = discovered.shell.submodel_descriptors.unwrap_or_default();
        let submodels_found = descriptors.len();

        let (mut reports, pending) = triage_submodels(&descriptors, governance);
        let mut data = HashMap::new();
        self.run_asset_fan_out(partner_bpn, pending, deadline, &mut reports, &mut data)
            .await;

        Ok(SubmodelsDiscovery {
            submodels: reports,
            data,
            submodels_found,
            registry: discovered.registry,
        })
    }

    /// Direct-path variant of [`Self::discover_submodels`] using the
    /// registry's single-submodel endpoint when the submodel id is already
    /// known.
    ///
    /// # Errors
    /// `NoRegistries` or `SubmodelNotFound`.
    #[instrument(skip(self, policies, governance))]
    pub async fn discover_submodel(
        &self,
        partner_bpn: &str,
        shell_id: &str,
        submodel_id: &str,
        policies: Option<&[OdrlPolicy]>,
        governance: &Governance,
        deadline: Option<Duration>,
    ) -> Result<SubmodelsDiscovery, ConsumerError> {
        let registries = self.registries(partner_bpn).await?;
        if registries.is_empty() {
            return Err(ConsumerError::no_registries(partner_bpn));
        }

        for registry in registries {
            let descriptor = match self
                .fetch_submodel_descriptor(partner_bpn, &registry, shell_id, submodel_id, policies)
                .await
            {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::debug!(
                        connector = %registry.connector_url,
                        error = %e,
                        "registry did not serve the submodel"
                    );
                    continue;
                }
            };

            let (mut reports, pending) =
                triage_submodels(std::slice::from_ref(&descriptor), governance);
            let mut data = HashMap::new();
            self.run_asset_fan_out(partner_bpn, pending, deadline, &mut reports, &mut data)
                .await;

            return Ok(SubmodelsDiscovery {
                submodels: reports,
                data,
                submodels_found: 1,
                registry: RegistryRef {
                    connector_url: registry.connector_url,
                    asset_id: registry.asset_id,
                },
            });
        }
        Err(ConsumerError::submodel_not_found(partner_bpn, submodel_id))
    }

    /// Scan a shell's submodels and retrieve every one whose semantic-id
    /// set contains ALL requested keys. May match zero, one or many
    /// submodels; the count is reported either way.
    ///
    /// # Errors
    /// `Validation` for an empty key set; otherwise as
    /// [`Self::discover_submodels`].
    #[instrument(skip(self, policies, governance, semantic_ids))]
    pub async fn discover_submodel_by_semantic_ids(
        &self,
        partner_bpn: &str,
        shell_id: &str,
        policies: Option<&[OdrlPolicy]>,
        governance: &Governance,
        semantic_ids: &[SemanticIdKey],
        deadline: Option<Duration>,
    ) -> Result<SubmodelsDiscovery, ConsumerError> {
        if semantic_ids.is_empty() {
            return Err(ConsumerError::validation("no semantic ids to search for"));
        }

        let discovered = self.discover_shell(partner_bpn, shell_id, policies).await?;
        let descriptors = discovered.shell.submodel_descriptors.unwrap_or_default();
        let matching: Vec<SubmodelDescriptor> = descriptors
            .into_iter()
            .filter(|d| has_all_semantic_ids(d, semantic_ids))
            .collect();
        let submodels_found = matching.len();

        let (mut reports, pending) = triage_submodels(&matching, governance);
        let mut data = HashMap::new();
        self.run_asset_fan_out(partner_bpn, pending, deadline, &mut reports, &mut data)
            .await;

        Ok(SubmodelsDiscovery {
            submodels: reports,
            data,
            submodels_found,
            registry: discovered.registry,
        })
    }

    fn registry_filter(&self) -> CatalogFilter {
        CatalogFilter {
            key: self.config.registry_type_key.clone(),
            operator: self.config.registry_type_operator.clone(),
            value: self.config.registry_type.clone(),
        }
    }

    /// Negotiate access to a registry asset, falling back to the policies
    /// recorded with the cached entry when the caller supplies none.
    async fn negotiate_registry(
        &self,
        partner_bpn: &str,
        registry: &RegistryEntry,
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<EndpointAccess, ConsumerError> {
        let policies = match policies {
            Some(p) if !p.is_empty() => p,
            _ => registry.policies.as_slice(),
        };
        if policies.is_empty() {
            return Err(ConsumerError::validation(
                "no registry policies provided and none recorded with the cached entry",
            ));
        }
        self.connector
            .negotiate(
                partner_bpn,
                &registry.connector_url,
                &registry.asset_id,
                policies,
            )
            .await
    }

    async fn lookup_registry_shells(
        &self,
        partner_bpn: &str,
        registry: &RegistryEntry,
        query: &[AssetLink],
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<Vec<ShellDescriptor>, ConsumerError> {
        let access = self.negotiate_registry(partner_bpn, registry, policies).await?;
        let base = access.data_plane_url.trim_end_matches('/');

        let mut url = format!("{base}/lookup/shellsByAssetLink");
        if !query.is_empty() {
            let params: Vec<String> = query
                .iter()
                .map(|link| link.encode().map(|token| format!("assetIds={token}")))
                .collect::<Result<_, _>>()
                .map_err(|e| ConsumerError::validation(format!("unencodable asset link: {e}")))?;
            url = format!("{url}?{}", params.join("&"));
        }

        let response = self.connector.fetch_data(&url, &access.access_token).await?;
        let shell_ids = extract_result_ids(&response);
        tracing::debug!(found = shell_ids.len(), "asset link lookup answered");

        let shells: Vec<ShellDescriptor> = stream::iter(shell_ids)
            .map(|shell_id| {
                let connector = self.connector.clone();
                let base = access.data_plane_url.clone();
                let token = access.access_token.clone();
                async move {
                    let url = format!(
                        "{}/shell-descriptors/{}",
                        base.trim_end_matches('/'),
                        encode_id(&shell_id)
                    );
                    match connector.fetch_data(&url, &token).await {
                        Ok(value) => serde_json::from_value::<ShellDescriptor>(value).ok(),
                        Err(e) => {
                            tracing::debug!(shell = %shell_id, error = %e, "shell descriptor fetch failed");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.config.fetch_concurrency.max(1))
            .filter_map(|shell| async move { shell })
            .collect()
            .await;
        Ok(shells)
    }

    async fn fetch_shell(
        &self,
        partner_bpn: &str,
        registry: &RegistryEntry,
        shell_id: &str,
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<ShellDescriptor, ConsumerError> {
        let access = self.negotiate_registry(partner_bpn, registry, policies).await?;
        let url = format!(
            "{}/shell-descriptors/{}",
            access.data_plane_url.trim_end_matches('/'),
            encode_id(shell_id)
        );
        let value = self.connector.fetch_data(&url, &access.access_token).await?;
        serde_json::from_value(value)
            .map_err(|e| ConsumerError::connector(format!("malformed shell descriptor: {e}")))
    }

    async fn fetch_submodel_descriptor(
        &self,
        partner_bpn: &str,
        registry: &RegistryEntry,
        shell_id: &str,
        submodel_id: &str,
        policies: Option<&[OdrlPolicy]>,
    ) -> Result<SubmodelDescriptor, ConsumerError> {
        let access = self.negotiate_registry(partner_bpn, registry, policies).await?;
        let url = format!(
            "{}/shell-descriptors/{}/submodel-descriptors/{}",
            access.data_plane_url.trim_end_matches('/'),
            encode_id(shell_id),
            encode_id(submodel_id)
        );
        let value = self.connector.fetch_data(&url, &access.access_token).await?;
        serde_json::from_value(value)
            .map_err(|e| ConsumerError::connector(format!("malformed submodel descriptor: {e}")))
    }

    /// Negotiate each distinct asset once and fetch the dependent submodel
    /// payloads, recording outcomes per submodel id.
    async fn run_asset_fan_out(
        &self,
        partner_bpn: &str,
        pending: Vec<PendingFetch>,
        deadline: Option<Duration>,
        reports: &mut HashMap<String, DiscoveredSubmodel>,
        data: &mut HashMap<String, serde_json::Value>,
    ) {
        if pending.is_empty() {
            return;
        }

        let mut assets: HashMap<String, AssetPlan> = HashMap::new();
        for item in pending {
            let PendingFetch {
                submodel_id,
                asset_id,
                connector_url,
                href,
                policies,
            } = item;
            assets
                .entry(asset_id.clone())
                .or_insert_with(|| AssetPlan {
                    asset_id,
                    connector_url,
                    policies,
                    submodels: Vec::new(),
                })
                .submodels
                .push((submodel_id, href));
        }
        tracing::debug!(assets = assets.len(), "negotiating distinct assets");

        let deadline_at = deadline.map(|d| Instant::now() + d);
        let semaphore = Arc::new(Semaphore::new(self.config.negotiation_concurrency.max(1)));
        let mut tasks: JoinSet<(AssetPlan, Result<FetchResults, String>)> = JoinSet::new();

        for (_, plan) in assets {
            let connector = self.connector.clone();
            let semaphore = semaphore.clone();
            let partner = partner_bpn.to_owned();
            tasks.spawn(async move {
                let work = async {
                    let permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| "negotiation pool closed".to_owned())?;
                    let access = connector
                        .negotiate(&partner, &plan.connector_url, &plan.asset_id, &plan.policies)
                        .await
                        .map_err(|e| format!("asset negotiation failed: {e}"))?;
                    drop(permit);

                    let fetches = plan.submodels.iter().map(|(submodel_id, href)| {
                        let connector = connector.clone();
                        let token = access.access_token.clone();
                        let submodel_id = submodel_id.clone();
                        let href = href.clone();
                        async move {
                            let result = connector
                                .fetch_data(&href, &token)
                                .await
                                .map_err(|e| format!("data fetch failed: {e}"));
                            (submodel_id, result)
                        }
                    });
                    Ok(futures::future::join_all(fetches).await)
                };
                let outcome = match deadline_at {
                    Some(at) => tokio::time::timeout_at(at, work)
                        .await
                        .unwrap_or_else(|_| Err("deadline exceeded".to_owned())),
                    None => work.await,
                };
                (plan, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((plan, outcome)) = joined else {
                tracing::warn!("asset fan-out task did not complete");
                continue;
            };
            match outcome {
                Err(message) => {
                    for (submodel_id, _) in &plan.submodels {
                        if let Some(report) = reports.get_mut(submodel_id) {
                            report.status = SubmodelStatus::Error;
                            report.message = Some(message.clone());
                        }
                    }
                }
                Ok(results) => {
                    for (submodel_id, result) in results {
                        let Some(report) = reports.get_mut(&submodel_id) else {
                            continue;
                        };
                        match result {
                            Ok(value) => {
                                report.status = SubmodelStatus::Success;
                                report.message = None;
                                data.insert(submodel_id, value);
                            }
                            Err(message) => {
                                report.status = SubmodelStatus::Error;
                                report.message = Some(message);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Classify each submodel descriptor and queue the governed ones for
/// retrieval. Queued entries start out as errors ("processing was not
/// completed"); the fan-out overwrites them as results arrive.
fn triage_submodels(
    descriptors: &[SubmodelDescriptor],
    governance: &Governance,
) -> (HashMap<String, DiscoveredSubmodel>, Vec<PendingFetch>) {
    let mut reports = HashMap::new();
    let mut pending = Vec::new();
    for descriptor in descriptors {
        let (report, plan) = triage_submodel(descriptor, governance);
        if let Some(plan) = plan {
            pending.push(plan);
        }
        reports.insert(report.submodel_id.clone(), report);
    }
    (reports, pending)
}

fn triage_submodel(
    descriptor: &SubmodelDescriptor,
    governance: &Governance,
) -> (DiscoveredSubmodel, Option<PendingFetch>) {
    let semantic_id = descriptor.semantic_id_value().map(str::to_owned);
    let endpoint = descriptor.dataspace_endpoint();

    let mut report = DiscoveredSubmodel {
        submodel_id: descriptor.id.clone(),
        semantic_id: semantic_id.clone(),
        asset_id: endpoint.as_ref().map(|(body, _)| body.asset_id.clone()),
        connector_url: endpoint.as_ref().map(|(body, _)| body.dsp_endpoint.clone()),
        href: endpoint.as_ref().map(|(_, href)| href.clone()),
        status: SubmodelStatus::Error,
        message: None,
    };

    let Some(semantic_id) = semantic_id else {
        report.message = Some("no semantic id in submodel descriptor".to_owned());
        return (report, None);
    };
    let Some((body, href)) = endpoint else {
        report.message = Some("no dataspace endpoint in submodel descriptor".to_owned());
        return (report, None);
    };
    let Some(accepted) = governance.get(&semantic_id) else {
        report.status = SubmodelStatus::NotRequested;
        return (report, None);
    };

    report.message = Some("processing was not completed".to_owned());
    let plan = PendingFetch {
        submodel_id: descriptor.id.clone(),
        asset_id: body.asset_id,
        connector_url: body.dsp_endpoint,
        href,
        policies: accepted.clone(),
    };
    (report, Some(plan))
}

fn has_all_semantic_ids(descriptor: &SubmodelDescriptor, wanted: &[SemanticIdKey]) -> bool {
    let present = descriptor.semantic_id_keys();
    wanted
        .iter()
        .all(|k| present.iter().any(|(t, v)| *t == k.key_type && *v == k.value))
}

/// Shell-id lists arrive either as `{"result": [...]}` or as a bare array.
fn extract_result_ids(value: &serde_json::Value) -> Vec<String> {
    let array = value
        .get("result")
        .and_then(serde_json::Value::as_array)
        .or_else(|| value.as_array());
    array
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}
