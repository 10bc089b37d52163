//! Per-partner cache of known remote registries.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::governance::OdrlPolicy;

/// Connection facts for one remote registry, keyed by (partner, asset id).
/// A partner may be discoverable through more than one registry.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    pub connector_url: String,
    pub asset_id: String,
    /// Usage policies offered for the registry asset; used as the default
    /// negotiation policy set when the caller supplies none.
    pub policies: Vec<OdrlPolicy>,
}

/// Expiring cache of known registries per business partner.
///
/// A miss is not an error; it triggers the discovery fallback. Expired
/// entries behave exactly like misses and are evicted on access.
pub trait RegistryCache: Send + Sync {
    /// All live entries of a partner; empty on miss or expiry.
    fn get(&self, partner_bpn: &str) -> Vec<RegistryEntry>;

    /// One live entry by asset id.
    fn get_by_asset_id(&self, partner_bpn: &str, asset_id: &str) -> Option<RegistryEntry>;

    /// Insert or replace an entry; last write wins for the same
    /// (partner, asset id) pair and the partner's expiry window restarts.
    fn put(&self, partner_bpn: &str, entry: RegistryEntry);

    /// Drop one registry of a partner.
    fn remove(&self, partner_bpn: &str, asset_id: &str);

    /// Drop everything known about a partner.
    fn purge_partner(&self, partner_bpn: &str);

    /// Reset the cache.
    fn clear(&self);

    /// Number of live entries for a partner.
    fn len(&self, partner_bpn: &str) -> usize;

    fn is_empty(&self, partner_bpn: &str) -> bool {
        self.len(partner_bpn) == 0
    }
}

struct PartnerRegistries {
    expires_at: Instant,
    by_asset: HashMap<String, RegistryEntry>,
}

/// In-memory TTL implementation of [`RegistryCache`].
///
/// Expiry is evaluated lazily on access; a stale partner entry is removed
/// from storage, not merely ignored, so the map stays bounded.
pub struct InMemoryRegistryCache {
    ttl: Duration,
    partners: Mutex<HashMap<String, PartnerRegistries>>,
}

impl InMemoryRegistryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            partners: Mutex::new(HashMap::new()),
        }
    }

    /// Evict the partner when expired, then apply `f` to its live entries.
    fn with_live<T>(
        &self,
        partner_bpn: &str,
        f: impl FnOnce(Option<&PartnerRegistries>) -> T,
    ) -> T {
        let mut partners = self.partners.lock();
        let expired = partners
            .get(partner_bpn)
            .is_some_and(|p| p.expires_at <= Instant::now());
        if expired {
            partners.remove(partner_bpn);
            tracing::debug!(partner = partner_bpn, "evicted expired registry cache entry");
        }
        f(partners.get(partner_bpn))
    }
}

impl RegistryCache for InMemoryRegistryCache {
    fn get(&self, partner_bpn: &str) -> Vec<RegistryEntry> {
        self.with_live(partner_bpn, |p| {
            p.map(|p| p.by_asset.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn get_by_asset_id(&self, partner_bpn: &str, asset_id: &str) -> Option<RegistryEntry> {
        self.with_live(partner_bpn, |p| p.and_then(|p| p.by_asset.get(asset_id).cloned()))
    }

    fn put(&self, partner_bpn: &str, entry: RegistryEntry) {
        let mut partners = self.partners.lock();
        let expires_at = Instant::now() + self.ttl;
        let partner = partners
            .entry(partner_bpn.to_owned())
            .or_insert_with(|| PartnerRegistries {
                expires_at,
                by_asset: HashMap::new(),
            });
        partner.expires_at = expires_at;
        partner.by_asset.insert(entry.asset_id.clone(), entry);
    }

    fn remove(&self, partner_bpn: &str, asset_id: &str) {
        let mut partners = self.partners.lock();
        if let Some(partner) = partners.get_mut(partner_bpn) {
            partner.by_asset.remove(asset_id);
            if partner.by_asset.is_empty() {
                partners.remove(partner_bpn);
            }
        }
    }

    fn purge_partner(&self, partner_bpn: &str) {
        self.partners.lock().remove(partner_bpn);
    }

    fn clear(&self) {
        self.partners.lock().clear();
    }

    fn len(&self, partner_bpn: &str) -> usize {
        self.with_live(partner_bpn, |p| p.map_or(0, |p| p.by_asset.len()))
    }
}
