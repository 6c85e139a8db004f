//! DNS synchronization
//!
//! Every addressed instance owns two A records in the zone: its bare label
//! and the wildcard below it. For each of them the synchronizer decides
//! between create, update-in-place (by record ID) and no-op, then applies
//! the mutating decisions one by one. Running it twice against unchanged
//! provider state issues no mutating call the second time.
//!
//! The zone is expected to hold at most one A record per label. Labels that
//! hold more are reported as conflicts and left untouched.

use crate::config::DnsConfig;
use crate::identity::{label_for, wildcard_label};
use crate::rate_limit::RateLimitGuard;
use crate::report::{Stage, UnitReport};
use crate::traits::{DnsProvider, DomainRecord, NewRecord, ObservedInstance};
use std::collections::{HashMap, HashSet};
use tracing::{error, info, warn};

/// A records of a zone, keyed by label
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    records: HashMap<String, DomainRecord>,
    /// Labels held by more than one A record, with their record count
    conflicts: HashMap<String, usize>,
}

impl ZoneIndex {
    /// Index the A records of a zone listing
    ///
    /// Records of other types are ignored.
    pub fn from_records(records: impl IntoIterator<Item = DomainRecord>) -> Self {
        let mut index = Self::default();

        for record in records {
            if !record.record_type.eq_ignore_ascii_case("A") {
                continue;
            }

            if let Some(count) = index.conflicts.get_mut(&record.name) {
                *count += 1;
            } else if index.records.contains_key(&record.name) {
                index.records.remove(&record.name);
                index.conflicts.insert(record.name, 2);
            } else {
                index.records.insert(record.name.clone(), record);
            }
        }

        for (label, count) in &index.conflicts {
            warn!("Zone holds {} A records for label {}", count, label);
        }

        index
    }

    pub fn get(&self, label: &str) -> Option<&DomainRecord> {
        self.records.get(label)
    }

    /// Number of records for `label` if it is duplicated
    pub fn conflict(&self, label: &str) -> Option<usize> {
        self.conflicts.get(label).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.conflicts.is_empty()
    }
}

/// What to do with one label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// No record for the label: create one
    Create { label: String, ip: String },
    /// Record exists with other data: rewrite it in place
    Update {
        label: String,
        record_id: String,
        old_ip: String,
        new_ip: String,
    },
    /// Record already points at the address
    NoOp { label: String, ip: String },
    /// Label is held by several records; leave it alone
    Conflict { label: String, count: usize },
}

impl SyncDecision {
    pub fn label(&self) -> &str {
        match self {
            SyncDecision::Create { label, .. }
            | SyncDecision::Update { label, .. }
            | SyncDecision::NoOp { label, .. }
            | SyncDecision::Conflict { label, .. } => label,
        }
    }

    /// Whether applying this decision calls the provider
    pub fn is_mutating(&self) -> bool {
        matches!(self, SyncDecision::Create { .. } | SyncDecision::Update { .. })
    }
}

/// Decide the fate of one label
pub fn decide(label: &str, ip: &str, index: &ZoneIndex) -> SyncDecision {
    if let Some(count) = index.conflict(label) {
        return SyncDecision::Conflict {
            label: label.to_string(),
            count,
        };
    }

    match index.get(label) {
        None => SyncDecision::Create {
            label: label.to_string(),
            ip: ip.to_string(),
        },
        Some(record) if record.data == ip => SyncDecision::NoOp {
            label: label.to_string(),
            ip: ip.to_string(),
        },
        Some(record) => SyncDecision::Update {
            label: label.to_string(),
            record_id: record.id.clone(),
            old_ip: record.data.clone(),
            new_ip: ip.to_string(),
        },
    }
}

/// Decisions for a set of instances
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Two decisions (label, wildcard) per addressed instance
    pub decisions: Vec<SyncDecision>,
    /// Instances without a public address
    pub skipped: Vec<UnitReport>,
}

impl SyncPlan {
    pub fn mutating(&self) -> impl Iterator<Item = &SyncDecision> {
        self.decisions.iter().filter(|d| d.is_mutating())
    }
}

/// Plan the records of `instances` against the indexed zone
///
/// A label is decided at most once per pass. When several instances map to
/// the same label, the first one listed owns it and the others are skipped,
/// so a single pass never writes two A records for one name.
pub fn plan(instances: &[ObservedInstance], index: &ZoneIndex, domain: &str) -> SyncPlan {
    let mut plan = SyncPlan::default();
    let mut claimed: HashSet<String> = HashSet::new();

    for instance in instances {
        let Some(address) = instance.public_address.as_deref() else {
            warn!("Missing public IPv4 address for instance {}", instance.name);
            plan.skipped.push(UnitReport::skipped(
                Stage::DnsSync,
                instance.name.as_str(),
                "no public address",
            ));
            continue;
        };

        let label = label_for(&instance.name, domain);
        if !claimed.insert(label.clone()) {
            warn!(
                "Instance {} ({}) maps to label {} already claimed in this pass",
                instance.name, instance.id, label
            );
            plan.skipped.push(UnitReport::skipped(
                Stage::DnsSync,
                instance.name.as_str(),
                format!("label {} already claimed by another instance", label),
            ));
            continue;
        }
        let wildcard = wildcard_label(&label);

        plan.decisions.push(decide(&label, address, index));
        plan.decisions.push(decide(&wildcard, address, index));
    }

    plan
}

/// Applies DNS sync decisions through a [`DnsProvider`]
pub struct DnsSynchronizer<'a> {
    dns: &'a dyn DnsProvider,
    config: &'a DnsConfig,
    guard: RateLimitGuard,
    dry_run: bool,
}

impl<'a> DnsSynchronizer<'a> {
    pub fn new(
        dns: &'a dyn DnsProvider,
        config: &'a DnsConfig,
        guard: RateLimitGuard,
        dry_run: bool,
    ) -> Self {
        Self {
            dns,
            config,
            guard,
            dry_run,
        }
    }

    /// Synchronize the records of `instances` with a zone listing
    ///
    /// Returns one report entry per label (plus one per skipped instance).
    /// A failed record does not stop the others.
    pub async fn sync(
        &self,
        instances: &[ObservedInstance],
        records: Vec<DomainRecord>,
    ) -> Vec<UnitReport> {
        let index = ZoneIndex::from_records(records);
        let plan = plan(instances, &index, &self.config.domain);

        let mut units = plan.skipped;
        for decision in &plan.decisions {
            units.push(self.apply(decision).await);
        }
        units
    }

    /// Apply one decision
    pub async fn apply(&self, decision: &SyncDecision) -> UnitReport {
        let zone = self.config.domain.as_str();
        let label = decision.label();

        match decision {
            SyncDecision::NoOp { ip, .. } => {
                info!("No domain change {}", label);
                UnitReport::success(Stage::DnsSync, label, format!("unchanged ({})", ip))
            }
            SyncDecision::Conflict { count, .. } => UnitReport::failed(
                Stage::DnsSync,
                label,
                format!("{} A records share this label, not touching them", count),
            ),
            _ if self.dry_run => {
                info!("Dry run: would apply {:?}", decision);
                UnitReport::skipped(Stage::DnsSync, label, format!("dry run: {:?}", decision))
            }
            SyncDecision::Create { ip, .. } => {
                let record = NewRecord::a(label, ip.as_str(), self.config.ttl);
                match self.dns.create_record(zone, &record).await {
                    Ok(response) => {
                        self.guard.check(response.quota.as_ref());
                        info!("Created domain {} {}", label, ip);
                        UnitReport::success(Stage::DnsSync, label, format!("created -> {}", ip))
                    }
                    Err(e) => {
                        self.guard.check_error(&e);
                        error!("Failed to create domain record {}: {}", label, e);
                        UnitReport::failed(Stage::DnsSync, label, e)
                    }
                }
            }
            SyncDecision::Update {
                record_id,
                old_ip,
                new_ip,
                ..
            } => match self.dns.update_record(zone, record_id, new_ip).await {
                Ok(response) => {
                    self.guard.check(response.quota.as_ref());
                    info!("Changed domain record for {} {} -> {}", label, old_ip, new_ip);
                    UnitReport::success(
                        Stage::DnsSync,
                        label,
                        format!("updated {} -> {}", old_ip, new_ip),
                    )
                }
                Err(e) => {
                    self.guard.check_error(&e);
                    error!("Failed to update domain record {}: {}", label, e);
                    UnitReport::failed(Stage::DnsSync, label, e)
                }
            },
        }
    }
}
