//! Fleet reconciliation engine
//!
//! The FleetEngine is responsible for:
//! - Listing the tagged instances and diffing them against the desired users
//! - Provisioning the missing instances
//! - Waiting for new instances to get a public address
//! - Synchronizing the zone's A records with the instance addresses
//! - Tearing the whole fleet down by tag
//!
//! ## Architecture
//!
//! ```text
//!  desired users ──┐
//!                  ▼
//!          ┌──────────────┐  list / create / delete  ┌─────────────────┐
//!          │ FleetEngine  │─────────────────────────▶│ ComputeProvider │
//!          └──────────────┘                          └─────────────────┘
//!                  │          list / create / update  ┌─────────────────┐
//!                  ├─────────────────────────────────▶│   DnsProvider   │
//!                  │                                  └─────────────────┘
//!                  ▼
//!             RunReport
//! ```
//!
//! ## Setup Flow
//!
//! 1. List observed instances
//! 2. Diff against desired users
//! 3. Provision the missing users
//! 4. Poll until new instances are addressed (bounded)
//! 5. Re-list observed instances
//! 6. List zone A records
//! 7. Synchronize label and wildcard records per instance
//!
//! Every unit of work ends up in the [`RunReport`]. A failed listing ends
//! the stages that depend on it; nothing panics and nothing is retried.

use crate::config::FleetConfig;
use crate::diff::diff;
use crate::dns_sync::DnsSynchronizer;
use crate::error::Result;
use crate::identity::UserSpec;
use crate::provision::Provisioner;
use crate::rate_limit::RateLimitGuard;
use crate::report::{RunReport, Stage, UnitReport};
use crate::settle::SettleWatcher;
use crate::traits::{ComputeProvider, DnsProvider, DomainRecord, ObservedInstance, PayloadRenderer};
use tracing::{debug, error, info};

/// Core fleet engine
///
/// Runs one setup or teardown pass to completion. All provider calls are
/// awaited one after the other; the engine holds no state between runs.
pub struct FleetEngine {
    /// Compute provider for instances
    compute: Box<dyn ComputeProvider>,

    /// DNS provider for zone records
    dns: Box<dyn DnsProvider>,

    /// Bootstrap payload renderer
    renderer: Box<dyn PayloadRenderer>,

    /// Fleet configuration
    config: FleetConfig,

    /// Quota headroom guard, fed after every provider call
    guard: RateLimitGuard,

    /// Dry-run: build and log every mutation, send none
    dry_run: bool,
}

impl FleetEngine {
    /// Create a new fleet engine
    ///
    /// # Returns
    ///
    /// - `Ok(FleetEngine)`: Ready to run
    /// - `Err(Error::Config)`: If the configuration is invalid
    pub fn new(
        compute: Box<dyn ComputeProvider>,
        dns: Box<dyn DnsProvider>,
        renderer: Box<dyn PayloadRenderer>,
        config: FleetConfig,
        dry_run: bool,
    ) -> Result<Self> {
        config.validate()?;

        let guard = RateLimitGuard::new(config.rate_limit_threshold);

        Ok(Self {
            compute,
            dns,
            renderer,
            config,
            guard,
            dry_run,
        })
    }

    /// Run a setup pass for the desired `users`
    pub async fn setup(&self, users: &[UserSpec]) -> RunReport {
        let mut report = RunReport::start(self.dry_run);
        info!("Running workshop setup for {} user(s)", users.len());

        let Some(observed) = self.list_instances(&mut report).await else {
            return report.finish();
        };

        if !observed.is_empty() {
            info!("Found {} instance(s) already registered", observed.len());
        }

        let missing = diff(users, &observed);
        let mut fleet_changed = false;

        if missing.is_empty() {
            info!("All instances already created");
        } else {
            info!("{} user(s) don't have their instance", missing.len());

            let provisioner = Provisioner::new(
                self.compute.as_ref(),
                self.renderer.as_ref(),
                &self.config.instance,
                self.guard,
                self.dry_run,
            );
            let batch = provisioner.provision_all(&missing).await;
            report.extend(batch.units);

            if !batch.created.is_empty() {
                fleet_changed = true;
                info!("Waiting for instances to start up");
                let watcher = SettleWatcher::new(
                    self.compute.as_ref(),
                    &self.config.instance.tag,
                    &self.config.settle,
                    self.guard,
                );
                let settled = watcher.wait_for_addresses(&batch.created).await;
                report.extend(settled.to_unit_reports());
            }
        }

        let current = if fleet_changed {
            match self.list_instances(&mut report).await {
                Some(current) => current,
                None => return report.finish(),
            }
        } else {
            observed
        };

        let Some(records) = self.list_records(&mut report).await else {
            return report.finish();
        };

        let synchronizer = DnsSynchronizer::new(
            self.dns.as_ref(),
            &self.config.dns,
            self.guard,
            self.dry_run,
        );
        report.extend(synchronizer.sync(&current, records).await);

        report.finish()
    }

    /// Remove every instance carrying the fleet tag
    ///
    /// One bulk delete-by-tag request, no listing, no diffing.
    pub async fn teardown(&self) -> RunReport {
        let mut report = RunReport::start(self.dry_run);
        let tag = self.config.instance.tag.as_str();

        info!("Removing all instances with tag {:?}", tag);

        if self.dry_run {
            info!("Dry run: would delete all instances tagged {:?}", tag);
            report.push(UnitReport::skipped(Stage::Teardown, tag, "dry run"));
            return report.finish();
        }

        match self.compute.delete_instances_by_tag(tag).await {
            Ok(response) => {
                self.guard.check(response.quota.as_ref());
                report.push(UnitReport::success(Stage::Teardown, tag, "deleted by tag"));
            }
            Err(e) => {
                self.guard.check_error(&e);
                error!("Failed to delete instances tagged {:?}: {}", tag, e);
                report.push(UnitReport::failed(Stage::Teardown, tag, e));
            }
        }

        report.finish()
    }

    /// List the tagged instances, recording the outcome
    async fn list_instances(&self, report: &mut RunReport) -> Option<Vec<ObservedInstance>> {
        let tag = self.config.instance.tag.as_str();

        match self.compute.list_instances_by_tag(tag).await {
            Ok(response) => {
                self.guard.check(response.quota.as_ref());
                let instances = response.value;
                debug!("Listed {} instance(s) tagged {:?}", instances.len(), tag);
                report.push(UnitReport::success(
                    Stage::ListInstances,
                    tag,
                    format!("{} instance(s)", instances.len()),
                ));
                Some(instances)
            }
            Err(e) => {
                self.guard.check_error(&e);
                error!(
                    "Listing {} instances failed: {}",
                    self.compute.provider_name(),
                    e
                );
                report.push(UnitReport::failed(Stage::ListInstances, tag, e));
                None
            }
        }
    }

    /// List the zone's A records, recording the outcome
    async fn list_records(&self, report: &mut RunReport) -> Option<Vec<DomainRecord>> {
        let zone = self.config.dns.domain.as_str();

        match self.dns.list_records(zone, "A").await {
            Ok(response) => {
                self.guard.check(response.quota.as_ref());
                let records = response.value;
                debug!("Listed {} A record(s) in {}", records.len(), zone);
                report.push(UnitReport::success(
                    Stage::ListRecords,
                    zone,
                    format!("{} record(s)", records.len()),
                ));
                Some(records)
            }
            Err(e) => {
                self.guard.check_error(&e);
                error!("Listing records of {} failed: {}", zone, e);
                report.push(UnitReport::failed(Stage::ListRecords, zone, e));
                None
            }
        }
    }
}
