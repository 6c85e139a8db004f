//! Waiting for new instances to get an address
//!
//! Freshly created instances have no public address yet. Instead of a fixed
//! sleep, the watcher re-lists the tagged instances on an interval and
//! tracks every watched name through a small state machine:
//!
//! ```text
//!  Provisioning ──(address seen)──▶ Addressed
//!       │
//!       └──────(deadline hit)─────▶ TimedOut
//! ```
//!
//! `Addressed` and `TimedOut` are terminal.

use crate::config::SettleConfig;
use crate::rate_limit::RateLimitGuard;
use crate::report::{Stage, UnitReport};
use crate::traits::{ComputeProvider, ObservedInstance};
use std::collections::BTreeMap;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Settle state of one watched instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleState {
    /// Created, no public address seen yet
    Provisioning,
    /// A public address was observed
    Addressed(String),
    /// The deadline elapsed before an address was observed
    TimedOut,
}

impl SettleState {
    /// Advance with the latest observation of the instance
    pub fn observe(self, instance: Option<&ObservedInstance>) -> Self {
        match self {
            SettleState::Provisioning => match instance.and_then(|i| i.public_address.clone()) {
                Some(address) => SettleState::Addressed(address),
                None => SettleState::Provisioning,
            },
            terminal => terminal,
        }
    }

    /// Advance once the deadline has elapsed
    pub fn expire(self) -> Self {
        match self {
            SettleState::Provisioning => SettleState::TimedOut,
            terminal => terminal,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SettleState::Provisioning)
    }
}

/// Final states of every watched instance
#[derive(Debug, Clone, Default)]
pub struct SettleResult {
    pub states: BTreeMap<String, SettleState>,
    /// Number of listings performed
    pub polls: usize,
}

impl SettleResult {
    /// `true` if every watched instance got an address
    pub fn all_addressed(&self) -> bool {
        self.states
            .values()
            .all(|s| matches!(s, SettleState::Addressed(_)))
    }

    /// Convert into report entries, one per watched instance
    pub fn to_unit_reports(&self) -> Vec<UnitReport> {
        self.states
            .iter()
            .map(|(name, state)| match state {
                SettleState::Addressed(address) => {
                    UnitReport::success(Stage::Settle, name, format!("addressed at {}", address))
                }
                SettleState::TimedOut => UnitReport::failed(
                    Stage::Settle,
                    name,
                    "timed out waiting for a public address",
                ),
                SettleState::Provisioning => {
                    UnitReport::skipped(Stage::Settle, name, "still provisioning")
                }
            })
            .collect()
    }
}

/// Polls the compute provider until watched instances are addressed
pub struct SettleWatcher<'a> {
    compute: &'a dyn ComputeProvider,
    tag: &'a str,
    config: &'a SettleConfig,
    guard: RateLimitGuard,
}

impl<'a> SettleWatcher<'a> {
    pub fn new(
        compute: &'a dyn ComputeProvider,
        tag: &'a str,
        config: &'a SettleConfig,
        guard: RateLimitGuard,
    ) -> Self {
        Self {
            compute,
            tag,
            config,
            guard,
        }
    }

    /// Wait until every instance in `names` has a public address or the
    /// deadline elapses
    ///
    /// A failed listing is logged and polling continues.
    pub async fn wait_for_addresses(&self, names: &[String]) -> SettleResult {
        let mut result = SettleResult {
            states: names
                .iter()
                .map(|n| (n.clone(), SettleState::Provisioning))
                .collect(),
            polls: 0,
        };

        if names.is_empty() {
            return result;
        }

        info!(
            "Waiting up to {:?} for {} instance(s) to get an address",
            self.config.deadline(),
            names.len()
        );

        let started = Instant::now();

        loop {
            result.polls += 1;
            match self.compute.list_instances_by_tag(self.tag).await {
                Ok(response) => {
                    self.guard.check(response.quota.as_ref());
                    let observed: BTreeMap<&str, &ObservedInstance> = response
                        .value
                        .iter()
                        .map(|i| (i.name.as_str(), i))
                        .collect();

                    for (name, state) in result.states.iter_mut() {
                        let current = std::mem::replace(state, SettleState::Provisioning);
                        *state = current.observe(observed.get(name.as_str()).copied());
                    }
                }
                Err(e) => {
                    self.guard.check_error(&e);
                    warn!("Listing instances while settling failed: {}", e);
                }
            }

            let pending = result.states.values().filter(|s| s.is_pending()).count();
            if pending == 0 {
                info!("All new instances have an address after {} poll(s)", result.polls);
                break;
            }

            if started.elapsed() + self.config.poll_interval() > self.config.deadline() {
                warn!("{} instance(s) still without address at deadline", pending);
                for state in result.states.values_mut() {
                    let current = std::mem::replace(state, SettleState::Provisioning);
                    *state = current.expire();
                }
                break;
            }

            debug!("{} instance(s) pending, polling again", pending);
            sleep(self.config.poll_interval()).await;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Outcome;
    use crate::traits::{CreateInstanceRequest, ProviderResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a scripted sequence of listings; the last one repeats
    struct ScriptedCompute {
        listings: Mutex<Vec<crate::Result<Vec<ObservedInstance>>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedCompute {
        fn new(listings: Vec<crate::Result<Vec<ObservedInstance>>>) -> Self {
            Self {
                listings: Mutex::new(listings),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ComputeProvider for ScriptedCompute {
        async fn list_instances_by_tag(
            &self,
            _tag: &str,
        ) -> crate::Result<ProviderResponse<Vec<ObservedInstance>>> {
            *self.calls.lock().unwrap() += 1;
            let mut listings = self.listings.lock().unwrap();
            let next = if listings.len() > 1 {
                listings.remove(0)
            } else {
                match &listings[0] {
                    Ok(v) => Ok(v.clone()),
                    Err(e) => Err(crate::Error::compute(e.to_string())),
                }
            };
            next.map(ProviderResponse::without_quota)
        }

        async fn create_instance(
            &self,
            _request: &CreateInstanceRequest,
        ) -> crate::Result<ProviderResponse<ObservedInstance>> {
            unreachable!("settle never creates")
        }

        async fn delete_instances_by_tag(&self, _tag: &str) -> crate::Result<ProviderResponse<()>> {
            unreachable!("settle never deletes")
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn instance(name: &str, address: Option<&str>) -> ObservedInstance {
        ObservedInstance {
            id: name.to_string(),
            name: name.to_string(),
            public_address: address.map(str::to_string),
            tags: vec!["nice-workshop".to_string()],
            status: if address.is_some() { "active" } else { "new" }.to_string(),
        }
    }

    fn fast_config(deadline_ms: u64) -> SettleConfig {
        SettleConfig {
            poll_interval_ms: 1,
            deadline_ms,
        }
    }

    #[test]
    fn state_machine_transitions() {
        let addressed = instance("a", Some("10.0.0.1"));
        let pending = instance("a", None);

        assert_eq!(
            SettleState::Provisioning.observe(Some(&pending)),
            SettleState::Provisioning
        );
        assert_eq!(
            SettleState::Provisioning.observe(Some(&addressed)),
            SettleState::Addressed("10.0.0.1".to_string())
        );
        assert_eq!(SettleState::Provisioning.expire(), SettleState::TimedOut);
        assert_eq!(
            SettleState::Addressed("10.0.0.1".to_string()).expire(),
            SettleState::Addressed("10.0.0.1".to_string())
        );
        assert_eq!(
            SettleState::TimedOut.observe(Some(&addressed)),
            SettleState::TimedOut
        );
    }

    #[tokio::test]
    async fn stops_once_everything_is_addressed() {
        let compute = ScriptedCompute::new(vec![
            Ok(vec![instance("a", None), instance("b", None)]),
            Ok(vec![instance("a", Some("10.0.0.1")), instance("b", None)]),
            Ok(vec![instance("a", Some("10.0.0.1")), instance("b", Some("10.0.0.2"))]),
        ]);
        let config = fast_config(10_000);
        let watcher = SettleWatcher::new(&compute, "nice-workshop", &config, RateLimitGuard::new(0));

        let result = watcher
            .wait_for_addresses(&["a".to_string(), "b".to_string()])
            .await;

        assert!(result.all_addressed());
        assert_eq!(result.polls, 3);
        assert_eq!(*compute.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn times_out_and_reports_failure() {
        let compute = ScriptedCompute::new(vec![Ok(vec![instance("a", None)])]);
        let config = fast_config(20);
        let watcher = SettleWatcher::new(&compute, "nice-workshop", &config, RateLimitGuard::new(0));

        let result = watcher.wait_for_addresses(&["a".to_string()]).await;

        assert_eq!(result.states["a"], SettleState::TimedOut);
        let units = result.to_unit_reports();
        assert!(matches!(units[0].outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn listing_errors_keep_polling() {
        let compute = ScriptedCompute::new(vec![
            Err(crate::Error::compute("503")),
            Ok(vec![instance("a", Some("10.0.0.1"))]),
        ]);
        let config = fast_config(10_000);
        let watcher = SettleWatcher::new(&compute, "nice-workshop", &config, RateLimitGuard::new(0));

        let result = watcher.wait_for_addresses(&["a".to_string()]).await;

        assert!(result.all_addressed());
        assert_eq!(result.polls, 2);
    }

    #[tokio::test]
    async fn nothing_to_watch_means_no_listing() {
        let compute = ScriptedCompute::new(vec![Ok(Vec::new())]);
        let config = fast_config(10_000);
        let watcher = SettleWatcher::new(&compute, "nice-workshop", &config, RateLimitGuard::new(0));

        let result = watcher.wait_for_addresses(&[]).await;

        assert_eq!(result.polls, 0);
        assert_eq!(*compute.calls.lock().unwrap(), 0);
    }
}
