//! Test doubles and common utilities for engine contract tests
//!
//! The mocks keep their state behind `Arc`s so a test can hand a clone to the
//! engine and keep another to inspect calls afterwards.

#![allow(dead_code)]

use fleet_core::config::{FleetConfig, SettleConfig};
use fleet_core::error::{Error, Result};
use fleet_core::identity::UserSpec;
use fleet_core::traits::{
    ComputeProvider, CreateInstanceRequest, DnsProvider, DomainRecord, NewRecord,
    ObservedInstance, PayloadRenderer, ProviderResponse, RateQuota,
};
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub const DOMAIN: &str = "encero.xyz";
pub const TAG: &str = "nice-workshop";

/// Warning the rate-limit guard logs when headroom runs low
pub const QUOTA_WARNING: &str = "Reaching provider request limit";

/// Quota reported by the mocks; plenty of headroom unless set otherwise
fn quota(remaining: &Mutex<Option<u64>>) -> Option<RateQuota> {
    Some(RateQuota {
        limit: 5000,
        remaining: remaining.lock().unwrap().unwrap_or(4999),
        reset: Some(1_700_000_060),
    })
}

/// An in-memory compute provider that tracks calls
///
/// Created instances have no address until the next listing, which
/// assigns `10.0.0.<n>` to them (unless `never_address` was called).
#[derive(Clone, Default)]
pub struct MockCompute {
    instances: Arc<Mutex<Vec<ObservedInstance>>>,
    requests: Arc<Mutex<Vec<CreateInstanceRequest>>>,
    list_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    delete_call_count: Arc<AtomicUsize>,
    fail_listing: Arc<Mutex<bool>>,
    rate_limit_listing: Arc<Mutex<bool>>,
    never_address: Arc<Mutex<bool>>,
    remaining: Arc<Mutex<Option<u64>>>,
    fail_create_for: Arc<Mutex<HashSet<String>>>,
}

impl MockCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with running instances
    pub fn with_instances(instances: Vec<ObservedInstance>) -> Self {
        let mock = Self::default();
        *mock.instances.lock().unwrap() = instances;
        mock
    }

    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    /// Refuse listings with HTTP 429, exhausted quota attached
    pub fn rate_limit_listing(&self) {
        *self.rate_limit_listing.lock().unwrap() = true;
    }

    /// Created instances stay without a public address forever
    pub fn never_address(&self) {
        *self.never_address.lock().unwrap() = true;
    }

    /// Report `remaining` calls left on every successful response
    pub fn set_remaining(&self, remaining: u64) {
        *self.remaining.lock().unwrap() = Some(remaining);
    }

    pub fn fail_create_for(&self, name: &str) {
        self.fail_create_for.lock().unwrap().insert(name.to_string());
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CreateInstanceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn instance_names(&self) -> Vec<String> {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl ComputeProvider for MockCompute {
    async fn list_instances_by_tag(
        &self,
        tag: &str,
    ) -> Result<ProviderResponse<Vec<ObservedInstance>>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if *self.fail_listing.lock().unwrap() {
            return Err(Error::compute("503 Service Unavailable"));
        }

        if *self.rate_limit_listing.lock().unwrap() {
            let exhausted = RateQuota {
                limit: 5000,
                remaining: 0,
                reset: Some(1_700_000_060),
            };
            return Err(Error::rate_limited("list droplets: 429", Some(exhausted)));
        }

        let mut instances = self.instances.lock().unwrap();
        if !*self.never_address.lock().unwrap() {
            for (n, instance) in instances.iter_mut().enumerate() {
                if instance.public_address.is_none() {
                    instance.public_address = Some(format!("10.0.0.{}", n + 1));
                    instance.status = "active".to_string();
                }
            }
        }

        let tagged = instances.iter().filter(|i| i.has_tag(tag)).cloned().collect();
        Ok(ProviderResponse::new(tagged, quota(&self.remaining)))
    }

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<ProviderResponse<ObservedInstance>> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_create_for.lock().unwrap().contains(&request.name) {
            return Err(Error::provider("mock", "422 Unprocessable Entity"));
        }

        let mut instances = self.instances.lock().unwrap();
        let instance = ObservedInstance {
            id: format!("{}", instances.len() + 1000),
            name: request.name.clone(),
            public_address: None,
            tags: request.tags.clone(),
            status: "new".to_string(),
        };
        instances.push(instance.clone());

        Ok(ProviderResponse::new(instance, quota(&self.remaining)))
    }

    async fn delete_instances_by_tag(&self, tag: &str) -> Result<ProviderResponse<()>> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.instances.lock().unwrap().retain(|i| !i.has_tag(tag));
        Ok(ProviderResponse::new((), quota(&self.remaining)))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An in-memory DNS zone that tracks calls
#[derive(Clone, Default)]
pub struct MockDns {
    records: Arc<Mutex<Vec<DomainRecord>>>,
    next_id: Arc<AtomicUsize>,
    list_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    fail_listing: Arc<Mutex<bool>>,
    fail_labels: Arc<Mutex<HashSet<String>>>,
    remaining: Arc<Mutex<Option<u64>>>,
}

impl MockDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DomainRecord>) -> Self {
        let mock = Self::default();
        mock.next_id.store(records.len() + 100, Ordering::SeqCst);
        *mock.records.lock().unwrap() = records;
        mock
    }

    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    /// Report `remaining` calls left on every successful response
    pub fn set_remaining(&self, remaining: u64) {
        *self.remaining.lock().unwrap() = Some(remaining);
    }

    /// Make create/update calls for `label` fail
    pub fn fail_label(&self, label: &str) {
        self.fail_labels.lock().unwrap().insert(label.to_string());
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    pub fn mutating_call_count(&self) -> usize {
        self.create_call_count() + self.update_call_count()
    }

    pub fn records(&self) -> Vec<DomainRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Data of the single record named `label`
    pub fn data_of(&self, label: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == label)
            .map(|r| r.data.clone())
    }

    fn check_label(&self, label: &str) -> Result<()> {
        if self.fail_labels.lock().unwrap().contains(label) {
            return Err(Error::dns(format!("500 Internal Server Error for {}", label)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDns {
    async fn list_records(
        &self,
        _zone: &str,
        record_type: &str,
    ) -> Result<ProviderResponse<Vec<DomainRecord>>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if *self.fail_listing.lock().unwrap() {
            return Err(Error::dns("503 Service Unavailable"));
        }

        let records = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect();
        Ok(ProviderResponse::new(records, quota(&self.remaining)))
    }

    async fn create_record(
        &self,
        _zone: &str,
        record: &NewRecord,
    ) -> Result<ProviderResponse<DomainRecord>> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_label(&record.name)?;

        let created = DomainRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            data: record.data.clone(),
            ttl: Some(record.ttl),
        };
        self.records.lock().unwrap().push(created.clone());

        Ok(ProviderResponse::new(created, quota(&self.remaining)))
    }

    async fn update_record(
        &self,
        _zone: &str,
        record_id: &str,
        data: &str,
    ) -> Result<ProviderResponse<DomainRecord>> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;

        self.check_label(&record.name)?;
        record.data = data.to_string();

        Ok(ProviderResponse::new(record.clone(), quota(&self.remaining)))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Collects formatted log lines of the current thread
///
/// Tokio tests run on a current-thread runtime, so a thread-local default
/// subscriber sees every event the engine emits.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events here until the guard is dropped
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Number of captured lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Renders a trivial payload; fails for identities listed in `broken`
#[derive(Clone, Default)]
pub struct StubRenderer {
    pub broken: HashSet<String>,
}

impl PayloadRenderer for StubRenderer {
    fn render(&self, user: &UserSpec) -> Result<String> {
        if self.broken.contains(&user.identity) {
            return Err(Error::render(format!("template failure for {}", user.identity)));
        }
        Ok(format!(
            "#cloud-config\nhostname: {}\n# {} key(s)\n",
            user.identity,
            user.authorized_keys.len()
        ))
    }
}

pub fn user(name: &str) -> UserSpec {
    UserSpec::new(name, DOMAIN, vec!["ssh-ed25519 FALLBACK".to_string()])
}

pub fn running(name: &str, address: &str) -> ObservedInstance {
    ObservedInstance {
        id: format!("id-{}", name),
        name: format!("{}.{}", name, DOMAIN),
        public_address: Some(address.to_string()),
        tags: vec![TAG.to_string()],
        status: "active".to_string(),
    }
}

pub fn a_record(id: &str, label: &str, data: &str) -> DomainRecord {
    DomainRecord {
        id: id.to_string(),
        name: label.to_string(),
        record_type: "A".to_string(),
        data: data.to_string(),
        ttl: Some(30),
    }
}

/// Default config with a settle loop fast enough for tests
pub fn test_config() -> FleetConfig {
    FleetConfig {
        settle: SettleConfig {
            poll_interval_ms: 1,
            deadline_ms: 200,
        },
        ..FleetConfig::default()
    }
}
