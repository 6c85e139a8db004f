//! Instance provisioning
//!
//! One creation request per missing user, issued sequentially. A user whose
//! payload cannot be rendered is skipped; a user whose creation call fails
//! is reported as failed. Neither stops the batch.

use crate::config::InstanceTemplate;
use crate::error::Error;
use crate::identity::UserSpec;
use crate::rate_limit::RateLimitGuard;
use crate::report::{Stage, UnitReport};
use crate::traits::{ComputeProvider, CreateInstanceRequest, ObservedInstance, PayloadRenderer};
use tracing::{debug, error, info, warn};

/// What happened to one user
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// The provider accepted the creation request
    Created(ObservedInstance),
    /// Dry-run: the request was built and surfaced, nothing was sent
    DryRun(CreateInstanceRequest),
    /// The bootstrap payload could not be rendered; nothing was sent
    RenderFailed(Error),
    /// The provider rejected or failed the creation request
    CreateFailed(Error),
}

impl ProvisionOutcome {
    /// Convert into a report entry for `user`
    pub fn to_unit_report(&self, user: &UserSpec) -> UnitReport {
        let subject = user.identity.as_str();
        match self {
            ProvisionOutcome::Created(instance) => UnitReport::success(
                Stage::Provision,
                subject,
                format!("created instance {} ({})", instance.name, instance.id),
            ),
            ProvisionOutcome::DryRun(request) => UnitReport::skipped(
                Stage::Provision,
                subject,
                format!("dry run: would create {}", request.name),
            ),
            ProvisionOutcome::RenderFailed(e) => UnitReport::skipped(
                Stage::Provision,
                subject,
                format!("user data template failure: {}", e),
            ),
            ProvisionOutcome::CreateFailed(e) => UnitReport::failed(Stage::Provision, subject, e),
        }
    }
}

/// Result of provisioning a batch of users
#[derive(Debug, Default)]
pub struct ProvisionBatch {
    /// One entry per user, in input order
    pub units: Vec<UnitReport>,
    /// Names of the instances the provider actually created
    pub created: Vec<String>,
}

/// Issues instance creation requests for missing users
pub struct Provisioner<'a> {
    compute: &'a dyn ComputeProvider,
    renderer: &'a dyn PayloadRenderer,
    template: &'a InstanceTemplate,
    guard: RateLimitGuard,
    dry_run: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        compute: &'a dyn ComputeProvider,
        renderer: &'a dyn PayloadRenderer,
        template: &'a InstanceTemplate,
        guard: RateLimitGuard,
        dry_run: bool,
    ) -> Self {
        Self {
            compute,
            renderer,
            template,
            guard,
            dry_run,
        }
    }

    /// Build the creation request for `user` around a rendered payload
    pub fn build_request(&self, user: &UserSpec, user_data: String) -> CreateInstanceRequest {
        CreateInstanceRequest {
            name: user.resource_name.clone(),
            region: self.template.region.clone(),
            size: self.template.size.clone(),
            image: self.template.image.clone(),
            ssh_keys: vec![self.template.ssh_fingerprint.clone()],
            tags: vec![self.template.tag.clone()],
            user_data,
        }
    }

    /// Provision one user
    pub async fn provision(&self, user: &UserSpec) -> ProvisionOutcome {
        let user_data = match self.renderer.render(user) {
            Ok(data) => data,
            Err(e) => {
                error!("User data template failure for {}: {}", user.identity, e);
                return ProvisionOutcome::RenderFailed(e);
            }
        };

        debug!("User data for {}:\n{}", user.resource_name, user_data);

        let request = self.build_request(user, user_data);

        if self.dry_run {
            let dump = serde_json::to_string_pretty(&request)
                .unwrap_or_else(|_| format!("{:?}", request));
            info!("Dry run: would create instance for {}:\n{}", user.identity, dump);
            return ProvisionOutcome::DryRun(request);
        }

        match self.compute.create_instance(&request).await {
            Ok(response) => {
                self.guard.check(response.quota.as_ref());
                info!("Created instance for hostname: {}", user.resource_name);
                ProvisionOutcome::Created(response.value)
            }
            Err(e) => {
                self.guard.check_error(&e);
                error!(
                    "Failed to create instance {} via {}: {}",
                    user.resource_name,
                    self.compute.provider_name(),
                    e
                );
                ProvisionOutcome::CreateFailed(e)
            }
        }
    }

    /// Provision every user in order; failures never stop the batch
    pub async fn provision_all(&self, users: &[UserSpec]) -> ProvisionBatch {
        let mut batch = ProvisionBatch::default();

        for user in users {
            let outcome = self.provision(user).await;
            if let ProvisionOutcome::Created(instance) = &outcome {
                batch.created.push(instance.name.clone());
            }
            batch.units.push(outcome.to_unit_report(user));
        }

        let failed = batch.units.iter().filter(|u| u.outcome.is_failure()).count();
        if failed > 0 {
            warn!("{} of {} instance creations failed", failed, users.len());
        }

        batch
    }
}
