//! Process-wide registry of running Hosts.

use super::host_runtime::{HostRuntime, TickOutcome};
use crate::config::{ClientConfig, HostSettings, Settings};
use crate::core::{
    application::{
        action_resolver::{ActionResolver, HostView, ResolvedTarget},
        registry_bridge::{EntityKind, PlatformRegistry, RegistryBridge},
    },
    domain::{
        error::{PveError, PveResult, ValidationError},
        model::{
            guest::GuestAction,
            host_options::HostOptions,
            snapshot::{ClusterSnapshot, GuestKey},
            target::{RawTarget, TargetSpec},
            version::ApiVersion,
        },
        value_object::HostId,
    },
    infrastructure::api_client::{ApiClient, ClusterApi},
};
use crate::diagnostics::HostDiagnostics;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Command sent to a switch or button entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCommand {
    TurnOn,
    TurnOff,
    Press,
}

struct HostEntry {
    runtime: Arc<HostRuntime>,
    task: JoinHandle<()>,
}

/// Owns one poll task per Host.
///
/// Hosts are started on [`add_host`](Self::add_host) and stopped on
/// [`remove_host`](Self::remove_host); there is no loop outside of them.
pub struct HostSupervisor {
    registry: Arc<dyn PlatformRegistry>,
    client_config: ClientConfig,
    hosts: RwLock<HashMap<HostId, HostEntry>>,
}

impl HostSupervisor {
    pub fn new(registry: Arc<dyn PlatformRegistry>, client_config: ClientConfig) -> Self {
        Self {
            registry,
            client_config,
            hosts: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a supervisor and starts every Host of `settings`.
    pub async fn from_settings(
        settings: Settings,
        registry: Arc<dyn PlatformRegistry>,
    ) -> PveResult<Self> {
        settings.validate()?;
        let supervisor = Self::new(registry, settings.client);
        for host in settings.hosts {
            supervisor.add_host(host).await?;
        }
        Ok(supervisor)
    }

    pub fn registry(&self) -> &Arc<dyn PlatformRegistry> {
        &self.registry
    }

    fn build_api(&self, settings: &HostSettings) -> PveResult<Arc<dyn ClusterApi>> {
        let client = ApiClient::new(settings.connection()?, self.client_config.clone())?;
        Ok(Arc::new(client))
    }

    /// Checks that the Host answers and accepts the token.
    pub async fn validate_host(&self, settings: &HostSettings) -> PveResult<ApiVersion> {
        settings.validate()?;
        let version = self.build_api(settings)?.version().await?;
        info!(host = %settings.id, version = %version.version, "host validated");
        Ok(version)
    }

    /// Starts polling a new Host.
    pub async fn add_host(&self, settings: HostSettings) -> PveResult<()> {
        settings.validate()?;
        let api = self.build_api(&settings)?;
        self.add_host_with_api(settings, api).await
    }

    /// Starts polling a new Host through the given API.
    pub async fn add_host_with_api(
        &self,
        settings: HostSettings,
        api: Arc<dyn ClusterApi>,
    ) -> PveResult<()> {
        settings.options.validate()?;
        let mut hosts = self.hosts.write().await;
        if hosts.contains_key(&settings.id) {
            return Err(PveError::Config(format!(
                "host '{}' is already configured",
                settings.id
            )));
        }
        let host_id = settings.id.clone();
        let entry = self.spawn(settings, api, None);
        hosts.insert(host_id.clone(), entry);
        info!(host = %host_id, "host added");
        Ok(())
    }

    fn spawn(
        &self,
        settings: HostSettings,
        api: Arc<dyn ClusterApi>,
        committed: Option<Arc<ClusterSnapshot>>,
    ) -> HostEntry {
        let bridge = RegistryBridge::new(settings.id.clone(), self.registry.clone());
        let runtime = Arc::new(HostRuntime::new(settings, api, bridge, committed));
        let task = tokio::spawn(runtime.clone().run());
        HostEntry { runtime, task }
    }

    async fn stop(entry: HostEntry) -> Arc<HostRuntime> {
        entry.runtime.cancel();
        if let Err(e) = entry.task.await {
            warn!(host = %entry.runtime.host_id(), error = %e, "poll task ended abnormally");
        }
        // A tick started through `refresh_now` may still be in flight.
        entry.runtime.quiesce().await;
        entry.runtime
    }

    /// Stops a Host and removes all of its managed objects.
    pub async fn remove_host(&self, host_id: &HostId) -> PveResult<()> {
        let entry = self
            .hosts
            .write()
            .await
            .remove(host_id)
            .ok_or_else(|| unknown_host(host_id))?;
        let runtime = Self::stop(entry).await;
        runtime.bridge().teardown();
        info!(host = %host_id, "host removed");
        Ok(())
    }

    /// Replaces a Host's connection settings and resumes polling.
    ///
    /// Managed objects are kept; the new loop diffs against the last
    /// committed snapshot. This also lifts an authentication suspension.
    pub async fn reconfigure_host(&self, settings: HostSettings) -> PveResult<()> {
        settings.validate()?;
        let api = self.build_api(&settings)?;
        self.reconfigure_host_with_api(settings, api).await
    }

    pub async fn reconfigure_host_with_api(
        &self,
        settings: HostSettings,
        api: Arc<dyn ClusterApi>,
    ) -> PveResult<()> {
        settings.options.validate()?;
        let mut hosts = self.hosts.write().await;
        let entry = hosts
            .remove(&settings.id)
            .ok_or_else(|| unknown_host(&settings.id))?;
        let previous = Self::stop(entry).await;
        let host_id = settings.id.clone();
        let entry = self.spawn(settings, api, previous.snapshot());
        hosts.insert(host_id.clone(), entry);
        info!(host = %host_id, "host reconfigured");
        Ok(())
    }

    /// Applies new options; they take effect on the next tick, which is
    /// requested right away.
    pub async fn update_options(&self, host_id: &HostId, options: HostOptions) -> PveResult<()> {
        options.validate()?;
        let runtime = self.runtime(host_id).await?;
        runtime.set_options(options);
        runtime.request_refresh();
        debug!(host = %host_id, "options updated");
        Ok(())
    }

    /// Runs a tick now, unless one is already running.
    pub async fn refresh_now(&self, host_id: &HostId) -> PveResult<TickOutcome> {
        Ok(self.runtime(host_id).await?.tick().await)
    }

    pub async fn snapshot(&self, host_id: &HostId) -> PveResult<Option<Arc<ClusterSnapshot>>> {
        Ok(self.runtime(host_id).await?.snapshot())
    }

    /// Receives every snapshot the Host commits.
    pub async fn subscribe(
        &self,
        host_id: &HostId,
    ) -> PveResult<watch::Receiver<Option<Arc<ClusterSnapshot>>>> {
        Ok(self.runtime(host_id).await?.subscribe())
    }

    pub async fn hosts(&self) -> Vec<HostId> {
        let mut ids: Vec<HostId> = self.hosts.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Normalizes a caller-shaped target, then dispatches the action.
    pub async fn perform_raw_action(
        &self,
        action: GuestAction,
        target: &RawTarget,
    ) -> PveResult<String> {
        let spec = target.normalize()?;
        self.perform_action(action, &spec).await
    }

    /// Resolves `target` and asks Proxmox to run `action`.
    ///
    /// Returns the task UPID. Managed objects are not touched here; the
    /// change shows up through the refresh requested afterwards. Failures are
    /// returned as-is and never retried.
    pub async fn perform_action(&self, action: GuestAction, target: &TargetSpec) -> PveResult<String> {
        let runtimes = self.runtimes().await;
        let views: Vec<HostView> = runtimes
            .iter()
            .map(|r| HostView {
                host_id: r.host_id().clone(),
                address: r.settings().host.trim().to_string(),
                snapshot: r.snapshot(),
            })
            .collect();

        let ResolvedTarget { host_id, guest } =
            ActionResolver::new(self.registry.clone()).resolve(target, &views)?;
        let runtime = runtimes
            .into_iter()
            .find(|r| r.host_id() == &host_id)
            .ok_or_else(|| unknown_host(&host_id))?;

        let upid = dispatch(&runtime, action, &guest).await?;
        runtime.request_refresh();
        Ok(upid)
    }

    /// Runs the action bound to a switch or button entity.
    pub async fn trigger_entity(&self, unique_id: &str, command: EntityCommand) -> PveResult<String> {
        let entity = self
            .registry
            .entity(unique_id)
            .ok_or_else(|| PveError::TargetNotFound(format!("entity {}", unique_id)))?;

        let action = match (entity.kind, command) {
            (EntityKind::Switch { on, .. }, EntityCommand::TurnOn) => on,
            (EntityKind::Switch { off, .. }, EntityCommand::TurnOff) => off,
            (EntityKind::Button(action), EntityCommand::Press) => action,
            (kind, command) => {
                return Err(ValidationError::ConstraintViolation(format!(
                    "{:?} does not accept {:?}",
                    kind, command
                ))
                .into());
            }
        };

        let guest: GuestKey = entity.device_identifier.parse()?;
        let target = TargetSpec::tuple(guest).on_host(entity.host_id);
        self.perform_action(action, &target).await
    }

    /// Redacted state of one Host, safe to share.
    pub async fn diagnostics(&self, host_id: &HostId) -> PveResult<HostDiagnostics> {
        let runtime = self.runtime(host_id).await?;
        let version = runtime.api().version().await.map_err(|e| e.to_string());
        Ok(HostDiagnostics::collect(
            runtime.settings(),
            &runtime.options(),
            runtime.last_poll(),
            runtime.snapshot().as_deref(),
            version,
        ))
    }

    /// Stops every loop. Managed objects stay registered.
    pub async fn shutdown(&self) {
        let entries: Vec<HostEntry> = self.hosts.write().await.drain().map(|(_, e)| e).collect();
        for entry in entries {
            Self::stop(entry).await;
        }
        info!("all hosts stopped");
    }

    async fn runtime(&self, host_id: &HostId) -> PveResult<Arc<HostRuntime>> {
        self.hosts
            .read()
            .await
            .get(host_id)
            .map(|e| e.runtime.clone())
            .ok_or_else(|| unknown_host(host_id))
    }

    async fn runtimes(&self) -> Vec<Arc<HostRuntime>> {
        let mut runtimes: Vec<Arc<HostRuntime>> = self
            .hosts
            .read()
            .await
            .values()
            .map(|e| e.runtime.clone())
            .collect();
        runtimes.sort_by(|a, b| a.host_id().cmp(b.host_id()));
        runtimes
    }
}

async fn dispatch(runtime: &HostRuntime, action: GuestAction, guest: &GuestKey) -> PveResult<String> {
    info!(
        host = %runtime.host_id(),
        node = %guest.node,
        vmid = guest.vmid,
        guest_type = %guest.guest_type,
        action = %action,
        "dispatching guest action"
    );
    runtime
        .api()
        .perform_action(&guest.node, guest.vmid, guest.guest_type, action)
        .await
}

fn unknown_host(host_id: &HostId) -> PveError {
    PveError::TargetNotFound(format!("host {} is not configured", host_id))
}
