use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

use crate::config::OrchestratorConfig;
use crate::domain::dismi::aci_store::AciStore;
use crate::domain::dismi::dismi_store::DismiStore;
use crate::domain::dismi::endpoint_store::ConnectionPointStore;
use crate::domain::dismi::intent_compiler::IntentCompiler;
use crate::domain::dismi::intent_decomposer_manager::IntentDecomposerManager;
use crate::domain::dismi::model::ActionKind;
use crate::domain::dismi::service_api::ServiceApi;
use crate::domain::dismi::service_decomposer::{SdwanDecomposer, ServiceDecomposerRegistry};
use crate::domain::dismi::state_handler::DismiStateHandler;
use crate::domain::netrap::event_handler::NetRapEventHandler;
use crate::domain::netrap::intent_reconciler::IntentReconciler;
use crate::domain::netrap::netrap_service::NetRapService;
use crate::domain::netrap::planner::PlannerService;
use crate::domain::netrap::registry::Registry;
use crate::domain::netrap::route_store::RouteStore;
use crate::domain::netrap::topology_export::TopologyExporter;
use crate::domain::netrap::transaction_queue::TransactionQueue;
use crate::domain::netrap::xrap::PlannerTransport;
use crate::domain::network::in_memory::LinkListener;
use crate::domain::network::model::{ApplicationId, IntentEvent, LinkEvent, TopologyEvent};
use crate::domain::network::services::{DeviceService, HostService, IntentService, LinkInstaller, LinkService};
use crate::error::Result;

pub const NETRAP_APP_ID: u16 = 1;
pub const DISMI_APP_ID: u16 = 2;

/// Provider side collaborators the orchestrator runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub intent_service: Arc<dyn IntentService>,
    pub link_service: Arc<dyn LinkService>,
    pub device_service: Arc<dyn DeviceService>,
    pub host_service: Arc<dyn HostService>,
    pub transport: Arc<dyn PlannerTransport>,
    /// Used only in null-provider mode.
    pub link_installer: Option<Arc<dyn LinkInstaller>>,
}

/// Owns every component of the client and planner pipelines, built once from
/// the configuration and the provider collaborators.
pub struct Orchestrator {
    config: OrchestratorConfig,
    service_api: ServiceApi,
    state_handler: Arc<DismiStateHandler>,
    queue: Arc<TransactionQueue>,
    netrap: Arc<NetRapService>,
    events: NetRapEventHandler,
    // Declared last: dropped after every component holding its handle.
    runtime: Runtime,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Result<Self> {
        let runtime = Builder::new_multi_thread().worker_threads(2).thread_name("netrap-dismi-timer").enable_time().build()?;
        let handle = runtime.handle().clone();

        let netrap_app = ApplicationId::new(NETRAP_APP_ID, config.netrap_app_name.clone());
        let dismi_app = ApplicationId::new(DISMI_APP_ID, config.dismi_app_name.clone());

        let dismi_store = DismiStore::new();
        let aci_store = AciStore::new();
        let compiler = IntentCompiler::new(
            collaborators.intent_service.clone(),
            collaborators.host_service.clone(),
            config.endpoint_model,
            config.default_priority,
            config.selection_levels(),
        );

        let service_decomposers = Arc::new(ServiceDecomposerRegistry::new());
        service_decomposers.register(
            ActionKind::Sdwan,
            Arc::new(SdwanDecomposer::new(
                aci_store.clone(),
                compiler.clone(),
                collaborators.intent_service.clone(),
                config.selection_levels(),
            )),
        );

        let manager = Arc::new(IntentDecomposerManager::new(
            dismi_app,
            config.directionality,
            dismi_store.clone(),
            aci_store.clone(),
            compiler.clone(),
            collaborators.intent_service.clone(),
            service_decomposers,
        ));
        let service_api =
            ServiceApi::new(dismi_store.clone(), manager, ConnectionPointStore::new(), config.enforce_unique_connection_points);
        let state_handler = Arc::new(DismiStateHandler::new(dismi_store, aci_store, compiler));

        let mut queue = TransactionQueue::new(
            collaborators.intent_service.clone(),
            collaborators.link_service.clone(),
            handle.clone(),
            config.fallback_drain_delay(),
        );
        if config.null_provider {
            match collaborators.link_installer.clone() {
                Some(installer) => queue = queue.with_link_installer(installer),
                None => log::warn!("Null provider mode requested without a link installer"),
            }
        }
        let queue = Arc::new(queue);

        let registry = Arc::new(Registry::new(handle.clone(), config.greeting_delay()));
        let planner = Arc::new(PlannerService::new(collaborators.transport.clone(), registry));
        let reconciler = Arc::new(IntentReconciler::new(
            netrap_app,
            config.default_priority,
            collaborators.intent_service.clone(),
            collaborators.link_service.clone(),
            planner.clone(),
            queue.clone(),
            RouteStore::new(),
        ));
        let exporter = Arc::new(TopologyExporter::new(collaborators.link_service.clone(), collaborators.device_service.clone()));
        let netrap = NetRapService::new(planner, exporter, reconciler);

        let events = NetRapEventHandler::new(
            config.netrap_app_name.clone(),
            config.dismi_app_name.clone(),
            &netrap,
            handle,
            config.topology_update_delay(),
        )
        .with_state_handler(state_handler.clone());

        log::info!(
            "Orchestrator started ({:?}, {:?} endpoints, null provider {})",
            config.directionality,
            config.endpoint_model,
            config.null_provider
        );
        Ok(Self { config, service_api, state_handler, queue, netrap, events, runtime })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn service_api(&self) -> &ServiceApi {
        &self.service_api
    }

    pub fn state_handler(&self) -> &Arc<DismiStateHandler> {
        &self.state_handler
    }

    pub fn netrap(&self) -> &Arc<NetRapService> {
        &self.netrap
    }

    pub fn queue(&self) -> &Arc<TransactionQueue> {
        &self.queue
    }

    pub fn events(&self) -> &NetRapEventHandler {
        &self.events
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Listener to register with the link service so blocked routes are
    /// released when their links show up.
    pub fn link_listener(&self) -> LinkListener {
        let queue = self.queue.clone();
        Arc::new(move |event: &LinkEvent| queue.on_link_event(event))
    }

    pub fn on_intent_event(&self, event: &IntentEvent) {
        self.events.on_intent_event(event);
    }

    pub fn on_topology_event(&self, event: &TopologyEvent) {
        self.events.on_topology_event(event);
    }

    /// Waits for queued client requests, planner exchanges and queue drains.
    pub fn flush(&self) {
        self.service_api.flush();
        self.netrap.reconciler().flush();
        self.queue.flush();
    }
}
