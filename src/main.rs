use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use netrap_dismi::api::netrap_dto::{NetRapAction, NetRapActionType, NetRapDemand, NetRapLink, NetRapRoute};
use netrap_dismi::domain::dismi::intent_fsm::UserState;
use netrap_dismi::domain::dismi::model::DismiService;
use netrap_dismi::domain::netrap::topology_export::TopologyExporter;
use netrap_dismi::domain::netrap::xrap::{PlannerTransport, RouteId, XrapMethod, XrapReply, XrapRequest};
use netrap_dismi::domain::network::in_memory::{InMemoryIntentService, InMemoryNetwork};
use netrap_dismi::domain::network::model::{ConnectPoint, IntentEvent, IntentEventType};
use netrap_dismi::domain::network::services::LinkService;
use netrap_dismi::domain::orchestrator::{Collaborators, Orchestrator};
use netrap_dismi::{load_scenario, logger};

#[derive(Debug, Parser)]
#[command(name = "netrap-dismi", about = "Decompose client services into provider intents and route them through a planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs every service of a scenario against an offline planner.
    Run {
        /// Scenario file with config, network, connection points and services
        #[arg(short, long)]
        scenario: PathBuf,

        /// Directory for the analytics event log
        #[arg(long)]
        analytics_dir: Option<PathBuf>,
    },
    /// Prints the planner topology of a scenario's network.
    Topology {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

/// Planner stand-in that routes every demand over the direct link between
/// its end devices, or fails it if there is none.
struct OfflinePlanner {
    network: InMemoryNetwork,
}

impl OfflinePlanner {
    fn route(&self, demand: &NetRapDemand) -> Option<NetRapRoute> {
        let src = ConnectPoint::parse(&format!("{}/{}", demand.ingress_node.device, demand.ingress_node.port))?;
        let dst = ConnectPoint::parse(&format!("{}/{}", demand.egress_node.device, demand.egress_node.port))?;
        let link = self
            .network
            .get_links()
            .into_iter()
            .find(|l| l.src.device_id == src.device_id && l.dst.device_id == dst.device_id)?;

        let mut hop = NetRapLink { src: link.src.device_id.to_string(), dst: link.dst.device_id.to_string(), layer: Some(1), ..Default::default() };
        hop.attributes.insert("srcPort".to_string(), link.src.port.to_string());
        hop.attributes.insert("dstPort".to_string(), link.dst.port.to_string());
        Some(NetRapRoute { links: vec![hop], layer: Some(1), ..Default::default() })
    }

    fn answer_demand(&self, body: &[u8]) -> netrap_dismi::error::Result<XrapReply> {
        let mut demand: NetRapDemand = serde_json::from_slice(body)?;
        let action = match self.route(&demand) {
            Some(route) => {
                demand.route = Some(route);
                NetRapActionType::Route
            }
            None => NetRapActionType::Fail,
        };
        let reply = serde_json::to_vec(&vec![NetRapAction { action, demand }])?;
        Ok(XrapReply::Post { status_code: 200, location: None, etag: None, body: Bytes::from(reply) })
    }
}

impl PlannerTransport for OfflinePlanner {
    fn send(&self, _address: &RouteId, request: XrapRequest) -> netrap_dismi::error::Result<XrapReply> {
        log::debug!("Offline planner got {} {}", request.method, request.resource);
        match (request.method, request.resource.as_str()) {
            (XrapMethod::Post, "/demand") => self.answer_demand(&request.body),
            (XrapMethod::Delete, _) => Ok(XrapReply::Delete { status_code: 200 }),
            (XrapMethod::Post, _) => Ok(XrapReply::Post { status_code: 201, location: None, etag: None, body: Bytes::from_static(b"[]") }),
            _ => Ok(XrapReply::error(405, "Not supported by the offline planner")),
        }
    }
}

fn colored_state(state: UserState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        UserState::Installed => text.green(),
        UserState::Failed | UserState::ProcessingFailed => text.red(),
        _ => text.yellow(),
    }
}

fn run(scenario_path: &str, analytics_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let _guard = analytics_dir.and_then(|dir| logger::init_analytics(dir, "analytics.log"));

    let scenario = load_scenario(scenario_path).with_context(|| format!("Could not load scenario '{}'", scenario_path))?;
    let network = InMemoryNetwork::new();
    scenario.network.populate(&network)?;

    let intents = Arc::new(InMemoryIntentService::new());
    let collaborators = Collaborators {
        intent_service: intents.clone(),
        link_service: Arc::new(network.clone()),
        device_service: Arc::new(network.clone()),
        host_service: Arc::new(network.clone()),
        transport: Arc::new(OfflinePlanner { network: network.clone() }),
        link_installer: Some(Arc::new(network.clone())),
    };
    let orchestrator = Orchestrator::new(scenario.config, collaborators)?;
    network.add_listener(orchestrator.link_listener());

    let register = XrapRequest::post_json("/register/", r#"{"name":"offline"}"#).from_peer(Bytes::from_static(b"offline"));
    let reply = orchestrator.netrap().dispatch(&register);
    log::info!("Registered offline planner ({})", reply.status_code());

    let api = orchestrator.service_api();
    for cp in scenario.connection_points.iter() {
        api.register_connection_point(cp.name.clone(), cp.endpoints());
    }
    let mut service_ids = Vec::new();
    for dto in scenario.services {
        let service = DismiService::try_from(dto)?;
        match api.submit_new_service(service) {
            Some(id) => service_ids.push(id),
            None => log::error!("Service was not accepted"),
        }
    }

    // The in-memory provider installs whatever it accepts; report that back
    // until no new submissions show up.
    let mut reported = 0;
    loop {
        orchestrator.flush();
        let submissions = intents.submissions();
        if submissions.len() == reported {
            break;
        }
        for intent in submissions[reported..].iter() {
            orchestrator.on_intent_event(&IntentEvent { event_type: IntentEventType::Installed, intent: intent.clone() });
        }
        reported = submissions.len();
    }

    for service_id in service_ids.iter() {
        println!("{} {}", "Service".bold(), service_id.to_string().cyan());
        for (intent_id, state) in api.intent_states(service_id) {
            println!("  {:<24} {}", intent_id.to_string(), colored_state(state));
        }
        for issue in api.issues(service_id) {
            println!("  {} {}", "issue:".red(), issue);
        }
    }
    println!("{}", orchestrator.netrap().get_status());
    Ok(())
}

fn topology(scenario_path: &str) -> anyhow::Result<()> {
    let scenario = load_scenario(scenario_path).with_context(|| format!("Could not load scenario '{}'", scenario_path))?;
    let network = InMemoryNetwork::new();
    scenario.network.populate(&network)?;

    let exporter = TopologyExporter::new(Arc::new(network.clone()), Arc::new(network));
    println!("{}", serde_json::to_string_pretty(&exporter.build_topology())?);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logger::init();

    let result = match cli.command {
        Command::Run { scenario, analytics_dir } => run(&scenario.to_string_lossy(), analytics_dir),
        Command::Topology { scenario } => topology(&scenario.to_string_lossy()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
