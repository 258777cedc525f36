use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::domain::netrap::expected_link::ExpectedLink;
use crate::domain::network::model::{ConnectPoint, IntentKey, LinkEvent, LinkEventType, PathIntent};
use crate::domain::network::services::{IntentService, LinkInstaller, LinkService};
use crate::domain::utils::executor::SerialExecutor;
use crate::domain::utils::scheduled_task::ScheduledTask;
use crate::domain::utils::statistics::ANALYTICS_TARGET;

new_key_type! {
    pub struct ActionItemId;
}

type LinkEnds = (ConnectPoint, ConnectPoint);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    New,
    Route,
    Move,
}

/// A provider intent waiting to be installed, possibly blocked on links the
/// topology does not know yet.
#[derive(Debug, Clone)]
pub struct ActionItem {
    pub action_type: ActionType,
    pub intent: PathIntent,
    pub waiting: Vec<ExpectedLink>,
    seq: u64,
}

impl ActionItem {
    pub fn is_waiting(&self) -> bool {
        !self.waiting.is_empty()
    }
}

impl fmt::Display for ActionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionItem{{type={:?}, key={}, waiting=[", self.action_type, self.intent.key)?;
        for (i, link) in self.waiting.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", link)?;
        }
        write!(f, "]}}")
    }
}

/// Both queues behind one lock.
///
/// Every IP item lives in `items`. A waiting item is indexed under each link it
/// still waits for in `blocked`; an item with nothing left to wait for sits in
/// `ready`, keyed by arrival, until the next drain takes it out.
#[derive(Default)]
struct QueueState {
    optical: VecDeque<ActionItem>,
    items: SlotMap<ActionItemId, ActionItem>,
    blocked: HashMap<LinkEnds, Vec<ActionItemId>>,
    ready: BTreeMap<u64, ActionItemId>,
    next_seq: u64,
}

impl QueueState {
    fn enqueue(&mut self, action_type: ActionType, intent: PathIntent, waiting: Vec<ExpectedLink>) -> ActionItemId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let ends: Vec<LinkEnds> = waiting.iter().map(ExpectedLink::ends).collect();
        let id = self.items.insert(ActionItem { action_type, intent, waiting, seq });

        for link in ends.iter() {
            let blocked = self.blocked.entry(link.clone()).or_default();
            if !blocked.contains(&id) {
                blocked.push(id);
            }
        }
        if ends.is_empty() {
            self.ready.insert(seq, id);
        }
        id
    }

    /// Clears `link` from every item waiting on it.
    ///
    /// # Returns
    /// Returns the number of items that were waiting on the link.
    fn release(&mut self, link: &LinkEnds) -> usize {
        let Some(ids) = self.blocked.remove(link) else {
            return 0;
        };

        let mut released = 0;
        for id in ids {
            let Some(item) = self.items.get_mut(id) else {
                continue;
            };
            item.waiting.retain(|l| &l.ends() != link);
            released += 1;
            if !item.is_waiting() {
                self.ready.insert(item.seq, id);
            }
        }
        released
    }

    fn take_ready(&mut self) -> Vec<ActionItem> {
        let ready = std::mem::take(&mut self.ready);
        ready.into_values().filter_map(|id| self.items.remove(id)).collect()
    }

    fn remove_key(&mut self, key: &IntentKey) -> usize {
        let ids: HashSet<ActionItemId> =
            self.items.iter().filter(|(_, item)| &item.intent.key == key).map(|(id, _)| id).collect();
        if ids.is_empty() {
            return 0;
        }

        for id in ids.iter() {
            self.items.remove(*id);
        }
        self.ready.retain(|_, id| !ids.contains(id));
        self.blocked.retain(|_, waiting| {
            waiting.retain(|id| !ids.contains(id));
            !waiting.is_empty()
        });
        ids.len()
    }

    fn is_blocked_on(&self, link: &LinkEnds) -> bool {
        self.blocked.contains_key(link)
    }

    fn ip_items(&self) -> Vec<ActionItem> {
        let mut items: Vec<ActionItem> = self.items.values().cloned().collect();
        items.sort_by_key(|item| item.seq);
        items
    }
}

struct QueueCore {
    state: Mutex<QueueState>,
    intent_service: Arc<dyn IntentService>,
    link_service: Arc<dyn LinkService>,
}

impl QueueCore {
    fn submit(&self, item: &ActionItem) {
        match self.intent_service.submit(item.intent.clone()) {
            Ok(()) => tracing::info!(
                target: ANALYTICS_TARGET,
                LogDescription = "Action released",
                ActionType = ?item.action_type,
                Key = %item.intent.key,
            ),
            Err(e) => log::error!("Submitting {} failed: {}", item, e),
        }
    }

    /// Installs every IP item that is no longer waiting, oldest first.
    fn drain(&self) -> usize {
        let mut state = self.state.lock().expect("Mutex poisoned");
        let ready = state.take_ready();
        for item in ready.iter() {
            log::debug!("Installing {}", item);
            self.submit(item);
        }
        ready.len()
    }

    /// Releases every waiting link that is already part of the topology.
    fn rescan(&self) -> usize {
        let links = self.link_service.get_links();
        let mut state = self.state.lock().expect("Mutex poisoned");
        let mut released = 0;
        for link in links.iter() {
            let ends = (link.src.clone(), link.dst.clone());
            if state.is_blocked_on(&ends) {
                released += state.release(&ends);
            }
        }
        released
    }
}

/// Install scheduler for planner decisions.
///
/// Optical intents go out strictly one at a time. IP intents go out as soon as
/// every link their path depends on exists; link events and a fallback timer
/// re-evaluate the blocked ones.
pub struct TransactionQueue {
    core: Arc<QueueCore>,
    executor: SerialExecutor,
    fallback: ScheduledTask,
    fallback_delay: Duration,
    link_installer: Option<Arc<dyn LinkInstaller>>,
}

impl TransactionQueue {
    pub fn new(
        intent_service: Arc<dyn IntentService>,
        link_service: Arc<dyn LinkService>,
        handle: Handle,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            core: Arc::new(QueueCore { state: Mutex::new(QueueState::default()), intent_service, link_service }),
            executor: SerialExecutor::new("netrap-transactions"),
            fallback: ScheduledTask::new("netrap-fallback-drain", handle),
            fallback_delay,
            link_installer: None,
        }
    }

    /// Installs expected links directly instead of waiting for the provider
    /// to discover them.
    pub fn with_link_installer(mut self, installer: Arc<dyn LinkInstaller>) -> Self {
        self.link_installer = Some(installer);
        self
    }

    /// Queues an optical intent. It is submitted right away if nothing else
    /// is outstanding.
    pub fn add_optical_intent(&self, intent: PathIntent) {
        let mut state = self.core.state.lock().expect("Mutex poisoned");
        let item = ActionItem { action_type: ActionType::New, intent, waiting: Vec::new(), seq: state.next_seq };
        state.next_seq += 1;

        if state.optical.is_empty() {
            self.core.submit(&item);
        }
        log::info!("Queued optical {}", item);
        state.optical.push_back(item);
    }

    /// Completes the outstanding optical intent and submits the next one.
    pub fn notify_installed_optical_intent(&self, key: &IntentKey) {
        let mut state = self.core.state.lock().expect("Mutex poisoned");
        let Some(position) = state.optical.iter().position(|item| &item.intent.key == key) else {
            return;
        };
        state.optical.remove(position);
        log::info!("Optical intent {} installed, {} left in queue.", key, state.optical.len());

        if position == 0 {
            if let Some(next) = state.optical.front() {
                self.core.submit(next);
            }
        }
    }

    /// Queues a routed IP intent behind the links it still waits for.
    pub fn add_route_intent(&self, intent: PathIntent, expected_links: Vec<ExpectedLink>) {
        self.add_ip_intent(ActionType::Route, intent, expected_links);
    }

    /// Same as [`TransactionQueue::add_route_intent`] for an intent the
    /// planner moved to a new path.
    pub fn add_moved_intent(&self, intent: PathIntent, expected_links: Vec<ExpectedLink>) {
        self.add_ip_intent(ActionType::Move, intent, expected_links);
    }

    fn add_ip_intent(&self, action_type: ActionType, intent: PathIntent, expected_links: Vec<ExpectedLink>) {
        let to_install: Vec<ExpectedLink> = if self.link_installer.is_some() { expected_links.clone() } else { Vec::new() };

        let id = {
            let mut state = self.core.state.lock().expect("Mutex poisoned");
            let id = state.enqueue(action_type, intent, expected_links);
            log::info!("Queued {}", state.items[id]);
            id
        };

        self.core.rescan();
        let still_waiting = self.core.state.lock().expect("Mutex poisoned").items.get(id).is_some_and(ActionItem::is_waiting);
        if still_waiting {
            let core = self.core.clone();
            self.fallback.schedule(self.fallback_delay, move || {
                let released = core.rescan();
                let installed = core.drain();
                log::debug!("Fallback drain released {} and installed {} actions.", released, installed);
            });
        } else {
            self.core.drain();
        }

        if let Some(installer) = &self.link_installer {
            for link in to_install.iter() {
                installer.install_link(&link.src, &link.dst);
            }
        }
    }

    /// Feeds topology changes into the queue. Installs happen on the queue's
    /// own executor.
    pub fn on_link_event(&self, event: &LinkEvent) {
        if !matches!(event.event_type, LinkEventType::LinkAdded | LinkEventType::LinkUpdated) {
            return;
        }

        let ends = (event.link.src.clone(), event.link.dst.clone());
        let released = self.core.state.lock().expect("Mutex poisoned").release(&ends);
        if released > 0 {
            log::debug!("Link {} -> {} released {} actions.", ends.0, ends.1, released);
            let core = self.core.clone();
            self.executor.execute(move || {
                core.drain();
            });
        }
    }

    /// Drops every queued IP item of `key`. Unknown keys are ignored.
    pub fn remove_route_intent(&self, key: &IntentKey) {
        let removed = self.core.state.lock().expect("Mutex poisoned").remove_key(key);
        if removed > 0 {
            log::info!("Removed {} queued actions of {}", removed, key);
        }
    }

    pub fn get_status(&self) -> String {
        let state = self.core.state.lock().expect("Mutex poisoned");
        let mut status = String::from("OptoQueue: \n");
        for item in state.optical.iter() {
            status.push_str(&format!("{}\n", item));
        }
        status.push_str("IPQueue: \n");
        for item in state.ip_items() {
            status.push_str(&format!("{}\n", item));
        }
        status
    }

    /// Snapshot of the IP items not yet installed, oldest first.
    pub fn ip_items(&self) -> Vec<ActionItem> {
        self.core.state.lock().expect("Mutex poisoned").ip_items()
    }

    pub fn optical_items(&self) -> Vec<ActionItem> {
        self.core.state.lock().expect("Mutex poisoned").optical.iter().cloned().collect()
    }

    /// Waits for drains triggered by link events.
    pub fn flush(&self) {
        self.executor.flush();
    }
}
