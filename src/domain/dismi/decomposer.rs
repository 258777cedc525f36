use crate::config::Directionality;
use crate::domain::dismi::model::{Action, ActionKind, Connection, Path, Subject};
use crate::domain::dismi::tracker::{ErrorType, Severity, Tracker};

/// Elementary primitives an action breaks down into.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitives {
    Paths(Vec<Path>),
    Connections(Vec<Connection>),
}

impl Primitives {
    pub fn len(&self) -> usize {
        match self {
            Primitives::Paths(p) => p.len(),
            Primitives::Connections(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Breaks one action shape down into paths or connections.
///
/// Both operations return `None` when the action is not of the shape the
/// decomposer handles; an `OBJECTISNOT<KIND>` issue is recorded in that case.
pub trait ActionDecomposer: Sync {
    fn kind(&self) -> ActionKind;

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>>;

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>>;

    fn reject(&self, tracker: &mut Tracker) {
        log::error!("Invalid instance of {} action.", self.kind());
        tracker.add_issue(&format!("Action{}Decomposer", self.kind()), Severity::Error, ErrorType::ObjectIsNot(self.kind()), "");
        tracker.set_invalid();
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn path(source: &Subject, destination: &Subject) -> Path {
    Path { source: source.clone(), destination: destination.clone() }
}

fn connection(source: &Subject, destination: &Subject) -> Connection {
    Connection { source: source.clone(), destination: destination.clone() }
}

/// Both directions of a connection.
pub fn expand_connection(c: &Connection) -> [Path; 2] {
    [path(&c.source, &c.destination), path(&c.destination, &c.source)]
}

/// Expands every connection into its two directed paths.
pub fn expand_connections(connections: &[Connection]) -> Vec<Path> {
    let mut paths = Vec::with_capacity(connections.len() * 2);
    for c in connections {
        for p in expand_connection(c) {
            push_unique(&mut paths, p);
        }
    }
    paths
}

/// Every unordered pair of `subjects`, each once.
pub fn pairwise_connections(subjects: &[Subject]) -> Vec<Connection> {
    let mut connections = Vec::new();
    for (i, a) in subjects.iter().enumerate() {
        for b in &subjects[i + 1..] {
            push_unique(&mut connections, connection(a, b));
        }
    }
    connections
}

/// One connection from `hub` to each of `spokes`.
pub fn star_connections(hub: &Subject, spokes: &[Subject]) -> Vec<Connection> {
    let mut connections = Vec::new();
    for s in spokes {
        push_unique(&mut connections, connection(hub, s));
    }
    connections
}

pub struct PathDecomposer;
pub struct ConnectionDecomposer;
pub struct AggregateDecomposer;
pub struct MulticastDecomposer;
pub struct MeshDecomposer;
pub struct TreeDecomposer;

impl ActionDecomposer for PathDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Path
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        match action {
            Action::Path(p) => Some(vec![p.clone()]),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Path(p) => Some(vec![connection(&p.source, &p.destination)]),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

impl ActionDecomposer for ConnectionDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Connection
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        match action {
            Action::Connection(c) => Some(expand_connections(std::slice::from_ref(c))),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Connection(c) => Some(vec![c.clone()]),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

impl ActionDecomposer for AggregateDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Aggregate
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        match action {
            Action::Aggregate(a) => {
                let mut paths = Vec::new();
                for source in &a.sources {
                    push_unique(&mut paths, path(source, &a.destination));
                }
                Some(paths)
            }
            _ => {
                self.reject(tracker);
                None
            }
        }
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Aggregate(a) => {
                let mut connections = Vec::new();
                for source in &a.sources {
                    push_unique(&mut connections, connection(source, &a.destination));
                }
                Some(connections)
            }
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

impl ActionDecomposer for MulticastDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Multicast
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        match action {
            Action::Multicast(m) => {
                let mut paths = Vec::new();
                for destination in &m.destinations {
                    push_unique(&mut paths, path(&m.source, destination));
                }
                Some(paths)
            }
            _ => {
                self.reject(tracker);
                None
            }
        }
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Multicast(m) => Some(star_connections(&m.source, &m.destinations)),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

impl ActionDecomposer for MeshDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Mesh
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        self.decompose_bidirectional(action, tracker).map(|c| expand_connections(&c))
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Mesh(m) => Some(pairwise_connections(&m.sources)),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

impl ActionDecomposer for TreeDecomposer {
    fn kind(&self) -> ActionKind {
        ActionKind::Tree
    }

    fn decompose(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Path>> {
        self.decompose_bidirectional(action, tracker).map(|c| expand_connections(&c))
    }

    fn decompose_bidirectional(&self, action: &Action, tracker: &mut Tracker) -> Option<Vec<Connection>> {
        match action {
            Action::Tree(t) => Some(star_connections(&t.source, &t.destinations)),
            _ => {
                self.reject(tracker);
                None
            }
        }
    }
}

/// Decomposer registered for `kind`. Service actions have none; they go
/// through the service decomposers instead.
pub fn decomposer_for(kind: ActionKind) -> Option<&'static dyn ActionDecomposer> {
    match kind {
        ActionKind::Path => Some(&PathDecomposer),
        ActionKind::Connection => Some(&ConnectionDecomposer),
        ActionKind::Aggregate => Some(&AggregateDecomposer),
        ActionKind::Multicast => Some(&MulticastDecomposer),
        ActionKind::Mesh => Some(&MeshDecomposer),
        ActionKind::Tree => Some(&TreeDecomposer),
        ActionKind::Sdwan | ActionKind::Vpn => None,
    }
}

/// Decomposes `action` according to `directionality`.
///
/// # Returns
/// Returns None if no decomposer handles the action or decomposition failed;
/// the reason is recorded on `tracker`.
pub fn decompose_action(action: &Action, directionality: Directionality, tracker: &mut Tracker) -> Option<Primitives> {
    let Some(decomposer) = decomposer_for(action.kind()) else {
        log::error!("No decomposer registered for {} actions.", action.kind());
        tracker.add_issue("DecomposeVocabulary", Severity::Error, ErrorType::NoDecomposer, action.kind().to_string());
        tracker.set_invalid();
        return None;
    };

    match directionality {
        Directionality::Unidirectional => decomposer.decompose(action, tracker).map(Primitives::Paths),
        Directionality::Bidirectional => decomposer.decompose_bidirectional(action, tracker).map(Primitives::Connections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dismi::model::{Mesh, Tree};

    fn subjects(names: &[&str]) -> Vec<Subject> {
        names.iter().map(|n| Subject::new(*n)).collect()
    }

    #[test]
    fn mismatched_action_records_issue() {
        let mut tracker = Tracker::new();
        let action = Action::Mesh(Mesh { sources: subjects(&["a", "b"]) });
        assert!(TreeDecomposer.decompose(&action, &mut tracker).is_none());
        assert!(tracker.has_issue(ErrorType::ObjectIsNot(ActionKind::Tree)));
        assert!(!tracker.is_valid());
    }

    #[test]
    fn tree_in_unidirectional_mode_yields_both_directions() {
        let mut tracker = Tracker::new();
        let s = subjects(&["root", "x", "y"]);
        let action = Action::Tree(Tree { source: s[0].clone(), destinations: s[1..].to_vec() });
        let paths = TreeDecomposer.decompose(&action, &mut tracker).unwrap();
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&Path { source: s[2].clone(), destination: s[0].clone() }));
    }

    #[test]
    fn service_actions_have_no_decomposer() {
        assert!(decomposer_for(ActionKind::Sdwan).is_none());
        assert!(decomposer_for(ActionKind::Path).is_some());
    }
}
