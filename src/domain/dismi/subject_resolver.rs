use std::sync::Arc;

use crate::domain::dismi::endpoint_store::EndpointDirectory;
use crate::domain::dismi::model::{Action, Endpoint, EndpointType, Subject};
use crate::domain::dismi::tracker::{ErrorType, Severity, Tracker};
use crate::domain::utils::id::ConnectionPointName;

const SOURCE: &str = "SubjectResolver";

/// Turns connection point names into candidate endpoints and narrows the
/// candidates of all subjects of a request to the endpoint types they share.
#[derive(Clone)]
pub struct SubjectResolver {
    directory: Arc<dyn EndpointDirectory>,
    enforce_unique: bool,
}

impl SubjectResolver {
    pub fn new(directory: Arc<dyn EndpointDirectory>, enforce_unique: bool) -> Self {
        Self { directory, enforce_unique }
    }

    /// # Returns
    /// Returns the endpoints behind `name`, or None (with a
    /// `CONNECTIONPOINTNOTFOUND` issue) if there are none.
    pub fn resolve(&self, name: &ConnectionPointName, tracker: &mut Tracker) -> Option<Vec<Endpoint>> {
        let endpoints = self.directory.get_endpoints(name);
        if endpoints.is_empty() {
            log::error!("Unable to find connection point '{}'.", name);
            tracker.add_issue(SOURCE, Severity::Error, ErrorType::ConnectionPointNotFound, format!("Unable to find connection point '{}'", name));
            return None;
        }
        Some(endpoints)
    }

    /// Fills in the candidate endpoints of `subject`.
    ///
    /// # Returns
    /// Returns false if the connection point could not be resolved.
    pub fn resolve_subject(&self, subject: &mut Subject, tracker: &mut Tracker) -> bool {
        match self.resolve(&subject.connection_point, tracker) {
            Some(endpoints) => {
                subject.endpoints = endpoints;
                true
            }
            None => false,
        }
    }

    /// Resolves every subject of `action` and prunes their endpoints to a
    /// common type.
    ///
    /// # Returns
    /// Returns true if every subject ended up with at least one candidate.
    pub fn resolve_action(&self, action: &mut Action, tracker: &mut Tracker) -> bool {
        let mut subjects = action.subjects_mut();
        let mut resolved = true;
        for subject in subjects.iter_mut() {
            resolved &= self.resolve_subject(subject, tracker);
        }
        if !resolved {
            tracker.set_invalid();
            return false;
        }

        self.resolve_network_edges(&mut subjects, tracker);
        tracker.is_valid()
    }

    /// Checks connection point uniqueness (when enabled) and removes endpoint
    /// types that are not present in every subject.
    pub fn resolve_network_edges(&self, subjects: &mut [&mut Subject], tracker: &mut Tracker) {
        if self.enforce_unique {
            check_uniqueness(subjects, tracker);
        }
        prune_endpoints(subjects, tracker);
    }
}

fn check_uniqueness(subjects: &[&mut Subject], tracker: &mut Tracker) {
    for (i, a) in subjects.iter().enumerate() {
        for b in &subjects[i + 1..] {
            if a.connection_point == b.connection_point {
                log::error!("Connection point {} is used by more than one subject.", a.connection_point);
                tracker.add_issue(SOURCE, Severity::Error, ErrorType::ConnectionPointNotUnique, a.connection_point.as_str());
                tracker.set_invalid();
            }
        }
    }
}

fn prune_endpoints(subjects: &mut [&mut Subject], tracker: &mut Tracker) {
    for s in subjects.iter().filter(|s| s.endpoints.is_empty()) {
        log::error!("Connection point {} does not have any endpoint.", s.connection_point);
        tracker.add_issue(SOURCE, Severity::Error, ErrorType::ConnectionPointHasNoEndpoints, s.connection_point.as_str());
    }

    let common: Vec<EndpointType> = EndpointType::ALL
        .into_iter()
        .filter(|t| subjects.iter().filter(|s| !s.endpoints.is_empty()).all(|s| s.endpoints.iter().any(|e| e.endpoint_type() == *t)))
        .collect();

    for subject in subjects.iter_mut() {
        subject.endpoints.retain(|e| common.contains(&e.endpoint_type()));
    }

    if subjects.iter().any(|s| s.endpoints.is_empty()) {
        log::error!("Subjects do not share a common endpoint type.");
        tracker.add_issue(SOURCE, Severity::Error, ErrorType::NoCommonEndpointType, "");
        tracker.set_invalid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dismi::endpoint_store::ConnectionPointStore;
    use crate::domain::dismi::model::{Connection, EthEndpoint, FiberEndpoint, IpEndpoint};

    fn ip(router: &str) -> Endpoint {
        Endpoint::Ip(IpEndpoint { router_id: router.into(), port_id: "1".into(), in_addr: "10.0.0.1/32".into() })
    }

    fn eth(switch: &str) -> Endpoint {
        Endpoint::Eth(EthEndpoint { switch_id: switch.into(), port_id: "2".into(), mac: "00:00:00:00:00:01".into() })
    }

    fn fiber(device: &str) -> Endpoint {
        Endpoint::Fiber(FiberEndpoint { device_id: device.into(), port_id: "3".into() })
    }

    fn resolver(store: &ConnectionPointStore, unique: bool) -> SubjectResolver {
        SubjectResolver::new(Arc::new(store.clone()), unique)
    }

    fn connection(a: &str, b: &str) -> Action {
        Action::Connection(Connection { source: Subject::new(a), destination: Subject::new(b) })
    }

    #[test]
    fn prunes_types_not_shared_by_all_subjects() {
        let store = ConnectionPointStore::new();
        store.put("a", vec![ip("r1"), eth("s1"), fiber("f1")]);
        store.put("b", vec![ip("r2"), eth("s2")]);

        let mut action = connection("a", "b");
        let mut tracker = Tracker::new();
        assert!(resolver(&store, true).resolve_action(&mut action, &mut tracker));

        for s in action.subjects() {
            assert_eq!(s.endpoints.len(), 2, "Should keep only IP and Ethernet endpoints");
            assert!(s.endpoints.iter().all(|e| e.endpoint_type() != EndpointType::Fiber));
        }
    }

    #[test]
    fn unknown_connection_point_is_reported() {
        let store = ConnectionPointStore::new();
        store.put("a", vec![ip("r1")]);

        let mut action = connection("a", "missing");
        let mut tracker = Tracker::new();
        assert!(!resolver(&store, true).resolve_action(&mut action, &mut tracker));
        assert!(tracker.has_issue(ErrorType::ConnectionPointNotFound));
    }

    #[test]
    fn disjoint_types_leave_no_candidates() {
        let store = ConnectionPointStore::new();
        store.put("a", vec![ip("r1")]);
        store.put("b", vec![fiber("f1")]);

        let mut action = connection("a", "b");
        let mut tracker = Tracker::new();
        assert!(!resolver(&store, true).resolve_action(&mut action, &mut tracker));
        assert!(tracker.has_issue(ErrorType::NoCommonEndpointType));
    }

    #[test]
    fn duplicate_connection_points_respect_toggle() {
        let store = ConnectionPointStore::new();
        store.put("a", vec![ip("r1")]);

        let mut tracker = Tracker::new();
        assert!(!resolver(&store, true).resolve_action(&mut connection("a", "a"), &mut tracker));
        assert!(tracker.has_issue(ErrorType::ConnectionPointNotUnique));

        let mut tracker = Tracker::new();
        assert!(resolver(&store, false).resolve_action(&mut connection("a", "a"), &mut tracker));
    }
}
