use serde::{Deserialize, Serialize};

use crate::domain::dismi::model::{AbstractConstraint, Path};
use crate::domain::dismi::units;
use crate::domain::network::model::ProviderConstraint;

/// Availability that is served by a protected path instead of a numeric target.
const HIGH_AVAILABILITY_PERCENT: f64 = 99.9999;

/// Which candidate wins when the same constraint category shows up more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionLevels {
    pub bw_level: usize,
    pub delay_level: usize,
    pub security_level: usize,
}

/// Maps one abstract constraint onto its provider form.
///
/// # Returns
/// Returns None if the constraint carries no provider requirement (e.g.
/// encryption disabled) or its value cannot be parsed.
pub fn to_provider_constraint(constraint: &AbstractConstraint) -> Option<ProviderConstraint> {
    match constraint {
        AbstractConstraint::Bandwidth(value) => match units::parse_bandwidth(value) {
            Ok(bps) => Some(ProviderConstraint::Bandwidth { bps }),
            Err(e) => {
                log::error!("Ignoring bandwidth constraint: {}", e);
                None
            }
        },
        AbstractConstraint::Delay(value) => match units::parse_time(value) {
            Ok(seconds) => Some(ProviderConstraint::Latency { millis: (seconds * 1000.0).round() as u64 }),
            Err(e) => {
                log::error!("Ignoring delay constraint: {}", e);
                None
            }
        },
        AbstractConstraint::Security { encryption } => encryption.then_some(ProviderConstraint::Encryption),
        AbstractConstraint::HighAvailability(enabled) => enabled.then_some(ProviderConstraint::HighAvailability),
        AbstractConstraint::Availability(percent) => {
            if (percent - HIGH_AVAILABILITY_PERCENT).abs() < 1e-9 {
                Some(ProviderConstraint::HighAvailability)
            } else {
                Some(ProviderConstraint::Availability(*percent))
            }
        }
    }
}

pub fn to_provider_constraints(constraints: &[AbstractConstraint]) -> Vec<ProviderConstraint> {
    constraints.iter().filter_map(to_provider_constraint).collect()
}

/// Merges source, destination and intent constraints, keeping one constraint
/// per category.
///
/// Bandwidth candidates are ordered ascending and latency candidates
/// descending; the configured level picks among them. For the remaining
/// categories the first one seen wins.
pub fn select_constraints(
    src: &[ProviderConstraint],
    dst: &[ProviderConstraint],
    intent: &[ProviderConstraint],
    levels: SelectionLevels,
) -> Vec<ProviderConstraint> {
    let mut bandwidth: Vec<f64> = Vec::new();
    let mut latency: Vec<u64> = Vec::new();
    let mut encryption = false;
    let mut high_availability = false;
    let mut availability: Option<f64> = None;

    for c in src.iter().chain(dst).chain(intent) {
        match c {
            ProviderConstraint::Bandwidth { bps } => bandwidth.push(*bps),
            ProviderConstraint::Latency { millis } => latency.push(*millis),
            ProviderConstraint::Encryption => encryption = true,
            ProviderConstraint::HighAvailability => high_availability = true,
            ProviderConstraint::Availability(v) => {
                availability.get_or_insert(*v);
            }
            ProviderConstraint::Negotiable => {}
        }
    }

    bandwidth.sort_by(|a, b| a.total_cmp(b));
    latency.sort_by(|a, b| b.cmp(a));

    let mut selected = Vec::new();
    if let Some(bps) = bandwidth.get(levels.bw_level) {
        selected.push(ProviderConstraint::Bandwidth { bps: *bps });
    }
    if let Some(millis) = latency.get(levels.delay_level) {
        selected.push(ProviderConstraint::Latency { millis: *millis });
    }
    if encryption {
        selected.push(ProviderConstraint::Encryption);
    }
    if high_availability {
        selected.push(ProviderConstraint::HighAvailability);
    }
    if let Some(v) = availability {
        selected.push(ProviderConstraint::Availability(v));
    }
    selected
}

/// Provider constraints for one decomposed path.
pub fn compile_constraints(path: &Path, intent_constraints: &[AbstractConstraint], negotiable: bool, levels: SelectionLevels) -> Vec<ProviderConstraint> {
    let src = to_provider_constraints(&path.source.constraints);
    let dst = to_provider_constraints(&path.destination.constraints);
    let intent = to_provider_constraints(intent_constraints);

    let mut constraints = select_constraints(&src, &dst, &intent, levels);
    if negotiable {
        constraints.push(ProviderConstraint::Negotiable);
    }
    log::debug!("Compiled {} constraints.", constraints.len());
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_special_case() {
        assert_eq!(to_provider_constraint(&AbstractConstraint::Availability(99.9999)), Some(ProviderConstraint::HighAvailability));
        assert_eq!(to_provider_constraint(&AbstractConstraint::Availability(99.9)), Some(ProviderConstraint::Availability(99.9)));
    }

    #[test]
    fn delay_is_rounded_to_millis() {
        assert_eq!(to_provider_constraint(&AbstractConstraint::Delay("1500us".into())), Some(ProviderConstraint::Latency { millis: 2 }));
    }

    #[test]
    fn disabled_security_adds_nothing() {
        assert_eq!(to_provider_constraint(&AbstractConstraint::Security { encryption: false }), None);
    }

    #[test]
    fn selection_keeps_one_per_category() {
        let src = vec![ProviderConstraint::Bandwidth { bps: 5e6 }, ProviderConstraint::Latency { millis: 10 }];
        let dst = vec![ProviderConstraint::Bandwidth { bps: 1e6 }, ProviderConstraint::Encryption];
        let intent = vec![ProviderConstraint::Latency { millis: 30 }, ProviderConstraint::Encryption];

        let selected = select_constraints(&src, &dst, &intent, SelectionLevels::default());
        assert_eq!(
            selected,
            vec![ProviderConstraint::Bandwidth { bps: 1e6 }, ProviderConstraint::Latency { millis: 30 }, ProviderConstraint::Encryption]
        );

        let levels = SelectionLevels { bw_level: 1, delay_level: 1, security_level: 0 };
        let selected = select_constraints(&src, &dst, &intent, levels);
        assert!(selected.contains(&ProviderConstraint::Bandwidth { bps: 5e6 }), "Should pick the second smallest bandwidth");
        assert!(selected.contains(&ProviderConstraint::Latency { millis: 10 }), "Should pick the second largest latency");
    }
}
