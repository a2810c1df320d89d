//! Voyage patterns describe the shape of a voyage independently of the vessel sailing it.
use crate::port::PortID;
use indexmap::IndexSet;
use itertools::Itertools;
use std::fmt;

/// The discharge ports visited on a voyage, in order of visit.
///
/// A voyage visits at most two discharge ports.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub enum DischargePorts {
    /// All cargo is discharged at one port
    Single(PortID),
    /// Cargo is split between two distinct ports, visited in this order
    Split([PortID; 2]),
}

impl DischargePorts {
    /// The discharge ports as a slice, in order of visit
    pub fn as_slice(&self) -> &[PortID] {
        match self {
            Self::Single(port) => std::slice::from_ref(port),
            Self::Split(ports) => ports,
        }
    }

    /// The final port visited
    pub fn last(&self) -> &PortID {
        match self {
            Self::Single(port) => port,
            Self::Split([_, second]) => second,
        }
    }

    /// Whether cargo is split between two ports
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split(_))
    }
}

/// A voyage shape: load at one port, then discharge at one or two others
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct VoyagePattern {
    /// Where the cargo is loaded
    pub loading_port: PortID,
    /// Where the cargo is discharged
    pub discharge: DischargePorts,
}

impl fmt::Display for VoyagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}",
            self.loading_port,
            self.discharge.as_slice().iter().join("->")
        )
    }
}

/// Enumerate every voyage pattern for the given ports.
///
/// One direct pattern is produced for each (loading, unloading) pair, followed by one split
/// pattern for each loading port and ordered pair of distinct unloading ports. Repeated IDs are
/// ignored after their first occurrence, so the output is deterministic for a given input order.
pub fn generate_patterns(
    loading_ports: &[PortID],
    unloading_ports: &[PortID],
) -> Vec<VoyagePattern> {
    let loading: IndexSet<_> = loading_ports.iter().collect();
    let unloading: IndexSet<_> = unloading_ports.iter().collect();

    let direct = loading
        .iter()
        .cartesian_product(unloading.iter())
        .map(|(load, unload)| VoyagePattern {
            loading_port: (*load).clone(),
            discharge: DischargePorts::Single((*unload).clone()),
        });

    let split = loading.iter().flat_map(|load| {
        unloading
            .iter()
            .permutations(2)
            .map(move |pair| VoyagePattern {
                loading_port: (*load).clone(),
                discharge: DischargePorts::Split([(*pair[0]).clone(), (*pair[1]).clone()]),
            })
    });

    direct.chain(split).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ids(names: &[&str]) -> Vec<PortID> {
        names.iter().map(|&name| name.into()).collect()
    }

    #[rstest]
    #[case(1, 1, 1, 0)]
    #[case(1, 2, 2, 2)]
    #[case(2, 3, 6, 12)]
    #[case(6, 11, 66, 660)]
    #[case(0, 3, 0, 0)]
    #[case(2, 0, 0, 0)]
    fn test_pattern_counts(
        #[case] num_loading: usize,
        #[case] num_unloading: usize,
        #[case] expected_direct: usize,
        #[case] expected_split: usize,
    ) {
        let loading: Vec<PortID> = (1..=num_loading).map(|i| format!("L{i}").into()).collect();
        let unloading: Vec<PortID> = (1..=num_unloading)
            .map(|i| format!("U{i}").into())
            .collect();

        let patterns = generate_patterns(&loading, &unloading);
        let num_split = patterns.iter().filter(|p| p.discharge.is_split()).count();
        assert_eq!(patterns.len() - num_split, expected_direct);
        assert_eq!(num_split, expected_split);
    }

    #[test]
    fn test_pattern_order() {
        let patterns = generate_patterns(&ids(&["L1"]), &ids(&["U1", "U2"]));
        let names: Vec<_> = patterns.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["L1->U1", "L1->U2", "L1->U1->U2", "L1->U2->U1"]);
    }

    #[test]
    fn test_split_ports_distinct() {
        let patterns = generate_patterns(&ids(&["L1", "L2"]), &ids(&["U1", "U2", "U3"]));
        for pattern in patterns {
            if let DischargePorts::Split([first, second]) = &pattern.discharge {
                assert_ne!(first, second);
            }
        }
    }

    #[test]
    fn test_duplicates_collapsed() {
        let patterns = generate_patterns(&ids(&["L1", "L1"]), &ids(&["U1", "U2", "U1"]));
        assert_eq!(patterns, generate_patterns(&ids(&["L1"]), &ids(&["U1", "U2"])));
    }

    #[test]
    fn test_deterministic() {
        let loading = ids(&["L2", "L1"]);
        let unloading = ids(&["U3", "U1", "U2"]);
        assert_eq!(
            generate_patterns(&loading, &unloading),
            generate_patterns(&loading, &unloading)
        );
    }

    #[test]
    fn test_discharge_ports() {
        let split = DischargePorts::Split(["U1".into(), "U2".into()]);
        assert_eq!(split.as_slice(), &ids(&["U1", "U2"]));
        assert_eq!(split.last(), &PortID::from("U2"));

        let single = DischargePorts::Single("U1".into());
        assert_eq!(single.as_slice().len(), 1);
        assert!(!single.is_split());
    }
}
