//! Sailing times between pairs of ports.
use crate::error::PlanningError;
use crate::port::PortID;
use crate::units::Hours;
use std::collections::HashMap;

/// Sailing times keyed by ordered (from, to) port pairs
#[derive(PartialEq, Debug, Clone, Default)]
pub struct SailingTimeTable(HashMap<(PortID, PortID), Hours>);

impl SailingTimeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sailing time, returning the previous value for the pair, if any
    pub fn insert(&mut self, from: PortID, to: PortID, hours: Hours) -> Option<Hours> {
        self.0.insert((from, to), hours)
    }

    /// Look up the sailing time from one port to another.
    ///
    /// A missing entry is an error.
    pub fn get(&self, from: &PortID, to: &PortID) -> Result<Hours, PlanningError> {
        self.0
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| PlanningError::MissingDistanceData {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Whether the table contains an entry for the pair
    pub fn contains(&self, from: &PortID, to: &PortID) -> bool {
        self.0.contains_key(&(from.clone(), to.clone()))
    }

    /// Add the reverse of every entry whose reverse is not already present.
    ///
    /// # Returns
    ///
    /// The number of entries added
    pub fn add_reverse_entries(&mut self) -> usize {
        let missing: Vec<_> = self
            .0
            .iter()
            .filter(|((from, to), _)| !self.contains(to, from))
            .map(|((from, to), hours)| ((to.clone(), from.clone()), *hours))
            .collect();

        let count = missing.len();
        self.0.extend(missing);
        count
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in the table (in arbitrary order)
    pub fn iter(&self) -> impl Iterator<Item = (&PortID, &PortID, Hours)> {
        self.0.iter().map(|((from, to), hours)| (from, to, *hours))
    }
}

impl FromIterator<(PortID, PortID, Hours)> for SailingTimeTable {
    fn from_iter<I: IntoIterator<Item = (PortID, PortID, Hours)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(from, to, hours)| ((from, to), hours))
                .collect(),
        )
    }
}
