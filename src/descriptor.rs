use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::unit::BuildUnit;

/// Build units collected during a configuration pass, in declaration order.
#[derive(Debug, Default)]
pub struct DescriptorSet {
    units: Vec<BuildUnit>,
    index: HashMap<String, usize>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. Fails if the name is taken or not a valid identifier.
    pub fn add_unit(&mut self, unit: BuildUnit) -> Result<()> {
        let name = unit.get_name();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(GraphError::InvalidIdentifier(name.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(GraphError::DuplicateIdentifier(name.to_string()));
        }

        self.index.insert(name.to_string(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    /// Close the set for graph construction.
    pub fn freeze(self) -> FrozenDescriptorSet {
        FrozenDescriptorSet {
            units: self.units,
            index: self.index,
        }
    }
}

/// Read-only descriptor set, the input of graph construction.
#[derive(Debug, Default)]
pub struct FrozenDescriptorSet {
    units: Vec<BuildUnit>,
    index: HashMap<String, usize>,
}

impl FrozenDescriptorSet {
    pub fn get_unit(&self, name: &str) -> Option<&BuildUnit> {
        self.index.get(name).map(|&i| &self.units[i])
    }

    /// Position of the unit in declaration order.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn units(&self) -> &[BuildUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl TryFrom<Vec<BuildUnit>> for FrozenDescriptorSet {
    type Error = GraphError;

    fn try_from(units: Vec<BuildUnit>) -> Result<Self> {
        let mut set = DescriptorSet::new();
        for unit in units {
            set.add_unit(unit)?;
        }
        Ok(set.freeze())
    }
}
