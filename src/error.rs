use std::fmt;
use thiserror::Error;

/// Bounded resources a composition can run out of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Buildings,
    Floors,
    Actors,
    FoliageCells,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Buildings => write!(f, "building count"),
            Resource::Floors => write!(f, "floor count"),
            Resource::Actors => write!(f, "actor count"),
            Resource::FoliageCells => write!(f, "foliage area (cells)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("capacity exceeded: {resource} {requested} > {limit} ({context})")]
    CapacityExceeded {
        resource: Resource,
        requested: u64,
        limit: u64,
        context: String,
    },

    #[error("no free anchor for building {building_index} within {searched_rings} rings of {origin}")]
    PlacementExhausted {
        building_index: usize,
        searched_rings: u32,
        origin: crate::data::GridCell,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ComposeError {
    pub fn capacity(resource: Resource, requested: usize, limit: usize, context: impl Into<String>) -> Self {
        ComposeError::CapacityExceeded {
            resource,
            requested: requested as u64,
            limit: limit as u64,
            context: context.into(),
        }
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, ComposeError::CapacityExceeded { .. })
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GridCell;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ComposeError::capacity(Resource::Buildings, 21, 20, "intent validation");
        assert_eq!(
            err.to_string(),
            "capacity exceeded: building count 21 > 20 (intent validation)"
        );
        assert!(err.is_capacity());

        let err = ComposeError::PlacementExhausted {
            building_index: 3,
            searched_rings: 8,
            origin: GridCell::new(4, 0),
        };
        assert!(err.to_string().contains("building 3"));
        assert!(!err.is_capacity());
    }
}
