//! Unique identifiers for planning entities.
//!
//! The backend assigns integer primary keys; each entity kind gets its own
//! newtype so an organization id can never be passed where a plan id is
//! expected.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw backend key.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an Organization
    OrganizationId
);
entity_id!(
    /// Unique identifier for a Plan
    PlanId
);
entity_id!(
    /// Unique identifier for a StrategicObjective
    ObjectiveId
);
entity_id!(
    /// Unique identifier for a Program
    ProgramId
);
entity_id!(
    /// Unique identifier for a StrategicInitiative
    InitiativeId
);
entity_id!(
    /// Unique identifier for a PerformanceMeasure
    MeasureId
);
entity_id!(
    /// Unique identifier for a MainActivity
    ActivityId
);
entity_id!(
    /// Unique identifier for a SubActivity or legacy ActivityBudget line
    BudgetLineId
);
entity_id!(
    /// Unique identifier for a User
    UserId
);
entity_id!(
    /// Unique identifier for a PlanReview
    ReviewId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&PlanId(42)).unwrap();
        assert_eq!(json, "42");
        let back: PlanId = serde_json::from_str("42").unwrap();
        assert_eq!(back, PlanId(42));
    }

    #[test]
    fn test_id_works_as_json_map_key() {
        let map: BTreeMap<ObjectiveId, f64> =
            serde_json::from_str(r#"{"3": 40.0, "7": 60.0}"#).unwrap();
        assert_eq!(map.get(&ObjectiveId(3)), Some(&40.0));
        assert_eq!(map.get(&ObjectiveId(7)), Some(&60.0));
    }

    #[test]
    fn test_id_parse() {
        assert_eq!(" 12 ".parse::<OrganizationId>().unwrap(), OrganizationId(12));
        assert!("abc".parse::<OrganizationId>().is_err());
    }
}
