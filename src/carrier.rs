//! Energy carriers tracked by the balance equations of the hub.
#![allow(missing_docs)]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A form of energy or fuel which is balanced independently in every time step
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    Electricity,
    Heat,
    Cooling,
    Gas,
    Hydrogen,
    Biomass,
    Waste,
}

impl Carrier {
    /// The prefix used for this carrier in the columns of the annual profile output
    pub fn profile_label(self) -> &'static str {
        match self {
            Self::Electricity => "power",
            Self::Heat => "heat",
            Self::Cooling => "cool",
            Self::Gas => "gas",
            Self::Hydrogen => "hydrogen",
            Self::Biomass => "biom",
            Self::Waste => "waste",
        }
    }

    /// Whether the carrier can be bought from outside the hub
    pub fn is_importable(self) -> bool {
        matches!(
            self,
            Self::Electricity | Self::Gas | Self::Hydrogen | Self::Biomass | Self::Waste
        )
    }

    /// Whether the carrier can be fed into an external grid
    pub fn is_exportable(self) -> bool {
        matches!(self, Self::Electricity | Self::Gas)
    }

    /// Whether imports are constrained by a contracted (and priced) grid connection
    pub fn has_grid_connection(self) -> bool {
        self.is_exportable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_carrier_names() {
        assert_eq!(Carrier::Electricity.to_string(), "electricity");
        assert_eq!(Carrier::from_str("biomass").unwrap(), Carrier::Biomass);
        assert!(Carrier::from_str("steam").is_err());
    }

    #[test]
    fn test_importable_exportable() {
        let importable = Carrier::iter().filter(|c| c.is_importable()).count();
        assert_eq!(importable, 5);
        assert!(Carrier::Gas.is_exportable());
        assert!(!Carrier::Heat.is_importable());
        assert!(!Carrier::Hydrogen.is_exportable());
    }
}
