//! Devices which can be installed in the energy hub and the immutable catalog holding them.
#![allow(missing_docs)]
use crate::carrier::Carrier;
use crate::units::{Area, Capacity, CapacityPerArea, Dimensionless, MoneyPerCapacity};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The fixed set of device types known to the model
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
pub enum DeviceKind {
    #[strum(serialize = "PV")]
    #[serde(rename = "PV")]
    Photovoltaic,
    #[strum(serialize = "WT")]
    #[serde(rename = "WT")]
    WindTurbine,
    #[strum(serialize = "STC")]
    #[serde(rename = "STC")]
    SolarThermalCollector,
    #[strum(serialize = "WAT")]
    #[serde(rename = "WAT")]
    Hydropower,
    #[strum(serialize = "HP")]
    #[serde(rename = "HP")]
    HeatPump,
    #[strum(serialize = "EB")]
    #[serde(rename = "EB")]
    ElectricBoiler,
    #[strum(serialize = "CC")]
    #[serde(rename = "CC")]
    CompressionChiller,
    #[strum(serialize = "AC")]
    #[serde(rename = "AC")]
    AbsorptionChiller,
    #[strum(serialize = "CHP")]
    #[serde(rename = "CHP")]
    GasChp,
    #[strum(serialize = "BOI")]
    #[serde(rename = "BOI")]
    GasBoiler,
    #[strum(serialize = "GHP")]
    #[serde(rename = "GHP")]
    GasHeatPump,
    #[strum(serialize = "BCHP")]
    #[serde(rename = "BCHP")]
    BiomassChp,
    #[strum(serialize = "BBOI")]
    #[serde(rename = "BBOI")]
    BiomassBoiler,
    #[strum(serialize = "WCHP")]
    #[serde(rename = "WCHP")]
    WasteChp,
    #[strum(serialize = "WBOI")]
    #[serde(rename = "WBOI")]
    WasteBoiler,
    #[strum(serialize = "ELYZ")]
    #[serde(rename = "ELYZ")]
    Electrolyser,
    #[strum(serialize = "FC")]
    #[serde(rename = "FC")]
    FuelCell,
    #[strum(serialize = "H2S")]
    #[serde(rename = "H2S")]
    HydrogenStorage,
    #[strum(serialize = "SAB")]
    #[serde(rename = "SAB")]
    SabatierReactor,
    #[strum(serialize = "TES")]
    #[serde(rename = "TES")]
    ThermalStorage,
    #[strum(serialize = "CTES")]
    #[serde(rename = "CTES")]
    ColdStorage,
    #[strum(serialize = "BAT")]
    #[serde(rename = "BAT")]
    Battery,
    #[strum(serialize = "GS")]
    #[serde(rename = "GS")]
    GasStorage,
}

impl DeviceKind {
    /// Whether the device produces energy from an on-site renewable resource
    pub fn is_renewable(self) -> bool {
        matches!(
            self,
            Self::Photovoltaic | Self::WindTurbine | Self::Hydropower | Self::SolarThermalCollector
        )
    }
}

/// Which flow of a converter its capacity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    /// Capacity limits the consumed carrier
    Input,
    /// Capacity limits the produced carrier
    Output,
}

/// The conversion physics of a device.
///
/// Each variant carries exactly the parameters its conversion constraints need.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceModel {
    /// Roof-mounted solar device whose capacity follows from the installed area
    Solar {
        /// Electricity (PV) or heat (STC)
        output: Carrier,
        /// Conversion efficiency of irradiance
        efficiency: Dimensionless,
        /// Irradiance at standard test conditions (kW/m²)
        peak_irradiance: CapacityPerArea,
        /// Smallest area which may be installed
        min_area: Area,
        /// Largest available area
        max_area: Area,
    },
    /// Wind turbine following a reference power curve
    Wind {
        /// Hub height (m)
        hub_height: f64,
        /// Height at which the wind speed was measured (m)
        reference_height: f64,
        /// Exponent of the power law for the wind profile
        roughness_exponent: f64,
    },
    /// Run-of-river hydropower with a constant potential
    Hydro {
        /// Power available in every hour
        potential: Capacity,
    },
    /// Electric heat pump with a temperature-dependent coefficient of performance
    HeatPump {
        /// Fraction of the Carnot COP which is reached
        carnot_efficiency: Dimensionless,
        /// Supply temperature (°C)
        supply_temperature: f64,
    },
    /// Single-input, single-output converter with constant efficiency
    Converter {
        input: Carrier,
        output: Carrier,
        efficiency: Dimensionless,
        rating: Rating,
    },
    /// Combined heat and power unit; capacity limits both outputs
    Chp {
        fuel: Carrier,
        eta_el: Dimensionless,
        eta_th: Dimensionless,
    },
    /// Hydrogen fuel cell
    FuelCell {
        eta_el: Dimensionless,
        eta_th: Dimensionless,
        /// Whether surplus heat may be dissipated instead of used
        heat_dissipation: bool,
    },
    /// Storage of a single carrier
    Storage {
        carrier: Carrier,
        /// Fraction of the stored energy lost per hour
        loss_rate: Dimensionless,
        /// Temperature spread of a water tank (K), used to report its volume
        delta_t: Option<f64>,
    },
}

impl DeviceModel {
    /// Carriers consumed by the device
    pub fn inputs(&self) -> Vec<Carrier> {
        match self {
            Self::HeatPump { .. } => vec![Carrier::Electricity],
            Self::Converter { input, .. } => vec![*input],
            Self::Chp { fuel, .. } => vec![*fuel],
            Self::FuelCell { .. } => vec![Carrier::Hydrogen],
            Self::Solar { .. } | Self::Wind { .. } | Self::Hydro { .. } | Self::Storage { .. } => {
                Vec::new()
            }
        }
    }

    /// Carriers produced by the device
    pub fn outputs(&self) -> Vec<Carrier> {
        match self {
            Self::Solar { output, .. } | Self::Converter { output, .. } => vec![*output],
            Self::Wind { .. } | Self::Hydro { .. } => vec![Carrier::Electricity],
            Self::HeatPump { .. } => vec![Carrier::Heat],
            Self::Chp { .. } | Self::FuelCell { .. } => {
                vec![Carrier::Electricity, Carrier::Heat]
            }
            Self::Storage { .. } => Vec::new(),
        }
    }

    /// All carriers for which the device has a flow variable
    pub fn flow_carriers(&self) -> Vec<Carrier> {
        let mut carriers = self.inputs();
        carriers.extend(self.outputs());
        carriers
    }

    /// The flows which may not exceed the installed capacity in any hour
    pub fn rated_carriers(&self) -> Vec<Carrier> {
        match self {
            Self::Converter {
                input,
                rating: Rating::Input,
                ..
            } => vec![*input],
            Self::FuelCell { .. } => vec![Carrier::Electricity],
            _ => self.outputs(),
        }
    }

    /// The carrier reported as the device's generation
    pub fn primary_output(&self) -> Option<Carrier> {
        self.outputs().first().copied()
    }

    /// The carrier held by a storage device
    pub fn storage_carrier(&self) -> Option<Carrier> {
        match self {
            Self::Storage { carrier, .. } => Some(*carrier),
            _ => None,
        }
    }

    /// How much firm supply of `carrier` one unit of installed capacity provides.
    ///
    /// Used to check that the installed capacity covers the unclustered peak demand. Weather
    /// dependent devices only count when `count_renewables` is set.
    pub fn peak_capacity_factor(
        &self,
        carrier: Carrier,
        count_renewables: bool,
    ) -> Option<Dimensionless> {
        let one = Dimensionless(1.0);
        match (self, carrier) {
            (Self::HeatPump { .. }, Carrier::Heat) => Some(one),
            (
                Self::Converter {
                    output,
                    efficiency,
                    rating,
                    ..
                },
                _,
            ) if *output == carrier => match rating {
                Rating::Output => Some(one),
                Rating::Input => Some(*efficiency),
            },
            (Self::Chp { eta_el, eta_th, .. } | Self::FuelCell { eta_el, eta_th, .. }, _) => {
                match carrier {
                    Carrier::Electricity => Some(one),
                    Carrier::Heat => Some(*eta_th / *eta_el),
                    _ => None,
                }
            }
            (Self::Solar { output, .. }, _) if *output == Carrier::Electricity => {
                (count_renewables && carrier == Carrier::Electricity).then_some(one)
            }
            (Self::Wind { .. } | Self::Hydro { .. }, Carrier::Electricity) => {
                count_renewables.then_some(one)
            }
            _ => None,
        }
    }
}

/// Coefficient of performance of a heat pump at the given air temperature (°C).
///
/// Zero when the supply temperature does not exceed the air temperature.
pub fn carnot_cop(
    carnot_efficiency: Dimensionless,
    supply_temperature: f64,
    air_temperature: f64,
) -> f64 {
    let lift = supply_temperature - air_temperature;
    if lift <= 0.0 {
        return 0.0;
    }

    carnot_efficiency.value() * (supply_temperature + 273.15) / lift
}

/// A device type with its technical and economic parameters for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// The device type
    pub kind: DeviceKind,
    /// Whether the device may be installed in this run
    pub feasible: bool,
    /// Smallest capacity which may be installed
    pub min_capacity: Capacity,
    /// Largest capacity which may be installed
    pub max_capacity: Capacity,
    /// Specific investment cost
    pub investment_cost: MoneyPerCapacity,
    /// Annual operation and maintenance cost as a fraction of the specific investment cost
    pub om_rate: Dimensionless,
    /// Service life in years
    pub lifetime: u32,
    /// Conversion physics
    pub model: DeviceModel,
}

impl Device {
    /// Whether the device is a storage
    pub fn is_storage(&self) -> bool {
        matches!(self.model, DeviceModel::Storage { .. })
    }

    /// Whether the device's capacity is derived from its installed area
    pub fn is_solar(&self) -> bool {
        matches!(self.model, DeviceModel::Solar { .. })
    }
}

/// The immutable set of devices available to a run, ordered by device type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceCatalog(IndexMap<DeviceKind, Device>);

impl DeviceCatalog {
    /// Create a catalog from a list of devices, ordering them by device type
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut map: IndexMap<_, _> = devices.into_iter().map(|dev| (dev.kind, dev)).collect();
        map.sort_keys();
        Self(map)
    }

    /// Get the device of the given type, if it is part of the catalog
    pub fn get(&self, kind: DeviceKind) -> Option<&Device> {
        self.0.get(&kind)
    }

    /// Iterate over all devices
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.0.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{boiler, chp, electrolyser};
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_device_kind_labels() {
        assert_eq!(DeviceKind::iter().count(), 23);
        assert_eq!(DeviceKind::GasChp.to_string(), "CHP");
        assert_eq!(DeviceKind::from_str("ELYZ").unwrap(), DeviceKind::Electrolyser);
        assert!(DeviceKind::from_str("NUKE").is_err());
    }

    #[rstest]
    #[case(35.0, 0.0, 0.4 * 308.15 / 35.0)]
    #[case(35.0, 34.0, 0.4 * 308.15)]
    #[case(35.0, 35.0, 0.0)]
    #[case(35.0, 40.0, 0.0)]
    fn test_carnot_cop(#[case] supply: f64, #[case] air: f64, #[case] expected: f64) {
        let cop = carnot_cop(Dimensionless(0.4), supply, air);
        float_cmp::assert_approx_eq!(f64, cop, expected, epsilon = 1e-9);
    }

    #[rstest]
    fn test_chp_flows(chp: Device) {
        assert_eq!(chp.model.inputs(), [Carrier::Gas]);
        assert_eq!(
            chp.model.rated_carriers(),
            [Carrier::Electricity, Carrier::Heat]
        );
        let factor = chp.model.peak_capacity_factor(Carrier::Heat, false).unwrap();
        assert_eq!(factor, Dimensionless(0.5 / 0.4));
    }

    #[rstest]
    fn test_electrolyser_rated_on_input(electrolyser: Device) {
        assert_eq!(electrolyser.model.rated_carriers(), [Carrier::Electricity]);
        assert_eq!(
            electrolyser
                .model
                .peak_capacity_factor(Carrier::Hydrogen, false),
            Some(Dimensionless(0.7))
        );
    }

    #[rstest]
    fn test_catalog_is_ordered(boiler: Device, chp: Device) {
        let catalog = DeviceCatalog::new([boiler, chp]);
        let kinds: Vec<_> = catalog.iter().map(|dev| dev.kind).collect();
        assert_eq!(kinds, [DeviceKind::GasChp, DeviceKind::GasBoiler]);
        assert!(catalog.get(DeviceKind::GasBoiler).unwrap().feasible);
        assert!(catalog.get(DeviceKind::HeatPump).is_none());
    }
}
