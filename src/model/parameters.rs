//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::carrier::Carrier;
use crate::device::DeviceKind;
use crate::input::{deserialise_proportion, input_err_msg, is_unique, read_toml};
use crate::units::{
    Capacity, Co2, Co2PerEnergy, Dimensionless, Energy, MoneyPerCapacity, MoneyPerCo2,
    MoneyPerEnergy,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_residual_discount, Dimensionless, 0.1);
define_unit_param_default!(default_inflation_factor, Dimensionless, 1.017);
define_unit_param_default!(default_co2_tolerance, Co2, 1e-6);
define_unit_param_default!(default_cost_slack, Dimensionless, 0.0);
define_param_default!(default_true, bool, true);
define_param_default!(default_mip_gap, f64, 0.02);
define_param_default!(default_time_limit, f64, 3600.0);
define_param_default!(default_gap_relaxation, f64, 5.0);
define_param_default!(default_cop_hp, f64, 3.0);
define_param_default!(default_cop_cc, f64, 4.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Device types which may be installed
    pub devices_to_use: Vec<DeviceKind>,
    /// Catalog file whose entries replace individual parameters of `devices.toml`
    pub device_overrides: Option<String>,
    /// Whether renewable generators count towards covering the peak power demand
    #[serde(default)]
    pub peak_dem_met_conv: bool,
    /// Interest, horizon and price escalation
    pub economics: Economics,
    /// CO₂ tax and feed-in credit limit
    #[serde(default)]
    pub emissions: Emissions,
    /// Supply and feed-in conditions of every carrier bought from outside the hub.
    ///
    /// Carriers which are not listed cannot be imported.
    #[serde(default)]
    pub supply: IndexMap<Carrier, CarrierSupply>,
    /// How CO₂ emissions are treated
    #[serde(default)]
    pub objective: Co2Mode,
    /// Options passed to the solver
    #[serde(default)]
    pub solver: SolverParameters,
    /// The conventional system used as a baseline (not calculated if omitted)
    pub reference: Option<ReferenceParameters>,
}

/// Economic parameters shared by all devices
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Economics {
    /// Interest rate
    pub interest_rate: Dimensionless,
    /// Observation period (years)
    pub observation_time: u32,
    /// How investments and replacements are annualised
    #[serde(default)]
    pub annuity_method: AnnuityMethod,
    /// Discount applied to the residual value of the final replacement (between 0 and 1)
    #[serde(
        default = "default_residual_discount",
        deserialize_with = "deserialise_proportion"
    )]
    pub residual_discount: Dimensionless,
    /// Annual price change factor applied to operation and maintenance
    #[serde(default = "default_inflation_factor")]
    pub inflation_factor: Dimensionless,
    /// Annual price change factor of electricity (derived from the price trajectory if omitted)
    pub price_change_el: Option<Dimensionless>,
    /// Annual price change factor of gas (derived from the price trajectory if omitted)
    pub price_change_gas: Option<Dimensionless>,
}

/// The formula used to annualise investments including replacements
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum AnnuityMethod {
    /// Discounted series of residual values
    #[default]
    #[string = "residual_series"]
    ResidualSeries,
    /// Replacement annuity after VDI 2067
    #[string = "replacement_annuity"]
    ReplacementAnnuity,
}

/// Parameters relating to CO₂ emissions
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Emissions {
    /// Tax on emissions from burning imported fuels (EUR/kg)
    #[serde(default)]
    pub co2_tax: MoneyPerCo2,
    /// Upper limit on the emissions credited for feed-in
    pub co2_feed_in_limit: Option<Co2>,
}

/// Conditions under which a carrier is bought from or fed into an external network
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct CarrierSupply {
    /// Whether the carrier may be imported at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Price of imported energy
    #[serde(default)]
    pub price: MoneyPerEnergy,
    /// Annual price of the grid connection per unit of capacity
    #[serde(default)]
    pub capacity_price: MoneyPerCapacity,
    /// Upper limit on the grid connection capacity
    pub capacity_limit: Option<Capacity>,
    /// Upper limit on the annual import
    pub supply_limit: Option<Energy>,
    /// Emissions caused by imported energy
    #[serde(default)]
    pub co2_factor: Co2PerEnergy,
    /// Whether the carrier may be fed into the grid
    #[serde(default)]
    pub feed_in: bool,
    /// Revenue for energy fed into the grid
    #[serde(default)]
    pub feed_in_revenue: MoneyPerEnergy,
    /// Upper limit on the energy for which feed-in revenue is paid
    pub feed_in_limit: Option<Energy>,
    /// Emissions credited for energy fed into the grid
    #[serde(default)]
    pub co2_feed_in_factor: Co2PerEnergy,
}

impl CarrierSupply {
    /// A carrier which cannot be bought or sold
    pub const UNAVAILABLE: Self = Self {
        enabled: false,
        price: MoneyPerEnergy(0.0),
        capacity_price: MoneyPerCapacity(0.0),
        capacity_limit: None,
        supply_limit: None,
        co2_factor: Co2PerEnergy(0.0),
        feed_in: false,
        feed_in_revenue: MoneyPerEnergy(0.0),
        feed_in_limit: None,
        co2_feed_in_factor: Co2PerEnergy(0.0),
    };
}

/// How CO₂ emissions enter the optimisation
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(tag = "co2_mode", rename_all = "snake_case")]
pub enum Co2Mode {
    /// Minimise cost with total emissions limited to a small tolerance
    HardLimit {
        /// Largest net emissions allowed (kg)
        #[serde(default = "default_co2_tolerance")]
        tolerance: Co2,
    },
    /// Minimise cost, then minimise emissions without raising cost by more than `cost_slack`
    Secondary {
        /// Relative increase of the total annualised cost allowed in the second stage
        #[serde(default = "default_cost_slack")]
        cost_slack: Dimensionless,
    },
    /// Minimise cost without any emission constraint
    Unconstrained,
}

impl Default for Co2Mode {
    fn default() -> Self {
        Self::HardLimit {
            tolerance: default_co2_tolerance(),
        }
    }
}

/// Options for the MILP solver
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct SolverParameters {
    /// Relative MIP gap at which the search stops
    #[serde(default = "default_mip_gap")]
    pub mip_gap: f64,
    /// Time limit for one solve (seconds)
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
    /// Seed for the solver's random choices
    #[serde(default)]
    pub random_seed: i32,
    /// Factor by which the gap is relaxed when the first solve hits a limit
    #[serde(default = "default_gap_relaxation")]
    pub gap_relaxation: f64,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            mip_gap: default_mip_gap(),
            time_limit: default_time_limit(),
            random_seed: 0,
            gap_relaxation: default_gap_relaxation(),
        }
    }
}

/// Parameters of the conventional reference system
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct ReferenceParameters {
    /// Whether the reference system contains a gas CHP unit
    #[serde(default = "default_true")]
    pub enable_chp: bool,
    /// Whether the reference system contains a heat pump
    #[serde(default)]
    pub enable_hp: bool,
    /// Constant COP of the reference heat pump
    #[serde(default = "default_cop_hp")]
    pub cop_hp: f64,
    /// Constant COP of the reference compression chiller
    #[serde(default = "default_cop_cc")]
    pub cop_cc: f64,
}

/// Check that the `devices_to_use` parameter is valid
fn check_devices_to_use(devices: &[DeviceKind]) -> Result<()> {
    ensure!(!devices.is_empty(), "`devices_to_use` is empty");
    ensure!(
        is_unique(devices),
        "`devices_to_use` cannot contain duplicate devices"
    );

    Ok(())
}

/// Check that the economic parameters are valid
fn check_economics(economics: &Economics) -> Result<()> {
    let rate = economics.interest_rate.value();
    ensure!(
        rate.is_finite() && rate >= 0.0,
        "interest_rate must be a finite non-negative number"
    );
    ensure!(
        economics.observation_time > 0,
        "observation_time must be greater than zero"
    );
    for (name, value) in [
        ("residual_discount", Some(economics.residual_discount)),
        ("inflation_factor", Some(economics.inflation_factor)),
        ("price_change_el", economics.price_change_el),
        ("price_change_gas", economics.price_change_gas),
    ] {
        if let Some(value) = value {
            ensure!(
                value.is_finite() && value.value() >= 0.0,
                "{name} must be a finite non-negative number"
            );
        }
    }

    Ok(())
}

/// Check that a non-negative quantity is valid
fn check_non_negative(name: &str, carrier: Carrier, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} of {carrier} must be a finite non-negative number"
    );

    Ok(())
}

/// Check that the supply conditions of a carrier are valid
fn check_carrier_supply(carrier: Carrier, supply: &CarrierSupply) -> Result<()> {
    ensure!(
        carrier.is_importable(),
        "{carrier} cannot be supplied from outside the hub"
    );
    if !carrier.is_exportable() {
        ensure!(!supply.feed_in, "{carrier} cannot be fed into a grid");
    }
    if !carrier.has_grid_connection() {
        ensure!(
            supply.capacity_price == MoneyPerCapacity(0.0) && supply.capacity_limit.is_none(),
            "{carrier} has no grid connection, so capacity_price and capacity_limit cannot be set"
        );
    }

    check_non_negative("price", carrier, supply.price.value())?;
    check_non_negative("capacity_price", carrier, supply.capacity_price.value())?;
    check_non_negative("feed_in_revenue", carrier, supply.feed_in_revenue.value())?;
    for (name, value) in [
        ("capacity_limit", supply.capacity_limit.map(Capacity::value)),
        ("supply_limit", supply.supply_limit.map(Energy::value)),
        ("feed_in_limit", supply.feed_in_limit.map(Energy::value)),
    ] {
        if let Some(value) = value {
            check_non_negative(name, carrier, value)?;
        }
    }
    ensure!(
        supply.co2_factor.is_finite() && supply.co2_feed_in_factor.is_finite(),
        "CO2 factors of {carrier} must be finite"
    );

    Ok(())
}

/// Check that the CO₂ mode is valid
fn check_co2_mode(mode: &Co2Mode) -> Result<()> {
    match mode {
        Co2Mode::HardLimit { tolerance } => ensure!(
            tolerance.is_finite(),
            "The CO2 tolerance must be a finite number"
        ),
        Co2Mode::Secondary { cost_slack } => ensure!(
            cost_slack.is_finite() && cost_slack.value() >= 0.0,
            "cost_slack must be a finite non-negative number"
        ),
        Co2Mode::Unconstrained => {}
    }

    Ok(())
}

/// Check that the solver options are valid
fn check_solver_parameters(solver: &SolverParameters) -> Result<()> {
    ensure!(
        (0.0..1.0).contains(&solver.mip_gap),
        "mip_gap must be at least zero and less than one"
    );
    ensure!(
        solver.time_limit > 0.0,
        "time_limit must be greater than zero"
    );
    ensure!(
        solver.gap_relaxation.is_finite() && solver.gap_relaxation >= 1.0,
        "gap_relaxation must be a finite number of at least one"
    );

    Ok(())
}

/// Check that the reference system parameters are valid
fn check_reference(reference: &ReferenceParameters) -> Result<()> {
    ensure!(
        reference.cop_hp.is_finite() && reference.cop_hp > 0.0,
        "cop_hp must be a finite number greater than zero"
    );
    ensure!(
        reference.cop_cc.is_finite() && reference.cop_cc > 0.0,
        "cop_cc must be a finite number greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// The supply conditions of a carrier
    pub fn supply(&self, carrier: Carrier) -> CarrierSupply {
        self.supply
            .get(&carrier)
            .copied()
            .unwrap_or(CarrierSupply::UNAVAILABLE)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_devices_to_use(&self.devices_to_use)?;
        check_economics(&self.economics)?;
        for (carrier, supply) in &self.supply {
            check_carrier_supply(*carrier, supply)?;
        }
        if let Some(limit) = self.emissions.co2_feed_in_limit {
            ensure!(limit.is_finite(), "co2_feed_in_limit must be a finite number");
        }
        ensure!(
            self.emissions.co2_tax.is_finite() && self.emissions.co2_tax.value() >= 0.0,
            "co2_tax must be a finite non-negative number"
        );
        check_co2_mode(&self.objective)?;
        check_solver_parameters(&self.solver)?;
        if let Some(reference) = &self.reference {
            check_reference(reference)?;
        }

        if self.economics.annuity_method == AnnuityMethod::ResidualSeries
            && self.economics.observation_time < 16
        {
            warn!(
                "The residual_series annuity method gives very small investment costs for \
                devices whose lifetime is much shorter than the observation time. Consider \
                comparing with annuity_method = \"replacement_annuity\"."
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model_parameters_toml;
    use rstest::rstest;
    use std::fmt::Display;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Helper function to assert validation result based on expected validity
    fn assert_validation_result<T, U: Display>(
        result: Result<T>,
        expected_valid: bool,
        value: U,
        expected_error_fragment: &str,
    ) {
        if expected_valid {
            assert!(
                result.is_ok(),
                "Expected value {} to be valid, but got error: {:?}",
                value,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Expected value {value} to be invalid, but it was accepted",
            );
            let error_message = result.err().unwrap().to_string();
            assert!(
                error_message.contains(expected_error_fragment),
                "Error message should mention the validation constraint, got: {error_message}",
            );
        }
    }

    #[test]
    fn test_check_devices_to_use() {
        assert!(check_devices_to_use(&[DeviceKind::GasBoiler]).is_ok());
        assert!(check_devices_to_use(&[]).is_err());
        assert!(check_devices_to_use(&[DeviceKind::GasBoiler, DeviceKind::GasBoiler]).is_err());
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            write!(file, "{}", model_parameters_toml()).unwrap();
        }

        let params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.devices_to_use, [DeviceKind::GasBoiler]);
        assert_eq!(params.economics.annuity_method, AnnuityMethod::ResidualSeries);
        assert_eq!(params.objective, Co2Mode::default());
        assert_eq!(params.solver, SolverParameters::default());
        assert!(params.supply(Carrier::Gas).enabled);
        assert_eq!(params.supply(Carrier::Waste), CarrierSupply::UNAVAILABLE);
    }

    #[test]
    fn test_co2_mode_from_toml() {
        let mode: Co2Mode = toml::from_str("co2_mode = \"secondary\"\ncost_slack = 0.05").unwrap();
        assert_eq!(
            mode,
            Co2Mode::Secondary {
                cost_slack: Dimensionless(0.05)
            }
        );

        let mode: Co2Mode = toml::from_str("co2_mode = \"hard_limit\"").unwrap();
        assert_eq!(mode, Co2Mode::default());

        let mode: Co2Mode = toml::from_str("co2_mode = \"unconstrained\"").unwrap();
        assert_eq!(mode, Co2Mode::Unconstrained);

        assert!(toml::from_str::<Co2Mode>("co2_mode = \"pareto\"").is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let toml = format!("enable_magic = true\n{}", model_parameters_toml());
        assert!(toml::from_str::<ModelParameters>(&toml).is_err());
    }

    #[rstest]
    #[case(Carrier::Electricity, true, true)]
    #[case(Carrier::Gas, true, true)]
    #[case(Carrier::Biomass, true, false)]
    #[case(Carrier::Hydrogen, false, true)]
    #[case(Carrier::Heat, false, false)]
    fn test_check_carrier_supply_feed_in(
        #[case] carrier: Carrier,
        #[case] feed_in: bool,
        #[case] expected_valid: bool,
    ) {
        let supply = CarrierSupply {
            enabled: true,
            feed_in,
            ..CarrierSupply::UNAVAILABLE
        };
        assert_eq!(check_carrier_supply(carrier, &supply).is_ok(), expected_valid);
    }

    #[test]
    fn test_check_carrier_supply_capacity_price() {
        let supply = CarrierSupply {
            capacity_price: MoneyPerCapacity(50.0),
            ..CarrierSupply::UNAVAILABLE
        };
        assert!(check_carrier_supply(Carrier::Electricity, &supply).is_ok());
        assert!(check_carrier_supply(Carrier::Biomass, &supply).is_err());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.3, true)]
    #[case(-0.1, false)]
    #[case(f64::INFINITY, false)]
    #[case(f64::NAN, false)]
    fn test_check_carrier_supply_price(#[case] value: f64, #[case] expected_valid: bool) {
        let supply = CarrierSupply {
            price: MoneyPerEnergy(value),
            ..CarrierSupply::UNAVAILABLE
        };
        assert_validation_result(
            check_carrier_supply(Carrier::Gas, &supply),
            expected_valid,
            value,
            "price of gas must be a finite non-negative number",
        );
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.02, true)]
    #[case(0.99, true)]
    #[case(1.0, false)]
    #[case(-0.01, false)]
    fn test_check_solver_mip_gap(#[case] value: f64, #[case] expected_valid: bool) {
        let solver = SolverParameters {
            mip_gap: value,
            ..SolverParameters::default()
        };
        assert_validation_result(
            check_solver_parameters(&solver),
            expected_valid,
            value,
            "mip_gap must be at least zero and less than one",
        );
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(5.0, true)]
    #[case(0.5, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_solver_gap_relaxation(#[case] value: f64, #[case] expected_valid: bool) {
        let solver = SolverParameters {
            gap_relaxation: value,
            ..SolverParameters::default()
        };
        assert_validation_result(
            check_solver_parameters(&solver),
            expected_valid,
            value,
            "gap_relaxation must be a finite number of at least one",
        );
    }

    #[rstest]
    #[case(3.0, true)]
    #[case(0.0, false)]
    #[case(-2.0, false)]
    fn test_check_reference_cop(#[case] value: f64, #[case] expected_valid: bool) {
        let reference = ReferenceParameters {
            enable_chp: false,
            enable_hp: true,
            cop_hp: value,
            cop_cc: 4.0,
        };
        assert_validation_result(
            check_reference(&reference),
            expected_valid,
            value,
            "cop_hp must be a finite number greater than zero",
        );
    }

    #[rstest]
    #[case("0.5", true)]
    #[case("1.0", true)]
    #[case("1.5", false)]
    fn test_residual_discount_is_proportion(#[case] value: &str, #[case] expected_valid: bool) {
        let toml =
            format!("interest_rate = 0.05\nobservation_time = 20\nresidual_discount = {value}");
        assert_eq!(toml::from_str::<Economics>(&toml).is_ok(), expected_valid);
    }

    #[test]
    fn test_check_economics_zero_horizon() {
        let economics = Economics {
            interest_rate: Dimensionless(0.05),
            observation_time: 0,
            annuity_method: AnnuityMethod::default(),
            residual_discount: default_residual_discount(),
            inflation_factor: default_inflation_factor(),
            price_change_el: None,
            price_change_gas: None,
        };
        assert!(check_economics(&economics).is_err());
    }
}
