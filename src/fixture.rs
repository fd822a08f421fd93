//! Fixtures for tests

use crate::carrier::Carrier;
use crate::day_mapping::DayMapping;
use crate::device::{Device, DeviceCatalog, DeviceKind, DeviceModel, Rating};
use crate::model::Model;
use crate::model::parameters::{
    AnnuityMethod, CarrierSupply, Co2Mode, Economics, ModelParameters,
};
use crate::time_series::{Demand, HOURS_PER_YEAR, HourlyInputs, Weather};
use crate::units::{Area, Capacity, CapacityPerArea, Dimensionless, MoneyPerCapacity};
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Contents of a minimal valid `model.toml`
pub fn model_parameters_toml() -> String {
    r#"devices_to_use = ["BOI"]

[economics]
interest_rate = 0.05
observation_time = 20

[supply.electricity]
price = 0.3
capacity_price = 60.0
co2_factor = 0.4
feed_in = true
feed_in_revenue = 0.08
co2_feed_in_factor = 0.4

[supply.gas]
price = 0.06
co2_factor = 0.2
"#
    .into()
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    toml::from_str(&model_parameters_toml()).unwrap()
}

#[fixture]
pub fn economics() -> Economics {
    Economics {
        interest_rate: Dimensionless(0.05),
        observation_time: 20,
        annuity_method: AnnuityMethod::ResidualSeries,
        residual_discount: Dimensionless(0.1),
        inflation_factor: Dimensionless(1.017),
        price_change_el: None,
        price_change_gas: None,
    }
}

/// A device with the given conversion model and economic parameters
pub fn device(kind: DeviceKind, model: DeviceModel, max_capacity: f64, investment: f64) -> Device {
    Device {
        kind,
        feasible: true,
        min_capacity: Capacity(0.0),
        max_capacity: Capacity(max_capacity),
        investment_cost: MoneyPerCapacity(investment),
        om_rate: Dimensionless(0.02),
        lifetime: 20,
        model,
    }
}

#[fixture]
pub fn boiler() -> Device {
    device(
        DeviceKind::GasBoiler,
        DeviceModel::Converter {
            input: Carrier::Gas,
            output: Carrier::Heat,
            efficiency: Dimensionless(0.9),
            rating: Rating::Output,
        },
        1000.0,
        100.0,
    )
}

#[fixture]
pub fn chp() -> Device {
    Device {
        lifetime: 15,
        ..device(
            DeviceKind::GasChp,
            DeviceModel::Chp {
                fuel: Carrier::Gas,
                eta_el: Dimensionless(0.4),
                eta_th: Dimensionless(0.5),
            },
            500.0,
            900.0,
        )
    }
}

#[fixture]
pub fn electrolyser() -> Device {
    device(
        DeviceKind::Electrolyser,
        DeviceModel::Converter {
            input: Carrier::Electricity,
            output: Carrier::Hydrogen,
            efficiency: Dimensionless(0.7),
            rating: Rating::Input,
        },
        200.0,
        1500.0,
    )
}

#[fixture]
pub fn heat_pump() -> Device {
    device(
        DeviceKind::HeatPump,
        DeviceModel::HeatPump {
            carnot_efficiency: Dimensionless(0.4),
            supply_temperature: 45.0,
        },
        1000.0,
        1200.0,
    )
}

#[fixture]
pub fn battery() -> Device {
    device(
        DeviceKind::Battery,
        DeviceModel::Storage {
            carrier: Carrier::Electricity,
            loss_rate: Dimensionless(0.001),
            delta_t: None,
        },
        1000.0,
        500.0,
    )
}

/// Constant demand of heat and power with mild weather all year
#[fixture]
pub fn hourly_inputs() -> HourlyInputs {
    let constant = |value: f64| vec![value; HOURS_PER_YEAR];
    HourlyInputs::new(
        Demand {
            heat: constant(100.0),
            cooling: constant(0.0),
            power: constant(50.0),
            hydrogen: constant(0.0),
        },
        Weather {
            air_temperature: constant(5.0),
            ghi: constant(200.0),
            wind_speed: constant(6.0),
        },
    )
    .unwrap()
}

/// Every calendar day represented by the first day of the year
pub fn single_day_mapping() -> DayMapping {
    DayMapping::from_medoids(&[0; 365]).unwrap()
}

/// A boiler-only hub without an emission limit, reduced to a single representative day
#[fixture]
pub fn model(
    mut model_parameters: ModelParameters,
    boiler: Device,
    hourly_inputs: HourlyInputs,
) -> Model {
    model_parameters.objective = Co2Mode::Unconstrained;
    Model::new(
        PathBuf::from("model"),
        model_parameters,
        DeviceCatalog::new([boiler]),
        hourly_inputs,
        single_day_mapping(),
    )
}

/// A solar device with 20% efficiency which may cover up to 5000 m²
pub fn solar(kind: DeviceKind, output: Carrier) -> Device {
    device(
        kind,
        DeviceModel::Solar {
            output,
            efficiency: Dimensionless(0.2),
            peak_irradiance: CapacityPerArea(1.0),
            min_area: Area(0.0),
            max_area: Area(5000.0),
        },
        1000.0,
        300.0,
    )
}

/// A storage which keeps its whole charge from one hour to the next
pub fn lossless_storage(kind: DeviceKind, carrier: Carrier, delta_t: Option<f64>) -> Device {
    device(
        kind,
        DeviceModel::Storage {
            carrier,
            loss_rate: Dimensionless(0.0),
            delta_t,
        },
        2000.0,
        20.0,
    )
}

/// 800 W/m² of irradiance from 8:00 to 16:00 and a constant 50 kW demand of `carrier`
pub fn daylight_inputs(carrier: Carrier) -> HourlyInputs {
    let constant = |value: f64| vec![value; HOURS_PER_YEAR];
    let demand_of = |target: Carrier| constant(if target == carrier { 50.0 } else { 0.0 });
    HourlyInputs::new(
        Demand {
            heat: demand_of(Carrier::Heat),
            cooling: constant(0.0),
            power: demand_of(Carrier::Electricity),
            hydrogen: constant(0.0),
        },
        Weather {
            air_temperature: constant(5.0),
            ghi: (0..HOURS_PER_YEAR)
                .map(|hour| if (8..16).contains(&(hour % 24)) { 800.0 } else { 0.0 })
                .collect(),
            wind_speed: constant(6.0),
        },
    )
    .unwrap()
}

/// A hub in which a solar device and a lossless storage alone cover a constant demand of
/// `carrier` (electricity or heat).
///
/// Neither electricity nor gas can be bought. For heat, an idle boiler covers the peak demand.
/// The daily surplus of 8 × 100 kWh must be stored for the night.
pub fn daylight_model(carrier: Carrier) -> Model {
    let mut parameters = model_parameters();
    parameters.objective = Co2Mode::Unconstrained;
    parameters.supply.insert(Carrier::Electricity, CarrierSupply::UNAVAILABLE);
    parameters.supply.insert(Carrier::Gas, CarrierSupply::UNAVAILABLE);
    let devices = if carrier == Carrier::Electricity {
        vec![
            solar(DeviceKind::Photovoltaic, carrier),
            lossless_storage(DeviceKind::Battery, carrier, None),
        ]
    } else {
        vec![
            boiler(),
            solar(DeviceKind::SolarThermalCollector, carrier),
            lossless_storage(DeviceKind::ThermalStorage, carrier, Some(30.0)),
        ]
    };

    Model::new(
        PathBuf::from("model"),
        parameters,
        DeviceCatalog::new(devices),
        daylight_inputs(carrier),
        single_day_mapping(),
    )
}
