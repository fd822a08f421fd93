//! Code for reading the device catalog and building the immutable [`DeviceCatalog`].
#![allow(missing_docs)]
use super::{input_err_msg, read_toml};
use crate::carrier::Carrier;
use crate::device::{Device, DeviceCatalog, DeviceKind, DeviceModel, Rating};
use crate::units::{Area, Capacity, CapacityPerArea, Dimensionless, MoneyPerCapacity};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const DEVICES_FILE_NAME: &str = "devices.toml";

/// Device parameters as they appear in the catalog files.
///
/// Every field is optional so that override files only need to name the values they change.
/// Which fields are required depends on the device type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDevice {
    pub min_cap: Option<f64>,
    pub max_cap: Option<f64>,
    pub inv_var: Option<f64>,
    pub cost_om: Option<f64>,
    pub life_time: Option<u32>,
    pub eta: Option<f64>,
    pub eta_el: Option<f64>,
    pub eta_th: Option<f64>,
    pub cop: Option<f64>,
    pub eta_carnot: Option<f64>,
    pub supply_temp: Option<f64>,
    pub g_stc: Option<f64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub hub_h: Option<f64>,
    pub ref_h: Option<f64>,
    pub h_coeff: Option<f64>,
    pub potential: Option<f64>,
    pub sto_loss: Option<f64>,
    pub enable_heat_diss: Option<bool>,
    pub delta_t: Option<f64>,
}

macro_rules! merge_fields {
    ($base:ident, $other:ident, $($field:ident),*) => {
        RawDevice {
            $($field: $other.$field.or($base.$field)),*
        }
    };
}

impl RawDevice {
    /// Overlay the values given in `other` on top of these
    pub fn merge(self, other: RawDevice) -> RawDevice {
        merge_fields!(
            self,
            other,
            min_cap,
            max_cap,
            inv_var,
            cost_om,
            life_time,
            eta,
            eta_el,
            eta_th,
            cop,
            eta_carnot,
            supply_temp,
            g_stc,
            min_area,
            max_area,
            hub_h,
            ref_h,
            h_coeff,
            potential,
            sto_loss,
            enable_heat_diss,
            delta_t
        )
    }
}

/// Raw catalog entries keyed by device type
pub type RawCatalog = IndexMap<DeviceKind, RawDevice>;

/// Read the base catalog from the model directory and apply an optional override file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `override_file` - Name of a file in the model directory whose entries replace base values
pub fn read_raw_catalog(model_dir: &Path, override_file: Option<&str>) -> Result<RawCatalog> {
    let base: RawCatalog = read_toml(&model_dir.join(DEVICES_FILE_NAME))?;
    let Some(override_file) = override_file else {
        return Ok(base);
    };

    let file_path = model_dir.join(override_file);
    let overrides: RawCatalog = read_toml(&file_path)?;
    apply_overrides(base, overrides).with_context(|| input_err_msg(&file_path))
}

/// Overlay override entries on the base catalog.
///
/// Device types missing from the base catalog are rejected.
pub fn apply_overrides(mut base: RawCatalog, overrides: RawCatalog) -> Result<RawCatalog> {
    for (kind, raw) in overrides {
        let entry = base.get_mut(&kind).with_context(|| {
            format!("Device {kind} in override file was not found in the base catalog")
        })?;
        *entry = entry.clone().merge(raw);
    }

    Ok(base)
}

/// Get a required parameter, raising a configuration error if it is missing
fn required<T>(value: Option<T>, kind: DeviceKind, name: &str) -> Result<T> {
    value.with_context(|| format!("Device {kind} is missing required parameter {name}"))
}

/// Get a required efficiency-like parameter which must be a finite positive number
fn required_positive(value: Option<f64>, kind: DeviceKind, name: &str) -> Result<Dimensionless> {
    let value = required(value, kind, name)?;
    ensure!(
        value.is_finite() && value > 0.0,
        "Parameter {name} of device {kind} must be a finite number greater than zero"
    );

    Ok(Dimensionless(value))
}

/// Build the conversion model for a device type from its raw parameters
fn build_model(kind: DeviceKind, raw: &RawDevice) -> Result<DeviceModel> {
    use DeviceKind as K;

    let converter = |input, output, name: &str, value, rating| -> Result<DeviceModel> {
        Ok(DeviceModel::Converter {
            input,
            output,
            efficiency: required_positive(value, kind, name)?,
            rating,
        })
    };
    let chp = |fuel| -> Result<DeviceModel> {
        Ok(DeviceModel::Chp {
            fuel,
            eta_el: required_positive(raw.eta_el, kind, "eta_el")?,
            eta_th: required_positive(raw.eta_th, kind, "eta_th")?,
        })
    };
    let storage = |carrier| -> Result<DeviceModel> {
        let loss_rate = raw.sto_loss.unwrap_or(0.0);
        ensure!(
            (0.0..=1.0).contains(&loss_rate),
            "Parameter sto_loss of device {kind} must be between 0 and 1"
        );
        Ok(DeviceModel::Storage {
            carrier,
            loss_rate: Dimensionless(loss_rate),
            delta_t: raw.delta_t,
        })
    };
    let solar = |output| -> Result<DeviceModel> {
        let min_area = raw.min_area.unwrap_or(0.0);
        let max_area = required(raw.max_area, kind, "max_area")?;
        ensure!(
            0.0 <= min_area && min_area <= max_area,
            "Area bounds of device {kind} must satisfy 0 <= min_area <= max_area"
        );
        Ok(DeviceModel::Solar {
            output,
            efficiency: required_positive(raw.eta, kind, "eta")?,
            peak_irradiance: CapacityPerArea(required_positive(raw.g_stc, kind, "g_stc")?.0),
            min_area: Area(min_area),
            max_area: Area(max_area),
        })
    };

    match kind {
        K::Photovoltaic => solar(Carrier::Electricity),
        K::SolarThermalCollector => solar(Carrier::Heat),
        K::WindTurbine => Ok(DeviceModel::Wind {
            hub_height: required_positive(raw.hub_h, kind, "hub_h")?.0,
            reference_height: required_positive(raw.ref_h, kind, "ref_h")?.0,
            roughness_exponent: required(raw.h_coeff, kind, "h_coeff")?,
        }),
        K::Hydropower => {
            let potential = required(raw.potential, kind, "potential")?;
            ensure!(
                potential >= 0.0,
                "Parameter potential of device {kind} cannot be negative"
            );
            Ok(DeviceModel::Hydro {
                potential: Capacity(potential),
            })
        }
        K::HeatPump => Ok(DeviceModel::HeatPump {
            carnot_efficiency: required_positive(raw.eta_carnot, kind, "eta_carnot")?,
            supply_temperature: required(raw.supply_temp, kind, "supply_temp")?,
        }),
        K::ElectricBoiler => converter(
            Carrier::Electricity,
            Carrier::Heat,
            "eta_th",
            raw.eta_th,
            Rating::Output,
        ),
        K::CompressionChiller => converter(
            Carrier::Electricity,
            Carrier::Cooling,
            "cop",
            raw.cop,
            Rating::Output,
        ),
        K::AbsorptionChiller => converter(
            Carrier::Heat,
            Carrier::Cooling,
            "eta_th",
            raw.eta_th,
            Rating::Output,
        ),
        K::GasBoiler => converter(
            Carrier::Gas,
            Carrier::Heat,
            "eta_th",
            raw.eta_th,
            Rating::Output,
        ),
        K::GasHeatPump => converter(Carrier::Gas, Carrier::Heat, "cop", raw.cop, Rating::Output),
        K::BiomassBoiler => converter(
            Carrier::Biomass,
            Carrier::Heat,
            "eta_th",
            raw.eta_th,
            Rating::Output,
        ),
        K::WasteBoiler => converter(
            Carrier::Waste,
            Carrier::Heat,
            "eta_th",
            raw.eta_th,
            Rating::Output,
        ),
        K::Electrolyser => converter(
            Carrier::Electricity,
            Carrier::Hydrogen,
            "eta_el",
            raw.eta_el,
            Rating::Input,
        ),
        K::SabatierReactor => converter(
            Carrier::Hydrogen,
            Carrier::Gas,
            "eta",
            raw.eta,
            Rating::Output,
        ),
        K::GasChp => chp(Carrier::Gas),
        K::BiomassChp => chp(Carrier::Biomass),
        K::WasteChp => chp(Carrier::Waste),
        K::FuelCell => Ok(DeviceModel::FuelCell {
            eta_el: required_positive(raw.eta_el, kind, "eta_el")?,
            eta_th: required_positive(raw.eta_th, kind, "eta_th")?,
            heat_dissipation: raw.enable_heat_diss.unwrap_or(false),
        }),
        K::HydrogenStorage => storage(Carrier::Hydrogen),
        K::ThermalStorage => storage(Carrier::Heat),
        K::ColdStorage => storage(Carrier::Cooling),
        K::Battery => storage(Carrier::Electricity),
        K::GasStorage => storage(Carrier::Gas),
    }
}

/// Build a single device from its raw parameters
fn build_device(kind: DeviceKind, raw: &RawDevice, feasible: bool) -> Result<Device> {
    let lifetime = required(raw.life_time, kind, "life_time")?;
    ensure!(lifetime > 0, "Device {kind} must have a life_time of at least one year");

    let model = build_model(kind, raw)?;

    let min_capacity = raw.min_cap.unwrap_or(0.0);
    let max_capacity = if matches!(model, DeviceModel::Solar { .. }) {
        raw.max_cap.unwrap_or(f64::INFINITY)
    } else {
        required(raw.max_cap, kind, "max_cap")?
    };
    ensure!(
        0.0 <= min_capacity && min_capacity <= max_capacity,
        "Capacity bounds of device {kind} must satisfy 0 <= min_cap <= max_cap"
    );

    let investment_cost = raw.inv_var.unwrap_or(0.0);
    let om_rate = raw.cost_om.unwrap_or(0.0);
    ensure!(
        investment_cost.is_finite() && investment_cost >= 0.0,
        "Parameter inv_var of device {kind} must be a finite non-negative number"
    );
    ensure!(
        om_rate.is_finite() && om_rate >= 0.0,
        "Parameter cost_om of device {kind} must be a finite non-negative number"
    );

    Ok(Device {
        kind,
        feasible,
        min_capacity: Capacity(min_capacity),
        max_capacity: Capacity(max_capacity),
        investment_cost: MoneyPerCapacity(investment_cost),
        om_rate: Dimensionless(om_rate),
        lifetime,
        model,
    })
}

/// Build the immutable device catalog.
///
/// Devices named in `devices_to_use` are marked as feasible; every other catalog entry is kept
/// but may not be installed.
///
/// # Arguments
///
/// * `raw` - The raw catalog entries
/// * `devices_to_use` - Device types which may be installed in this run
pub fn build_catalog(raw: &RawCatalog, devices_to_use: &[DeviceKind]) -> Result<DeviceCatalog> {
    for kind in devices_to_use {
        ensure!(
            raw.contains_key(kind),
            "Device {kind} is listed in devices_to_use but missing from the catalog"
        );
    }

    let devices = raw
        .iter()
        .map(|(kind, raw)| build_device(*kind, raw, devices_to_use.contains(kind)))
        .collect::<Result<Vec<_>>>()?;

    Ok(DeviceCatalog::new(devices))
}

/// Read the device catalog of a model.
pub fn read_catalog(
    model_dir: &Path,
    override_file: Option<&str>,
    devices_to_use: &[DeviceKind],
) -> Result<DeviceCatalog> {
    let raw = read_raw_catalog(model_dir, override_file)?;
    let file_path = model_dir.join(DEVICES_FILE_NAME);
    build_catalog(&raw, devices_to_use).with_context(|| input_err_msg(file_path))
}
