//! Code for adding the decision variables of the design problem.
use super::{DesignProblem, Variable};
use crate::carrier::Carrier;
use crate::device::{Device, DeviceKind};
use crate::model::Model;
use crate::time_series::{DayProfiles, HOURS_PER_DAY, HOURS_PER_YEAR};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

/// One variable for each hour of each representative day
#[derive(Debug, Clone, PartialEq)]
pub struct SlotVariables(Vec<Variable>);

impl SlotVariables {
    /// Add a variable for every slot, all with the same bounds
    fn add(problem: &mut DesignProblem, name: &str, n_days: usize, lower: f64, upper: f64) -> Self {
        let vars = (0..n_days)
            .flat_map(|day| (0..HOURS_PER_DAY).map(move |hour| (day, hour)))
            .map(|(day, hour)| problem.add_column(format!("{name}_{day}_{hour}"), lower..=upper))
            .collect();
        Self(vars)
    }

    /// The variable of the given representative day and hour
    pub fn get(&self, day: usize, hour: usize) -> Variable {
        self.0[day * HOURS_PER_DAY + hour]
    }

    /// Iterate over the variables along with their day and hour
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Variable)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, var)| (idx / HOURS_PER_DAY, idx % HOURS_PER_DAY, *var))
    }

    /// Collect the values of the variables from the column values of a solution
    pub fn values(&self, values: &[f64]) -> DayProfiles {
        let days = self
            .0
            .chunks(HOURS_PER_DAY)
            .map(|chunk| {
                let mut day = [0.0; HOURS_PER_DAY];
                for (value, var) in day.iter_mut().zip(chunk) {
                    *value = values[var.index()];
                }
                day
            })
            .collect();
        DayProfiles::new(days)
    }
}

/// Variables of a storage device
#[derive(Debug, Clone, PartialEq)]
pub struct StorageVariables {
    /// Net charging power (negative when discharging)
    pub charge: SlotVariables,
    /// State of charge at the end of every hour of the calendar year
    pub soc: Vec<Variable>,
}

/// Annualised cost components of a device
#[derive(Debug, Clone, PartialEq)]
pub struct CostVariables {
    /// Annualised investment
    pub investment: Variable,
    /// Annual O&M
    pub om: Variable,
    /// Cost of the electricity and gas the device consumes
    pub demand: Variable,
    /// Sum of the components
    pub total: Variable,
}

/// Variables belonging to one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceVariables {
    /// Whether the device is installed (binary)
    pub selected: Variable,
    /// Installed capacity (kW, or kWh for storages)
    pub capacity: Variable,
    /// Installed area of solar devices
    pub area: Option<Variable>,
    /// Flow of every carrier the device consumes or produces
    pub flows: IndexMap<Carrier, SlotVariables>,
    /// Charging and state of charge of a storage
    pub storage: Option<StorageVariables>,
    /// Annualised cost components
    pub costs: CostVariables,
}

/// Variables for the exchange of a carrier with the outside of the hub
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierVariables {
    /// Hourly import
    pub import: SlotVariables,
    /// Weighted annual import
    pub import_total: Variable,
    /// Hourly export, if the carrier can be fed in
    pub export: Option<SlotVariables>,
    /// Weighted annual export
    pub export_total: Option<Variable>,
    /// Capacity of the grid connection
    pub grid_capacity: Option<Variable>,
    /// Annual energy cost of imports
    pub supply_cost: Variable,
    /// Annual cost of the grid connection
    pub capacity_cost: Option<Variable>,
    /// Annual revenue for paid feed-in
    pub feed_in_revenue: Option<Variable>,
}

/// All variables of the design problem
#[derive(Debug, Clone, PartialEq)]
pub struct Variables {
    /// Variables of every catalog device
    pub devices: IndexMap<DeviceKind, DeviceVariables>,
    /// Variables of every carrier which can be imported
    pub carriers: IndexMap<Carrier, CarrierVariables>,
    /// Tax on the emissions of burnt fuels
    pub co2_tax: Variable,
    /// Total annualised cost
    pub tac: Variable,
    /// Net annual emissions
    pub co2: Variable,
}

impl Variables {
    /// The flows of a device which consume or produce the given carrier
    pub fn device_flows(
        &self,
        carrier: Carrier,
    ) -> impl Iterator<Item = (DeviceKind, &SlotVariables)> {
        self.devices
            .iter()
            .filter_map(move |(kind, vars)| vars.flows.get(&carrier).map(|flow| (*kind, flow)))
    }
}

/// Add the variables of a single device
fn add_device_variables(
    problem: &mut DesignProblem,
    device: &Device,
    n_days: usize,
) -> DeviceVariables {
    let kind = device.kind;
    let selected = problem.add_binary_column(format!("x_{kind}"));
    let capacity = problem.add_column(format!("cap_{kind}"), 0.0..);
    let area = device
        .is_solar()
        .then(|| problem.add_column(format!("area_{kind}"), 0.0..));

    let flows = device
        .model
        .flow_carriers()
        .into_iter()
        .map(|carrier| {
            let name = format!("{kind}_{}", carrier.profile_label());
            let vars = SlotVariables::add(problem, &name, n_days, 0.0, f64::INFINITY);
            (carrier, vars)
        })
        .collect();

    let storage = device.is_storage().then(|| StorageVariables {
        charge: SlotVariables::add(
            problem,
            &format!("ch_{kind}"),
            n_days,
            f64::NEG_INFINITY,
            f64::INFINITY,
        ),
        soc: (0..HOURS_PER_YEAR)
            .map(|hour| problem.add_column(format!("soc_{kind}_{hour}"), 0.0..))
            .collect(),
    });

    let costs = CostVariables {
        investment: problem.add_column(format!("c_inv_{kind}"), 0.0..),
        om: problem.add_column(format!("c_om_{kind}"), 0.0..),
        demand: problem.add_column(format!("c_dem_{kind}"), 0.0..),
        total: problem.add_column(format!("c_total_{kind}"), 0.0..),
    };

    DeviceVariables {
        selected,
        capacity,
        area,
        flows,
        storage,
        costs,
    }
}

/// Add the import and export variables of a carrier
fn add_carrier_variables(
    problem: &mut DesignProblem,
    carrier: Carrier,
    n_days: usize,
) -> CarrierVariables {
    let label = carrier.profile_label();
    let import = SlotVariables::add(
        problem,
        &format!("import_{label}"),
        n_days,
        0.0,
        f64::INFINITY,
    );
    let import_total = problem.add_column(format!("import_total_{label}"), 0.0..);
    let (export, export_total, feed_in_revenue) = if carrier.is_exportable() {
        (
            Some(SlotVariables::add(
                problem,
                &format!("export_{label}"),
                n_days,
                0.0,
                f64::INFINITY,
            )),
            Some(problem.add_column(format!("export_total_{label}"), 0.0..)),
            Some(problem.add_column(format!("feed_in_revenue_{label}"), 0.0..)),
        )
    } else {
        (None, None, None)
    };
    let (grid_capacity, capacity_cost) = if carrier.has_grid_connection() {
        (
            Some(problem.add_column(format!("grid_cap_{label}"), 0.0..)),
            Some(problem.add_column(format!("capacity_cost_{label}"), 0.0..)),
        )
    } else {
        (None, None)
    };

    CarrierVariables {
        import,
        import_total,
        export,
        export_total,
        grid_capacity,
        supply_cost: problem.add_column(format!("supply_cost_{label}"), 0.0..),
        capacity_cost,
        feed_in_revenue,
    }
}

/// Add all variables of the design problem.
///
/// Variables are created for every device of the catalog, including devices which may not be
/// installed in this run; the selection constraints fix those at zero.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `model` - The model
pub fn add_variables(problem: &mut DesignProblem, model: &Model) -> Variables {
    let n_days = model.days.n_days();
    let devices = model
        .catalog
        .iter()
        .map(|device| (device.kind, add_device_variables(problem, device, n_days)))
        .collect();
    let carriers = Carrier::iter()
        .filter(|carrier| carrier.is_importable())
        .map(|carrier| (carrier, add_carrier_variables(problem, carrier, n_days)))
        .collect();

    Variables {
        devices,
        carriers,
        co2_tax: problem.add_column("co2_tax".into(), 0.0..),
        tac: problem.add_column("tac".into(), f64::NEG_INFINITY..),
        co2: problem.add_column("co2".into(), f64::NEG_INFINITY..),
    }
}
