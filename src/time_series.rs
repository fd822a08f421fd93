//! Demand and weather time series at full-year and representative-day resolution.
use crate::carrier::Carrier;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Number of hourly time steps in a day
pub const HOURS_PER_DAY: usize = 24;

/// Number of calendar days in the modelled year
pub const DAYS_PER_YEAR: usize = 365;

/// Number of hourly time steps in the modelled year
pub const HOURS_PER_YEAR: usize = HOURS_PER_DAY * DAYS_PER_YEAR;

/// Month names and their lengths in a 365-day year
const MONTHS: [(&str, usize); 12] = [
    ("Jan", 31),
    ("Feb", 28),
    ("Mar", 31),
    ("Apr", 30),
    ("May", 31),
    ("Jun", 30),
    ("Jul", 31),
    ("Aug", 31),
    ("Sep", 30),
    ("Oct", 31),
    ("Nov", 30),
    ("Dec", 31),
];

/// Hourly values for each representative day
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayProfiles(Vec<[f64; HOURS_PER_DAY]>);

impl DayProfiles {
    /// Create profiles from the hourly values of each day
    pub fn new(days: Vec<[f64; HOURS_PER_DAY]>) -> Self {
        Self(days)
    }

    /// Profiles with the same value in every hour
    pub fn constant(n_days: usize, value: f64) -> Self {
        Self(vec![[value; HOURS_PER_DAY]; n_days])
    }

    /// Number of representative days
    pub fn n_days(&self) -> usize {
        self.0.len()
    }

    /// The value at the given representative day and hour
    pub fn get(&self, day: usize, hour: usize) -> f64 {
        self.0[day][hour]
    }

    /// The hourly values of one representative day
    pub fn day(&self, day: usize) -> &[f64; HOURS_PER_DAY] {
        &self.0[day]
    }

    /// Iterate over all (day, hour, value) triples, day by day
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.0.iter().enumerate().flat_map(|(day, values)| {
            values
                .iter()
                .enumerate()
                .map(move |(hour, value)| (day, hour, *value))
        })
    }

    /// Apply a function to every value
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self(
            self.0
                .iter()
                .map(|values| values.map(&f))
                .collect(),
        )
    }

    /// The largest value of any hour
    pub fn peak(&self) -> f64 {
        self.iter().map(|(_, _, value)| value).fold(0.0, f64::max)
    }
}

/// Demand of the hub per carrier
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Demand<S> {
    /// Heat demand
    pub heat: S,
    /// Cooling demand
    pub cooling: S,
    /// Electricity demand
    pub power: S,
    /// Hydrogen demand
    pub hydrogen: S,
}

impl<S> Demand<S> {
    /// The demand series for a carrier, if the hub has a demand for it
    pub fn get(&self, carrier: Carrier) -> Option<&S> {
        match carrier {
            Carrier::Heat => Some(&self.heat),
            Carrier::Cooling => Some(&self.cooling),
            Carrier::Electricity => Some(&self.power),
            Carrier::Hydrogen => Some(&self.hydrogen),
            Carrier::Gas | Carrier::Biomass | Carrier::Waste => None,
        }
    }

    /// Iterate over the carriers with a demand and their series
    pub fn iter(&self) -> impl Iterator<Item = (Carrier, &S)> {
        [
            (Carrier::Heat, &self.heat),
            (Carrier::Cooling, &self.cooling),
            (Carrier::Electricity, &self.power),
            (Carrier::Hydrogen, &self.hydrogen),
        ]
        .into_iter()
    }

    /// Transform every series
    pub fn map<T, F: Fn(&S) -> T>(&self, f: F) -> Demand<T> {
        Demand {
            heat: f(&self.heat),
            cooling: f(&self.cooling),
            power: f(&self.power),
            hydrogen: f(&self.hydrogen),
        }
    }
}

/// Weather at the site of the hub
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Weather<S> {
    /// Ambient air temperature (°C)
    pub air_temperature: S,
    /// Global horizontal irradiance (W/m²)
    pub ghi: S,
    /// Wind speed at measurement height (m/s)
    pub wind_speed: S,
}

impl<S> Weather<S> {
    /// Transform every series
    pub fn map<T, F: Fn(&S) -> T>(&self, f: F) -> Weather<T> {
        Weather {
            air_temperature: f(&self.air_temperature),
            ghi: f(&self.ghi),
            wind_speed: f(&self.wind_speed),
        }
    }
}

/// Unclustered hourly inputs for a whole year
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyInputs {
    /// Hourly demand (kW)
    pub demand: Demand<Vec<f64>>,
    /// Hourly weather
    pub weather: Weather<Vec<f64>>,
}

impl HourlyInputs {
    /// Create hourly inputs, checking that every series covers the whole year
    pub fn new(demand: Demand<Vec<f64>>, weather: Weather<Vec<f64>>) -> Result<Self> {
        for (carrier, series) in demand.iter() {
            ensure!(
                series.len() == HOURS_PER_YEAR,
                "Demand series for {carrier} must have {HOURS_PER_YEAR} values, found {}",
                series.len()
            );
            ensure!(
                series.iter().all(|value| value.is_finite() && *value >= 0.0),
                "Demand for {carrier} must be finite and non-negative"
            );
        }
        for series in [&weather.air_temperature, &weather.ghi, &weather.wind_speed] {
            ensure!(
                series.len() == HOURS_PER_YEAR,
                "Weather series must have {HOURS_PER_YEAR} values, found {}",
                series.len()
            );
        }

        Ok(Self { demand, weather })
    }

    /// The unclustered peak demand for a carrier (zero if the hub has no demand for it)
    pub fn peak_demand(&self, carrier: Carrier) -> f64 {
        self.demand
            .get(carrier)
            .map_or(0.0, |series| series.iter().copied().fold(0.0, f64::max))
    }
}

/// Summary of the unclustered demand for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandStatistics {
    /// Demand per month (MWh)
    pub monthly: IndexMap<Carrier, IndexMap<String, f64>>,
    /// Peak hourly demand (kW)
    pub year_peak: IndexMap<Carrier, f64>,
    /// Annual demand (MWh)
    pub year_sum: IndexMap<Carrier, f64>,
}

impl DemandStatistics {
    /// Calculate monthly sums, peaks and annual sums of the hourly demand
    pub fn new(demand: &Demand<Vec<f64>>) -> Self {
        let mut monthly = IndexMap::new();
        let mut year_peak = IndexMap::new();
        let mut year_sum = IndexMap::new();
        for (carrier, series) in demand.iter() {
            let mut months = IndexMap::new();
            let mut start = 0;
            for (name, days) in MONTHS {
                let end = start + days * HOURS_PER_DAY;
                months.insert(name.to_string(), series[start..end].iter().sum::<f64>() / 1000.0);
                start = end;
            }
            monthly.insert(carrier, months);
            year_peak.insert(carrier, series.iter().copied().fold(0.0, f64::max));
            year_sum.insert(carrier, series.iter().sum::<f64>() / 1000.0);
        }

        Self {
            monthly,
            year_peak,
            year_sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn constant_demand(value: f64) -> Demand<Vec<f64>> {
        Demand {
            heat: vec![value; HOURS_PER_YEAR],
            cooling: vec![0.0; HOURS_PER_YEAR],
            power: vec![value / 2.0; HOURS_PER_YEAR],
            hydrogen: vec![0.0; HOURS_PER_YEAR],
        }
    }

    fn constant_weather() -> Weather<Vec<f64>> {
        Weather {
            air_temperature: vec![10.0; HOURS_PER_YEAR],
            ghi: vec![0.0; HOURS_PER_YEAR],
            wind_speed: vec![3.0; HOURS_PER_YEAR],
        }
    }

    #[test]
    fn test_months_cover_year() {
        assert_eq!(MONTHS.iter().map(|(_, days)| days).sum::<usize>(), DAYS_PER_YEAR);
    }

    #[test]
    fn test_day_profiles() {
        let mut day = [0.0; HOURS_PER_DAY];
        day[12] = 5.0;
        let profiles = DayProfiles::new(vec![[1.0; HOURS_PER_DAY], day]);
        assert_eq!(profiles.n_days(), 2);
        assert_eq!(profiles.get(1, 12), 5.0);
        assert_eq!(profiles.peak(), 5.0);
        assert_eq!(profiles.iter().count(), 2 * HOURS_PER_DAY);
        assert_eq!(profiles.map(|v| v * 2.0).get(1, 12), 10.0);
    }

    #[test]
    fn test_hourly_inputs_validation() {
        assert!(HourlyInputs::new(constant_demand(10.0), constant_weather()).is_ok());

        let mut demand = constant_demand(10.0);
        demand.heat.pop();
        assert!(HourlyInputs::new(demand, constant_weather()).is_err());

        let mut demand = constant_demand(10.0);
        demand.power[3] = -1.0;
        assert!(HourlyInputs::new(demand, constant_weather()).is_err());
    }

    #[test]
    fn test_peak_demand() {
        let mut demand = constant_demand(10.0);
        demand.heat[100] = 42.0;
        let inputs = HourlyInputs::new(demand, constant_weather()).unwrap();
        assert_eq!(inputs.peak_demand(Carrier::Heat), 42.0);
        assert_eq!(inputs.peak_demand(Carrier::Gas), 0.0);
    }

    #[test]
    fn test_demand_statistics() {
        let stats = DemandStatistics::new(&constant_demand(10.0));
        assert_approx_eq!(f64, stats.monthly[&Carrier::Heat]["Jan"], 31.0 * 24.0 * 0.01);
        assert_approx_eq!(f64, stats.year_sum[&Carrier::Heat], 87.6);
        assert_eq!(stats.year_peak[&Carrier::Electricity], 5.0);
    }
}
