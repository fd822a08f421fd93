//! General functions related to finance.
use crate::carrier::Carrier;
use crate::device::{Device, DeviceCatalog, DeviceKind};
use crate::model::parameters::{AnnuityMethod, Economics};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity, MoneyPerEnergy};
use indexmap::IndexMap;

/// First year of the built-in price trajectory
const BASE_YEAR: u32 = 2024;

/// Years of the built-in price trajectory
const TRAJECTORY_YEARS: [u32; 5] = [2024, 2025, 2030, 2035, 2040];

/// Gas prices of the built-in trajectory (EUR/MWh)
const GAS_PRICES: [f64; 5] = [130.0, 106.0, 104.0, 103.0, 116.0];

/// Electricity prices of the built-in trajectory (EUR/MWh)
const ELECTRICITY_PRICES: [f64; 5] = [340.0, 349.0, 303.0, 302.0, 322.0];

/// Horizon below which the residual series includes the discounted replacement terms
const SHORT_HORIZON: u32 = 16;

/// Calculates the capital recovery factor (CRF) for a given horizon and interest rate.
///
/// The CRF is used to annualise a present value over the observation time.
pub fn capital_recovery_factor(horizon: u32, interest_rate: Dimensionless) -> Dimensionless {
    if horizon == 0 {
        return Dimensionless(0.0);
    }
    if interest_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(f64::from(horizon));
    }
    let factor = (Dimensionless(1.0) + interest_rate).powf(f64::from(horizon));
    (interest_rate * factor) / (factor - Dimensionless(1.0))
}

/// Price-dynamic cash value factor for a price changing by `price_change` every year.
///
/// Sums the discounted price factors over the horizon. Where the price change equals the
/// interest factor the limit of the closed form is used.
pub fn cash_value_factor(
    price_change: Dimensionless,
    horizon: u32,
    interest_rate: Dimensionless,
) -> Dimensionless {
    let p = price_change.value();
    let q = 1.0 + interest_rate.value();
    let t = f64::from(horizon);
    if (p - q).abs() < 1e-12 {
        return Dimensionless(t / q);
    }

    Dimensionless((1.0 - (p / q).powf(t)) / (q - p))
}

/// Fraction of the investment which is still worth something at the end of the horizon
pub fn residual_value(
    method: AnnuityMethod,
    lifetime: u32,
    economics: &Economics,
) -> Dimensionless {
    let life = f64::from(lifetime);
    let horizon = f64::from(economics.observation_time);
    let rate = economics.interest_rate.value();
    let q = 1.0 + rate;
    let n = economics.observation_time / lifetime;
    let unused = (f64::from(n + 1) * life - horizon) / life;

    let value = match method {
        AnnuityMethod::ResidualSeries if economics.observation_time < SHORT_HORIZON => {
            let series: f64 = (0..=n)
                .map(|i| (rate / q).powf(f64::from(i) * life))
                .sum();
            let discount = economics
                .residual_discount
                .value()
                .powf(f64::from(n) * life);
            series - discount * unused * q.powf(-horizon)
        }
        AnnuityMethod::ResidualSeries | AnnuityMethod::ReplacementAnnuity => {
            unused * q.powf(-horizon)
        }
    };

    Dimensionless(value)
}

/// Factor converting the specific investment of a device into an annual cost.
///
/// The replacement annuity adds the present value of every replacement within the horizon.
pub fn annuity_factor(lifetime: u32, economics: &Economics) -> Dimensionless {
    let method = economics.annuity_method;
    let crf = capital_recovery_factor(economics.observation_time, economics.interest_rate);
    let rv = residual_value(method, lifetime, economics);

    match method {
        AnnuityMethod::ReplacementAnnuity if lifetime <= economics.observation_time => {
            let q = 1.0 + economics.interest_rate.value();
            let n = economics.observation_time / lifetime;
            let replacements: f64 = (1..=n)
                .map(|i| q.powf(-f64::from(i * lifetime)))
                .sum();
            (Dimensionless(1.0 + replacements) - rv) * crf
        }
        _ => (Dimensionless(1.0) - rv) * crf,
    }
}

/// Annual price change factor derived from the built-in price trajectory.
///
/// Uses the trajectory year closest to the end of the horizon.
fn trajectory_price_change(prices: &[f64; 5], horizon: u32) -> Dimensionless {
    let target = BASE_YEAR + horizon;
    let (idx, year) = TRAJECTORY_YEARS
        .iter()
        .enumerate()
        .min_by_key(|(_, year)| year.abs_diff(target))
        .map(|(idx, year)| (idx, *year))
        .unwrap_or((0, BASE_YEAR));
    if year == BASE_YEAR {
        return Dimensionless(1.0);
    }

    Dimensionless(1.0 + (prices[idx] / prices[0]) / f64::from(year - BASE_YEAR))
}

/// Annual price change factors used for the demand-related and O&M costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceChangeFactors {
    /// Factor for electricity prices
    pub electricity: Dimensionless,
    /// Factor for gas prices
    pub gas: Dimensionless,
    /// Factor for all other prices
    pub inflation: Dimensionless,
}

impl PriceChangeFactors {
    /// Take the factors from the economics, falling back to the price trajectory
    pub fn new(economics: &Economics) -> Self {
        let horizon = economics.observation_time;
        Self {
            electricity: economics
                .price_change_el
                .unwrap_or_else(|| trajectory_price_change(&ELECTRICITY_PRICES, horizon)),
            gas: economics
                .price_change_gas
                .unwrap_or_else(|| trajectory_price_change(&GAS_PRICES, horizon)),
            inflation: economics.inflation_factor,
        }
    }
}

/// Precomputed factors for the annualised cost of every device in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CostFactors {
    /// Capital recovery factor shared by all devices
    pub crf: Dimensionless,
    /// Cash value factors of electricity, gas and inflation
    cash_value: PriceChangeFactors,
    annuity_factors: IndexMap<DeviceKind, Dimensionless>,
}

impl CostFactors {
    /// Calculate the cost factors of all devices
    pub fn new(economics: &Economics, catalog: &DeviceCatalog) -> Self {
        let horizon = economics.observation_time;
        let rate = economics.interest_rate;
        let changes = PriceChangeFactors::new(economics);
        let cash_value = PriceChangeFactors {
            electricity: cash_value_factor(changes.electricity, horizon, rate),
            gas: cash_value_factor(changes.gas, horizon, rate),
            inflation: cash_value_factor(changes.inflation, horizon, rate),
        };
        let annuity_factors = catalog
            .iter()
            .map(|dev| (dev.kind, annuity_factor(dev.lifetime, economics)))
            .collect();

        Self {
            crf: capital_recovery_factor(horizon, rate),
            cash_value,
            annuity_factors,
        }
    }

    /// The annuity factor of a device (zero for devices outside the catalog)
    pub fn annuity_factor(&self, kind: DeviceKind) -> Dimensionless {
        self.annuity_factors
            .get(&kind)
            .copied()
            .unwrap_or(Dimensionless(0.0))
    }

    /// Annualised investment per unit of installed capacity
    pub fn investment_cost_per_capacity(&self, device: &Device) -> MoneyPerCapacity {
        device.investment_cost * self.annuity_factor(device.kind)
    }

    /// Annualised investment for a given capacity
    pub fn investment_cost(&self, device: &Device, capacity: Capacity) -> Money {
        self.investment_cost_per_capacity(device) * capacity
    }

    /// Annual operation and maintenance cost of a selected device.
    ///
    /// The O&M rate applies to the specific investment cost, so the result does not depend on
    /// the installed capacity.
    pub fn om_cost(&self, device: &Device) -> Money {
        let per_capacity = device.investment_cost * (self.crf * self.cash_value.inflation);
        Money(per_capacity.value() * device.om_rate.value())
    }

    /// Annualised cost of each unit of a carrier consumed by a device, if that carrier incurs
    /// demand-related costs
    pub fn demand_cost_per_energy(
        &self,
        carrier: Carrier,
        price: MoneyPerEnergy,
    ) -> Option<MoneyPerEnergy> {
        let cash_value = match carrier {
            Carrier::Electricity => self.cash_value.electricity,
            Carrier::Gas => self.cash_value.gas,
            _ => return None,
        };

        Some(price * (self.crf * cash_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{boiler, economics};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: horizon==0
    #[case(10, 0.0, 0.1)] // Other edge case: interest_rate==0
    #[case(10, 0.05, 0.1295045749654567)]
    #[case(5, 0.03, 0.2183545714005762)]
    fn test_capital_recovery_factor(
        #[case] horizon: u32,
        #[case] interest_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(horizon, Dimensionless(interest_rate));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(1.0, 1, 0.05, 1.0 / 1.05)]
    #[case(1.05, 20, 0.05, 20.0 / 1.05)] // Price change equals interest factor
    #[case(1.0, 10, 0.0, 10.0)]
    #[case(1.02, 2, 0.05, (1.0 - (1.02f64 / 1.05).powi(2)) / 0.03)]
    fn test_cash_value_factor(
        #[case] price_change: f64,
        #[case] horizon: u32,
        #[case] interest_rate: f64,
        #[case] expected: f64,
    ) {
        let result =
            cash_value_factor(Dimensionless(price_change), horizon, Dimensionless(interest_rate));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[rstest]
    fn test_residual_value_replacement_annuity(mut economics: Economics) {
        economics.annuity_method = AnnuityMethod::ReplacementAnnuity;
        economics.observation_time = 20;

        // Lifetime 15: one replacement, 10 of its 15 years unused
        let rv = residual_value(AnnuityMethod::ReplacementAnnuity, 15, &economics);
        assert_approx_eq!(f64, rv.0, 10.0 / 15.0 * 1.05f64.powi(-20), epsilon = 1e-12);

        // Lifetime exceeding the horizon still discounts the unused years
        let rv = residual_value(AnnuityMethod::ReplacementAnnuity, 30, &economics);
        assert_approx_eq!(f64, rv.0, 10.0 / 30.0 * 1.05f64.powi(-20), epsilon = 1e-12);
    }

    #[rstest]
    fn test_residual_value_series_short_horizon(mut economics: Economics) {
        economics.observation_time = 10;

        // No replacement: series is 1, the discount is d^0 = 1
        let rv = residual_value(AnnuityMethod::ResidualSeries, 20, &economics);
        let expected = 1.0 - 10.0 / 20.0 * 1.05f64.powi(-10);
        assert_approx_eq!(f64, rv.0, expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_residual_value_series_long_horizon(economics: Economics) {
        // Horizons of 16 years or more use the plain residual value
        let rv = residual_value(AnnuityMethod::ResidualSeries, 15, &economics);
        assert_approx_eq!(f64, rv.0, 10.0 / 15.0 * 1.05f64.powi(-20), epsilon = 1e-12);
    }

    #[rstest]
    fn test_annuity_factor_replacements(mut economics: Economics) {
        economics.annuity_method = AnnuityMethod::ReplacementAnnuity;
        let crf = capital_recovery_factor(20, Dimensionless(0.05)).0;
        let rv = 10.0 / 15.0 * 1.05f64.powi(-20);
        let expected = (1.0 + 1.05f64.powi(-15) - rv) * crf;
        assert_approx_eq!(f64, annuity_factor(15, &economics).0, expected, epsilon = 1e-12);

        // A device outliving the horizon is never replaced
        let rv = 20.0 / 40.0 * 1.05f64.powi(-20);
        let expected = (1.0 - rv) * crf;
        assert_approx_eq!(f64, annuity_factor(40, &economics).0, expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_annuity_factor_exact_lifetime(mut economics: Economics) {
        // A lifetime equal to the horizon needs one (fully wasted) replacement
        economics.annuity_method = AnnuityMethod::ReplacementAnnuity;
        let crf = capital_recovery_factor(20, Dimensionless(0.05)).0;
        let rv = 1.05f64.powi(-20);
        let expected = (1.0 + 1.05f64.powi(-20) - rv) * crf;
        assert_approx_eq!(f64, annuity_factor(20, &economics).0, expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(1, 1.0 + 349.0 / 340.0)]
    #[case(6, 1.0 + (303.0 / 340.0) / 6.0)]
    #[case(20, 1.0 + (322.0 / 340.0) / 16.0)]
    #[case(50, 1.0 + (322.0 / 340.0) / 16.0)]
    fn test_trajectory_price_change(#[case] horizon: u32, #[case] expected: f64) {
        let result = trajectory_price_change(&ELECTRICITY_PRICES, horizon);
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_price_change_factors_explicit(mut economics: Economics) {
        economics.price_change_gas = Some(Dimensionless(1.03));
        let factors = PriceChangeFactors::new(&economics);
        assert_eq!(factors.gas, Dimensionless(1.03));
        assert_eq!(factors.inflation, Dimensionless(1.017));
    }

    #[rstest]
    fn test_cost_factors(economics: Economics, boiler: Device) {
        let catalog = DeviceCatalog::new([boiler.clone()]);
        let factors = CostFactors::new(&economics, &catalog);
        let crf = capital_recovery_factor(20, Dimensionless(0.05));
        assert_eq!(factors.crf, crf);

        let af = factors.annuity_factor(DeviceKind::GasBoiler);
        assert_eq!(af, annuity_factor(boiler.lifetime, &economics));
        assert_eq!(factors.annuity_factor(DeviceKind::HeatPump), Dimensionless(0.0));

        let cost = factors.investment_cost(&boiler, Capacity(100.0));
        assert_approx_eq!(
            f64,
            cost.0,
            af.0 * boiler.investment_cost.0 * 100.0,
            epsilon = 1e-9
        );

        let b_infl = cash_value_factor(Dimensionless(1.017), 20, Dimensionless(0.05));
        let expected_om = crf.0 * b_infl.0 * boiler.om_rate.0 * boiler.investment_cost.0;
        assert_approx_eq!(f64, factors.om_cost(&boiler).0, expected_om, epsilon = 1e-9);
    }

    #[rstest]
    fn test_demand_cost_per_energy(economics: Economics) {
        let factors = CostFactors::new(&economics, &DeviceCatalog::default());
        let price = MoneyPerEnergy(0.1);
        assert!(factors.demand_cost_per_energy(Carrier::Heat, price).is_none());

        let b_gas = cash_value_factor(
            PriceChangeFactors::new(&economics).gas,
            20,
            Dimensionless(0.05),
        );
        let expected = 0.1 * factors.crf.0 * b_gas.0;
        let result = factors.demand_cost_per_energy(Carrier::Gas, price).unwrap();
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-12);
    }
}
