//! Normalised output of a wind turbine as a function of wind speed.
use crate::time_series::DayProfiles;

/// Rated output of the reference turbine (kW)
const RATED_POWER: f64 = 500.0;

/// Power curve of a 500 kW reference turbine (Enercon E-40) as (wind speed in m/s, output in kW)
const POWER_CURVE: [(f64, f64); 28] = [
    (0.0, 0.0),
    (2.4, 0.0),
    (2.5, 1.14),
    (3.0, 4.37),
    (3.5, 10.64),
    (4.0, 18.87),
    (4.5, 29.77),
    (5.0, 40.39),
    (5.5, 52.85),
    (6.0, 69.36),
    (6.5, 88.02),
    (7.0, 112.19),
    (7.5, 134.67),
    (8.0, 165.38),
    (8.5, 197.08),
    (9.0, 236.89),
    (9.5, 279.46),
    (10.0, 328.00),
    (10.5, 362.93),
    (11.0, 396.64),
    (11.5, 435.27),
    (12.0, 465.15),
    (12.5, 483.63),
    (13.0, 495.95),
    (14.0, 500.00),
    (25.0, 500.00),
    (25.1, 0.0),
    (1000.0, 0.0),
];

/// Output of the reference turbine (kW) at the given hub-height wind speed.
///
/// Linear interpolation between the points of the power curve. Speeds which are not positive or
/// which lie beyond the table give no output.
pub fn turbine_power(wind_speed: f64) -> f64 {
    if wind_speed <= 0.0 {
        return 0.0;
    }

    POWER_CURVE
        .windows(2)
        .find(|pair| pair[1].0 > wind_speed)
        .map_or(0.0, |pair| {
            let (v0, p0) = pair[0];
            let (v1, p1) = pair[1];
            p0 + (p1 - p0) / (v1 - v0) * (wind_speed - v0)
        })
}

/// Correct a measured wind speed to hub height with the power law
pub fn hub_height_speed(
    wind_speed: f64,
    hub_height: f64,
    reference_height: f64,
    roughness_exponent: f64,
) -> f64 {
    wind_speed * (hub_height / reference_height).powf(roughness_exponent)
}

/// Output per unit of installed capacity for every representative hour
pub fn normalised_power(
    wind_speed: &DayProfiles,
    hub_height: f64,
    reference_height: f64,
    roughness_exponent: f64,
) -> DayProfiles {
    wind_speed.map(|speed| {
        let corrected = hub_height_speed(speed, hub_height, reference_height, roughness_exponent);
        turbine_power(corrected) / RATED_POWER
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0, 0.0)]
    #[case(0.0, 0.0)]
    #[case(2.0, 0.0)]
    #[case(3.0, 4.37)]
    #[case(3.25, 7.505)]
    #[case(20.0, 500.0)]
    #[case(25.05, 250.0)]
    #[case(30.0, 0.0)]
    #[case(1000.0, 0.0)]
    #[case(2000.0, 0.0)]
    fn test_turbine_power(#[case] speed: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, turbine_power(speed), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_hub_height_speed() {
        assert_approx_eq!(f64, hub_height_speed(5.0, 40.0, 10.0, 0.5), 10.0);
        assert_approx_eq!(f64, hub_height_speed(5.0, 10.0, 10.0, 0.2), 5.0);
    }

    #[test]
    fn test_normalised_power() {
        let speeds = DayProfiles::constant(2, 20.0);
        let norm = normalised_power(&speeds, 10.0, 10.0, 0.2);
        assert_eq!(norm.n_days(), 2);
        assert_approx_eq!(f64, norm.get(1, 3), 1.0);
    }
}
