//! Comparison of the results of two runs.
use crate::device::DeviceKind;
use crate::results::ScenarioResult;
use indexmap::IndexMap;
use std::fmt;

/// A quantity in two runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difference {
    /// Value in the first run
    pub before: f64,
    /// Value in the second run
    pub after: f64,
}

impl Difference {
    /// Absolute change from the first to the second run
    pub fn change(&self) -> f64 {
        self.after - self.before
    }

    /// Change relative to the first run (%), if the first value is non-zero
    pub fn relative_change(&self) -> Option<f64> {
        (self.before.abs() > 0.0).then(|| self.change() / self.before.abs() * 100.0)
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} -> {:.2} ({:+.2}",
            self.before,
            self.after,
            self.change()
        )?;
        match self.relative_change() {
            Some(relative) => write!(f, ", {relative:+.1}%)"),
            None => write!(f, ")"),
        }
    }
}

/// How a device differs between two runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceDifference {
    /// Only installed in the second run
    Added {
        /// Installed capacity
        capacity: f64,
    },
    /// Only installed in the first run
    Removed {
        /// Installed capacity
        capacity: f64,
    },
    /// Installed in both runs
    Changed {
        /// Installed capacity
        capacity: Difference,
        /// Total annualised cost of the device
        total_cost: Difference,
    },
}

/// Differences between the results of two runs
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Total annualised cost
    pub tac: Difference,
    /// Net emissions
    pub co2: Difference,
    /// Installed capacity of each device in either run
    pub devices: IndexMap<DeviceKind, DeviceDifference>,
}

impl Comparison {
    /// Compare the result of a second run against a first one
    pub fn new(before: &ScenarioResult, after: &ScenarioResult) -> Self {
        let mut kinds: Vec<_> = before.devices.keys().chain(after.devices.keys()).collect();
        kinds.sort();
        kinds.dedup();

        let devices = kinds
            .into_iter()
            .filter_map(|kind| {
                let difference = match (before.devices.get(kind), after.devices.get(kind)) {
                    (Some(old), Some(new)) => DeviceDifference::Changed {
                        capacity: Difference {
                            before: old.capacity.value(),
                            after: new.capacity.value(),
                        },
                        total_cost: Difference {
                            before: old.total_cost.value(),
                            after: new.total_cost.value(),
                        },
                    },
                    (Some(old), None) => DeviceDifference::Removed {
                        capacity: old.capacity.value(),
                    },
                    (None, Some(new)) => DeviceDifference::Added {
                        capacity: new.capacity.value(),
                    },
                    (None, None) => return None,
                };
                Some((*kind, difference))
            })
            .collect();

        Self {
            tac: Difference {
                before: before.total_costs.tac.value(),
                after: after.total_costs.tac.value(),
            },
            co2: Difference {
                before: before.co2_emissions.net.value(),
                after: after.co2_emissions.net.value(),
            },
            devices,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total annualised cost: {}", self.tac)?;
        writeln!(f, "CO2 emissions (kg): {}", self.co2)?;
        for (kind, difference) in &self.devices {
            match difference {
                DeviceDifference::Added { capacity } => {
                    writeln!(f, "{kind}: added with capacity {capacity:.2}")?;
                }
                DeviceDifference::Removed { capacity } => {
                    writeln!(f, "{kind}: removed (capacity was {capacity:.2})")?;
                }
                DeviceDifference::Changed {
                    capacity,
                    total_cost,
                } => {
                    writeln!(f, "{kind}: capacity {capacity}, annual cost {total_cost}")?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, 110.0, Some(10.0))]
    #[case(-100.0, -50.0, Some(50.0))]
    #[case(0.0, 5.0, None)]
    fn test_relative_change(
        #[case] before: f64,
        #[case] after: f64,
        #[case] expected: Option<f64>,
    ) {
        let relative = Difference { before, after }.relative_change();
        match expected {
            Some(expected) => assert_approx_eq!(f64, relative.unwrap(), expected),
            None => assert!(relative.is_none()),
        }
    }

    #[test]
    fn test_difference_display() {
        let difference = Difference {
            before: 200.0,
            after: 150.0,
        };
        assert_eq!(difference.to_string(), "200.00 -> 150.00 (-50.00, -25.0%)");
    }
}
