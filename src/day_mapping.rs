//! Mapping between calendar days and representative days.
use crate::time_series::{
    DAYS_PER_YEAR, Demand, DayProfiles, HOURS_PER_DAY, HourlyInputs, Weather,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

/// Assignment of each calendar day to a representative day
#[derive(Debug, Clone, PartialEq)]
pub struct DayMapping {
    /// Calendar day (0-based) represented by each representative day
    representative_days: Vec<usize>,
    /// Index of the representative day for each calendar day
    assignment: Vec<usize>,
    /// Number of calendar days represented by each representative day
    weights: Vec<u32>,
}

impl DayMapping {
    /// Create a mapping from the representative day index of each calendar day.
    ///
    /// # Arguments
    ///
    /// * `representative_days` - The calendar day which each representative day is taken from
    /// * `assignment` - Index of the representative day for each of the 365 calendar days
    pub fn new(representative_days: Vec<usize>, assignment: Vec<usize>) -> Result<Self> {
        let n_days = representative_days.len();
        ensure!(n_days > 0, "At least one representative day is required");
        ensure!(
            assignment.len() == DAYS_PER_YEAR,
            "Day mapping must assign all {DAYS_PER_YEAR} calendar days, found {}",
            assignment.len()
        );
        for (idx, &day) in representative_days.iter().enumerate() {
            ensure!(
                day < DAYS_PER_YEAR,
                "Representative day {day} is outside the year"
            );
            ensure!(
                assignment[day] == idx,
                "Calendar day {day} must be represented by itself"
            );
        }

        let mut weights = vec![0u32; n_days];
        for &idx in &assignment {
            ensure!(idx < n_days, "Unknown representative day index {idx}");
            weights[idx] += 1;
        }
        for (idx, weight) in weights.iter().enumerate() {
            ensure!(*weight > 0, "Representative day {idx} represents no days");
        }

        Ok(Self {
            representative_days,
            assignment,
            weights,
        })
    }

    /// Create a mapping from the medoid calendar day of each calendar day's cluster.
    ///
    /// Representative days are numbered in order of their calendar day.
    pub fn from_medoids(medoids: &[usize]) -> Result<Self> {
        let mut representative_days = medoids.to_vec();
        representative_days.sort_unstable();
        representative_days.dedup();
        let index: IndexMap<usize, usize> = representative_days
            .iter()
            .enumerate()
            .map(|(idx, day)| (*day, idx))
            .collect();

        let assignment = medoids
            .iter()
            .map(|day| {
                index
                    .get(day)
                    .copied()
                    .with_context(|| format!("Unknown representative day {day}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(representative_days, assignment)
    }

    /// Every calendar day is its own representative (no clustering)
    pub fn identity() -> Self {
        Self {
            representative_days: (0..DAYS_PER_YEAR).collect(),
            assignment: (0..DAYS_PER_YEAR).collect(),
            weights: vec![1; DAYS_PER_YEAR],
        }
    }

    /// Number of representative days
    pub fn n_representative(&self) -> usize {
        self.representative_days.len()
    }

    /// The representative day of a calendar day
    pub fn representative_of(&self, calendar_day: usize) -> usize {
        self.assignment[calendar_day]
    }

    /// Number of calendar days represented by a representative day
    pub fn weight_of(&self, day: usize) -> f64 {
        f64::from(self.weights[day])
    }

    /// Calendar days in order, each with its representative day
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Reduce a full-year hourly series to the representative days
    pub fn reduce(&self, hourly: &[f64]) -> DayProfiles {
        DayProfiles::new(
            self.representative_days
                .iter()
                .map(|day| {
                    let start = day * HOURS_PER_DAY;
                    let mut values = [0.0; HOURS_PER_DAY];
                    values.copy_from_slice(&hourly[start..start + HOURS_PER_DAY]);
                    values
                })
                .collect(),
        )
    }

    /// Expand representative-day profiles to a full-year hourly series
    pub fn expand(&self, profiles: &DayProfiles) -> Vec<f64> {
        self.assignment
            .iter()
            .flat_map(|day| profiles.day(*day).iter().copied())
            .collect()
    }
}

/// Demand and weather reduced to the representative days
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentativeDays {
    /// Assignment of calendar days to representative days
    pub mapping: DayMapping,
    /// Demand on the representative days
    pub demand: Demand<DayProfiles>,
    /// Weather on the representative days
    pub weather: Weather<DayProfiles>,
}

impl RepresentativeDays {
    /// Reduce the hourly inputs with the given mapping
    pub fn new(mapping: DayMapping, hourly: &HourlyInputs) -> Self {
        let demand = hourly.demand.map(|series| mapping.reduce(series));
        let weather = hourly.weather.map(|series| mapping.reduce(series));
        Self {
            mapping,
            demand,
            weather,
        }
    }

    /// Number of representative days
    pub fn n_days(&self) -> usize {
        self.mapping.n_representative()
    }

    /// Iterate over all (day, hour) slots
    pub fn slots(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let n_days = self.n_days();
        (0..n_days).flat_map(|day| (0..HOURS_PER_DAY).map(move |hour| (day, hour)))
    }

    /// Number of calendar days represented by a representative day
    pub fn weight(&self, day: usize) -> f64 {
        self.mapping.weight_of(day)
    }

    /// Sum of a profile weighted by the number of calendar days each day represents
    pub fn weighted_sum(&self, profile: &DayProfiles) -> f64 {
        profile
            .iter()
            .map(|(day, _, value)| self.weight(day) * value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_series::HOURS_PER_YEAR;

    /// Two seasons: days 0..180 represented by day 10, the rest by day 200
    fn two_seasons() -> DayMapping {
        let medoids: Vec<_> = (0..DAYS_PER_YEAR)
            .map(|day| if day < 180 { 10 } else { 200 })
            .collect();
        DayMapping::from_medoids(&medoids).unwrap()
    }

    #[test]
    fn test_from_medoids() {
        let mapping = two_seasons();
        assert_eq!(mapping.n_representative(), 2);
        assert_eq!(mapping.representative_of(0), 0);
        assert_eq!(mapping.representative_of(364), 1);
        assert_eq!(mapping.weight_of(0), 180.0);
        assert_eq!(mapping.weight_of(1), 185.0);
    }

    #[test]
    fn test_weights_sum_to_year() {
        let mapping = two_seasons();
        let total: f64 = (0..mapping.n_representative())
            .map(|day| mapping.weight_of(day))
            .sum();
        assert_eq!(total, DAYS_PER_YEAR as f64);
    }

    #[test]
    fn test_medoid_must_represent_itself() {
        // Day 10 is a medoid but assigned to day 200
        let mut medoids: Vec<_> = (0..DAYS_PER_YEAR).map(|_| 200).collect();
        medoids[0] = 10;
        assert!(DayMapping::from_medoids(&medoids).is_err());
    }

    #[test]
    fn test_wrong_number_of_days() {
        assert!(DayMapping::from_medoids(&[0, 0, 0]).is_err());
    }

    #[test]
    fn test_reduce_expand() {
        let mapping = two_seasons();
        let hourly: Vec<f64> = (0..HOURS_PER_YEAR).map(|h| (h / HOURS_PER_DAY) as f64).collect();
        let profiles = mapping.reduce(&hourly);
        assert_eq!(profiles.get(0, 5), 10.0);
        assert_eq!(profiles.get(1, 23), 200.0);

        let expanded = mapping.expand(&profiles);
        assert_eq!(expanded.len(), HOURS_PER_YEAR);
        assert_eq!(expanded[0], 10.0);
        assert_eq!(expanded[HOURS_PER_YEAR - 1], 200.0);
    }

    #[test]
    fn test_identity() {
        let mapping = DayMapping::identity();
        assert_eq!(mapping.n_representative(), DAYS_PER_YEAR);
        assert_eq!(mapping.weight_of(17), 1.0);
    }
}
