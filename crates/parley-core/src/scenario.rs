//! Scenario files: actors, capabilities, positions and saliences.
//!
//! Scenarios are written on a percent scale (positions and saliences in
//! `[0, 100]`) and normalized to `[0, 1]` when a model is built from them.
//! Two layouts are accepted:
//!
//! - **CSV** -- row 1 holds the scenario name (column 1), the actor count
//!   (column 3) and the dimension count (column 4); row 2 names each
//!   dimension at columns 4, 6, 8, ...; each following row describes one
//!   actor: name, description, capability, then a position/salience pair per
//!   dimension. Fields are plain comma-separated text without quoting.
//! - **YAML** -- the [`Scenario`] struct serialized directly.
//!
//! Both layouts go through the same [`Scenario::validate_bounds`]; nothing is
//! clamped.

use std::path::Path;

use parley_types::VotingRule;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::error::ValidationError;

/// Fewest actors a scenario may have.
pub const MIN_ACTORS: usize = 3;

/// Most actors a scenario may have.
pub const MAX_ACTORS: usize = 100;

/// Scale of positions and saliences in scenario files.
pub const PERCENT: f64 = 100.0;

/// Rounding allowed when a salience total is compared with 100.
const SALIENCE_ROUNDING: f64 = 1e-9;

/// A complete scenario on the percent scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// One name per policy dimension.
    pub dimensions: Vec<String>,
    /// The actors, in roster order.
    pub actors: Vec<ActorRecord>,
}

/// One actor of a scenario, on the percent scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ActorRecord {
    /// Short display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Scalar capability, at least 0 and below `1e8`.
    #[validate(range(min = 0.0, exclusive_max = 1e8))]
    pub capability: f64,
    /// Position on each dimension, in `[0, 100]`.
    #[validate(custom(function = "percentages"))]
    pub positions: Vec<f64>,
    /// Salience of each dimension, in `[0, 100]`.
    #[validate(custom(function = "percentages"))]
    pub saliences: Vec<f64>,
    /// How this actor converts utility differences into votes.
    #[serde(default)]
    pub voting_rule: VotingRule,
}

fn percentages(values: &[f64]) -> Result<(), validator::ValidationError> {
    if values.iter().all(|v| (0.0..=PERCENT).contains(v)) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("percentage"))
    }
}

impl Scenario {
    /// Load a scenario, choosing the layout by file extension (`.csv`,
    /// otherwise YAML), and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the file cannot be read or parsed, or
    /// any value is out of bounds.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let contents = std::fs::read_to_string(path)?;
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let scenario = if is_csv {
            Self::from_csv_str(&contents)?
        } else {
            Self::from_yaml_str(&contents)?
        };
        info!(
            path = %path.display(),
            scenario = %scenario.name,
            actors = scenario.actors.len(),
            dimensions = scenario.dimensions.len(),
            "Scenario loaded"
        );
        Ok(scenario)
    }

    /// Parse and validate a YAML scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Yaml`] on malformed YAML, or the first
    /// bound violation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ValidationError> {
        let scenario: Self = serde_yml::from_str(yaml)?;
        scenario.validate_bounds()?;
        Ok(scenario)
    }

    /// Serialize the scenario as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Yaml`] if serialization fails.
    pub fn to_yaml_string(&self) -> Result<String, ValidationError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Parse and validate a CSV scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a short header, ragged or missing
    /// rows, malformed numbers, or any bound violation.
    pub fn from_csv_str(text: &str) -> Result<Self, ValidationError> {
        let mut rows = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| CsvRow::new(index.saturating_add(1), line));

        let header = rows.next().ok_or(ValidationError::MissingRows {
            expected: 1,
            actual: 0,
        })?;
        header.require(4)?;
        let name = header.text(1)?;
        let actor_count = header.count(3)?;
        let dimension_count = header.count(4)?;
        if dimension_count < 1 {
            return Err(ValidationError::NoDimensions);
        }
        check_actor_count(actor_count)?;

        let names_row = rows.next().ok_or(ValidationError::MissingRows {
            expected: actor_count,
            actual: 0,
        })?;
        names_row.require(pair_column(2, dimension_count))?;
        let dimensions = (0..dimension_count)
            .map(|d| names_row.text(pair_column(4, d)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut actors = Vec::with_capacity(actor_count);
        for row in rows.take(actor_count) {
            row.require(pair_column(3, dimension_count))?;
            let mut positions = Vec::with_capacity(dimension_count);
            let mut saliences = Vec::with_capacity(dimension_count);
            for d in 0..dimension_count {
                positions.push(row.number(pair_column(4, d))?);
                saliences.push(row.number(pair_column(5, d))?);
            }
            actors.push(ActorRecord {
                name: row.text(1)?,
                description: row.text(2)?,
                capability: row.number(3)?,
                positions,
                saliences,
                voting_rule: VotingRule::default(),
            });
        }
        if actors.len() < actor_count {
            return Err(ValidationError::MissingRows {
                expected: actor_count,
                actual: actors.len(),
            });
        }

        let scenario = Self {
            name,
            description: String::new(),
            dimensions,
            actors,
        };
        scenario.validate_bounds()?;
        Ok(scenario)
    }

    /// Check every bound: roster size, dimension count, per-actor field
    /// ranges and total salience.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, in roster order.
    pub fn validate_bounds(&self) -> Result<(), ValidationError> {
        check_actor_count(self.actors.len())?;
        let dimensions = self.dimensions.len();
        if dimensions < 1 {
            return Err(ValidationError::NoDimensions);
        }

        for actor in &self.actors {
            for (what, values) in [("position", &actor.positions), ("salience", &actor.saliences)] {
                if values.len() != dimensions {
                    return Err(ValidationError::DimensionMismatch {
                        actor: actor.name.clone(),
                        what,
                        expected: dimensions,
                        actual: values.len(),
                    });
                }
            }
            actor.validate().map_err(|source| ValidationError::Actor {
                actor: actor.name.clone(),
                source,
            })?;
            if !actor.capability.is_finite() {
                return Err(ValidationError::Actor {
                    actor: actor.name.clone(),
                    source: capability_error(),
                });
            }
            let total: f64 = actor.saliences.iter().sum();
            if total > PERCENT + SALIENCE_ROUNDING {
                return Err(ValidationError::SalienceTotal {
                    actor: actor.name.clone(),
                    total,
                });
            }
            if total <= 0.0 {
                return Err(ValidationError::ZeroSalience {
                    actor: actor.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn check_actor_count(count: usize) -> Result<(), ValidationError> {
    if (MIN_ACTORS..=MAX_ACTORS).contains(&count) {
        Ok(())
    } else {
        Err(ValidationError::ActorCount {
            count,
            min: MIN_ACTORS,
            max: MAX_ACTORS,
        })
    }
}

/// Column of dimension `d` in a row whose per-dimension pairs start at
/// column `first`.
const fn pair_column(first: usize, d: usize) -> usize {
    first.saturating_add(d.saturating_mul(2))
}

fn capability_error() -> validator::ValidationErrors {
    let mut errors = validator::ValidationErrors::new();
    errors.add("capability", validator::ValidationError::new("finite"));
    errors
}

// ---------------------------------------------------------------------------
// CSV rows
// ---------------------------------------------------------------------------

/// One non-blank CSV line, split into trimmed fields.
struct CsvRow<'a> {
    number: usize,
    fields: Vec<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn new(number: usize, line: &'a str) -> Self {
        Self {
            number,
            fields: line.split(',').map(str::trim).collect(),
        }
    }

    /// Fail unless the row has at least `expected` fields.
    fn require(&self, expected: usize) -> Result<(), ValidationError> {
        if self.fields.len() < expected {
            return Err(ValidationError::RaggedRow {
                row: self.number,
                expected,
                actual: self.fields.len(),
            });
        }
        Ok(())
    }

    /// The field at one-based `column`.
    fn field(&self, column: usize) -> Result<&'a str, ValidationError> {
        column
            .checked_sub(1)
            .and_then(|index| self.fields.get(index))
            .copied()
            .ok_or(ValidationError::RaggedRow {
                row: self.number,
                expected: column,
                actual: self.fields.len(),
            })
    }

    fn text(&self, column: usize) -> Result<String, ValidationError> {
        self.field(column).map(str::to_owned)
    }

    fn number(&self, column: usize) -> Result<f64, ValidationError> {
        let value = self.field(column)?;
        value
            .parse::<f64>()
            .map_err(|_parse| self.malformed(column, value))
    }

    fn count(&self, column: usize) -> Result<usize, ValidationError> {
        let value = self.field(column)?;
        value
            .parse::<usize>()
            .map_err(|_parse| self.malformed(column, value))
    }

    fn malformed(&self, column: usize, value: &str) -> ValidationError {
        ValidationError::MalformedNumber {
            row: self.number,
            column,
            value: value.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CSV: &str = "\
Trade talks,,3,2
,,,Tariffs,,Quotas,
North,Northern bloc,50,0,60,100,40
Centre,Swing states,40,50,80,50,20
South,Southern bloc,30,100,50,0,50
";

    #[test]
    fn csv_layout_is_parsed() {
        let scenario = Scenario::from_csv_str(CSV).unwrap();
        assert_eq!(scenario.name, "Trade talks");
        assert_eq!(scenario.dimensions, vec!["Tariffs", "Quotas"]);
        assert_eq!(scenario.actors.len(), 3);
        let centre = &scenario.actors[1];
        assert_eq!(centre.name, "Centre");
        assert_eq!(centre.description, "Swing states");
        assert_eq!(centre.positions, vec![50.0, 50.0]);
        assert_eq!(centre.saliences, vec![80.0, 20.0]);
    }

    #[test]
    fn yaml_round_trips_csv() {
        let scenario = Scenario::from_csv_str(CSV).unwrap();
        let yaml = scenario.to_yaml_string().unwrap();
        assert_eq!(Scenario::from_yaml_str(&yaml).unwrap(), scenario);
    }

    #[test]
    fn actor_count_is_bounded() {
        let csv = "Pair,,2,1\n,,,D,\nA,,1,0,50\nB,,1,100,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::ActorCount { count: 2, .. })
        ));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let csv = "None,,3,0\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::NoDimensions)
        ));
    }

    #[test]
    fn short_rows_rejected() {
        let csv = "S,,3,1\n,,,D,\nA,,1,0,50\nB,,1,100\nC,,1,50,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::RaggedRow { row: 4, expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn missing_rows_rejected() {
        let csv = "S,,3,1\n,,,D,\nA,,1,0,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::MissingRows { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn malformed_numbers_rejected() {
        let csv = "S,,3,1\n,,,D,\nA,,1,0,50\nB,,lots,100,50\nC,,1,50,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::MalformedNumber { row: 4, column: 3, .. })
        ));
    }

    #[test]
    fn out_of_range_values_rejected() {
        let position = "S,,3,1\n,,,D,\nA,,1,120,50\nB,,1,100,50\nC,,1,50,50\n";
        assert!(matches!(
            Scenario::from_csv_str(position),
            Err(ValidationError::Actor { .. })
        ));
        let capability = "S,,3,1\n,,,D,\nA,,-1,20,50\nB,,1,100,50\nC,,1,50,50\n";
        assert!(matches!(
            Scenario::from_csv_str(capability),
            Err(ValidationError::Actor { .. })
        ));
        let unnamed = "S,,3,1\n,,,D,\n,,1,20,50\nB,,1,100,50\nC,,1,50,50\n";
        assert!(matches!(
            Scenario::from_csv_str(unnamed),
            Err(ValidationError::Actor { .. })
        ));
    }

    #[test]
    fn salience_total_is_capped() {
        let csv = "S,,3,2\n,,,D1,,D2,\nA,,1,0,60,0,50\nB,,1,100,50,0,50\nC,,1,50,50,0,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::SalienceTotal { total, .. }) if (total - 110.0).abs() < 1e-12
        ));
    }

    #[test]
    fn actor_without_salience_rejected() {
        let yaml = r"
name: Indifferent
dimensions: [D]
actors:
  - { name: A, capability: 1, positions: [0], saliences: [50] }
  - { name: B, capability: 1, positions: [50], saliences: [0] }
  - { name: C, capability: 1, positions: [100], saliences: [50] }
";
        assert!(matches!(
            Scenario::from_yaml_str(yaml),
            Err(ValidationError::ZeroSalience { actor }) if actor == "B"
        ));
        let csv = "S,,3,2\n,,,D1,,D2,\nA,,1,0,50,0,50\nB,,1,100,0,0,0\nC,,1,50,50,0,50\n";
        assert!(matches!(
            Scenario::from_csv_str(csv),
            Err(ValidationError::ZeroSalience { .. })
        ));
    }

    #[test]
    fn yaml_dimension_mismatch_rejected() {
        let yaml = r"
name: Mismatch
dimensions: [D1, D2]
actors:
  - { name: A, capability: 1, positions: [0, 0], saliences: [50, 50] }
  - { name: B, capability: 1, positions: [0], saliences: [50, 50] }
  - { name: C, capability: 1, positions: [0, 0], saliences: [50, 50] }
";
        assert!(matches!(
            Scenario::from_yaml_str(yaml),
            Err(ValidationError::DimensionMismatch { what: "position", expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn yaml_voting_rule_is_optional() {
        let yaml = r"
name: Rules
dimensions: [D]
actors:
  - { name: A, capability: 1, positions: [0], saliences: [50], voting_rule: binary }
  - { name: B, capability: 1, positions: [50], saliences: [50] }
  - { name: C, capability: 1, positions: [100], saliences: [50] }
";
        let scenario = Scenario::from_yaml_str(yaml).unwrap();
        assert_eq!(scenario.actors[0].voting_rule, VotingRule::Binary);
        assert_eq!(scenario.actors[1].voting_rule, VotingRule::Proportional);
    }
}
