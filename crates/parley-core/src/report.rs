//! History reports: per-state positions and probability distributions.
//!
//! A [`HistoryReport`] is a plain snapshot of a model's history, ready for
//! JSON export or for printing as text tables. Positions are reported on
//! the percent scale of scenario files.

use std::fmt::{self, Write as _};

use parley_types::{Perspective, RunId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::Model;
use crate::scenario::PERCENT;
use crate::state::State;

/// Width of one state column in rendered tables.
const COLUMN_WIDTH: usize = 8;

/// Snapshot of a model's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    /// Identifier of the reported run.
    pub run_id: RunId,
    /// Scenario name (empty for models built from raw inputs).
    pub scenario: String,
    /// Actor names, in roster order.
    pub actors: Vec<String>,
    /// Dimension names.
    pub dimensions: Vec<String>,
    /// Whose estimates the probabilities use.
    pub perspective: Perspective,
    /// One entry per state, initial first.
    pub states: Vec<StateSnapshot>,
}

/// One state of a [`HistoryReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Index of the state in the history.
    pub index: usize,
    /// `positions[actor][dimension]`, on the percent scale.
    pub positions: Vec<Vec<f64>>,
    /// Probability of each actor's position prevailing, from the report's
    /// perspective.
    pub probabilities: Vec<f64>,
}

impl HistoryReport {
    /// Build a report of every state in `model`'s history, with
    /// probabilities from `perspective`.
    ///
    /// Probabilities of states whose utilities were never computed (the
    /// last state of a run) are computed here without modifying the model.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PerspectiveOutOfRange`] if `perspective` names
    /// an unknown actor, or [`EngineError::Invariant`] if any distribution
    /// fails.
    pub fn build(model: &Model, perspective: Perspective) -> Result<Self, EngineError> {
        if let Perspective::Actor(index) = perspective
            && index >= model.actors().len()
        {
            return Err(EngineError::PerspectiveOutOfRange {
                index,
                actors: model.actors().len(),
            });
        }

        let states: Vec<&State> = model.history().iter().collect();
        let states = states
            .into_par_iter()
            .map(|state| {
                let probabilities =
                    state.probability_distribution(perspective, model.actors(), model.config())?;
                Ok(StateSnapshot {
                    index: state.index(),
                    positions: state
                        .positions()
                        .iter()
                        .map(|p| p.coords().iter().map(|x| x * PERCENT).collect())
                        .collect(),
                    probabilities: probabilities.iter().copied().collect(),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self {
            run_id: model.run_id(),
            scenario: model.name().to_owned(),
            actors: model.actors().iter().map(|a| a.name.clone()).collect(),
            dimensions: model.dimension_names().to_vec(),
            perspective,
            states,
        })
    }

    /// Serialize the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error; a report of finite values always
    /// serializes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn name_width(&self) -> usize {
        self.actors
            .iter()
            .map(String::len)
            .chain(std::iter::once("Actor".len()))
            .max()
            .unwrap_or_default()
    }

    fn write_header(&self, out: &mut String, title: &str, width: usize) -> fmt::Result {
        writeln!(out, "{title}")?;
        write!(out, "{:<width$}", "Actor")?;
        for state in &self.states {
            write!(out, "{:>COLUMN_WIDTH$}", state.index)?;
        }
        writeln!(out)
    }

    fn render(&self) -> Result<String, fmt::Error> {
        let width = self.name_width().saturating_add(2);
        let mut out = String::new();
        if !self.scenario.is_empty() {
            writeln!(out, "Scenario: {}", self.scenario)?;
        }
        writeln!(out, "Run: {}", self.run_id)?;

        for (d, dimension) in self.dimensions.iter().enumerate() {
            writeln!(out)?;
            self.write_header(&mut out, &format!("Positions on {dimension}"), width)?;
            for (a, actor) in self.actors.iter().enumerate() {
                write!(out, "{actor:<width$}")?;
                for state in &self.states {
                    let value = state
                        .positions
                        .get(a)
                        .and_then(|p| p.get(d))
                        .copied()
                        .unwrap_or(f64::NAN);
                    write!(out, "{value:>COLUMN_WIDTH$.1}")?;
                }
                writeln!(out)?;
            }
        }

        writeln!(out)?;
        let title = match self.perspective {
            Perspective::Own => "Probability of prevailing (own estimates)".to_owned(),
            Perspective::Actor(index) => {
                let holder = self.actors.get(index).map_or("?", String::as_str);
                format!("Probability of prevailing (as seen by {holder})")
            }
        };
        self.write_header(&mut out, &title, width)?;
        for (a, actor) in self.actors.iter().enumerate() {
            write!(out, "{actor:<width$}")?;
            for state in &self.states {
                let value = state.probabilities.get(a).copied().unwrap_or(f64::NAN);
                write!(out, "{value:>COLUMN_WIDTH$.3}")?;
            }
            writeln!(out)?;
        }
        Ok(out)
    }
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crate::config::BargainingConfig;
    use crate::observer::NoOpObserver;
    use crate::scenario::Scenario;
    use crate::stop::StopPolicy;

    use super::*;

    const YAML: &str = "
name: Line
dimensions: [Budget]
actors:
  - { name: Left, capability: 50, positions: [0], saliences: [100] }
  - { name: Middle, capability: 50, positions: [50], saliences: [100] }
  - { name: Right, capability: 50, positions: [100], saliences: [100] }
";

    fn model(steps: u32) -> Model {
        let scenario = Scenario::from_yaml_str(YAML).unwrap();
        let mut model = Model::from_scenario(scenario, BargainingConfig::default()).unwrap();
        model
            .run(&StopPolicy::MaxIterations(steps), &mut NoOpObserver)
            .unwrap();
        model
    }

    #[test]
    fn report_covers_every_state() {
        let model = model(2);
        let report = HistoryReport::build(&model, Perspective::Own).unwrap();
        assert_eq!(report.scenario, "Line");
        assert_eq!(report.actors, vec!["Left", "Middle", "Right"]);
        assert_eq!(report.states.len(), 3);
        assert_eq!(report.states[0].positions, vec![vec![0.0], vec![50.0], vec![100.0]]);
        for state in &report.states {
            let total: f64 = state.probabilities.iter().sum();
            assert!((total - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn json_export_parses_back() {
        let report = HistoryReport::build(&model(1), Perspective::Own).unwrap();
        let parsed: HistoryReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.states.len(), 2);
        assert_eq!(parsed.states[1].index, 1);
    }

    #[test]
    fn table_lists_actors_and_dimensions() {
        let text = HistoryReport::build(&model(1), Perspective::Own).unwrap().to_string();
        assert!(text.contains("Scenario: Line"));
        assert!(text.contains("Positions on Budget"));
        assert!(text.contains("Probability of prevailing"));
        assert!(text.lines().any(|l| l.starts_with("Middle") && l.contains("50.0")));
    }

    #[test]
    fn actor_perspective_is_reported() {
        let model = model(0);
        let report = HistoryReport::build(&model, Perspective::Actor(0)).unwrap();
        assert_eq!(report.perspective, Perspective::Actor(0));
        // Seen from the left flank, the centre is the likeliest to prevail.
        let p = &report.states[0].probabilities;
        assert!(p[1] > p[0] && p[1] > p[2], "{p:?}");
        assert!(report.to_string().contains("as seen by Left"));

        let own = HistoryReport::build(&model, Perspective::Own).unwrap();
        assert_ne!(own.states[0].probabilities, report.states[0].probabilities);
    }

    #[test]
    fn unknown_perspective_is_rejected() {
        let err = HistoryReport::build(&model(0), Perspective::Actor(3)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::PerspectiveOutOfRange { index: 3, actors: 3 }
        ));
    }
}
