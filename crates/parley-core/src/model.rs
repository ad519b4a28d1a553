//! The model driver: roster, dimensions, history and the run loop.
//!
//! A [`Model`] owns a fixed actor roster and an append-only [`History`]
//! that always holds at least the initial state. [`Model::run`] steps the
//! latest state until the supplied [`StopCondition`] fires or an invariant
//! fails; in the latter case the run stops with the index of the state
//! being stepped.

use chrono::{DateTime, Utc};
use nalgebra::DVector;
use parley_types::{Actor, Perspective, Position, RunId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bcn::bcn_step;
use crate::config::BargainingConfig;
use crate::error::{EngineError, ValidationError};
use crate::observer::StepObserver;
use crate::scenario::{ActorRecord, PERCENT, Scenario};
use crate::state::State;
use crate::stop::{StopCondition, StopReason, state_distance};

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Append-only sequence of states, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    past: Vec<State>,
    latest: State,
}

impl History {
    /// A history holding only `initial`.
    pub const fn new(initial: State) -> Self {
        Self {
            past: Vec::new(),
            latest: initial,
        }
    }

    /// Append a state; it becomes the latest.
    pub fn push(&mut self, state: State) {
        let previous = std::mem::replace(&mut self.latest, state);
        self.past.push(previous);
    }

    /// The most recent state.
    pub const fn latest(&self) -> &State {
        &self.latest
    }

    /// The most recent state, for filling in its derived data.
    pub const fn latest_mut(&mut self) -> &mut State {
        &mut self.latest
    }

    /// The state at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&State> {
        self.past
            .get(index)
            .or_else(|| (index == self.past.len()).then_some(&self.latest))
    }

    /// Number of states, including the initial one.
    pub fn len(&self) -> usize {
        self.past.len().saturating_add(1)
    }

    /// Never true: a history holds at least its initial state.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every state in order, initial first.
    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.into_iter()
    }

    /// Distance moved in the first step, once there is one.
    pub fn first_step_distance(&self) -> Option<f64> {
        Some(state_distance(self.get(0)?, self.get(1)?))
    }

    /// Distance moved in the latest step, once there is one.
    pub fn last_step_distance(&self) -> Option<f64> {
        let previous = self.past.last()?;
        Some(state_distance(previous, &self.latest))
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a State;
    type IntoIter = std::iter::Chain<std::slice::Iter<'a, State>, std::iter::Once<&'a State>>;

    fn into_iter(self) -> Self::IntoIter {
        self.past.iter().chain(std::iter::once(&self.latest))
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Outcome of [`Model::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier of the model that ran.
    pub run_id: RunId,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run.
    pub finished_at: DateTime<Utc>,
    /// Steps executed in this run.
    pub iterations: u32,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// Distance moved in the final step (zero if no step ran).
    pub final_distance: f64,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A negotiation model: fixed roster, dimension names and history.
#[derive(Debug, Clone)]
pub struct Model {
    run_id: RunId,
    name: String,
    actors: Vec<Actor>,
    dimension_names: Vec<String>,
    history: History,
    config: BargainingConfig,
}

impl Model {
    /// Build a model from parallel per-actor inputs on the `[0, 1]` scale.
    ///
    /// `positions[i]` and `saliences[i]` hold one value per dimension.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if the roster size is out of
    /// bounds, there are no dimensions, or any per-actor input is missing
    /// or has the wrong number of dimensions.
    pub fn init(
        actor_names: Vec<String>,
        actor_descs: Vec<String>,
        dim_names: Vec<String>,
        capabilities: &[f64],
        mut positions: Vec<Vec<f64>>,
        saliences: Vec<Vec<f64>>,
        config: BargainingConfig,
    ) -> Result<Self, EngineError> {
        let count = actor_names.len();
        let shortest = [
            actor_descs.len(),
            capabilities.len(),
            positions.len(),
            saliences.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or_default();
        if shortest < count {
            return Err(ValidationError::MissingRows {
                expected: count,
                actual: shortest,
            }
            .into());
        }

        let actors: Vec<Actor> = actor_names
            .into_iter()
            .zip(actor_descs)
            .zip(capabilities)
            .zip(saliences)
            .map(|(((name, description), &capability), salience)| {
                Actor::new(name, description, capability, salience)
            })
            .collect();

        // Bounds are checked on the percent scale shared with scenario files.
        let records = actors
            .iter()
            .zip(&positions)
            .map(|(actor, position)| ActorRecord {
                name: actor.name.clone(),
                description: actor.description.clone(),
                capability: actor.capability,
                positions: position.iter().map(|x| x * PERCENT).collect(),
                saliences: actor.salience.iter().map(|s| s * PERCENT).collect(),
                voting_rule: actor.voting_rule,
            })
            .collect();
        Scenario {
            name: String::new(),
            description: String::new(),
            dimensions: dim_names.clone(),
            actors: records,
        }
        .validate_bounds()?;

        positions.truncate(count);
        Ok(Self::assemble(String::new(), actors, dim_names, positions, config))
    }

    /// Build a model from a validated scenario, normalizing its percent
    /// scale to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if the scenario fails its bounds.
    pub fn from_scenario(scenario: Scenario, config: BargainingConfig) -> Result<Self, EngineError> {
        scenario.validate_bounds()?;
        let (actors, positions) = scenario
            .actors
            .into_iter()
            .map(|record| {
                let positions: Vec<f64> = record.positions.iter().map(|x| x / PERCENT).collect();
                let actor = Actor {
                    name: record.name,
                    description: record.description,
                    capability: record.capability,
                    salience: record.saliences.iter().map(|s| s / PERCENT).collect(),
                    voting_rule: record.voting_rule,
                };
                (actor, positions)
            })
            .unzip();
        Ok(Self::assemble(
            scenario.name,
            actors,
            scenario.dimensions,
            positions,
            config,
        ))
    }

    fn assemble(
        name: String,
        actors: Vec<Actor>,
        dimension_names: Vec<String>,
        positions: Vec<Vec<f64>>,
        config: BargainingConfig,
    ) -> Self {
        let initial = State::initial(positions.into_iter().map(Position::new).collect());
        let model = Self {
            run_id: RunId::new(),
            name,
            actors,
            dimension_names,
            history: History::new(initial),
            config,
        };
        info!(
            run_id = %model.run_id,
            actors = model.actors.len(),
            dimensions = model.dimension_names.len(),
            "Model initialized"
        );
        model
    }

    /// Identifier of this model's run.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Scenario name, if the model was built from one.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actor roster.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// One name per policy dimension.
    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    /// Sub-model selection used by every step.
    pub const fn config(&self) -> &BargainingConfig {
        &self.config
    }

    /// Every state so far, initial first.
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Probability distribution over actors' positions in the state at
    /// `state_index`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StateOutOfRange`] for an unknown state,
    /// [`EngineError::PerspectiveOutOfRange`] for an unknown actor, or
    /// [`EngineError::Invariant`] if the equilibrium fails.
    pub fn probability_distribution(
        &self,
        state_index: usize,
        perspective: Perspective,
    ) -> Result<DVector<f64>, EngineError> {
        let state = self
            .history
            .get(state_index)
            .ok_or(EngineError::StateOutOfRange {
                index: state_index,
                states: self.history.len(),
            })?;
        state.probability_distribution(perspective, &self.actors, &self.config)
    }

    /// Step the latest state until `stop` fires.
    ///
    /// Before each step the stop condition sees the number of steps run so
    /// far in this call and the whole history; after each step the observer
    /// sees the step report and the new state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Invariant`] with the failing state's index if
    /// any step violates an invariant. States appended before the failure
    /// remain in the history.
    pub fn run(
        &mut self,
        stop: &dyn StopCondition,
        observer: &mut dyn StepObserver,
    ) -> Result<RunSummary, EngineError> {
        let started_at = Utc::now();
        let mut iterations: u32 = 0;

        info!(
            run_id = %self.run_id,
            actors = self.actors.len(),
            states = self.history.len(),
            "Run starting"
        );

        let stop_reason = loop {
            if let Some(reason) = stop.should_stop(iterations, &self.history) {
                break reason;
            }

            let index = self.history.latest().index();
            let at_state = |source| EngineError::invariant(index, source);
            self.history
                .latest_mut()
                .ensure_utilities(&self.actors, &self.config)
                .map_err(at_state)?;
            let (next, report) =
                bcn_step(self.history.latest(), &self.actors, &self.config).map_err(at_state)?;
            self.history.push(next);
            iterations = iterations.saturating_add(1);

            let distance = self.history.last_step_distance().unwrap_or_default();
            info!(
                iteration = iterations,
                state = index.saturating_add(1),
                proposals = report.proposals,
                adopted = report.adopted(),
                distance,
                "Step complete"
            );
            debug!(choices = ?report.choices, "Step choices");
            observer.on_step(&report, self.history.latest());
        };

        let summary = RunSummary {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            iterations,
            stop_reason,
            final_distance: self.history.last_step_distance().unwrap_or_default(),
        };
        info!(
            run_id = %summary.run_id,
            reason = ?summary.stop_reason,
            iterations = summary.iterations,
            final_distance = summary.final_distance,
            "Run ended"
        );
        Ok(summary)
    }
}
