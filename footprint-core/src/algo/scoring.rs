//! Travel time to pressure score.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Error, Grid, NEVER, NODATA_TIME, PRESSURE_NODATA, PressureRaster, Time, TimeGrid};

const SETTLEMENT_SCORE: f32 = 7.5;
const LAND_USE_CHANGE_SCORE: f32 = 4.0;
const INDIRECT_HORIZON_HOURS: f64 = 4.0;

/// Exponential-decay scoring constants
///
/// Durations are in hours so the constants do not depend on the time unit
/// of the cumulative-time grid; [`ScoreParams::scorer`] converts them.
/// Cells beyond the horizon score zero; origins score `direct_score`;
/// every other cell scores
/// `max_score_exp * exp(-hours / denominator_hours) + min_score_exp`,
/// capped at `ceiling` when one is set. With `built_override`, every built
/// cell counts as an origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreParams {
    pub direct_score: f32,
    pub max_score_exp: f32,
    pub min_score_exp: f32,
    pub max_horizon_hours: f64,
    pub denominator_hours: f64,
    #[serde(default)]
    pub ceiling: Option<f32>,
    #[serde(default)]
    pub built_override: bool,
}

impl ScoreParams {
    /// Uncapped proximity to settlements
    pub fn proximity() -> Self {
        Self {
            direct_score: SETTLEMENT_SCORE,
            max_score_exp: LAND_USE_CHANGE_SCORE,
            min_score_exp: 0.0,
            max_horizon_hours: INDIRECT_HORIZON_HOURS,
            denominator_hours: 1.0,
            ceiling: None,
            built_override: false,
        }
    }

    /// Indirect pressure: capped, and built cells always count as origins
    pub fn indirect() -> Self {
        Self {
            direct_score: LAND_USE_CHANGE_SCORE,
            max_score_exp: LAND_USE_CHANGE_SCORE,
            min_score_exp: 0.0,
            max_horizon_hours: INDIRECT_HORIZON_HOURS,
            denominator_hours: 1.0,
            ceiling: Some(LAND_USE_CHANGE_SCORE),
            built_override: true,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let scores = [
            ("direct_score", self.direct_score),
            ("max_score_exp", self.max_score_exp),
            ("min_score_exp", self.min_score_exp),
        ];
        for (name, value) in scores {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Configuration(format!(
                    "score constant `{name}` must be finite and non-negative, got {value}"
                )));
            }
        }
        if let Some(ceiling) = self.ceiling
            && (!ceiling.is_finite() || ceiling < 0.0)
        {
            return Err(Error::Configuration(format!(
                "score ceiling must be finite and non-negative, got {ceiling}"
            )));
        }
        let durations = [
            ("decay denominator", self.denominator_hours),
            ("max horizon", self.max_horizon_hours),
        ];
        for (name, hours) in durations {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(Error::Configuration(format!(
                    "{name} must be a positive number of hours, got {hours}"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the constants to a grid whose times count `units_per_hour` per hour
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for invalid constants, a non-positive unit, or
    /// a horizon that does not fit between one unit and [`NEVER`].
    pub fn scorer(&self, units_per_hour: f64) -> Result<Scorer<'_>, Error> {
        self.validate()?;
        if !units_per_hour.is_finite() || units_per_hour <= 0.0 {
            return Err(Error::Configuration(format!(
                "time units per hour must be positive, got {units_per_hour}"
            )));
        }
        let horizon = (self.max_horizon_hours * units_per_hour).round();
        if horizon < 1.0 || horizon >= f64::from(NEVER) {
            return Err(Error::Configuration(format!(
                "max horizon of {} h is {horizon} time units, expected 1 to {}",
                self.max_horizon_hours,
                NEVER - 1
            )));
        }
        Ok(Scorer {
            params: self,
            horizon: horizon as Time,
            denominator: self.denominator_hours * units_per_hour,
        })
    }
}

/// [`ScoreParams`] bound to a time unit
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    params: &'a ScoreParams,
    horizon: Time,
    denominator: f64,
}

impl Scorer<'_> {
    /// Max horizon in time units
    pub fn horizon(&self) -> Time {
        self.horizon
    }

    /// Score of a single reachable or unreachable cell
    pub fn score(&self, time: Time, built: bool) -> f32 {
        let params = self.params;
        if time > self.horizon {
            return 0.0;
        }
        if time == 0 || (params.built_override && built) {
            return params.direct_score;
        }
        let decayed = f64::from(params.max_score_exp) * (-f64::from(time) / self.denominator).exp()
            + f64::from(params.min_score_exp);
        let decayed = decayed as f32;
        match params.ceiling {
            Some(ceiling) => decayed.min(ceiling),
            None => decayed,
        }
    }
}

/// Scores a cumulative-time grid; nodata cells stay nodata
///
/// `built` is required when `params.built_override` is set.
pub fn score_grid(
    times: &TimeGrid,
    built: Option<&Grid<bool>>,
    params: &ScoreParams,
    units_per_hour: f64,
) -> Result<PressureRaster, Error> {
    let scorer = params.scorer(units_per_hour)?;
    if let Some(built) = built {
        times.spec().ensure_matches(built.spec(), "built")?;
    } else if params.built_override {
        return Err(Error::Configuration(
            "built-cell override needs a built-up mask".into(),
        ));
    }

    let data: Vec<f32> = times
        .data()
        .par_iter()
        .enumerate()
        .map(|(index, &time)| {
            if time == NODATA_TIME {
                return PRESSURE_NODATA;
            }
            let is_built = built.is_some_and(|mask| mask.data()[index]);
            scorer.score(time, is_built)
        })
        .collect();

    Grid::new(times.spec().clone(), data, Some(PRESSURE_NODATA))
}
