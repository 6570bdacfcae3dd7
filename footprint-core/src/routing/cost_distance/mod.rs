//! Multi-source cost-distance over an 8-connected cost grid.

mod state;

use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;
use std::time::{Duration, Instant};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{CostGrid, Error, Grid, IMPASSABLE, NEVER, NODATA_TIME, SeedSet, Time, TimeGrid};
use state::State;

/// How often the deadline is checked, in settled cells
const TIMEOUT_CHECK_INTERVAL: u64 = 4096;

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Cost of stepping between two neighbouring cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeighting {
    /// The destination cell's cost
    #[default]
    Destination,
    /// Mean of both cells' costs times the step length (√2 on diagonals)
    Geometric,
}

impl EdgeWeighting {
    fn step(self, from: Time, to: Time, diagonal: bool) -> Time {
        match self {
            EdgeWeighting::Destination => to,
            EdgeWeighting::Geometric => {
                let length = if diagonal { SQRT_2 } else { 1.0 };
                let mean = (f64::from(from) + f64::from(to)) / 2.0;
                (mean * length).round() as Time
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    pub weighting: EdgeWeighting,
    /// Working-set ceiling; larger problems report resource exhaustion
    pub memory_budget_bytes: Option<usize>,
    /// Wall-clock limit; exceeding it reports resource exhaustion
    pub timeout: Option<Duration>,
    /// Stop expanding beyond this time; farther cells stay [`NEVER`]
    pub max_time: Option<Time>,
}

/// Upper estimate of the solver's working set for a grid of `cells`
pub fn estimated_solve_bytes(cells: usize) -> usize {
    cells.saturating_mul(size_of::<Time>() + size_of::<State>())
}

fn exhausted(what: impl std::fmt::Display) -> Error {
    Error::ResourceExhausted(what.to_string())
}

/// Minimum accumulated cost from any seed to every cell
///
/// All seeds start at zero simultaneously. Impassable cells come out as
/// [`NODATA_TIME`], passable cells no seed reaches as [`NEVER`]. Seeds
/// outside the grid or on impassable cells are ignored.
///
/// # Errors
///
/// [`Error::ResourceExhausted`] when the working set exceeds the budget,
/// an allocation fails, or the timeout elapses.
pub fn cost_distance(
    cost: &CostGrid,
    seeds: &SeedSet,
    options: &SolveOptions,
) -> Result<TimeGrid, Error> {
    let spec = cost.spec();
    let cells = spec.len();
    let costs = cost.data();
    let impassable = |value: Time| value == IMPASSABLE || cost.is_nodata(value);

    if let Some(budget) = options.memory_budget_bytes {
        let needed = estimated_solve_bytes(cells);
        if needed > budget {
            return Err(exhausted(format!(
                "solving {cells} cells needs ~{needed} bytes, budget is {budget}"
            )));
        }
    }

    let mut times: Vec<Time> = Vec::new();
    times
        .try_reserve_exact(cells)
        .map_err(|e| exhausted(format!("cannot allocate {cells} cells: {e}")))?;
    times.extend(
        costs
            .iter()
            .map(|&value| if impassable(value) { NODATA_TIME } else { NEVER }),
    );

    let mut heap = BinaryHeap::new();
    heap.try_reserve(seeds.len())
        .map_err(|e| exhausted(format!("cannot allocate the queue: {e}")))?;

    for seed in seeds.iter() {
        let Some((row, col)) = spec.cell_at(seed.point) else {
            trace!("Seed at {:?} is outside the grid", seed.point);
            continue;
        };
        let index = spec.index(row, col);
        match times[index] {
            NODATA_TIME => trace!("Seed at {:?} lies on an impassable cell", seed.point),
            0 => {}
            _ => {
                times[index] = 0;
                heap.push(State {
                    cost: 0,
                    cell: index,
                });
            }
        }
    }
    debug!(
        "Expanding from {} origin cells over {}x{} grid",
        heap.len(),
        spec.width,
        spec.height
    );

    let deadline = options.timeout.map(|limit| (Instant::now() + limit, limit));
    let mut settled = 0u64;

    while let Some(State { cost: current, cell }) = heap.pop() {
        // Skip if we've found a better path
        if current > times[cell] {
            continue;
        }
        if let Some(max) = options.max_time
            && current > max
        {
            break;
        }

        settled += 1;
        if settled % TIMEOUT_CHECK_INTERVAL == 0
            && let Some((deadline, limit)) = deadline
            && Instant::now() >= deadline
        {
            return Err(exhausted(format!(
                "solve exceeded {limit:?} after settling {settled} cells"
            )));
        }

        let (row, col) = spec.row_col(cell);
        for (dr, dc) in NEIGHBOURS {
            let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
            else {
                continue;
            };
            if r >= spec.height || c >= spec.width {
                continue;
            }
            let next = spec.index(r, c);
            let to = costs[next];
            if impassable(to) {
                continue;
            }
            let step = options.weighting.step(costs[cell], to, dr != 0 && dc != 0);
            let next_cost = current.saturating_add(step).min(NEVER - 1);

            if next_cost < times[next] {
                times[next] = next_cost;
                if heap.len() == heap.capacity() {
                    heap.try_reserve(heap.capacity().max(64))
                        .map_err(|e| exhausted(format!("cannot grow the queue: {e}")))?;
                }
                heap.push(State {
                    cost: next_cost,
                    cell: next,
                });
            }
        }
    }

    if let Some(max) = options.max_time {
        for time in times.iter_mut().filter(|t| **t > max && **t < NEVER) {
            *time = NEVER;
        }
    }

    debug!("Settled {settled} cells");
    Grid::new(spec.clone(), times, Some(NODATA_TIME))
}
