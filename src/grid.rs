// Per-cell world arrays on a toroidal grid

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Grid coordinate as (row, col).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: usize,
    pub col: usize,
}

impl Location {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Cardinal directions in clockwise order, matching the layout of the
/// sensory inputs and the reproduction / energy outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    const fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

pub struct Grid {
    rows: usize,
    cols: usize,
    num_nutrients: usize,
    pub occupancy: Vec<bool>,
    pub light: Vec<f64>,
    /// `num_nutrients` entries per cell, cell-major.
    pub nutrients: Vec<f64>,
    /// Committed by the previous step; read-only during a step.
    pub info: Vec<bool>,
    /// Energy sent into each cell during the previous step.
    pub inbound_energy: Vec<f64>,
}

impl Grid {
    pub fn new(config: &SimulationConfig) -> Self {
        let cells = config.cell_count();
        Self {
            rows: config.rows,
            cols: config.cols,
            num_nutrients: config.num_nutrients,
            occupancy: vec![false; cells],
            light: vec![config.sun_energy; cells],
            nutrients: vec![config.initial_nutrients; cells * config.num_nutrients],
            info: vec![false; cells],
            inbound_energy: vec![0.0; cells],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_nutrients(&self) -> usize {
        self.num_nutrients
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn index(&self, loc: Location) -> usize {
        loc.row * self.cols + loc.col
    }

    #[inline]
    pub fn location(&self, index: usize) -> Location {
        Location::new(index / self.cols, index % self.cols)
    }

    /// Neighbor in `dir`, wrapping around both edges.
    pub fn neighbor(&self, loc: Location, dir: Direction) -> Location {
        let (dr, dc) = dir.delta();
        let row = (loc.row as isize + dr).rem_euclid(self.rows as isize) as usize;
        let col = (loc.col as isize + dc).rem_euclid(self.cols as isize) as usize;
        Location::new(row, col)
    }

    pub fn is_occupied(&self, loc: Location) -> bool {
        self.occupancy[self.index(loc)]
    }

    pub fn nutrients_at(&self, loc: Location) -> &[f64] {
        let start = self.index(loc) * self.num_nutrients;
        &self.nutrients[start..start + self.num_nutrients]
    }

    pub fn nutrients_at_mut(&mut self, loc: Location) -> &mut [f64] {
        let start = self.index(loc) * self.num_nutrients;
        &mut self.nutrients[start..start + self.num_nutrients]
    }

    /// Add `amount` to every nutrient of every cell. No upper bound.
    pub fn restore_nutrients(&mut self, amount: f64) {
        self.nutrients.par_iter_mut().for_each(|n| *n += amount);
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.par_iter().filter(|&&o| o).count()
    }
}
