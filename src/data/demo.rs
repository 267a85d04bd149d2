//! Seeded synthetic car dataset for the demo walkthrough.
//!
//! Columns:
//!
//! - `mpg` (numeric response): fuel economy, linear in weight and power plus
//!   a per-cylinder shift and Gaussian noise
//! - `wt`, `hp` (numeric): weight in 1000 lbs, gross horsepower
//! - `cyl` (categorical): `four`, `six` or `eight`
//! - `am` (categorical): `auto` or `manual`, more likely manual for light cars
//!
//! A fraction of `hp` cells is left missing so the row-preserving prediction
//! path has something to do.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::{Column, Table};
use crate::error::SpecError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoConfig {
    pub seed: u64,
    pub rows: usize,
    /// Share of `hp` cells set to missing, in `[0, 1)`.
    pub missing_rate: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rows: 60,
            missing_rate: 0.05,
        }
    }
}

const CYLINDERS: [(&str, f64, f64); 3] = [
    // (level, mean weight, mpg shift)
    ("four", 2.3, 0.0),
    ("six", 3.1, -2.5),
    ("eight", 3.9, -4.0),
];

pub fn generate_demo(config: &DemoConfig) -> Result<Table, SpecError> {
    if config.rows < 2 {
        return Err(SpecError::Data("demo dataset needs at least 2 rows".to_string()));
    }
    if !(0.0..1.0).contains(&config.missing_rate) {
        return Err(SpecError::Data(format!(
            "missing rate must be in [0, 1), got {}",
            config.missing_rate
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 1.0).map_err(|e| SpecError::Data(format!("noise distribution error: {e}")))?;

    let mut mpg = Vec::with_capacity(config.rows);
    let mut wt = Vec::with_capacity(config.rows);
    let mut hp = Vec::with_capacity(config.rows);
    let mut cyl = Vec::with_capacity(config.rows);
    let mut am = Vec::with_capacity(config.rows);

    for i in 0..config.rows {
        // Cycle through levels first so every level is present in small samples.
        let (level, mean_wt, shift) = if i < CYLINDERS.len() {
            CYLINDERS[i]
        } else {
            CYLINDERS[rng.gen_range(0..CYLINDERS.len())]
        };
        let weight = (mean_wt + 0.35 * noise.sample(&mut rng)).max(1.5);
        let power = (40.0 * weight + 20.0 + 15.0 * noise.sample(&mut rng)).max(50.0);
        let economy = 37.0 - 3.2 * weight - 0.02 * power + shift + 1.5 * noise.sample(&mut rng);

        let p_manual = 1.0 / (1.0 + (3.0 * (weight - 3.0)).exp());
        let transmission = if rng.gen_bool(p_manual.clamp(0.0, 1.0)) { "manual" } else { "auto" };
        let missing = rng.gen_bool(config.missing_rate);

        mpg.push(round2(economy));
        wt.push(round2(weight));
        hp.push(if missing { None } else { Some(power.round()) });
        cyl.push(level.to_string());
        am.push(transmission.to_string());
    }

    Table::from_columns(vec![
        Column::numeric("mpg", mpg),
        Column::numeric("wt", wt),
        Column::numeric_opt("hp", hp),
        Column::categorical("cyl", cyl),
        Column::categorical("am", am),
    ])
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
