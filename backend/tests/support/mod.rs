#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use hammerhead_rust::models::time::Epoch;
use hammerhead_rust::models::TrajectorySample;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Perihelion of encounter 4.
pub fn perihelion_e04() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 29, 9, 37, 0).unwrap()
}

pub fn epoch(dt: DateTime<Utc>) -> f64 {
    Epoch::from_datetime(dt).value()
}

/// 5-minute trajectory covering `perihelion ± half_window` that advances
/// `rate` degrees per hour from `lon0`, wrapped into [0, 360).
pub fn linear_trajectory(
    perihelion: DateTime<Utc>,
    half_window: f64,
    lon0: f64,
    rate: f64,
) -> Vec<TrajectorySample> {
    let start = epoch(perihelion) - half_window;
    let n = (2.0 * half_window / 300.0) as usize;
    (0..=n)
        .map(|i| {
            let dt = i as f64 * 300.0;
            TrajectorySample::new(start + dt, (lon0 + rate * dt / 3600.0).rem_euclid(360.0))
        })
        .collect()
}

/// Trajectory that moves backward for the first `back_hours`, then forward.
pub fn turnaround_trajectory(
    perihelion: DateTime<Utc>,
    half_window: f64,
    lon0: f64,
    back_hours: f64,
) -> Vec<TrajectorySample> {
    let start = epoch(perihelion) - half_window;
    let n = (2.0 * half_window / 300.0) as usize;
    (0..=n)
        .map(|i| {
            let hours = i as f64 * 300.0 / 3600.0;
            let lon = if hours < back_hours {
                lon0 - hours
            } else {
                lon0 - back_hours + 3.0 * (hours - back_hours)
            };
            TrajectorySample::new(start + i as f64 * 300.0, lon.rem_euclid(360.0))
        })
        .collect()
}
