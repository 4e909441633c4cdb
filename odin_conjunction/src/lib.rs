/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! conjunction (close approach) analysis for a target object against a TLE catalog.
//!
//! The pipeline is
//! ```text
//!   TLE text -> Catalog -> CatalogPropagator -> PropagatedCatalog -> scan -> AlertRanker -> AnalysisResult
//! ```
//! All positions are TEME cartesian coordinates in km as produced by SGP4/SDP4. Every position sequence
//! of a run is computed over the same [`TimeGrid`], which is what makes the index-wise distance
//! comparison valid.

use std::{fs, path::Path, time::Duration};
use chrono::{DateTime, TimeDelta, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub mod errors;
use errors::{invalid_param, Result, OdinConjunctionError};

pub mod catalog;
pub mod propagator;
pub mod driver;
pub mod scanner;
pub mod ranker;
pub mod analysis;

pub use catalog::{Catalog, OrbitalElementSet, RecordOutcome, SkippedRecord, parse_records};
pub use propagator::{OrbitPropagator, propagate};
pub use driver::{CatalogPropagator, PropagatedCatalog, PropagatedObject, PropagationFailure};
pub use scanner::{ProximityRecord, min_distance, min_distance_slices, scan};
pub use ranker::{Alert, AlertRanker, RiskBands, RiskLevel};
pub use analysis::{AnalysisResult, AnalysisState, ConjunctionAnalysis, Insight, RunParams, analyze, analyze_staged, assess};

/// upper bound for the number of samples in a TimeGrid (24h at 0.1 sec)
pub const MAX_GRID_SAMPLES: usize = 864_000;

/* #region configuration ********************************************************************************************/

/// configuration of conjunction analysis runs. Values not specified in a config file
/// fall back to the defaults:
/// ```text
///   window:       24h
///   step:         60 sec
///   threshold_km: 100.0
///   risk_bands:   maneuver < 25km, close monitoring < 50km
///   max_workers:  0 (number of cores)
///   timeout:      None
/// ```
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct ConjunctionConfig {
    pub window: Duration,
    pub step: Duration,
    pub threshold_km: f64,
    pub risk_bands: RiskBands,
    pub max_workers: usize,
    pub timeout: Option<Duration>, // budget for the whole propagate-and-scan pass
}

impl Default for ConjunctionConfig {
    fn default ()->Self {
        ConjunctionConfig {
            window: Duration::from_secs( 24 * 3600),
            step: Duration::from_secs(60),
            threshold_km: 100.0,
            risk_bands: RiskBands::default(),
            max_workers: 0,
            timeout: None,
        }
    }
}

impl ConjunctionConfig {
    pub fn validate (&self)->Result<()> {
        self.risk_bands.validate()?;
        ranker::check_threshold( self.threshold_km)?;
        if self.step.is_zero() { return Err( invalid_param!("time step has to be > 0")) }
        if self.window < self.step { return Err( invalid_param!("window {:?} shorter than time step {:?}", self.window, self.step)) }
        Ok(())
    }
}

/// load a RON config from the provided path
pub fn load_config_path<C,P> (path: P) -> Result<C> where C: for <'a> Deserialize<'a>, P: AsRef<Path> {
    let data = fs::read_to_string( path.as_ref())?;
    Ok( ron::de::from_str( &data)? )
}

/* #endregion configuration */

/* #region time grid ************************************************************************************************/

/// the ordered, evenly spaced sample times of one analysis run.
/// This is shared read-only by all propagations of the run
#[derive(Debug,Clone,PartialEq)]
pub struct TimeGrid {
    step: TimeDelta,
    times: Vec<DateTime<Utc>>,
}

impl TimeGrid {
    /// grid starting at `start` with floor(window/step) samples, i.e. 24h at 1min gives 1440 samples
    pub fn new (start: DateTime<Utc>, window: Duration, step: Duration) -> Result<Self> {
        if step.is_zero() { return Err( invalid_param!("time step has to be > 0")) }
        if window < step { return Err( invalid_param!("window {:?} shorter than time step {:?}", window, step)) }

        let n = usize::try_from( window.as_nanos() / step.as_nanos())
            .map_err(|_| invalid_param!("too many time samples for window {:?} and step {:?}", window, step))?;
        Self::with_samples( start, step, n)
    }

    pub fn with_samples (start: DateTime<Utc>, step: Duration, n_samples: usize) -> Result<Self> {
        if step.is_zero() { return Err( invalid_param!("time step has to be > 0")) }
        if n_samples == 0 { return Err( invalid_param!("time grid needs at least one sample")) }
        if n_samples > MAX_GRID_SAMPLES { return Err( invalid_param!("too many time samples: {n_samples}")) }

        let step = TimeDelta::from_std(step).map_err(|e| invalid_param!("time step out of range: {e}"))?;
        let mut times: Vec<DateTime<Utc>> = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            // compute each sample from start so that we don't accumulate rounding errors
            let t = step.checked_mul(i as i32)
                .and_then( |dt| start.checked_add_signed(dt))
                .ok_or( invalid_param!("time grid exceeds datetime range at sample {i}"))?;
            times.push(t);
        }

        Ok( TimeGrid { step, times } )
    }

    pub fn len (&self)->usize { self.times.len() }

    /// grids always have at least one sample
    pub fn is_empty (&self)->bool { self.times.is_empty() }

    pub fn start (&self)->DateTime<Utc> { self.times[0] }

    pub fn end (&self)->DateTime<Utc> { self.times[self.times.len()-1] }

    pub fn step (&self)->TimeDelta { self.step }

    pub fn times (&self)->&[DateTime<Utc>] { &self.times }

    pub fn time_at (&self, idx: usize)->Option<DateTime<Utc>> { self.times.get(idx).copied() }

    pub fn iter (&self)->impl Iterator<Item=&DateTime<Utc>> { self.times.iter() }
}

/* #endregion time grid */

/* #region position sequence ****************************************************************************************/

/// TEME positions [km] of one object, one per TimeGrid sample
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(transparent)]
pub struct PositionSequence {
    positions: Vec<Vector3<f64>>,
}

impl PositionSequence {
    pub fn new (positions: Vec<Vector3<f64>>)->Self {
        PositionSequence { positions }
    }

    pub fn len (&self)->usize { self.positions.len() }

    pub fn is_empty (&self)->bool { self.positions.is_empty() }

    pub fn get (&self, idx: usize)->Option<&Vector3<f64>> { self.positions.get(idx) }

    pub fn as_slice (&self)->&[Vector3<f64>] { &self.positions }

    pub fn iter (&self)->impl Iterator<Item=&Vector3<f64>> { self.positions.iter() }

    /// euclidean distance [km] to `other` at the same sample index
    pub fn distance_at (&self, other: &PositionSequence, idx: usize)->Option<f64> {
        match (self.positions.get(idx), other.positions.get(idx)) {
            (Some(p), Some(q)) => Some( (p - q).norm()),
            _ => None
        }
    }

    /// geocentric distance [km] at the given sample index
    pub fn radius_at (&self, idx: usize)->Option<f64> {
        self.positions.get(idx).map( |p| p.norm())
    }
}

impl From<Vec<Vector3<f64>>> for PositionSequence {
    fn from (positions: Vec<Vector3<f64>>)->Self { PositionSequence { positions } }
}

/* #endregion position sequence */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_grid_size_limits () {
        let start = Utc.with_ymd_and_hms( 2025, 3, 17, 12, 0, 0).unwrap();

        let grid = TimeGrid::new( start, Duration::from_secs(150), Duration::from_secs(60)).unwrap();
        assert_eq!( grid.len(), 2);
        assert_eq!( grid.end(), start + TimeDelta::minutes(1));

        // sample count does not fit into usize
        assert!( matches!( TimeGrid::new( start, Duration::MAX, Duration::from_nanos(1)), Err(OdinConjunctionError::InvalidParameter(_))));
        // fits but exceeds the grid limit
        assert!( matches!( TimeGrid::new( start, Duration::from_secs(86400), Duration::from_millis(10)), Err(OdinConjunctionError::InvalidParameter(_))));
        assert!( TimeGrid::new( start, Duration::from_secs(30), Duration::from_secs(60)).is_err());
    }
}
