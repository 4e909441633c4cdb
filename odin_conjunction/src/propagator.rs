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

use chrono::{DateTime, NaiveDateTime, Utc};
use nalgebra::Vector3;
use sgp4::{Constants, MinutesSinceEpoch};
use crate::{PositionSequence, TimeGrid, catalog::OrbitalElementSet, errors::{propagation_error, Result, OdinConjunctionError}};

/// SGP4/SDP4 propagator for a single element set. The model constants are initialized once
/// so that the propagator can be evaluated for any number of sample times.
/// Output positions are in the TEME frame [km]
pub struct OrbitPropagator<'a> {
    elset: &'a OrbitalElementSet,
    constants: Constants,
}

impl <'a> OrbitPropagator<'a> {
    /// this fails for degenerate elements (e.g. negative semi-latus rectum or out-of-range eccentricity)
    pub fn new (elset: &'a OrbitalElementSet) -> Result<Self> {
        let constants = Constants::from_elements( elset.elements())
            .map_err(|e| propagation_error!("invalid elements: {e}"))?;

        Ok( OrbitPropagator { elset, constants } )
    }

    pub fn element_set (&self)->&OrbitalElementSet { self.elset }

    pub fn position_at (&self, t: DateTime<Utc>) -> Result<Vector3<f64>> {
        self.predict( &t).map_err(|msg| propagation_error!("at {t}: {msg}"))
    }

    /// fill `buf` with the positions for all grid samples. The buffer is cleared first so that
    /// callers can re-use it across objects
    pub fn propagate_into (&self, grid: &TimeGrid, buf: &mut Vec<Vector3<f64>>) -> Result<()> {
        buf.clear();
        buf.reserve( grid.len());

        for (i,t) in grid.iter().enumerate() {
            let p = self.predict(t).map_err(|msg| propagation_error!("sample {i} ({t}): {msg}"))?;
            buf.push(p);
        }
        Ok(())
    }

    pub fn propagate (&self, grid: &TimeGrid) -> Result<PositionSequence> {
        let mut buf: Vec<Vector3<f64>> = Vec::with_capacity( grid.len());
        self.propagate_into( grid, &mut buf)?;
        Ok( PositionSequence::new(buf) )
    }

    fn predict (&self, t: &DateTime<Utc>) -> std::result::Result<Vector3<f64>,String> {
        let minutes = minutes_since_epoch( &self.elset.elements().datetime, t)?;
        let prediction = self.constants.propagate( MinutesSinceEpoch(minutes)).map_err(|e| e.to_string())?;

        let p = Vector3::new( prediction.position[0], prediction.position[1], prediction.position[2]);
        if p.iter().all( |c| c.is_finite()) { Ok(p) } else { Err( "non-finite position".to_string()) }
    }
}

/// propagate one element set over the provided time grid. The result has exactly one position per grid sample
pub fn propagate (elset: &OrbitalElementSet, grid: &TimeGrid) -> Result<PositionSequence> {
    OrbitPropagator::new(elset)?.propagate(grid)
}

/// minutes between element set epoch and `t` (negative if `t` is before the epoch).
/// This uses integer microseconds for the difference so that the result does not depend on
/// how far grid and epoch are apart
fn minutes_since_epoch (epoch: &NaiveDateTime, t: &DateTime<Utc>) -> std::result::Result<f64,String> {
    let dt = t.naive_utc().signed_duration_since( *epoch);
    dt.num_microseconds()
        .map( |us| us as f64 / 60_000_000.0)
        .ok_or_else( || format!("time too far from element set epoch {epoch}"))
}
