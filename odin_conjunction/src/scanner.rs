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

use std::fmt;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::{PositionSequence, driver::PropagatedCatalog};

/// closest approach of one object to the target over the time grid
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct ProximityRecord {
    pub object_id: String,
    pub norad_id: u64,
    pub min_distance_km: f64,
    pub time_index: usize,
}

impl fmt::Display for ProximityRecord {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {:.3} km at sample {}", self.object_id, self.norad_id, self.min_distance_km, self.time_index)
    }
}

/// minimum euclidean distance between two position sequences that were computed for the same
/// time grid, and the first sample index at which it occurs.
/// Returns None if the sequences are empty or of different length
pub fn min_distance (a: &PositionSequence, b: &PositionSequence)->Option<(f64,usize)> {
    min_distance_slices( a.as_slice(), b.as_slice())
}

/// the scan kernel - a single allocation free pass over the time axis that compares squared distances
/// and only takes one square root per object
pub fn min_distance_slices (a: &[Vector3<f64>], b: &[Vector3<f64>])->Option<(f64,usize)> {
    if a.is_empty() || a.len() != b.len() { return None }

    let mut min_d2 = f64::INFINITY;
    let mut min_idx = 0;

    for (i,(p,q)) in a.iter().zip(b.iter()).enumerate() {
        let d2 = (p - q).norm_squared();
        if d2 < min_d2 {
            min_d2 = d2;
            min_idx = i;
        }
    }

    Some( (min_d2.sqrt(), min_idx) )
}

/// compute the closest approach of every propagated non-target object to the target positions.
/// Objects that failed to propagate are not part of `propagated` and hence never show up here
pub fn scan (target_id: &str, target: &PositionSequence, propagated: &PropagatedCatalog)->Vec<ProximityRecord> {
    propagated.objects().iter()
        .filter( |o| o.object_id != target_id)
        .filter_map( |o| {
            min_distance( target, &o.positions).map( |(min_distance_km, time_index)| {
                ProximityRecord { object_id: o.object_id.clone(), norad_id: o.norad_id, min_distance_km, time_index }
            })
        })
        .collect()
}
