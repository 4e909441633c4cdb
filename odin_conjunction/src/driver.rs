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

use std::{collections::HashMap, fmt, time::{Duration, Instant}};
use nalgebra::Vector3;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::{
    ConjunctionConfig, PositionSequence, TimeGrid,
    catalog::{Catalog, OrbitalElementSet},
    propagator::{propagate, OrbitPropagator},
    scanner::{min_distance_slices, ProximityRecord},
    errors::{op_failed, Result, OdinConjunctionError}
};

/// an object that could not be propagated in this run. This is informational and does not fail the run
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct PropagationFailure {
    pub object_id: String,
    pub norad_id: u64,
    pub reason: String,
}

impl PropagationFailure {
    pub fn new (elset: &OrbitalElementSet, reason: impl ToString)->Self {
        PropagationFailure { object_id: elset.name().to_string(), norad_id: elset.norad_id(), reason: reason.to_string() }
    }
}

impl fmt::Display for PropagationFailure {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.object_id, self.norad_id, self.reason)
    }
}

#[derive(Debug,Clone,PartialEq)]
pub struct PropagatedObject {
    pub object_id: String,
    pub norad_id: u64,
    pub positions: PositionSequence,
}

/// the position sequences of all successfully propagated catalog objects (in catalog order) plus the
/// objects that failed. All sequences have the same length as the TimeGrid they were computed for
#[derive(Debug,Clone)]
pub struct PropagatedCatalog {
    grid_len: usize,
    objects: Vec<PropagatedObject>,
    index: HashMap<String,usize>,
    failures: Vec<PropagationFailure>,
}

impl PropagatedCatalog {
    pub fn new (grid_len: usize, objects: Vec<PropagatedObject>, failures: Vec<PropagationFailure>) -> Result<Self> {
        let mut index: HashMap<String,usize> = HashMap::with_capacity( objects.len());

        for (i,o) in objects.iter().enumerate() {
            if o.positions.len() != grid_len {
                return Err( op_failed!("position sequence of {} has {} samples, expected {}", o.object_id, o.positions.len(), grid_len))
            }
            if index.insert( o.object_id.clone(), i).is_some() {
                return Err( op_failed!("duplicate object id {}", o.object_id))
            }
        }

        Ok( PropagatedCatalog { grid_len, objects, index, failures } )
    }

    pub fn grid_len (&self)->usize { self.grid_len }

    pub fn len (&self)->usize { self.objects.len() }

    pub fn is_empty (&self)->bool { self.objects.is_empty() }

    pub fn get (&self, object_id: &str)->Option<&PositionSequence> {
        self.object(object_id).map( |o| &o.positions)
    }

    pub fn object (&self, object_id: &str)->Option<&PropagatedObject> {
        self.index.get(object_id).map( |&i| &self.objects[i])
    }

    pub fn objects (&self)->&[PropagatedObject] { &self.objects }

    pub fn failures (&self)->&[PropagationFailure] { &self.failures }

    pub fn failure (&self, object_id: &str)->Option<&PropagationFailure> {
        self.failures.iter().find( |f| f.object_id == object_id)
    }
}

/// per-object result of the fused propagate-and-scan pass
enum ObjectScan {
    Target,
    Scanned(ProximityRecord),
    Failed(PropagationFailure),
}

/// the driver that propagates catalog objects on a fixed size worker pool.
/// Each worker produces the result slot for its own object, results are gathered in catalog order
/// at a single join point so that runs are deterministic regardless of the number of workers
pub struct CatalogPropagator {
    pool: ThreadPool,
    timeout: Option<Duration>,
}

impl CatalogPropagator {
    /// `max_workers` == 0 uses the number of available cores
    pub fn new (max_workers: usize, timeout: Option<Duration>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads( max_workers)
            .thread_name( |i| format!("conjunction-{i}"))
            .build()
            .map_err(|e| op_failed!("failed to create worker pool: {e}"))?;

        Ok( CatalogPropagator { pool, timeout } )
    }

    pub fn from_config (config: &ConjunctionConfig) -> Result<Self> {
        Self::new( config.max_workers, config.timeout)
    }

    pub fn n_workers (&self)->usize { self.pool.current_num_threads() }

    pub fn timeout (&self)->Option<Duration> { self.timeout }

    /// propagate all catalog entries (including a potential target) over the same time grid.
    /// Objects that cannot be propagated are recorded as failures, they do not abort the batch
    pub fn propagate_all (&self, catalog: &Catalog, grid: &TimeGrid) -> Result<PropagatedCatalog> {
        let outcomes = self.fan_out( catalog.entries(), || (), |_, elset| {
            match propagate( elset, grid) {
                Ok(positions) => Ok( PropagatedObject{ object_id: elset.name().to_string(), norad_id: elset.norad_id(), positions }),
                Err(e) => Err( PropagationFailure::new( elset, e))
            }
        })?;

        let mut objects: Vec<PropagatedObject> = Vec::with_capacity( outcomes.len());
        let mut failures: Vec<PropagationFailure> = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(o) => objects.push(o),
                Err(f) => {
                    warn!("failed to propagate {f}");
                    failures.push(f);
                }
            }
        }
        debug!("propagated {} objects over {} samples, {} failures", objects.len(), grid.len(), failures.len());

        PropagatedCatalog::new( grid.len(), objects, failures)
    }

    /// propagate every non-target catalog object and immediately reduce it to its closest approach
    /// to the provided target positions. Per-object position buffers are re-used within each worker
    /// so that we never hold the positions of the whole catalog
    pub fn propagate_and_scan (&self, catalog: &Catalog, grid: &TimeGrid, target_id: &str, target: &PositionSequence)
        -> Result<(Vec<ProximityRecord>, Vec<PropagationFailure>)>
    {
        if target.len() != grid.len() {
            return Err( op_failed!("target positions have {} samples, expected {}", target.len(), grid.len()))
        }
        let n = grid.len();

        let outcomes = self.fan_out( catalog.entries(), || Vec::<Vector3<f64>>::with_capacity(n), |buf, elset| {
            if elset.name() == target_id { return ObjectScan::Target }

            match OrbitPropagator::new(elset).and_then( |p| p.propagate_into( grid, buf)) {
                Ok(()) => match min_distance_slices( target.as_slice(), buf) {
                    Some((min_distance_km, time_index)) => ObjectScan::Scanned( ProximityRecord {
                        object_id: elset.name().to_string(),
                        norad_id: elset.norad_id(),
                        min_distance_km,
                        time_index
                    }),
                    None => ObjectScan::Failed( PropagationFailure::new( elset, "no positions to compare"))
                }
                Err(e) => ObjectScan::Failed( PropagationFailure::new( elset, e))
            }
        })?;

        let mut records: Vec<ProximityRecord> = Vec::with_capacity( outcomes.len());
        let mut failures: Vec<PropagationFailure> = Vec::new();
        for outcome in outcomes {
            match outcome {
                ObjectScan::Scanned(rec) => records.push(rec),
                ObjectScan::Failed(f) => {
                    warn!("failed to propagate {f}");
                    failures.push(f);
                }
                ObjectScan::Target => {}
            }
        }

        Ok( (records, failures) )
    }

    /// the parallel map over catalog entries. `init` creates per-worker state (e.g. buffers).
    /// If a time budget is set and exceeded, workers skip the remaining objects and the whole pass fails
    fn fan_out<T,S,I,F> (&self, entries: &[OrbitalElementSet], init: I, f: F) -> Result<Vec<T>>
        where T: Send, I: Fn()->S + Sync + Send, F: Fn(&mut S, &OrbitalElementSet)->T + Sync + Send
    {
        let started = Instant::now();
        let budget = self.timeout;

        let slots: Vec<Option<T>> = self.pool.install( || {
            entries.par_iter()
                .map_init( init, |state, elset| {
                    if budget.is_some_and( |b| started.elapsed() > b) { None } else { Some( f( state, elset)) }
                })
                .collect()
        });

        if let Some(budget) = budget {
            if slots.iter().any( |s| s.is_none()) {
                return Err( OdinConjunctionError::Timeout { elapsed: started.elapsed(), budget })
            }
        }

        Ok( slots.into_iter().flatten().collect() )
    }
}
