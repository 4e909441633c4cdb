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

use std::{fmt, time::{Duration, Instant}};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::{
    ConjunctionConfig, PositionSequence, TimeGrid,
    catalog::Catalog,
    driver::{CatalogPropagator, PropagatedCatalog, PropagationFailure},
    propagator::propagate,
    ranker::{check_threshold, Alert, AlertRanker, RiskLevel},
    scanner::scan,
    errors::{op_failed, Result, OdinConjunctionError}
};

/* #region run parameters *******************************************************************************************/

/// the caller supplied parameters of one analysis run.
/// If `start` is not set the time grid starts at the epoch of the target element set
#[derive(Debug,Clone,PartialEq)]
pub struct RunParams {
    pub target: String,
    pub threshold_km: f64,
    pub start: Option<DateTime<Utc>>,
    pub window: Duration,
    pub step: Duration,
}

impl RunParams {
    /// 24h window with 1min resolution
    pub fn new (target: impl ToString, threshold_km: f64)->Self {
        let config = ConjunctionConfig::default();
        RunParams { target: target.to_string(), threshold_km, start: None, window: config.window, step: config.step }
    }

    pub fn from_config (target: impl ToString, config: &ConjunctionConfig)->Self {
        RunParams { target: target.to_string(), threshold_km: config.threshold_km, start: None, window: config.window, step: config.step }
    }

    pub fn with_start (mut self, start: DateTime<Utc>)->Self { self.start = Some(start); self }

    pub fn with_window (mut self, window: Duration)->Self { self.window = window; self }

    pub fn with_step (mut self, step: Duration)->Self { self.step = step; self }

    pub fn with_threshold (mut self, threshold_km: f64)->Self { self.threshold_km = threshold_km; self }

    pub fn time_grid (&self, default_start: DateTime<Utc>) -> Result<TimeGrid> {
        TimeGrid::new( self.start.unwrap_or(default_start), self.window, self.step)
    }
}

/* #endregion run parameters */

/* #region analysis result ******************************************************************************************/

/// assessment of the closest threat
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Insight {
    pub object_id: String,
    pub distance_km: f64,
    pub risk: RiskLevel,
    pub insight: String,
    pub recommendation: String,
}

impl fmt::Display for Insight {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insight: {}\nrecommendation: {}", self.insight, self.recommendation)
    }
}

/// the sole output of a conjunction analysis, which is also the input for visualization.
/// Alerts are sorted by ascending distance, all position sequences align with `times`
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct AnalysisResult {
    pub target_id: String,
    pub threshold_km: f64,
    pub objects_checked: usize,
    pub alerts: Vec<Alert>,
    pub times: Vec<DateTime<Utc>>,
    pub target_positions: PositionSequence,
    pub closest_threat_positions: Option<PositionSequence>,
    pub skipped_records: usize,
    pub failed_objects: Vec<PropagationFailure>,
}

impl AnalysisResult {
    pub fn assemble (
        target_id: &str,
        threshold_km: f64,
        objects_checked: usize,
        alerts: Vec<Alert>,
        grid: &TimeGrid,
        target_positions: PositionSequence,
        closest_threat_positions: Option<PositionSequence>,
        skipped_records: usize,
        failed_objects: Vec<PropagationFailure>
    )->Self {
        AnalysisResult {
            target_id: target_id.to_string(),
            threshold_km,
            objects_checked,
            alerts,
            times: grid.times().to_vec(),
            target_positions,
            closest_threat_positions,
            skipped_records,
            failed_objects
        }
    }

    pub fn has_conjunctions (&self)->bool { !self.alerts.is_empty() }

    pub fn closest_alert (&self)->Option<&Alert> { self.alerts.first() }

    pub fn closest_threat_id (&self)->Option<&str> { self.alerts.first().map( |a| a.object_id.as_str()) }

    /// insight and recommendation for the closest threat, None if there is no conjunction risk
    pub fn insight (&self)->Option<Insight> {
        self.alerts.first().map( |a| {
            let insight = match a.risk {
                RiskLevel::High => format!("closest object {} is predicted to pass within {:.2} km of {}, this is a high risk conjunction",
                                            a.object_id, a.min_distance_km, self.target_id),
                RiskLevel::Medium => format!("closest object {} is predicted to pass within {:.2} km of {}, this is a medium risk event",
                                            a.object_id, a.min_distance_km, self.target_id),
                RiskLevel::Low => format!("{} objects are within the {} km threshold but the closest one ({} at {:.2} km) is not an immediate collision threat",
                                            self.alerts.len(), self.threshold_km, a.object_id, a.min_distance_km),
            };
            Insight {
                object_id: a.object_id.clone(),
                distance_km: a.min_distance_km,
                risk: a.risk,
                insight,
                recommendation: a.risk.recommendation().to_string()
            }
        })
    }

    pub fn summary (&self)->String {
        let mut s = format!("{} objects checked against {}: ", self.objects_checked, self.target_id);
        if self.alerts.is_empty() {
            s.push_str( &format!("no conjunction risk detected below {} km", self.threshold_km));
        } else {
            s.push_str( &format!("{} potential conjunctions below {} km", self.alerts.len(), self.threshold_km));
        }
        if !self.failed_objects.is_empty() {
            s.push_str( &format!(", {} objects could not be evaluated", self.failed_objects.len()));
        }
        if self.skipped_records > 0 {
            s.push_str( &format!(", {} catalog records skipped", self.skipped_records));
        }
        s
    }
}

/* #endregion analysis result */

/* #region analysis functions ***************************************************************************************/

/// run a complete analysis for the given catalog and parameters. This is a pure function of its inputs,
/// i.e. identical inputs produce identical results
pub fn analyze (catalog: &Catalog, params: &RunParams, config: &ConjunctionConfig) -> Result<AnalysisResult> {
    let ranker = AlertRanker::new( config.risk_bands.clone())?;
    let driver = CatalogPropagator::from_config( config)?;
    run_analysis( catalog, params, &ranker, &driver)
}

/// same as [`analyze`] but propagating the whole catalog first and then scanning the propagated
/// position sequences. This holds all positions in memory and is mostly useful for smaller catalogs
/// or if the caller wants to keep the propagated catalog
pub fn analyze_staged (catalog: &Catalog, params: &RunParams, config: &ConjunctionConfig) -> Result<AnalysisResult> {
    let ranker = AlertRanker::new( config.risk_bands.clone())?;
    let driver = CatalogPropagator::from_config( config)?;

    check_threshold( params.threshold_km)?;
    let target = catalog.get( &params.target).ok_or_else( || OdinConjunctionError::TargetNotFound( params.target.clone()))?;
    let grid = params.time_grid( target.epoch())?;

    let propagated = driver.propagate_all( catalog, &grid)?;
    assess( target.name(), &propagated, &grid, params.threshold_km, &ranker, catalog.skipped_count())
}

/// scan and rank an already propagated catalog
pub fn assess (target_id: &str, propagated: &PropagatedCatalog, grid: &TimeGrid, threshold_km: f64,
               ranker: &AlertRanker, skipped_records: usize) -> Result<AnalysisResult>
{
    if propagated.grid_len() != grid.len() {
        return Err( op_failed!("propagated catalog has {} samples, time grid {}", propagated.grid_len(), grid.len()))
    }

    let target_positions = match propagated.get( target_id) {
        Some(positions) => positions.clone(),
        None => match propagated.failure( target_id) {
            Some(f) => return Err( OdinConjunctionError::TargetPropagation( target_id.to_string(), f.reason.clone())),
            None => return Err( OdinConjunctionError::TargetNotFound( target_id.to_string()))
        }
    };

    let records = scan( target_id, &target_positions, propagated);
    let alerts = ranker.rank( target_id, &records, threshold_km, grid)?;
    let closest = alerts.first().and_then( |a| propagated.get( &a.object_id)).cloned();
    let failed: Vec<PropagationFailure> = propagated.failures().iter().filter( |f| f.object_id != target_id).cloned().collect();

    Ok( AnalysisResult::assemble( target_id, threshold_km, records.len(), alerts, grid, target_positions, closest, skipped_records, failed) )
}

fn run_analysis (catalog: &Catalog, params: &RunParams, ranker: &AlertRanker, driver: &CatalogPropagator) -> Result<AnalysisResult> {
    let threshold_km = check_threshold( params.threshold_km)?;

    // this has to be checked before we propagate anything
    let target = catalog.get( &params.target).ok_or_else( || OdinConjunctionError::TargetNotFound( params.target.clone()))?;
    let grid = params.time_grid( target.epoch())?;

    let target_positions = propagate( target, &grid)
        .map_err(|e| OdinConjunctionError::TargetPropagation( target.name().to_string(), e.to_string()))?;

    let (records, failed) = driver.propagate_and_scan( catalog, &grid, target.name(), &target_positions)?;
    let alerts = ranker.rank( target.name(), &records, threshold_km, &grid)?;

    // we only keep the scan results, re-propagate the closest threat for visualization
    let closest = match alerts.first() {
        Some(alert) => {
            let elset = catalog.get( &alert.object_id).ok_or( op_failed!("unknown alert object {}", alert.object_id))?;
            Some( propagate( elset, &grid)?)
        }
        None => None
    };

    Ok( AnalysisResult::assemble( target.name(), threshold_km, records.len(), alerts, &grid, target_positions, closest, catalog.skipped_count(), failed) )
}

/* #endregion analysis functions */

/* #region analysis state machine ***********************************************************************************/

/// the observable state of a ConjunctionAnalysis. `Analyzing` can only transition into `Complete` or `Failed`
#[derive(Debug,Clone,PartialEq)]
pub enum AnalysisState {
    Loaded,
    Analyzing,
    Complete(AnalysisResult),
    Failed(OdinConjunctionError),
}

impl AnalysisState {
    pub fn is_complete (&self)->bool { matches!( self, AnalysisState::Complete(_)) }

    pub fn is_failed (&self)->bool { matches!( self, AnalysisState::Failed(_)) }
}

/// a loaded catalog plus configuration that can be analyzed for different targets and thresholds.
/// The catalog is read-only for the lifetime of the analysis, reloading means creating a new one
pub struct ConjunctionAnalysis {
    catalog: Catalog,
    config: ConjunctionConfig,
    ranker: AlertRanker,
    driver: CatalogPropagator,
    state: AnalysisState,
    elapsed: Option<Duration>,
}

impl ConjunctionAnalysis {
    pub fn new (catalog: Catalog, config: ConjunctionConfig) -> Result<Self> {
        config.validate()?;
        let ranker = AlertRanker::new( config.risk_bands.clone())?;
        let driver = CatalogPropagator::from_config( &config)?;

        info!("loaded catalog with {} objects ({} records skipped, {} duplicates)", catalog.len(), catalog.skipped_count(), catalog.duplicates());
        Ok( ConjunctionAnalysis { catalog, config, ranker, driver, state: AnalysisState::Loaded, elapsed: None } )
    }

    /// parse TLE text and create an analysis for it. Fails if the text does not contain any valid element set
    pub fn from_text (text: &str, config: ConjunctionConfig) -> Result<Self> {
        Self::new( Catalog::parse(text)?, config)
    }

    pub fn catalog (&self)->&Catalog { &self.catalog }

    pub fn config (&self)->&ConjunctionConfig { &self.config }

    pub fn state (&self)->&AnalysisState { &self.state }

    /// wall clock time of the last run. This is not part of the AnalysisResult so that results stay comparable
    pub fn elapsed (&self)->Option<Duration> { self.elapsed }

    pub fn result (&self)->Option<&AnalysisResult> {
        match &self.state {
            AnalysisState::Complete(result) => Some(result),
            _ => None
        }
    }

    /// run parameters for `target` using the configured defaults
    pub fn params_for (&self, target: impl ToString)->RunParams {
        RunParams::from_config( target, &self.config)
    }

    pub fn run (&mut self, params: &RunParams) -> Result<&AnalysisResult> {
        self.state = AnalysisState::Analyzing;
        let started = Instant::now();

        let outcome = run_analysis( &self.catalog, params, &self.ranker, &self.driver);
        let elapsed = started.elapsed();
        self.elapsed = Some(elapsed);

        self.state = match outcome {
            Ok(result) => {
                info!("{} ({:.3} s)", result.summary(), elapsed.as_secs_f64());
                AnalysisState::Complete(result)
            }
            Err(e) => {
                warn!("conjunction analysis for {} failed: {e}", params.target);
                AnalysisState::Failed(e)
            }
        };

        match &self.state {
            AnalysisState::Complete(result) => Ok(result),
            AnalysisState::Failed(e) => Err(e.clone()),
            _ => Err( op_failed!("analysis did not complete"))
        }
    }
}

/* #endregion analysis state machine */
