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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::{TimeGrid, scanner::ProximityRecord, errors::{invalid_param, op_failed, Result, OdinConjunctionError}};

/// qualitative risk of a conjunction, ordered from highest to lowest
#[derive(Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash,Serialize,Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn label (&self)->&'static str {
        match self {
            RiskLevel::High => "maneuver recommended",
            RiskLevel::Medium => "close monitoring",
            RiskLevel::Low => "monitor",
        }
    }

    pub fn recommendation (&self)->&'static str {
        match self {
            RiskLevel::High => "a debris avoidance maneuver is highly recommended to ensure a safe passing distance",
            RiskLevel::Medium => "this conjunction requires close monitoring, be prepared for a maneuver if the orbit prediction changes",
            RiskLevel::Low => "no immediate action required, continue routine monitoring",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// distance bands [km] that map a minimum distance to a RiskLevel:
/// `d < maneuver_km` is High, `d < close_monitoring_km` is Medium, everything else is Low
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct RiskBands {
    pub maneuver_km: f64,
    pub close_monitoring_km: f64,
}

impl Default for RiskBands {
    fn default ()->Self {
        RiskBands { maneuver_km: 25.0, close_monitoring_km: 50.0 }
    }
}

impl RiskBands {
    pub fn new (maneuver_km: f64, close_monitoring_km: f64) -> Result<Self> {
        let bands = RiskBands { maneuver_km, close_monitoring_km };
        bands.validate()?;
        Ok(bands)
    }

    pub fn validate (&self)->Result<()> {
        if !(self.maneuver_km.is_finite() && self.close_monitoring_km.is_finite()) {
            return Err( invalid_param!("risk bands have to be finite"))
        }
        if self.maneuver_km <= 0.0 || self.close_monitoring_km < self.maneuver_km {
            return Err( invalid_param!("risk bands need 0 < maneuver ({}) <= close monitoring ({})", self.maneuver_km, self.close_monitoring_km))
        }
        Ok(())
    }

    pub fn classify (&self, distance_km: f64)->RiskLevel {
        if distance_km < self.maneuver_km {
            RiskLevel::High
        } else if distance_km < self.close_monitoring_km {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// a predicted close approach of `object_id` to `target_id` below the alert threshold
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Alert {
    pub object_id: String,
    pub norad_id: u64,
    pub min_distance_km: f64,
    pub time_index: usize,
    pub time: DateTime<Utc>,
    pub target_id: String,
    pub risk: RiskLevel,
}

impl fmt::Display for Alert {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<26} {:>6} {:>10.3} km  {}  {}", self.object_id, self.norad_id, self.min_distance_km, self.time.format("%Y-%m-%d %H:%M:%S"), self.risk)
    }
}

/// alert distance thresholds have to be finite and strictly positive
pub fn check_threshold (threshold_km: f64)->Result<f64> {
    if threshold_km.is_finite() && threshold_km > 0.0 {
        Ok(threshold_km)
    } else {
        Err( invalid_param!("alert threshold has to be a positive distance: {threshold_km}"))
    }
}

/// turns proximity records into ranked alerts
#[derive(Debug,Clone,Default)]
pub struct AlertRanker {
    bands: RiskBands,
}

impl AlertRanker {
    pub fn new (bands: RiskBands) -> Result<Self> {
        bands.validate()?;
        Ok( AlertRanker { bands } )
    }

    pub fn bands (&self)->&RiskBands { &self.bands }

    /// keep only records with a minimum distance strictly below `threshold_km`, sorted by ascending
    /// distance and object id. An empty result is a valid outcome
    pub fn rank (&self, target_id: &str, records: &[ProximityRecord], threshold_km: f64, grid: &TimeGrid) -> Result<Vec<Alert>> {
        let threshold_km = check_threshold( threshold_km)?;

        let mut alerts: Vec<Alert> = Vec::new();
        for rec in records.iter().filter( |r| r.min_distance_km < threshold_km) {
            let time = grid.time_at( rec.time_index)
                .ok_or( op_failed!("time index {} of {} outside of time grid", rec.time_index, rec.object_id))?;

            alerts.push( Alert {
                object_id: rec.object_id.clone(),
                norad_id: rec.norad_id,
                min_distance_km: rec.min_distance_km,
                time_index: rec.time_index,
                time,
                target_id: target_id.to_string(),
                risk: self.bands.classify( rec.min_distance_km)
            });
        }

        alerts.sort_by( |a,b| a.min_distance_km.total_cmp( &b.min_distance_km).then_with( || a.object_id.cmp( &b.object_id)));
        Ok(alerts)
    }
}
