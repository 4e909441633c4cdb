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

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinConjunctionError>;

/// run level errors. Per-record parse failures and per-object propagation failures are not errors
/// of the run - those are reported as data (SkippedRecord, PropagationFailure).
/// Note this is Clone so that a failed analysis can keep its error as observable state
#[derive(Error,Debug,Clone,PartialEq)]
pub enum OdinConjunctionError {

    #[error("empty element set catalog")]
    EmptyCatalog,

    #[error("no valid element set records in catalog ({skipped} records skipped)")]
    NoValidRecords { skipped: usize },

    #[error("target object not found in catalog: {0}")]
    TargetNotFound(String),

    #[error("target object {0} could not be propagated: {1}")]
    TargetPropagation(String,String),

    #[error("invalid parameter {0}")]
    InvalidParameter(String),

    #[error("analysis exceeded time budget of {budget:?} (elapsed {elapsed:?})")]
    Timeout { elapsed: Duration, budget: Duration },

    #[error("TLE error {0}")]
    TleError(String),

    #[error("Propagation error {0}")]
    PropagationError(String),

    #[error("config error {0}")]
    ConfigError(String),

    #[error("operation failed {0}")]
    OpFailedError(String),
}

impl From<std::io::Error> for OdinConjunctionError {
    fn from (e: std::io::Error)->Self {
        OdinConjunctionError::ConfigError( e.to_string())
    }
}

impl From<ron::error::SpannedError> for OdinConjunctionError {
    fn from (e: ron::error::SpannedError)->Self {
        OdinConjunctionError::ConfigError( e.to_string())
    }
}

macro_rules! tle_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinConjunctionError::TleError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use tle_error;

macro_rules! propagation_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinConjunctionError::PropagationError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use propagation_error;

macro_rules! invalid_param {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinConjunctionError::InvalidParameter( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use invalid_param;

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinConjunctionError::OpFailedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;
