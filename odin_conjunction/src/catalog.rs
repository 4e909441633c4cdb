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

use std::{collections::HashMap, fmt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sgp4::Elements;
use tracing::{debug, warn};
use crate::errors::{tle_error, Result, OdinConjunctionError};

/// the parsed orbital elements of a single catalog object. This is immutable once parsed
#[derive(Debug,Clone)]
pub struct OrbitalElementSet {
    name: String,
    elements: Elements,
}

impl OrbitalElementSet {
    /// parse the two element lines of a TLE. If there is no (non-empty) name the object is
    /// named after its NORAD catalog number
    pub fn from_lines (name: Option<&str>, line1: &str, line2: &str) -> Result<Self> {
        let name = name.map( |s| s.trim()).filter( |s| !s.is_empty()).map( |s| s.to_string());
        let elements = Elements::from_tle( name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| tle_error!("invalid element lines: {e}"))?;
        let name = name.unwrap_or_else( || elements.norad_id.to_string());

        Ok( OrbitalElementSet { name, elements } )
    }

    pub fn name (&self)->&str { &self.name }

    pub fn norad_id (&self)->u64 { self.elements.norad_id }

    pub fn international_designator (&self)->Option<&str> { self.elements.international_designator.as_deref() }

    pub fn epoch (&self)->DateTime<Utc> { self.elements.datetime.and_utc() }

    pub fn inclination_deg (&self)->f64 { self.elements.inclination }

    pub fn right_ascension_deg (&self)->f64 { self.elements.right_ascension }

    pub fn eccentricity (&self)->f64 { self.elements.eccentricity }

    pub fn argument_of_perigee_deg (&self)->f64 { self.elements.argument_of_perigee }

    pub fn mean_anomaly_deg (&self)->f64 { self.elements.mean_anomaly }

    /// revolutions per day
    pub fn mean_motion (&self)->f64 { self.elements.mean_motion }

    /// first derivative of mean motion [rev/day²]
    pub fn mean_motion_dot (&self)->f64 { self.elements.mean_motion_dot }

    /// B* drag term [1/earth radii]
    pub fn drag_term (&self)->f64 { self.elements.drag_term }

    /// mean orbital period in minutes
    pub fn period_minutes (&self)->f64 { 1440.0 / self.elements.mean_motion }

    pub (crate) fn elements (&self)->&Elements { &self.elements }
}

impl fmt::Display for OrbitalElementSet {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementSet( {} [{}], epoch:{}, incl:{:.4}°, ecc:{:.7}, n:{:.8} rev/day)",
            self.name, self.norad_id(), self.epoch(), self.inclination_deg(), self.eccentricity(), self.mean_motion())
    }
}

/// a record that was not ingested, with the 1-based line number where it started
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct SkippedRecord {
    pub line: usize,
    pub name: Option<String>,
    pub reason: String,
}

impl fmt::Display for SkippedRecord {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "line {} ({}): {}", self.line, name, self.reason),
            None => write!(f, "line {}: {}", self.line, self.reason)
        }
    }
}

/// the per-record result of parsing catalog text
#[derive(Debug,Clone)]
pub enum RecordOutcome {
    Parsed(OrbitalElementSet),
    Skipped(SkippedRecord),
}

/* #region record parsing ******************************************************************************************/

/// element lines are 69 chars and 3LE names at most 24. Long lines without a valid line number
/// are corrupted element lines and stay within their record
const MIN_ELEMENT_LINE_LEN: usize = 60;

#[derive(Debug,Clone,Copy,PartialEq)]
enum LineKind {
    Name,
    Line1,
    Line2,
    Malformed,
}

fn line_kind (line: &str)->LineKind {
    if line.starts_with("1 ") {
        LineKind::Line1
    } else if line.starts_with("2 ") {
        LineKind::Line2
    } else if line.trim().len() >= MIN_ELEMENT_LINE_LEN {
        LineKind::Malformed
    } else {
        LineKind::Name
    }
}

/// 3LE name lines (as provided by space-track.org) are prefixed with "0 "
fn name_of (line: &str)->&str {
    line.strip_prefix("0 ").unwrap_or(line).trim()
}

fn skipped (line: usize, name: Option<&str>, reason: impl ToString)->RecordOutcome {
    RecordOutcome::Skipped( SkippedRecord{ line, name: name.map(|s| s.to_string()), reason: reason.to_string() })
}

/// split catalog text into records of an optional name line followed by the two element lines.
/// This never fails - each record is either parsed or skipped with a reason. A record with a corrupted
/// element line is skipped as a whole so that the next record starts at the right line. Blank lines are ignored
pub fn parse_records (text: &str) -> Vec<RecordOutcome> {
    let lines: Vec<(usize,&str,LineKind)> = text.lines()
        .enumerate()
        .map( |(i,l)| (i+1, l.trim_end()))
        .filter( |(_,l)| !l.trim().is_empty())
        .map( |(n,l)| (n, l, line_kind(l)))
        .collect();

    let mut outcomes: Vec<RecordOutcome> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (line_no, line, kind) = lines[i];

        let name = if kind == LineKind::Name {
            match lines.get(i+1) {
                Some((_,_,next)) if *next != LineKind::Name => {
                    i += 1;
                    Some( name_of(line))
                }
                _ => {
                    outcomes.push( skipped( line_no, Some( name_of(line)), "name without element lines"));
                    i += 1;
                    continue
                }
            }
        } else {
            None
        };

        let (_, first, first_kind) = lines[i];
        let second = lines.get(i+1).filter( |(_,_,k)| matches!( k, LineKind::Line2 | LineKind::Malformed));

        match (first_kind, second) {
            (LineKind::Line1, Some((_, line2, LineKind::Line2))) => {
                match OrbitalElementSet::from_lines( name, first, line2) {
                    Ok(elset) => outcomes.push( RecordOutcome::Parsed(elset)),
                    Err(e) => outcomes.push( skipped( line_no, name, e))
                }
                i += 2;
            }
            (LineKind::Line1 | LineKind::Malformed, Some(_)) => {
                outcomes.push( skipped( line_no, name, "malformed element line"));
                i += 2;
            }
            (LineKind::Line1, None) => {
                outcomes.push( skipped( line_no, name, "element line 1 without line 2"));
                i += 1;
            }
            (LineKind::Line2, _) => {
                outcomes.push( skipped( line_no, name, "element line 2 without line 1"));
                i += 1;
            }
            _ => {
                outcomes.push( skipped( line_no, name, "malformed element line"));
                i += 1;
            }
        }
    }

    outcomes
}

/* #endregion record parsing */

/// the ordered collection of element sets for one analysis. Object names are unique keys,
/// iteration follows catalog order
#[derive(Debug,Clone)]
pub struct Catalog {
    entries: Vec<OrbitalElementSet>,
    index: HashMap<String,usize>,
    skipped: Vec<SkippedRecord>,
    n_duplicates: usize,
}

impl Catalog {
    /// parse catalog text. This only fails if the text is blank or does not contain a single valid record
    pub fn parse (text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err( OdinConjunctionError::EmptyCatalog)
        }
        Self::from_outcomes( parse_records(text))
    }

    /// build catalog from record outcomes. If a name occurs more than once the later element set
    /// replaces the former one, keeping the position of the first
    pub fn from_outcomes (outcomes: Vec<RecordOutcome>) -> Result<Self> {
        let mut entries: Vec<OrbitalElementSet> = Vec::with_capacity( outcomes.len());
        let mut index: HashMap<String,usize> = HashMap::with_capacity( outcomes.len());
        let mut skipped: Vec<SkippedRecord> = Vec::new();
        let mut n_duplicates = 0;

        for outcome in outcomes {
            match outcome {
                RecordOutcome::Parsed(elset) => {
                    if let Some(&i) = index.get( elset.name()) {
                        debug!("duplicate catalog entry {} replaces previous element set", elset.name());
                        n_duplicates += 1;
                        entries[i] = elset;
                    } else {
                        index.insert( elset.name().to_string(), entries.len());
                        entries.push( elset);
                    }
                }
                RecordOutcome::Skipped(rec) => {
                    debug!("skipping catalog record {rec}");
                    skipped.push( rec);
                }
            }
        }

        if entries.is_empty() {
            if skipped.is_empty() {
                return Err( OdinConjunctionError::EmptyCatalog)
            } else {
                return Err( OdinConjunctionError::NoValidRecords{ skipped: skipped.len() })
            }
        }

        if !skipped.is_empty() {
            warn!("skipped {} malformed catalog records", skipped.len());
        }

        Ok( Catalog { entries, index, skipped, n_duplicates } )
    }

    pub fn len (&self)->usize { self.entries.len() }

    pub fn is_empty (&self)->bool { self.entries.is_empty() }

    pub fn get (&self, name: &str)->Option<&OrbitalElementSet> {
        self.index.get(name).map( |&i| &self.entries[i])
    }

    pub fn position (&self, name: &str)->Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains (&self, name: &str)->bool { self.index.contains_key(name) }

    pub fn entries (&self)->&[OrbitalElementSet] { &self.entries }

    pub fn iter (&self)->impl Iterator<Item=&OrbitalElementSet> { self.entries.iter() }

    pub fn names (&self)->impl Iterator<Item=&str> { self.entries.iter().map( |e| e.name()) }

    pub fn skipped (&self)->&[SkippedRecord] { &self.skipped }

    pub fn skipped_count (&self)->usize { self.skipped.len() }

    pub fn duplicates (&self)->usize { self.n_duplicates }
}
