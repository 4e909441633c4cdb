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

use std::{fs, time::Duration};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use odin_conjunction::{load_config_path, ConjunctionAnalysis, ConjunctionConfig};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "check a TLE catalog for objects that come close to a target object")]
pub struct Args {
    /// RON config file (defaults are used if not set)
    #[arg(short,long)]
    pub config: Option<String>,

    /// alert distance threshold in km
    #[arg(short,long)]
    pub threshold: Option<f64>,

    /// analysis window in hours
    #[arg(long)]
    pub hours: Option<f64>,

    /// time step in seconds
    #[arg(long)]
    pub step: Option<u64>,

    /// start of analysis window (RFC 3339). Defaults to the epoch of the target element set
    #[arg(short,long)]
    pub start: Option<String>,

    /// start analysis window at the current time
    #[arg(long, conflicts_with="start")]
    pub now: bool,

    /// write the analysis result as JSON to this file
    #[arg(short,long)]
    pub output: Option<String>,

    /// file with TLE records (name line plus two element lines)
    pub tle_file: String,

    /// name of target object
    pub target: String,
}

fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .init();

    let args = Args::parse();

    let mut config: ConjunctionConfig = if let Some(path) = &args.config { load_config_path(path)? } else { ConjunctionConfig::default() };
    if let Some(threshold) = args.threshold { config.threshold_km = threshold }
    if let Some(hours) = args.hours {
        config.window = Duration::try_from_secs_f64( hours * 3600.0).map_err(|e| anyhow!("invalid window: {e}"))?
    }
    if let Some(step) = args.step { config.step = Duration::from_secs(step) }

    let text = fs::read_to_string( &args.tle_file)?;
    let mut analysis = ConjunctionAnalysis::from_text( &text, config)?;

    let mut params = analysis.params_for( &args.target);
    if let Some(start) = &args.start {
        params = params.with_start( DateTime::parse_from_rfc3339(start)?.with_timezone(&Utc));
    } else if args.now {
        params = params.with_start( Utc::now());
    }

    let result = analysis.run( &params)?;

    println!("{}", result.summary());
    if let Some(t) = result.times.first() {
        println!("window: {} + {} samples", t, result.times.len());
    }

    if result.has_conjunctions() {
        println!("\n{:<26} {:>6} {:>13}  {:<19}  {}", "object", "norad", "distance", "time (UTC)", "risk");
        for alert in &result.alerts { println!("{alert}") }
    }
    if let Some(insight) = result.insight() {
        println!("\n{insight}");
    }
    for f in &result.failed_objects {
        println!("not evaluated: {f}");
    }

    if let Some(path) = &args.output {
        fs::write( path, serde_json::to_string( result)?)?;
        println!("result saved to {path}");
    }

    if let Some(elapsed) = analysis.elapsed() {
        println!("elapsed: {:.3} s", elapsed.as_secs_f64());
    }

    Ok(())
}
