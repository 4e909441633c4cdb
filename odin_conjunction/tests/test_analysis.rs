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
#![allow(unused)]

use std::time::Duration;
use chrono::{TimeZone, Utc};
use odin_conjunction::{
    analyze, analyze_staged, propagate, AnalysisState, Catalog, CatalogPropagator, ConjunctionAnalysis, ConjunctionConfig,
    RiskLevel, RunParams, TimeGrid, errors::OdinConjunctionError
};

/// end-to-end tests with real SGP4 propagation. All element sets share the same epoch.
/// run with "cargo test --test test_analysis -- --nocapture"

const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

/// same orbit as ISS but trailing by 0.03° mean anomaly, i.e. about 3.5km along-track
const SHADOW: &str = "ISS SHADOW
1 90001U 98067B   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 90001  51.6416 247.4627 0006703 130.5360 325.0588 15.72125391563530";

/// sun synchronous orbit at about 825km altitude
const POLAR: &str = "POLAR SAT
1 54234U 22150A   08264.51782528  .00000366  00000-0  19403-3 0  9991
2 54234  98.7204  17.0432 0002710  72.7407 287.4066 14.19556514121811";

const POLAR_CORRUPTED: &str = "POLAR SAT
1 54234U 22150A   08264.51782528  .00000366  00000-0  19403-3 0  9991
2 54234  98.72X4  17.0432 0002710  72.7407 287.4066 14.19556514121811";

const GEO: &str = "GEO SAT
1 41866U 16071A   08264.51782528 -.00000094  00000-0  00000-0 0  9992
2 41866   0.0410 264.1937 0001074 314.3414 271.3521  1.00271416 69712";

const TARGET: &str = "ISS (ZARYA)";

fn catalog_text (records: &[&str])->String { records.join("\n") }

fn config (max_workers: usize)->ConjunctionConfig {
    ConjunctionConfig { max_workers, ..ConjunctionConfig::default() }
}

#[test]
fn test_grid_alignment () {
    let catalog = Catalog::parse( &catalog_text( &[ISS, GEO])).unwrap();
    let iss = catalog.get(TARGET).unwrap();

    let grid = TimeGrid::new( iss.epoch(), Duration::from_secs(24*3600), Duration::from_secs(60)).unwrap();
    assert_eq!( grid.len(), 1440);
    assert_eq!( grid.start(), iss.epoch());
    assert_eq!( grid.end() - grid.start(), chrono::TimeDelta::minutes(1439));

    let positions = propagate( iss, &grid).unwrap();
    assert_eq!( positions.len(), grid.len());
    for i in (0..grid.len()).step_by(120) {
        let r = positions.radius_at(i).unwrap();
        println!("  {}: r = {:.1} km", grid.time_at(i).unwrap(), r);
        assert!( r > 6600.0 && r < 6800.0);
    }

    let propagated = CatalogPropagator::new( 2, None).unwrap().propagate_all( &catalog, &grid).unwrap();
    assert_eq!( propagated.len(), 2);
    assert!( propagated.objects().iter().all( |o| o.positions.len() == grid.len()));
    assert_eq!( propagated.get(TARGET), Some(&positions));
}

#[test]
fn test_close_approach () {
    let mut analysis = ConjunctionAnalysis::from_text( &catalog_text( &[ISS, SHADOW, POLAR, GEO]), config(0)).unwrap();
    assert_eq!( *analysis.state(), AnalysisState::Loaded);

    let params = analysis.params_for(TARGET);
    let result = analysis.run( &params).unwrap().clone();

    println!("{}", result.summary());
    for a in &result.alerts { println!("  {a}") }
    if let Some(insight) = result.insight() { println!("{insight}") }

    assert_eq!( result.target_id, TARGET);
    assert_eq!( result.objects_checked, 3);
    assert_eq!( result.alerts.len(), 1);
    assert_eq!( result.times.len(), 1440);
    assert_eq!( result.target_positions.len(), 1440);

    let alert = &result.alerts[0];
    assert_eq!( alert.object_id, "ISS SHADOW");
    assert_eq!( alert.norad_id, 90001);
    assert!( alert.min_distance_km > 3.0 && alert.min_distance_km < 4.0);
    assert_eq!( alert.risk, RiskLevel::High);
    assert_eq!( alert.time, result.times[alert.time_index]);

    let closest = result.closest_threat_positions.as_ref().unwrap();
    assert_eq!( closest.len(), 1440);
    let d = result.target_positions.distance_at( closest, alert.time_index).unwrap();
    assert!( (d - alert.min_distance_km).abs() < 1e-9);

    let insight = result.insight().unwrap();
    assert_eq!( insight.object_id, "ISS SHADOW");
    assert_eq!( insight.risk, RiskLevel::High);

    assert!( analysis.state().is_complete());
    assert!( analysis.elapsed().is_some());
}

#[test]
fn test_no_conjunction () {
    let catalog = Catalog::parse( &catalog_text( &[ISS, POLAR, GEO])).unwrap();
    let result = analyze( &catalog, &RunParams::new( TARGET, 100.0), &config(0)).unwrap();

    println!("{}", result.summary());
    assert_eq!( result.objects_checked, 2);
    assert!( !result.has_conjunctions());
    assert!( result.closest_threat_positions.is_none());
    assert!( result.insight().is_none());
    assert!( result.summary().contains("no conjunction risk"));
}

#[test]
fn test_threshold_is_strict () {
    let catalog = Catalog::parse( &catalog_text( &[ISS, SHADOW, GEO])).unwrap();
    let cfg = config(0);

    let result = analyze( &catalog, &RunParams::new( TARGET, 100.0), &cfg).unwrap();
    let d = result.alerts[0].min_distance_km;

    let at = analyze( &catalog, &RunParams::new( TARGET, d), &cfg).unwrap();
    assert!( at.alerts.is_empty());

    let above = analyze( &catalog, &RunParams::new( TARGET, d * (1.0 + 1e-9)), &cfg).unwrap();
    assert_eq!( above.alerts.len(), 1);
    assert_eq!( above.alerts[0].min_distance_km, d);
}

#[test]
fn test_idempotence () {
    let catalog = Catalog::parse( &catalog_text( &[ISS, SHADOW, POLAR, GEO])).unwrap();
    let params = RunParams::new( TARGET, 500.0);

    let r1 = analyze( &catalog, &params, &config(1)).unwrap();
    let r2 = analyze( &catalog, &params, &config(1)).unwrap();
    let r3 = analyze( &catalog, &params, &config(4)).unwrap();

    assert_eq!( r1, r2);
    assert_eq!( r1, r3);
}

#[test]
fn test_staged_equals_fused () {
    let catalog = Catalog::parse( &catalog_text( &[ISS, SHADOW, POLAR, GEO])).unwrap();
    let params = RunParams::new( TARGET, 1000.0).with_window( Duration::from_secs(6*3600)).with_step( Duration::from_secs(30));
    let cfg = config(3);

    let fused = analyze( &catalog, &params, &cfg).unwrap();
    let staged = analyze_staged( &catalog, &params, &cfg).unwrap();

    println!("fused:  {}", fused.summary());
    println!("staged: {}", staged.summary());
    assert_eq!( fused.times.len(), 720);
    assert_eq!( fused, staged);
}

#[test]
fn test_bad_record_isolation () {
    let clean = Catalog::parse( &catalog_text( &[ISS, SHADOW, GEO])).unwrap();
    let dirty = Catalog::parse( &catalog_text( &[ISS, POLAR_CORRUPTED, SHADOW, GEO])).unwrap();

    assert_eq!( clean.len(), dirty.len());
    assert_eq!( dirty.skipped_count(), 1);
    for rec in dirty.skipped() { println!("  skipped {rec}") }
    assert_eq!( dirty.skipped()[0].name.as_deref(), Some("POLAR SAT"));

    let params = RunParams::new( TARGET, 100.0);
    let r_clean = analyze( &clean, &params, &config(0)).unwrap();
    let r_dirty = analyze( &dirty, &params, &config(0)).unwrap();

    assert_eq!( r_clean.alerts, r_dirty.alerts);
    assert_eq!( r_clean.objects_checked, r_dirty.objects_checked);
    assert_eq!( r_clean.skipped_records, 0);
    assert_eq!( r_dirty.skipped_records, 1);
    assert!( r_dirty.summary().contains("1 catalog records skipped"));
}

#[test]
fn test_far_from_epoch () {
    // propagating two years past the element set epoch must not take down the run
    let catalog = Catalog::parse( &catalog_text( &[ISS, SHADOW, POLAR, GEO])).unwrap();
    let start = Utc.with_ymd_and_hms( 2010, 9, 20, 0, 0, 0).unwrap();
    let params = RunParams::new( "GEO SAT", 100.0).with_start(start).with_window( Duration::from_secs(2*3600));

    match analyze( &catalog, &params, &config(0)) {
        Ok(result) => {
            println!("{}", result.summary());
            for f in &result.failed_objects { println!("  not evaluated: {f}") }
            assert_eq!( result.objects_checked + result.failed_objects.len(), 3);
            assert_eq!( result.times[0], start);
        }
        Err(e) => {
            println!("target failed: {e}");
            assert!( matches!( e, OdinConjunctionError::TargetPropagation(..)));
        }
    }
}

#[test]
fn test_unknown_target () {
    let mut analysis = ConjunctionAnalysis::from_text( &catalog_text( &[ISS, GEO]), config(0)).unwrap();

    let res = analysis.run( &RunParams::new( "NOT THERE", 100.0));
    assert_eq!( res.err(), Some( OdinConjunctionError::TargetNotFound( "NOT THERE".to_string())));
    assert!( analysis.state().is_failed());
    assert!( analysis.result().is_none());

    // the analysis can be re-run with different parameters
    let result = analysis.run( &analysis.params_for(TARGET)).unwrap();
    assert_eq!( result.objects_checked, 1);
    assert!( analysis.state().is_complete());
}

#[test]
fn test_invalid_parameters () {
    let catalog = Catalog::parse( ISS).unwrap();

    for threshold in [0.0, -10.0, f64::NAN] {
        let res = analyze( &catalog, &RunParams::new( TARGET, threshold), &config(0));
        assert!( matches!( res, Err(OdinConjunctionError::InvalidParameter(_))));
    }

    let params = RunParams::new( TARGET, 100.0).with_step( Duration::ZERO);
    assert!( matches!( analyze( &catalog, &params, &config(0)), Err(OdinConjunctionError::InvalidParameter(_))));

    let cfg = ConjunctionConfig { step: Duration::ZERO, ..ConjunctionConfig::default() };
    assert!( ConjunctionAnalysis::new( catalog, cfg).is_err());
}

#[test]
fn test_single_object_catalog () {
    let catalog = Catalog::parse( ISS).unwrap();
    let result = analyze( &catalog, &RunParams::new( TARGET, 100.0), &config(0)).unwrap();

    assert_eq!( result.objects_checked, 0);
    assert!( result.alerts.is_empty());
    assert_eq!( result.target_positions.len(), 1440);
}

#[test]
fn test_empty_catalog () {
    assert_eq!( ConjunctionAnalysis::from_text( " \n\n", config(0)).err(), Some(OdinConjunctionError::EmptyCatalog));
    assert_eq!( Catalog::parse("").err(), Some(OdinConjunctionError::EmptyCatalog));
    assert_eq!( Catalog::parse("SOME NAME\nANOTHER NAME").err(), Some(OdinConjunctionError::NoValidRecords{ skipped: 2 }));
    assert_eq!( Catalog::parse( POLAR_CORRUPTED).err(), Some(OdinConjunctionError::NoValidRecords{ skipped: 1 }));
}

#[test]
fn test_timeout () {
    let budget = Duration::from_nanos(1);
    let cfg = ConjunctionConfig { timeout: Some(budget), ..ConjunctionConfig::default() };
    let text = catalog_text( &[ISS, SHADOW, POLAR, GEO]);

    let mut analysis = ConjunctionAnalysis::from_text( &text, cfg.clone()).unwrap();
    let params = analysis.params_for(TARGET);

    match analysis.run( &params) {
        Err(OdinConjunctionError::Timeout{ budget: b, elapsed }) => {
            println!("timed out after {elapsed:?}");
            assert_eq!( b, budget);
            assert!( elapsed > budget);
        }
        other => panic!("unexpected result {other:?}")
    }
    assert!( analysis.state().is_failed());
    assert!( analysis.result().is_none());

    let catalog = Catalog::parse( &text).unwrap();
    let staged = analyze_staged( &catalog, &params, &cfg);
    assert!( matches!( staged, Err(OdinConjunctionError::Timeout{..})));

    // a generous budget does not change the result
    let relaxed = ConjunctionConfig { timeout: Some(Duration::from_secs(600)), ..ConjunctionConfig::default() };
    let r1 = analyze( &catalog, &params, &relaxed).unwrap();
    let r2 = analyze( &catalog, &params, &ConjunctionConfig::default()).unwrap();
    assert_eq!( r1, r2);
}

#[test]
fn test_garbled_record_isolation () {
    let garbled = POLAR.replacen( "\n2 54234", "\nX 54234", 1);
    let clean = Catalog::parse( &catalog_text( &[ISS, SHADOW, GEO])).unwrap();
    let dirty = Catalog::parse( &catalog_text( &[ISS, garbled.as_str(), SHADOW, GEO])).unwrap();
    assert_eq!( dirty.skipped_count(), 1);

    let params = RunParams::new( TARGET, 100.0);
    let r_clean = analyze( &clean, &params, &config(0)).unwrap();
    let r_dirty = analyze( &dirty, &params, &config(0)).unwrap();

    assert_eq!( r_clean.alerts, r_dirty.alerts);
    assert_eq!( r_clean.objects_checked, r_dirty.objects_checked);
    assert_eq!( r_dirty.skipped_records, 1);
}
