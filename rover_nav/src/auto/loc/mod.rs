//! # Localisation module
//!
//! This module provides localisation for the rover from GPS. [`GpsTrack`] holds the latest and
//! previous fixes, deriving the rover's heading from the bearing between them, and [`GpsSampler`]
//! is the periodic job which feeds it from the receiver.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::gps::{Coordinate, GpsFix, GpsReceiver};
use log::{trace, warn};
use std::sync::{Arc, RwLock};
use util::task::PeriodicJob;

use crate::geo;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared handle to the rover's GPS track.
///
/// Clones share the same underlying fixes. The sampler is the only writer, readers always get a
/// whole copy of a fix so there are no torn reads.
#[derive(Clone, Debug, Default)]
pub struct GpsTrack {
    inner: Arc<RwLock<FixPair>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct FixPair {
    current: Option<GpsFix>,
    previous: Option<GpsFix>,
}

/// Periodic job reading the GPS receiver into a [`GpsTrack`].
pub struct GpsSampler<R: GpsReceiver> {
    receiver: R,
    track: GpsTrack,
    num_no_fix: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GpsTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new fix into the track.
    ///
    /// The current fix becomes the previous one. The new fix's bearing is computed from the
    /// previous fix if there is one, and carried forward from the previous fix if the two are
    /// coincident.
    pub fn update(&self, mut fix: GpsFix) {
        let mut pair = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        fix.true_bearing_deg = match pair.current {
            Some(prev) if prev.coordinates == fix.coordinates => prev.true_bearing_deg,
            Some(prev) => Some(geo::bearing_deg(&prev.coordinates, &fix.coordinates)),
            None => None,
        };

        pair.previous = pair.current.take();
        pair.current = Some(fix);
    }

    /// Snapshot of the latest fix, `None` if no fix has been received yet.
    pub fn current(&self) -> Option<GpsFix> {
        self.read().current
    }

    pub fn previous(&self) -> Option<GpsFix> {
        self.read().previous
    }

    /// The rover's true heading in degrees, once two fixes are known.
    pub fn heading_deg(&self) -> Option<f64> {
        self.current().and_then(|f| f.true_bearing_deg)
    }

    /// Distance from the latest fix to the target in meters.
    pub fn distance_to(&self, target: &Coordinate) -> Option<f64> {
        self.current()
            .map(|f| geo::distance_meters(&f.coordinates, target))
    }

    /// True bearing from the latest fix to the target in degrees.
    pub fn bearing_to(&self, target: &Coordinate) -> Option<f64> {
        self.current()
            .map(|f| geo::bearing_deg(&f.coordinates, target))
    }

    fn read(&self) -> FixPair {
        match self.inner.read() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<R: GpsReceiver> GpsSampler<R> {
    pub fn new(receiver: R, track: GpsTrack) -> Self {
        Self {
            receiver,
            track,
            num_no_fix: 0,
        }
    }

    /// Read the receiver once, pushing the fix into the track if there is one.
    pub fn sample(&mut self) -> bool {
        match self.receiver.reading() {
            Some(fix) => {
                trace!("GPS fix {} (h_err {} mm)", fix.coordinates, fix.horizontal_error_mm);
                self.num_no_fix = 0;
                self.track.update(fix);
                true
            }
            None => {
                self.num_no_fix += 1;
                warn!("No GPS fix ({} consecutive reads)", self.num_no_fix);
                false
            }
        }
    }
}

impl<R: GpsReceiver> PeriodicJob for GpsSampler<R> {
    fn tick(&mut self) {
        self.sample();
    }

    fn on_stop(&mut self) {
        self.receiver.finish();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::gps::GpsError;

    fn is_north(h: f64) -> bool {
        h < 1e-6 || h > 360.0 - 1e-6
    }

    fn fix(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            coordinates: Coordinate::new(lat, lon),
            height_m: 1400.0,
            time_ms: 0,
            horizontal_error_mm: 15.0,
            vertical_error_mm: 30.0,
            true_bearing_deg: None,
        }
    }

    #[test]
    fn test_heading_needs_two_fixes() {
        let track = GpsTrack::new();
        assert!(track.current().is_none());
        assert!(track.heading_deg().is_none());

        track.update(fix(51.0, -1.0));
        assert!(track.heading_deg().is_none());
        assert!(track.previous().is_none());

        // Due north
        track.update(fix(51.0001, -1.0));
        let h = track.heading_deg().unwrap();
        assert!(is_north(h));
        assert_eq!(track.previous().unwrap().coordinates, Coordinate::new(51.0, -1.0));

        // Stationary fix keeps the heading
        track.update(fix(51.0001, -1.0));
        assert_eq!(track.heading_deg(), Some(h));

        // Due east
        track.update(fix(51.0001, -0.9999));
        assert!((track.heading_deg().unwrap() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_clones_share_fixes() {
        let track = GpsTrack::new();
        let reader = track.clone();

        track.update(fix(10.0, 10.0));
        let target = Coordinate::new(10.001, 10.0);

        assert_eq!(reader.current().unwrap().coordinates, Coordinate::new(10.0, 10.0));
        assert!((reader.distance_to(&target).unwrap() - 110.6).abs() < 1.0);
        assert!(is_north(reader.bearing_to(&target).unwrap()));
    }

    #[test]
    fn test_readers_see_whole_fixes_during_updates() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        const NUM_FIXES: u64 = 2000;

        fn numbered(i: u64) -> GpsFix {
            GpsFix {
                time_ms: i,
                ..fix(10.0 + i as f64 * 1e-4, 10.0)
            }
        }

        let track = GpsTrack::new();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let track = track.clone();
                let done = done.clone();

                thread::spawn(move || {
                    let mut last_time = 0;
                    let mut reads = 0u64;

                    while !done.load(Ordering::SeqCst) || reads == 0 {
                        let pair = track.read();
                        reads += 1;

                        let cur = match pair.current {
                            Some(c) => c,
                            None => continue,
                        };

                        // Every field of the snapshot comes from the same fix
                        assert_eq!(cur.coordinates, numbered(cur.time_ms).coordinates);
                        assert!(cur.time_ms >= last_time);
                        last_time = cur.time_ms;

                        match pair.previous {
                            Some(prev) => {
                                assert_eq!(prev.time_ms + 1, cur.time_ms);
                                assert!(is_north(cur.true_bearing_deg.unwrap()));
                            }
                            None => {
                                assert_eq!(cur.time_ms, 0);
                                assert!(cur.true_bearing_deg.is_none());
                            }
                        }
                    }
                })
            })
            .collect();

        for i in 0..NUM_FIXES {
            track.update(numbered(i));
        }
        done.store(true, Ordering::SeqCst);

        for r in readers {
            r.join().unwrap();
        }

        assert_eq!(track.current().unwrap().time_ms, NUM_FIXES - 1);
    }

    struct ScriptedReceiver {
        fixes: Vec<(f64, f64)>,
        finished: bool,
    }

    impl GpsReceiver for ScriptedReceiver {
        fn init(&mut self, _host: &str, _port: u16) -> Result<(), GpsError> { Ok(()) }
        fn latitude(&mut self) -> f64 { self.fixes[0].0 }
        fn longitude(&mut self) -> f64 { self.fixes[0].1 }
        fn height(&mut self) -> f64 { 0.0 }
        fn time(&mut self) -> u64 {
            // Position already read for this fix, advance the script
            if self.fixes.len() > 1 {
                self.fixes.remove(0);
            }
            0
        }
        fn horizontal_error(&mut self) -> f64 { 0.0 }
        fn vertical_error(&mut self) -> f64 { 0.0 }
        fn finish(&mut self) { self.finished = true; }
    }

    #[test]
    fn test_sampler_skips_no_fix() {
        let track = GpsTrack::new();
        let mut sampler = GpsSampler::new(
            ScriptedReceiver { fixes: vec![(0.0, 0.0)], finished: false },
            track.clone()
        );

        assert!(!sampler.sample());
        assert!(!sampler.sample());
        assert!(track.current().is_none());

        sampler.on_stop();
        assert!(sampler.receiver.finished);
    }

    #[test]
    fn test_sampler_feeds_track() {
        let track = GpsTrack::new();
        let mut sampler = GpsSampler::new(
            ScriptedReceiver { fixes: vec![(20.0, 30.0), (20.001, 30.0)], finished: false },
            track.clone()
        );

        assert!(sampler.sample());
        assert!(sampler.sample());
        assert!(is_north(track.heading_deg().unwrap()));
    }
}
