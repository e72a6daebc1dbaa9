// Property tests driving whole sessions with generated input

use pacekeeper::coaching::CoachingDispatcher;
use pacekeeper::coaching::recorder::CoachingRecorder;
use pacekeeper::tracking::{EARTH_RADIUS_M, GeoSample};
use pacekeeper::workout::{Phase, SessionConfig, WorkoutEvent, WorkoutSession};
use pacekeeper::writer::SummaryRecorder;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn session(summaries: &SummaryRecorder) -> WorkoutSession {
    WorkoutSession::new(
        CoachingDispatcher::with_rng(CoachingRecorder::default().outputs(), StdRng::seed_from_u64(5)),
        Box::new(summaries.clone()),
    )
}

#[derive(Clone, Debug)]
enum Input {
    Tick,
    /// Move `north_m` and `east_m`, reported `dt_ms` after the previous fix
    Fix { north_m: f64, east_m: f64, dt_ms: u64, accuracy_m: f64 },
    Pause,
    Resume,
    Checkpoint,
    Reset,
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        6 => Just(Input::Tick),
        6 => (-30.0f64..30.0, -30.0f64..30.0, 0u64..3000, 1.0f64..40.0).prop_map(
            |(north_m, east_m, dt_ms, accuracy_m)| Input::Fix { north_m, east_m, dt_ms, accuracy_m }
        ),
        1 => Just(Input::Pause),
        1 => Just(Input::Resume),
        1 => Just(Input::Checkpoint),
        1 => Just(Input::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_counters_only_grow_between_resets(inputs in prop::collection::vec(input(), 1..400)) {
        let summaries = SummaryRecorder::default();
        let mut session = session(&summaries);
        session.start(SessionConfig { distance_milestone_interval_m: 250, ..SessionConfig::default() }).unwrap();

        let m_per_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let (mut lat, mut lon, mut t_ms) = (10.0f64, 20.0f64, 0u64);
        let mut last_distance = 0.0;
        let mut last_elapsed = 0;
        let mut last_milestone_index = 0;

        for input in inputs {
            let mut reset = false;
            let events = match input {
                Input::Tick => session.on_tick(),
                Input::Fix { north_m, east_m, dt_ms, accuracy_m } => {
                    lat += north_m / m_per_deg;
                    lon += east_m / (m_per_deg * lat.to_radians().cos());
                    t_ms += dt_ms;
                    session.on_sample(GeoSample::new(lat, lon, t_ms, accuracy_m, None))
                }
                Input::Pause => { let _ = session.pause(); Vec::new() }
                Input::Resume => { let _ = session.resume(); Vec::new() }
                Input::Checkpoint => session.manual_milestone().unwrap_or_default(),
                Input::Reset => { reset = session.reset().is_ok(); Vec::new() }
            };

            if reset {
                last_distance = 0.0;
                last_elapsed = 0;
                last_milestone_index = 0;
                continue;
            }

            let distance = session.route().cumulative_distance_m();
            prop_assert!(distance >= last_distance);
            prop_assert!(session.state().elapsed_seconds >= last_elapsed);
            last_distance = distance;
            last_elapsed = session.state().elapsed_seconds;

            for event in events {
                if let WorkoutEvent::DistanceMilestone { index, .. } = event {
                    prop_assert!(index > last_milestone_index);
                    last_milestone_index = index;
                }
            }
            prop_assert!(f64::from(last_milestone_index) * 250.0 <= distance + 1e-9);
            prop_assert_ne!(session.phase(), Phase::Completed);
        }
        prop_assert!(summaries.summaries().is_empty());
    }

    #[test]
    fn prop_stop_reports_only_long_sessions(ticks in 0u32..90) {
        let summaries = SummaryRecorder::default();
        let mut session = session(&summaries);
        session.start(SessionConfig { track_position: false, ..SessionConfig::default() }).unwrap();
        for _ in 0..ticks {
            session.on_tick();
        }

        session.stop().unwrap();

        if ticks < 30 {
            prop_assert_eq!(session.phase(), Phase::Configuring);
            prop_assert!(summaries.summaries().is_empty());
        } else {
            prop_assert_eq!(session.phase(), Phase::Completed);
            prop_assert_eq!(summaries.summaries().len(), 1);
            prop_assert_eq!(summaries.summaries()[0].duration_seconds, ticks);
        }
    }

    #[test]
    fn prop_time_goal_duration_matches_target(target in 1u32..600) {
        let summaries = SummaryRecorder::default();
        let mut session = session(&summaries);
        session.start(SessionConfig {
            goal: pacekeeper::workout::GoalType::TimeBound { target_seconds: target },
            track_position: false,
            ..SessionConfig::default()
        }).unwrap();

        let mut halfway = 0;
        let mut almost_done = 0;
        for _ in 0..target + 10 {
            for event in session.on_tick() {
                match event {
                    WorkoutEvent::Halfway => halfway += 1,
                    WorkoutEvent::AlmostDone => almost_done += 1,
                    _ => {}
                }
            }
        }

        prop_assert_eq!(session.phase(), Phase::Completed);
        prop_assert_eq!(summaries.summaries()[0].duration_seconds, target);
        prop_assert!(halfway <= 1 && almost_done <= 1);
    }
}
