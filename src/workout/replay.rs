// Offline replay of a recorded route. Clock ticks are synthesised from the
// sample timestamps so a recording plays back identically every time.

use log::{debug, info};

use crate::PacekeeperError;
use crate::tracking::GeoSample;

use super::{GoalType, Phase, SessionConfig, WorkoutEvent, WorkoutSession};

/// Run `samples` through a fresh session started with `config`.
///
/// The session sees one tick per second between samples, timed from the first
/// sample. After the last sample a time goal is ticked to completion; any other
/// session still running is finished. Returns every event in order.
///
/// # Errors
///
/// Propagates `start` and `finish` errors, e.g. an invalid configuration or a
/// session that is not configuring.
pub fn replay_samples(
    session: &mut WorkoutSession,
    config: SessionConfig,
    samples: &[GeoSample],
) -> Result<Vec<WorkoutEvent>, PacekeeperError> {
    let mut events = session.start(config)?;
    info!("Replaying {} samples", samples.len());

    let origin_ms = samples.first().map_or(0, |s| s.timestamp_ms);
    for sample in samples {
        let due_s = u32::try_from(sample.timestamp_ms.saturating_sub(origin_ms) / 1000)
            .unwrap_or(u32::MAX);
        tick_until(session, due_s, &mut events);
        if session.phase() != Phase::Active {
            break;
        }
        events.extend(session.on_sample(*sample));
    }

    if session.phase() == Phase::Active {
        if let GoalType::TimeBound { target_seconds } = session.config().goal {
            tick_until(session, target_seconds, &mut events);
        }
    }
    if matches!(session.phase(), Phase::Active | Phase::Paused) {
        events.extend(session.finish()?);
    }

    debug!("Replay produced {} events", events.len());
    Ok(events)
}

fn tick_until(session: &mut WorkoutSession, due_s: u32, events: &mut Vec<WorkoutEvent>) {
    while session.phase() == Phase::Active && session.state().elapsed_seconds < due_s {
        events.extend(session.on_tick());
    }
}
