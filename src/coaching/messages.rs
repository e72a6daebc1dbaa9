use super::CoachingCategory;

const START: &[&str] = &[
    "Let's go! Settle into your rhythm.",
    "Workout started. Find a pace you can hold.",
    "Here we go. Breathe easy and warm up.",
    "You showed up, that's the hardest part. Let's move!",
];

const ENCOURAGEMENT: &[&str] = &[
    "You're doing great, keep it up!",
    "Strong and steady. Keep moving.",
    "Relax your shoulders and keep breathing.",
    "Every step counts. Stay with it!",
    "Looking good. Hold this effort.",
    "Nice work, you're in the zone.",
];

const MILESTONE: &[&str] = &[
    "Milestone reached! Keep that momentum.",
    "Another one down. Great pace!",
    "Checkpoint crushed. On to the next!",
    "Boom! That's progress.",
];

const AUTO_MILESTONE: &[&str] = &[
    "Another interval complete. Nice consistency!",
    "Interval done. Keep the engine running.",
    "Time checkpoint hit. You're on track.",
];

const HALFWAY: &[&str] = &[
    "Halfway there! The rest is downhill.",
    "You're at the halfway mark. Keep it going!",
    "Half done. Same energy for the second half.",
];

const ALMOST_DONE: &[&str] = &[
    "Almost done! Give it everything you've got.",
    "Final stretch. Finish strong!",
    "Just a little more. You've got this!",
];

const GOAL_REACHED: &[&str] = &[
    "You made it to your destination!",
    "Goal reached! Outstanding effort.",
    "Destination reached. Take a moment to enjoy it.",
];

const COMPLETE: &[&str] = &[
    "Workout complete! Amazing job today.",
    "That's a wrap. Be proud of that effort!",
    "Done! Time to stretch and recover.",
    "Session finished. You got stronger today.",
];

const ADVISORY: &[&str] = &[
    "Location is unavailable, tracking time and effort only.",
    "No GPS signal access. Your time and calories still count.",
    "Distance tracking is off for this workout. Keep going!",
];

/// Fixed message pool for a category. Every pool has at least three entries.
pub fn pool(category: CoachingCategory) -> &'static [&'static str] {
    match category {
        CoachingCategory::Start => START,
        CoachingCategory::Encouragement => ENCOURAGEMENT,
        CoachingCategory::Milestone => MILESTONE,
        CoachingCategory::AutoMilestone => AUTO_MILESTONE,
        CoachingCategory::Halfway => HALFWAY,
        CoachingCategory::AlmostDone => ALMOST_DONE,
        CoachingCategory::GoalReached => GOAL_REACHED,
        CoachingCategory::Complete => COMPLETE,
        CoachingCategory::Advisory => ADVISORY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pool_has_three_messages() {
        for category in CoachingCategory::ALL {
            let messages = pool(category);
            assert!(
                messages.len() >= 3,
                "{category:?} only has {} messages",
                messages.len()
            );
            assert!(messages.iter().all(|m| !m.trim().is_empty()));
        }
    }
}
