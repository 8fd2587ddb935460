//! ML module - Workout analytics, trend prediction and progression advice
//!
//! Features:
//! - Per-exercise statistics (average weight, records, volume)
//! - Next-session weight recommendation (+5% with plate rounding)
//! - Weight trend prediction using linear regression (linfa)

pub mod advisor;
pub mod predictor;

pub use advisor::{PlateSet, ProgressAdvisor, estimate_weight_for_rep_target};
pub use predictor::WeightTrend;

use crate::db::Workout;

/// Statistics for one exercise
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseStats {
    pub name: String,
    pub sessions: usize,
    pub avg_weight: f64,
    pub record_weight: f64,
    pub avg_volume: f64,
    pub record_volume: f64,
}

/// Normalize exercise names for matching: users type "Жим лёжа" and
/// "жим лежа" for the same movement
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('ё', "е")
}

/// Workout analytics
pub struct Analytics {
    workouts: Vec<Workout>,
}

impl Analytics {
    pub fn new(workouts: Vec<Workout>) -> Self {
        Self { workouts }
    }

    /// Statistics for one exercise, None if never logged
    pub fn exercise_stats(&self, exercise: &str) -> Option<ExerciseStats> {
        let key = normalize(exercise);
        let matching: Vec<_> = self
            .workouts
            .iter()
            .filter(|w| normalize(&w.exercise) == key)
            .collect();

        if matching.is_empty() {
            return None;
        }

        let weights: Vec<f64> = matching
            .iter()
            .flat_map(|w| w.sets.iter().map(|s| s.weight))
            .collect();
        let volumes: Vec<f64> = matching.iter().map(|w| w.volume()).collect();

        let avg_weight = weights.iter().sum::<f64>() / weights.len().max(1) as f64;
        let record_weight = weights.iter().copied().fold(0.0, f64::max);
        let avg_volume = volumes.iter().sum::<f64>() / volumes.len() as f64;
        let record_volume = volumes.iter().copied().fold(0.0, f64::max);

        Some(ExerciseStats {
            name: matching[0].exercise.clone(),
            sessions: matching.len(),
            avg_weight,
            record_weight,
            avg_volume,
            record_volume,
        })
    }

    /// Statistics for every exercise, grouped by normalized name
    pub fn all_stats(&self) -> Vec<ExerciseStats> {
        let mut seen: Vec<String> = Vec::new();
        let mut stats = Vec::new();

        for workout in &self.workouts {
            let key = normalize(&workout.exercise);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            if let Some(s) = self.exercise_stats(&workout.exercise) {
                stats.push(s);
            }
        }

        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Get training frequency (sessions per week)
    pub fn weekly_frequency(&self) -> f64 {
        if self.workouts.len() < 2 {
            return 0.0;
        }

        let dates: Vec<_> = self.workouts.iter().map(|w| w.date.date_naive()).collect();
        let first = dates.iter().min().unwrap();
        let last = dates.iter().max().unwrap();
        let days = (*last - *first).num_days() as f64;

        if days == 0.0 {
            return self.workouts.len() as f64;
        }

        (self.workouts.len() as f64 / days) * 7.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SetEntry;
    use chrono::Utc;

    fn create_workout(exercise: &str, sets: Vec<(i32, f64)>) -> Workout {
        Workout {
            id: None,
            user_id: 1,
            date: Utc::now(),
            exercise: exercise.to_string(),
            sets: sets
                .into_iter()
                .map(|(reps, weight)| SetEntry { reps, weight })
                .collect(),
            notes: None,
        }
    }

    fn create_workout_days_ago(exercise: &str, sets: Vec<(i32, f64)>, days_ago: i64) -> Workout {
        let mut w = create_workout(exercise, sets);
        w.date = Utc::now() - chrono::Duration::days(days_ago);
        w
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Жим лёжа "), "жим лежа");
        assert_eq!(normalize("ПРИСЕД"), "присед");
    }

    #[test]
    fn test_stats_unknown_exercise() {
        let analytics = Analytics::new(vec![]);
        assert!(analytics.exercise_stats("жим лёжа").is_none());
    }

    #[test]
    fn test_stats_single_session() {
        let analytics = Analytics::new(vec![create_workout(
            "жим лёжа",
            vec![(10, 60.0), (8, 65.0)],
        )]);
        let stats = analytics.exercise_stats("жим лёжа").unwrap();

        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.avg_weight, 62.5);
        assert_eq!(stats.record_weight, 65.0);
        assert_eq!(stats.avg_volume, 600.0 + 520.0);
        assert_eq!(stats.record_volume, 1120.0);
    }

    #[test]
    fn test_stats_matches_normalized_name() {
        let analytics = Analytics::new(vec![create_workout("Жим лёжа", vec![(10, 60.0)])]);
        let stats = analytics.exercise_stats("жим лежа").unwrap();
        assert_eq!(stats.sessions, 1);
        // Display name keeps the user's original spelling
        assert_eq!(stats.name, "Жим лёжа");
    }

    #[test]
    fn test_stats_record_across_sessions() {
        let analytics = Analytics::new(vec![
            create_workout_days_ago("присед", vec![(5, 80.0)], 7),
            create_workout("присед", vec![(5, 85.0), (3, 90.0)]),
        ]);
        let stats = analytics.exercise_stats("присед").unwrap();

        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.record_weight, 90.0);
        assert_eq!(stats.record_volume, 5.0 * 85.0 + 3.0 * 90.0);
    }

    #[test]
    fn test_all_stats_groups_spelling_variants() {
        let analytics = Analytics::new(vec![
            create_workout("Жим лёжа", vec![(10, 60.0)]),
            create_workout("жим лежа", vec![(10, 62.5)]),
            create_workout("присед", vec![(5, 80.0)]),
        ]);
        let all = analytics.all_stats();

        assert_eq!(all.len(), 2);
        let bench = all.iter().find(|s| normalize(&s.name) == "жим лежа").unwrap();
        assert_eq!(bench.sessions, 2);
    }

    #[test]
    fn test_weekly_frequency_empty() {
        let analytics = Analytics::new(vec![]);
        assert_eq!(analytics.weekly_frequency(), 0.0);
    }

    #[test]
    fn test_weekly_frequency_over_week() {
        let analytics = Analytics::new(vec![
            create_workout("присед", vec![(5, 80.0)]),
            create_workout_days_ago("присед", vec![(5, 77.5)], 7),
        ]);
        // 2 workouts over 7 days = 2 per week
        let freq = analytics.weekly_frequency();
        assert!((freq - 2.0).abs() < 0.1, "Expected ~2, got {}", freq);
    }
}
