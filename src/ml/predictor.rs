//! Weight trend prediction using linear regression (linfa)

use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use crate::db::Workout;
use crate::ml::normalize;

/// Minimum sessions required for training
const MIN_DATA_POINTS: usize = 3;

/// Working weight trend for one exercise
pub struct WeightTrend {
    slope: f64,
    intercept: f64,
    r2_score: f64,
    data_points: usize,
    first_date: DateTime<Utc>,
    /// Cached (date, mean weight) pairs for average calculations
    sessions: Vec<(DateTime<Utc>, f64)>,
}

/// Prediction result for display
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub daily_progress: f64,
    pub week_prediction: f64,
    pub month_prediction: f64,
    pub r2_score: f64,
    pub data_points: usize,
    /// Average working weight over last 7 days
    pub avg_7_days: Option<f64>,
    /// Average working weight over last 14 days
    pub avg_14_days: Option<f64>,
    /// Training frequency (sessions per week)
    pub frequency_per_week: f64,
}

impl WeightTrend {
    /// Fit a trend from workout history for a specific exercise.
    /// One data point per session: days since first session vs mean weight.
    pub fn train(workouts: &[Workout], exercise: &str) -> Option<Self> {
        let key = normalize(exercise);
        let sessions: Vec<(DateTime<Utc>, f64)> = workouts
            .iter()
            .filter(|w| normalize(&w.exercise) == key && !w.sets.is_empty())
            .map(|w| (w.date, w.mean_weight()))
            .collect();

        if sessions.len() < MIN_DATA_POINTS {
            return None;
        }

        let first_date = sessions.iter().map(|(d, _)| *d).min()?;

        // X = days since first session, Y = mean working weight
        let mut x_data: Vec<f64> = Vec::new();
        let mut y_data: Vec<f64> = Vec::new();

        for (date, weight) in &sessions {
            x_data.push((*date - first_date).num_days() as f64);
            y_data.push(*weight);
        }

        let n_samples = x_data.len();

        let records = Array2::from_shape_vec((n_samples, 1), x_data).ok()?;
        let targets = Array1::from_vec(y_data);
        let dataset = Dataset::new(records, targets);

        let model = LinearRegression::default().fit(&dataset).ok()?;

        let params = model.params();
        let slope = params[0];
        let intercept = model.intercept();

        let predictions = model.predict(&dataset);
        let r2_score = predictions.r2(&dataset).unwrap_or(0.0);

        Some(Self {
            slope,
            intercept,
            r2_score,
            data_points: n_samples,
            first_date,
            sessions,
        })
    }

    /// Predict mean weight for a given number of days ahead from now
    pub fn predict_weight(&self, days_ahead: i32) -> f64 {
        let now = Utc::now();
        let days_from_start = (now - self.first_date).num_days() as f64;
        let future_day = days_from_start + days_ahead as f64;
        self.slope * future_day + self.intercept
    }

    /// Get current predicted level (mean weight today)
    pub fn current_level(&self) -> f64 {
        self.predict_weight(0)
    }

    /// Get daily progress (slope, kg/day)
    pub fn daily_progress(&self) -> f64 {
        self.slope
    }

    /// Get R2 score (model fit quality, 0-1)
    pub fn r2_score(&self) -> f64 {
        self.r2_score
    }

    /// Get number of sessions used for fitting
    pub fn data_points(&self) -> usize {
        self.data_points
    }

    /// Average mean weight for sessions within last N days
    fn avg_last_days(&self, days: i64) -> Option<f64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);

        let recent: Vec<_> = self
            .sessions
            .iter()
            .filter(|(date, _)| *date >= cutoff)
            .collect();

        if recent.is_empty() {
            None
        } else {
            let sum: f64 = recent.iter().map(|(_, w)| *w).sum();
            Some(sum / recent.len() as f64)
        }
    }

    /// Calculate training frequency (sessions per week)
    fn frequency_per_week(&self) -> f64 {
        if self.sessions.len() < 2 {
            return 0.0;
        }

        let first = self.sessions.iter().map(|(d, _)| d).min().unwrap();
        let last = self.sessions.iter().map(|(d, _)| d).max().unwrap();
        let days = (*last - *first).num_days() as f64;

        if days < 1.0 {
            return self.sessions.len() as f64;
        }

        (self.sessions.len() as f64 / days) * 7.0
    }

    /// Get full report for display
    pub fn get_report(&self) -> TrendReport {
        TrendReport {
            daily_progress: self.slope,
            week_prediction: self.predict_weight(7),
            month_prediction: self.predict_weight(30),
            r2_score: self.r2_score,
            data_points: self.data_points,
            avg_7_days: self.avg_last_days(7),
            avg_14_days: self.avg_last_days(14),
            frequency_per_week: self.frequency_per_week(),
        }
    }

    /// Format report for bot message
    pub fn format_report(&self) -> String {
        let report = self.get_report();

        let mut lines = vec!["--- Прогресс ---".to_string()];

        if let Some(avg7) = report.avg_7_days {
            lines.push(format!("Среднее за 7 дней: {:.1} кг", avg7));
        }
        if let Some(avg14) = report.avg_14_days {
            lines.push(format!("Среднее за 14 дней: {:.1} кг", avg14));
        }

        if report.frequency_per_week > 0.0 {
            lines.push(format!("Частота: {:.1} раз/нед", report.frequency_per_week));
        }

        let trend_str = if report.daily_progress >= 0.0 {
            format!("+{:.2}", report.daily_progress)
        } else {
            format!("{:.2}", report.daily_progress)
        };
        lines.push(format!("Тренд: {} кг/день", trend_str));
        lines.push(format!("Через неделю: ~{:.1} кг", report.week_prediction));
        lines.push(format!("Через месяц: ~{:.1} кг", report.month_prediction));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SetEntry;

    fn create_workout(exercise: &str, weight: f64, days_ago: i64) -> Workout {
        Workout {
            id: None,
            user_id: 1,
            date: Utc::now() - chrono::Duration::days(days_ago),
            exercise: exercise.to_string(),
            sets: vec![SetEntry { reps: 8, weight }],
            notes: None,
        }
    }

    #[test]
    fn test_trend_insufficient_data() {
        // Only 2 sessions - should return None
        let workouts = vec![
            create_workout("жим лёжа", 60.0, 7),
            create_workout("жим лёжа", 62.5, 0),
        ];
        assert!(WeightTrend::train(&workouts, "жим лёжа").is_none());
    }

    #[test]
    fn test_trend_no_matching_exercise() {
        let workouts = vec![
            create_workout("присед", 80.0, 14),
            create_workout("присед", 82.5, 7),
            create_workout("присед", 85.0, 0),
        ];
        assert!(WeightTrend::train(&workouts, "жим лёжа").is_none());
    }

    #[test]
    fn test_trend_linear_progression() {
        // 60 -> 62.5 -> 65 over 14 days
        let workouts = vec![
            create_workout("жим лёжа", 60.0, 14),
            create_workout("жим лёжа", 62.5, 7),
            create_workout("жим лёжа", 65.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "жим лёжа").unwrap();

        // Daily progress should be approximately 5/14 ≈ 0.357 kg/day
        let daily = trend.daily_progress();
        assert!(daily > 0.3 && daily < 0.4, "Daily progress: {}", daily);

        // R2 should be very high for perfect linear data
        assert!(trend.r2_score() > 0.9, "R2 score: {}", trend.r2_score());
    }

    #[test]
    fn test_predict_future_weight() {
        let workouts = vec![
            create_workout("жим лёжа", 60.0, 14),
            create_workout("жим лёжа", 62.5, 7),
            create_workout("жим лёжа", 65.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "жим лёжа").unwrap();

        let current = trend.current_level();
        assert!(current > 64.0 && current < 66.0, "Current level: {}", current);

        let week = trend.predict_weight(7);
        assert!(week > current, "Week prediction {} should be > current {}", week, current);
    }

    #[test]
    fn test_trend_matches_normalized_name() {
        let workouts = vec![
            create_workout("Жим лёжа", 60.0, 14),
            create_workout("жим лежа", 62.5, 7),
            create_workout("жим лёжа", 65.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "жим лежа").unwrap();
        assert_eq!(trend.data_points(), 3);
    }

    #[test]
    fn test_negative_trend() {
        // Deload phase: decreasing weights
        let workouts = vec![
            create_workout("присед", 100.0, 14),
            create_workout("присед", 95.0, 7),
            create_workout("присед", 90.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "присед").unwrap();

        assert!(trend.daily_progress() < 0.0);
        assert!(trend.predict_weight(7) < trend.current_level());
    }

    #[test]
    fn test_get_report() {
        let workouts = vec![
            create_workout("жим лёжа", 60.0, 14),
            create_workout("жим лёжа", 62.5, 7),
            create_workout("жим лёжа", 65.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "жим лёжа").unwrap();
        let report = trend.get_report();

        assert!(report.daily_progress > 0.0);
        assert!(report.month_prediction > report.week_prediction);
        assert_eq!(report.data_points, 3);
    }

    #[test]
    fn test_format_report() {
        let workouts = vec![
            create_workout("жим лёжа", 60.0, 14),
            create_workout("жим лёжа", 62.5, 7),
            create_workout("жим лёжа", 65.0, 0),
        ];
        let trend = WeightTrend::train(&workouts, "жим лёжа").unwrap();
        let formatted = trend.format_report();

        assert!(formatted.contains("Прогресс"), "Format: {}", formatted);
        assert!(formatted.contains("Тренд:"), "Format: {}", formatted);
        assert!(formatted.contains("Среднее за"), "Format: {}", formatted);
        assert!(formatted.contains("Через неделю:"), "Format: {}", formatted);
    }
}
