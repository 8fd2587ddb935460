//! Database module - SQLite storage for workouts and reminders

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

/// One completed set: repetitions at a given weight (kg)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    pub reps: i32,
    pub weight: f64,
}

/// Workout session record: all sets of one exercise on one date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: Option<i64>,
    pub user_id: i64,
    pub date: DateTime<Utc>,
    pub exercise: String,
    pub sets: Vec<SetEntry>,
    pub notes: Option<String>,
}

impl Workout {
    /// Session volume: sum of reps * weight over all sets
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(|s| s.reps as f64 * s.weight).sum()
    }

    /// Mean working weight over all sets
    pub fn mean_weight(&self) -> f64 {
        if self.sets.is_empty() {
            return 0.0;
        }
        self.sets.iter().map(|s| s.weight).sum::<f64>() / self.sets.len() as f64
    }
}

/// Recurring workout reminder: days like "пн,ср,пт", time like "19:00"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Option<i64>,
    pub user_id: i64,
    pub days: String,
    pub time: String,
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                exercise TEXT NOT NULL,
                notes TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                set_no INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                weight REAL NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reminders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                days TEXT NOT NULL,
                time TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Add workout with its sets in one transaction
    pub fn add_workout(&self, workout: &Workout) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO workouts (user_id, date, exercise, notes) VALUES (?1, ?2, ?3, ?4)",
            params![
                workout.user_id,
                workout.date.to_rfc3339(),
                workout.exercise,
                workout.notes,
            ],
        )?;
        let workout_id = tx.last_insert_rowid();

        for (i, set) in workout.sets.iter().enumerate() {
            tx.execute(
                "INSERT INTO sets (workout_id, set_no, reps, weight) VALUES (?1, ?2, ?3, ?4)",
                params![workout_id, i as i64 + 1, set.reps, set.weight],
            )?;
        }

        tx.commit()?;
        Ok(workout_id)
    }

    /// Get all workouts for a user, newest first, sets in logged order
    pub fn get_workouts(&self, user_id: i64) -> Result<Vec<Workout>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, date, exercise, notes FROM workouts
             WHERE user_id = ?1 ORDER BY date DESC",
        )?;

        let mut workouts = stmt
            .query_map(params![user_id], |row| {
                let date_str: String = row.get(2)?;
                Ok(Workout {
                    id: Some(row.get(0)?),
                    user_id: row.get(1)?,
                    date: DateTime::parse_from_rfc3339(&date_str)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    exercise: row.get(3)?,
                    sets: Vec::new(),
                    notes: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut set_stmt = self
            .conn
            .prepare("SELECT reps, weight FROM sets WHERE workout_id = ?1 ORDER BY set_no")?;
        for workout in &mut workouts {
            workout.sets = set_stmt
                .query_map(params![workout.id], |row| {
                    Ok(SetEntry {
                        reps: row.get(0)?,
                        weight: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(workouts)
    }

    /// Most recent workout for an exercise, if any
    pub fn last_workout(&self, user_id: i64, exercise: &str) -> Result<Option<Workout>> {
        let workouts = self.get_workouts(user_id)?;
        Ok(workouts.into_iter().find(|w| w.exercise == exercise))
    }

    /// Distinct exercise names the user has logged, alphabetical
    pub fn exercise_names(&self, user_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT exercise FROM workouts WHERE user_id = ?1 ORDER BY exercise",
        )?;
        let names = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Delete all records of one exercise, returns removed workout count
    pub fn delete_exercise(&self, user_id: i64, exercise: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM sets WHERE workout_id IN
             (SELECT id FROM workouts WHERE user_id = ?1 AND exercise = ?2)",
            params![user_id, exercise],
        )?;
        let removed = tx.execute(
            "DELETE FROM workouts WHERE user_id = ?1 AND exercise = ?2",
            params![user_id, exercise],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Add reminder schedule
    pub fn add_reminder(&self, reminder: &Reminder) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO reminders (user_id, days, time) VALUES (?1, ?2, ?3)",
            params![reminder.user_id, reminder.days, reminder.time],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Reminders for one user
    pub fn get_reminders(&self, user_id: i64) -> Result<Vec<Reminder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, days, time FROM reminders WHERE user_id = ?1")?;
        let reminders = stmt
            .query_map(params![user_id], Self::map_reminder)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    /// All reminders, for the delivery loop
    pub fn all_reminders(&self) -> Result<Vec<Reminder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, days, time FROM reminders")?;
        let reminders = stmt
            .query_map([], Self::map_reminder)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    /// Remove all reminders for a user, returns removed count
    pub fn remove_reminders(&self, user_id: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM reminders WHERE user_id = ?1", params![user_id])?;
        Ok(removed)
    }

    fn map_reminder(row: &rusqlite::Row) -> rusqlite::Result<Reminder> {
        Ok(Reminder {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            days: row.get(2)?,
            time: row.get(3)?,
        })
    }
}
