//! Telegram bot module - Conversational workout logging with scheduled reminders

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike, Utc, Weekday};
use teloxide::{
    dispatching::dialogue::{Dialogue, InMemStorage},
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::command::BotCommands,
};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::db::{Database, Reminder, SetEntry, Workout};
use crate::ml::{Analytics, PlateSet, ProgressAdvisor, WeightTrend};
use crate::ml::advisor::ConfigurationError;

type MyDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Smallest weight step achievable on the bar (a plate pair)
const BAR_STEP_KG: f64 = 2.5;

/// Upper bound for generated loadable weights
const MAX_BAR_KG: f64 = 500.0;

/// Advisor over the standard loadable weights
fn next_session_advisor() -> Result<ProgressAdvisor, ConfigurationError> {
    Ok(ProgressAdvisor::new(PlateSet::steps(BAR_STEP_KG, MAX_BAR_KG)?))
}

/// Format a weight without trailing zeros: 62.50 -> "62.5", 65.00 -> "65"
fn fmt_weight(weight: f64) -> String {
    format!("{:.2}", weight)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    /// Waiting for exercise pick or a new exercise name
    AddExercise,
    /// Waiting for reps per set ("10 8 6")
    AddReps { exercise: String },
    /// Waiting for weight per set ("60 62.5 65", one value applies to all)
    AddWeights { exercise: String, reps: Vec<i32> },
    /// Waiting for reminder schedule ("пн,ср,пт 19:00")
    AddReminder,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Команды бота:")]
pub enum Command {
    #[command(description = "Начать работу")]
    Start,
    #[command(description = "Показать помощь")]
    Help,
    #[command(description = "Записать подходы")]
    Add,
    #[command(description = "Последняя тренировка")]
    Last,
    #[command(description = "История тренировок")]
    History,
    #[command(description = "Статистика")]
    Stats,
    #[command(description = "Прогресс по упражнению")]
    Progress,
    #[command(description = "Удалить упражнение")]
    Delete,
    #[command(description = "Добавить напоминание")]
    Remind,
    #[command(description = "Мои напоминания")]
    Reminders,
    #[command(description = "Удалить все напоминания")]
    StopRemind,
}

/// Parse reps list: positive integers separated by whitespace
fn parse_reps(text: &str) -> Option<Vec<i32>> {
    let reps: Vec<i32> = text
        .split_whitespace()
        .map(|t| t.parse::<i32>().ok().filter(|r| *r > 0))
        .collect::<Option<Vec<_>>>()?;
    if reps.is_empty() { None } else { Some(reps) }
}

/// Parse weights list: non-negative numbers, comma or dot decimals.
/// A single value is repeated for every set; otherwise the count must
/// match the number of sets.
fn parse_weights(text: &str, n_sets: usize) -> Option<Vec<f64>> {
    let weights: Vec<f64> = text
        .split_whitespace()
        .map(|t| t.replace(',', ".").parse::<f64>().ok().filter(|w| *w >= 0.0))
        .collect::<Option<Vec<_>>>()?;

    match weights.len() {
        0 => None,
        1 => Some(vec![weights[0]; n_sets]),
        n if n == n_sets => Some(weights),
        _ => None,
    }
}

/// Short Russian weekday name
fn weekday_abbr(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "пн",
        Weekday::Tue => "вт",
        Weekday::Wed => "ср",
        Weekday::Thu => "чт",
        Weekday::Fri => "пт",
        Weekday::Sat => "сб",
        Weekday::Sun => "вс",
    }
}

/// Parse a reminder like "пн, ср, пт 19:00" into normalized
/// ("пн,ср,пт", "19:00")
fn parse_reminder(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let (days_part, time_part) = text.rsplit_once(char::is_whitespace)?;

    let (hours, minutes) = time_part.split_once(':')?;
    let hours: u32 = hours.parse().ok().filter(|h| *h < 24)?;
    let minutes: u32 = minutes.parse().ok().filter(|m| *m < 60)?;

    let known = ["пн", "вт", "ср", "чт", "пт", "сб", "вс"];
    let days: Vec<&str> = days_part
        .split(',')
        .map(|d| d.trim().to_lowercase())
        .map(|d| known.iter().copied().find(|k| *k == d))
        .collect::<Option<Vec<_>>>()?;
    if days.is_empty() {
        return None;
    }

    Some((days.join(","), format!("{:02}:{:02}", hours, minutes)))
}

/// Whether a reminder fires at the given local time
fn reminder_due(reminder: &Reminder, now: DateTime<Local>) -> bool {
    let today = weekday_abbr(now.date_naive().weekday());
    let time = format!("{:02}:{:02}", now.hour(), now.minute());
    reminder.days.split(',').any(|d| d == today) && reminder.time == time
}

/// One logged session as a multi-line summary
fn format_session(workout: &Workout) -> String {
    let mut text = format!(
        "{} — {}:\n",
        workout.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        workout.exercise
    );
    for (i, set) in workout.sets.iter().enumerate() {
        text.push_str(&format!(
            "{}) {} повторений — {} кг\n",
            i + 1,
            set.reps,
            fmt_weight(set.weight)
        ));
    }
    text
}

/// Advisor output as "65, 70, 75 кг"
fn format_recommendation(weights: &[f64]) -> String {
    let parts: Vec<String> = weights.iter().map(|w| fmt_weight(*w)).collect();
    format!("{} кг", parts.join(", "))
}

/// Inline keyboard over the user's exercises, two per row
fn make_exercises_keyboard(exercises: &[String], prefix: &str) -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = exercises
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|name| {
                    InlineKeyboardButton::callback(name.clone(), format!("{}:{}", prefix, name))
                })
                .collect()
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

/// Background task delivering due reminders once a minute
async fn reminder_task(bot: Bot, db: Arc<Mutex<Database>>) {
    info!("Reminder task started (minute granularity)");

    loop {
        // Wake shortly after each minute boundary
        let to_next_minute = 60 - Local::now().second() as u64;
        tokio::time::sleep(Duration::from_secs(to_next_minute.max(1))).await;

        let now = Local::now();
        let reminders = {
            let db = db.lock().await;
            match db.all_reminders() {
                Ok(r) => r,
                Err(e) => {
                    error!("Failed to load reminders: {}", e);
                    continue;
                }
            }
        };

        for reminder in reminders.iter().filter(|r| reminder_due(r, now)) {
            let chat_id = ChatId(reminder.user_id);
            let result = bot
                .send_message(chat_id, "⏰ Напоминание: пора тренироваться!\n\n/add — записать подходы")
                .await;

            if let Err(e) = result {
                error!("Failed to send reminder to {}: {}", chat_id, e);
            } else {
                info!("Reminder sent to {}", chat_id);
            }
        }
    }
}

/// Start the Telegram bot with the reminder loop
pub async fn run_bot(token: String, db_path: &str) -> anyhow::Result<()> {
    let bot = Bot::new(token);
    let db = Arc::new(Mutex::new(Database::open(db_path)?));

    // Start reminder background task
    let reminder_bot = bot.clone();
    let reminder_db = db.clone();
    tokio::spawn(async move {
        reminder_task(reminder_bot, reminder_db).await;
    });

    let handler = dptree::entry()
        .enter_dialogue::<Update, InMemStorage<State>, State>()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![InMemStorage::<State>::new(), db])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: MyDialogue,
    db: Arc<Mutex<Database>>,
) -> HandlerResult {
    let user_id = msg.chat.id.0;

    match cmd {
        Command::Start => {
            let text = "🏋️ zhelezo\n\n\
                Дневник силовых тренировок\n\n\
                /add - записать подходы\n\
                /last - последняя тренировка\n\
                /history - история\n\
                /stats - статистика\n\
                /progress - прогресс и рекомендация\n\
                /delete - удалить упражнение\n\
                /remind - напоминания";
            bot.send_message(msg.chat.id, text).await?;
        }

        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }

        Command::Add => {
            let exercises = {
                let db = db.lock().await;
                db.exercise_names(user_id)?
            };

            let text = "Выбери упражнение или напиши название нового:";
            if exercises.is_empty() {
                bot.send_message(msg.chat.id, "Напиши название упражнения:")
                    .await?;
            } else {
                let keyboard = make_exercises_keyboard(&exercises, "add");
                bot.send_message(msg.chat.id, text)
                    .reply_markup(keyboard)
                    .await?;
            }
            dialogue.update(State::AddExercise).await?;
        }

        Command::Last => {
            let workouts = {
                let db = db.lock().await;
                db.get_workouts(user_id)?
            };

            match workouts.first() {
                None => {
                    bot.send_message(msg.chat.id, "У тебя нет прошлых тренировок. Жми /add!")
                        .await?;
                }
                Some(last) => {
                    let advisor = next_session_advisor()?;
                    let recommendation = advisor.recommend(&last.sets);

                    let text = format!(
                        "Последняя тренировка:\n\n{}\nВ следующий раз попробуй: {}",
                        format_session(last),
                        format_recommendation(&recommendation)
                    );
                    bot.send_message(msg.chat.id, text).await?;
                }
            }
        }

        Command::History => {
            let workouts = {
                let db = db.lock().await;
                db.get_workouts(user_id)?
            };

            if workouts.is_empty() {
                bot.send_message(msg.chat.id, "У тебя пока нет записей. Жми /add!")
                    .await?;
            } else {
                let mut text = String::from("📊 Последние тренировки:\n\n");
                for workout in workouts.iter().take(10) {
                    text.push_str(&format_session(workout));
                    text.push_str(&"—".repeat(20));
                    text.push('\n');
                }
                bot.send_message(msg.chat.id, text).await?;
            }
        }

        Command::Stats => {
            let exercises = {
                let db = db.lock().await;
                db.exercise_names(user_id)?
            };

            if exercises.is_empty() {
                bot.send_message(msg.chat.id, "У тебя пока нет записей. Жми /add!")
                    .await?;
            } else {
                let mut keyboard = make_exercises_keyboard(&exercises, "st");
                keyboard
                    .inline_keyboard
                    .push(vec![InlineKeyboardButton::callback(
                        "Все упражнения",
                        "st:*",
                    )]);
                bot.send_message(msg.chat.id, "Выбери упражнение для статистики:")
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        Command::Progress => {
            let exercises = {
                let db = db.lock().await;
                db.exercise_names(user_id)?
            };

            if exercises.is_empty() {
                bot.send_message(msg.chat.id, "У тебя пока нет записей для прогресса.")
                    .await?;
            } else {
                let keyboard = make_exercises_keyboard(&exercises, "pr");
                bot.send_message(msg.chat.id, "Выбери упражнение для прогресса:")
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        Command::Delete => {
            let exercises = {
                let db = db.lock().await;
                db.exercise_names(user_id)?
            };

            if exercises.is_empty() {
                bot.send_message(msg.chat.id, "У тебя нет упражнений для удаления.")
                    .await?;
            } else {
                let keyboard = make_exercises_keyboard(&exercises, "del");
                bot.send_message(msg.chat.id, "Выбери упражнение, которое удалить:")
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        Command::Remind => {
            bot.send_message(
                msg.chat.id,
                "Введи дни недели и время в формате:\nпн, ср, пт 19:00",
            )
            .await?;
            dialogue.update(State::AddReminder).await?;
        }

        Command::Reminders => {
            let reminders = {
                let db = db.lock().await;
                db.get_reminders(user_id)?
            };

            if reminders.is_empty() {
                bot.send_message(msg.chat.id, "У тебя пока нет напоминаний.\n\n/remind - добавить")
                    .await?;
            } else {
                let lines: Vec<String> = reminders
                    .iter()
                    .map(|r| format!("• {} в {}", r.days, r.time))
                    .collect();
                bot.send_message(msg.chat.id, format!("⏰ Твои напоминания:\n{}", lines.join("\n")))
                    .await?;
            }
        }

        Command::StopRemind => {
            let removed = {
                let db = db.lock().await;
                db.remove_reminders(user_id)?
            };

            if removed > 0 {
                bot.send_message(msg.chat.id, "🔕 Все напоминания удалены.\n\n/remind - добавить снова")
                    .await?;
                info!("User {} removed {} reminders", user_id, removed);
            } else {
                bot.send_message(msg.chat.id, "Напоминаний и так нет.\n\n/remind - добавить")
                    .await?;
            }
        }
    }

    Ok(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: MyDialogue,
    db: Arc<Mutex<Database>>,
) -> HandlerResult {
    if let (Some(data), Some(msg)) = (&q.data, q.message.as_ref()) {
        let chat_id = msg.chat().id;
        let user_id = chat_id.0;

        if let Some(exercise) = data.strip_prefix("add:") {
            dialogue
                .update(State::AddReps {
                    exercise: exercise.to_string(),
                })
                .await?;
            let text = format!(
                "{}\n\nСколько повторений в каждом подходе?\nНапример: 10 8 6",
                exercise
            );
            bot.edit_message_text(chat_id, msg.id(), text).await?;
        } else if let Some(exercise) = data.strip_prefix("st:") {
            let workouts = {
                let db = db.lock().await;
                db.get_workouts(user_id)?
            };
            let analytics = Analytics::new(workouts);

            let text = if exercise == "*" {
                let mut parts = Vec::new();
                for stats in analytics.all_stats() {
                    parts.push(format!(
                        "🏋️ {}:\n   Тренировок: {}\n   Средний вес: {:.1} кг\n   Личный рекорд: {:.1} кг\n   Средний объём: {:.1} кг\n   Рекордный объём: {:.1} кг",
                        stats.name,
                        stats.sessions,
                        stats.avg_weight,
                        stats.record_weight,
                        stats.avg_volume,
                        stats.record_volume
                    ));
                }
                parts.push(format!(
                    "Частота: {:.1} тренировок/нед",
                    analytics.weekly_frequency()
                ));
                parts.join("\n\n")
            } else {
                match analytics.exercise_stats(exercise) {
                    Some(stats) => format!(
                        "📊 Статистика по {}:\n   Тренировок: {}\n   Средний вес: {:.1} кг\n   Личный рекорд: {:.1} кг\n   Средний объём: {:.1} кг\n   Рекордный объём: {:.1} кг",
                        stats.name,
                        stats.sessions,
                        stats.avg_weight,
                        stats.record_weight,
                        stats.avg_volume,
                        stats.record_volume
                    ),
                    None => format!("Записей по '{}' не найдено.", exercise),
                }
            };
            bot.edit_message_text(chat_id, msg.id(), text).await?;
        } else if let Some(exercise) = data.strip_prefix("pr:") {
            let workouts = {
                let db = db.lock().await;
                db.get_workouts(user_id)?
            };

            let trend_text = match WeightTrend::train(&workouts, exercise) {
                Some(trend) => trend.format_report(),
                None => "Мало данных для тренда (нужно минимум 3 тренировки).".to_string(),
            };

            let last = workouts
                .iter()
                .find(|w| w.exercise == exercise && !w.sets.is_empty());
            let recommendation_text = match last {
                Some(last) => {
                    let advisor = next_session_advisor()?;
                    format!(
                        "\n\nВ следующий раз попробуй: {}",
                        format_recommendation(&advisor.recommend(&last.sets))
                    )
                }
                None => String::new(),
            };

            let text = format!("📈 {}\n\n{}{}", exercise, trend_text, recommendation_text);
            bot.edit_message_text(chat_id, msg.id(), text).await?;
        } else if let Some(exercise) = data.strip_prefix("del:") {
            let removed = {
                let db = db.lock().await;
                db.delete_exercise(user_id, exercise)?
            };
            let text = if removed > 0 {
                format!("✅ Упражнение '{}' удалено ({} записей).", exercise, removed)
            } else {
                format!("Записей по '{}' не найдено.", exercise)
            };
            bot.edit_message_text(chat_id, msg.id(), text).await?;
            info!("User {} deleted exercise '{}'", user_id, exercise);
        }
    }

    bot.answer_callback_query(q.id).await?;
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    dialogue: MyDialogue,
    db: Arc<Mutex<Database>>,
) -> HandlerResult {
    let state = dialogue.get().await?.unwrap_or_default();
    let user_id = msg.chat.id.0;

    match state {
        State::AddExercise => {
            if let Some(text) = msg.text() {
                let exercise = text.trim();
                if exercise.is_empty() || exercise.len() > 64 {
                    bot.send_message(msg.chat.id, "Введи название упражнения (до 64 символов)")
                        .await?;
                    return Ok(());
                }

                dialogue
                    .update(State::AddReps {
                        exercise: exercise.to_string(),
                    })
                    .await?;
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "{}\n\nСколько повторений в каждом подходе?\nНапример: 10 8 6",
                        exercise
                    ),
                )
                .await?;
            }
        }

        State::AddReps { exercise } => {
            if let Some(text) = msg.text() {
                match parse_reps(text) {
                    Some(reps) => {
                        let prompt = format!(
                            "Подходов: {}\n\nВес в кг для каждого подхода?\nНапример: 60 62.5 65 (одно число — на все подходы, 0 — свой вес)",
                            reps.len()
                        );
                        dialogue
                            .update(State::AddWeights { exercise, reps })
                            .await?;
                        bot.send_message(msg.chat.id, prompt).await?;
                    }
                    None => {
                        bot.send_message(msg.chat.id, "Введи повторения числами, например: 10 8 6")
                            .await?;
                    }
                }
            }
        }

        State::AddWeights { exercise, reps } => {
            if let Some(text) = msg.text() {
                match parse_weights(text, reps.len()) {
                    Some(weights) => {
                        let sets: Vec<SetEntry> = reps
                            .iter()
                            .zip(weights.iter())
                            .map(|(reps, weight)| SetEntry {
                                reps: *reps,
                                weight: *weight,
                            })
                            .collect();

                        let workout = Workout {
                            id: None,
                            user_id,
                            date: Utc::now(),
                            exercise: exercise.clone(),
                            sets,
                            notes: None,
                        };

                        {
                            let db = db.lock().await;
                            db.add_workout(&workout)?;
                        }

                        let advisor = next_session_advisor()?;
                        let recommendation = advisor.recommend(&workout.sets);

                        let response = format!(
                            "Записано!\n\n{}\nВ следующий раз попробуй: {}\n\n/add - ещё",
                            format_session(&workout),
                            format_recommendation(&recommendation)
                        );
                        bot.send_message(msg.chat.id, response).await?;
                        dialogue.reset().await?;
                        info!("User {} logged '{}' ({} sets)", user_id, exercise, workout.sets.len());
                    }
                    None => {
                        bot.send_message(
                            msg.chat.id,
                            format!(
                                "Введи вес числами: {} значений или одно на все подходы",
                                reps.len()
                            ),
                        )
                        .await?;
                    }
                }
            }
        }

        State::AddReminder => {
            if let Some(text) = msg.text() {
                match parse_reminder(text) {
                    Some((days, time)) => {
                        {
                            let db = db.lock().await;
                            db.add_reminder(&Reminder {
                                id: None,
                                user_id,
                                days: days.clone(),
                                time: time.clone(),
                            })?;
                        }
                        bot.send_message(
                            msg.chat.id,
                            format!("✅ Напоминание сохранено: {} в {}", days, time),
                        )
                        .await?;
                        dialogue.reset().await?;
                        info!("User {} added reminder {} {}", user_id, days, time);
                    }
                    None => {
                        bot.send_message(msg.chat.id, "❌ Ошибка. Используй формат: пн, ср, пт 19:00")
                            .await?;
                    }
                }
            }
        }

        State::Start => {
            bot.send_message(msg.chat.id, "Жми /add чтобы записать подходы")
                .await?;
        }
    }

    Ok(())
}
