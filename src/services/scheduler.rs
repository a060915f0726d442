use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::{DayOfWeek, Lesson};
use crate::notify::{NotificationPermission, PermissionState, ReminderSink};
use crate::services::lesson_store::LessonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMatch {
    /// Fire once anywhere in `(0, lead]` minutes before start.
    Window,
    /// Fire only on a tick that sees exactly `lead` minutes remaining.
    Exact,
}

impl FromStr for ReminderMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" => Ok(ReminderMatch::Window),
            "exact" => Ok(ReminderMatch::Exact),
            other => Err(format!("unknown reminder match {:?}, expected window or exact", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub lead_minutes: i64,
    pub matching: ReminderMatch,
}

impl ReminderPolicy {
    pub fn matches(&self, minutes_until: i64) -> bool {
        match self.matching {
            ReminderMatch::Window => minutes_until > 0 && minutes_until <= self.lead_minutes,
            ReminderMatch::Exact => minutes_until == self.lead_minutes,
        }
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            lead_minutes: 15,
            matching: ReminderMatch::Window,
        }
    }
}

/// A lesson whose start falls inside the reminder window at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub lesson_id: String,
    pub occurrence: NaiveDate,
    pub minutes_until: i64,
    pub title: String,
    pub body: String,
}

/// Lessons on `now`'s weekday that the policy says are due.
pub fn due_reminders(lessons: &[Lesson], now: NaiveDateTime, policy: &ReminderPolicy) -> Vec<DueReminder> {
    let today = now.date();
    let current_day = DayOfWeek::from(today.weekday());

    lessons
        .iter()
        .filter(|lesson| lesson.day_of_week == current_day)
        .filter_map(|lesson| {
            let span = lesson.span()?;
            let starts_at = today.and_time(span.start);
            let minutes_until = (starts_at - now).num_seconds().div_euclid(60);
            if !policy.matches(minutes_until) {
                return None;
            }

            let location = if lesson.location.trim().is_empty() {
                "N/A"
            } else {
                lesson.location.as_str()
            };
            Some(DueReminder {
                lesson_id: lesson.id.clone(),
                occurrence: today,
                minutes_until,
                title: format!("Upcoming Class: {}", lesson.subject),
                body: format!("Starting in {} mins at {}", minutes_until, location),
            })
        })
        .collect()
}

/// Occurrences already notified during this process.
#[derive(Debug, Default)]
pub struct ReminderFireLog {
    fired: HashSet<(String, NaiveDate)>,
}

impl ReminderFireLog {
    pub fn contains(&self, lesson_id: &str, occurrence: NaiveDate) -> bool {
        self.fired.contains(&(lesson_id.to_string(), occurrence))
    }

    pub fn record(&mut self, lesson_id: &str, occurrence: NaiveDate) {
        self.fired.insert((lesson_id.to_string(), occurrence));
    }

    pub fn prune_before(&mut self, date: NaiveDate) {
        self.fired.retain(|(_, occurrence)| *occurrence >= date);
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub unauthorized: bool,
    pub due: usize,
    pub fired: usize,
    pub already_fired: usize,
    pub failed: usize,
}

/// 授業リマインダー スケジューラー
/// 一定間隔で時間割を確認し、授業ごと・日ごとに一度だけ通知する
pub struct ReminderScheduler {
    store: Arc<LessonStore>,
    permission: Arc<dyn NotificationPermission>,
    sink: Arc<dyn ReminderSink>,
    interval: Duration,
    policy: ReminderPolicy,
    fire_log: ReminderFireLog,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<LessonStore>,
        permission: Arc<dyn NotificationPermission>,
        sink: Arc<dyn ReminderSink>,
        interval_secs: u64,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            store,
            permission,
            sink,
            interval: Duration::from_secs(interval_secs),
            policy,
            fire_log: ReminderFireLog::default(),
        }
    }

    pub fn fire_log(&self) -> &ReminderFireLog {
        &self.fire_log
    }

    /// `shutdown` が `true` になるか送信側が drop されるまでループで実行
    ///
    /// 停止はティックの合間でのみ確認する。開始したティックは必ず最後まで実行される
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting reminder scheduler (interval: {:?}, lead: {} min, {:?})",
            self.interval, self.policy.lead_minutes, self.policy.matching
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            // リマインダー判定を実行
            let now = Local::now().naive_local();
            let report = self.run_tick(now).await;
            debug!("Reminder tick at {}: {:?}", now, report);
        }

        info!("Reminder scheduler stopped");
    }

    /// `now` 時点で1ティック分の判定を実行
    pub async fn run_tick(&mut self, now: NaiveDateTime) -> TickReport {
        self.fire_log.prune_before(now.date());

        let mut report = TickReport::default();
        if self.permission.state() != PermissionState::Granted {
            report.unauthorized = true;
            return report;
        }

        let lessons = self.store.snapshot().await;
        let due = due_reminders(&lessons, now, &self.policy);
        report.due = due.len();

        for reminder in due {
            if self.fire_log.contains(&reminder.lesson_id, reminder.occurrence) {
                report.already_fired += 1;
                continue;
            }

            match self.sink.emit(&reminder.title, &reminder.body).await {
                Ok(()) => {
                    self.fire_log.record(&reminder.lesson_id, reminder.occurrence);
                    report.fired += 1;
                }
                Err(e) => {
                    // 記録しないので次のティックで再送される
                    warn!("Failed to emit reminder for {}: {}", reminder.lesson_id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
