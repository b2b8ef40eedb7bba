use std::{str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    types::Json,
    FromRow,
};
use uuid::Uuid;

use super::{
    group::Group,
    quiz::{Quiz, SendKind},
    report::{QuizSnapshot, Report, ReportStatus, Reporter},
    settings::{Settings, Stats, SETTINGS_KEY, STATS_KEY},
    store::{GroupStore, QuizStore, ReportStore, SingletonStore},
};
use crate::error::{Error, Result};

/// Postgres-backed content store.
pub struct Connection {
    pool: PgPool,
}

impl Connection {
    /// Every statement and every pool checkout is bounded by `timeout`.
    pub async fn connect(connection_string: &str, timeout: Duration) -> Result<Self> {
        let options = PgConnectOptions::from_str(connection_string)?
            .options([("statement_timeout", timeout.as_millis().to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn perform_migrations(&self) -> Result<()> {
        log::debug!("Applying pending migrations");
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    question: String,
    options: Vec<String>,
    correct_option: i16,
    is_active: bool,
    sent_count: i64,
    manual_sent_count: i64,
    last_sent: Option<DateTime<Utc>>,
    added_at: DateTime<Utc>,
}

impl From<QuizRecord> for Quiz {
    fn from(record: QuizRecord) -> Self {
        Quiz::retreive(
            record.id,
            record.question,
            record.options,
            record.correct_option as u8,
            record.is_active,
            record.sent_count as u64,
            record.manual_sent_count as u64,
            record.last_sent,
            record.added_at,
        )
    }
}

#[derive(FromRow)]
struct GroupRecord {
    chat_id: i64,
    title: String,
    is_active: bool,
    quizzes_received: i64,
    manual_quizzes_received: i64,
    member_count: i32,
    last_activity: DateTime<Utc>,
    added_at: DateTime<Utc>,
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        Group {
            chat_id: record.chat_id,
            title: record.title,
            is_active: record.is_active,
            quizzes_received: record.quizzes_received as u64,
            manual_quizzes_received: record.manual_quizzes_received as u64,
            member_count: record.member_count.max(0) as u32,
            last_activity: record.last_activity,
            added_at: record.added_at,
        }
    }
}

#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    status: String,
    question: String,
    options: Vec<String>,
    correct_option: i16,
    reporter_id: i64,
    reporter_username: Option<String>,
    reporter_name: String,
    chat_id: i64,
    message_id: i32,
    group_name: Option<String>,
    reported_at: DateTime<Utc>,
    action_taken: Option<String>,
    action_time: Option<DateTime<Utc>>,
    deleted_quizzes: i64,
    additional_deleted: i64,
    total_deleted: i64,
}

impl TryFrom<ReportRecord> for Report {
    type Error = Error;

    fn try_from(record: ReportRecord) -> Result<Self> {
        let status = record.status.parse::<ReportStatus>().map_err(decode_error)?;
        let action_taken = record
            .action_taken
            .map(|action| action.parse())
            .transpose()
            .map_err(decode_error)?;

        Ok(Report {
            id: record.id,
            status,
            snapshot: QuizSnapshot {
                question: record.question,
                options: record.options,
                correct_option: record.correct_option as u8,
            },
            reporter: Reporter {
                user_id: record.reporter_id as u64,
                username: record.reporter_username,
                first_name: record.reporter_name,
            },
            chat_id: record.chat_id,
            message_id: record.message_id,
            group_name: record.group_name,
            reported_at: record.reported_at,
            action_taken,
            action_time: record.action_time,
            deleted_quizzes: record.deleted_quizzes as u64,
            additional_deleted: record.additional_deleted as u64,
            total_deleted: record.total_deleted as u64,
        })
    }
}

fn decode_error(message: String) -> Error {
    Error::Database(sqlx::Error::Decode(message.into()))
}

const QUIZ_COLUMNS: &str = "id, question, options, correct_option, is_active, sent_count, manual_sent_count, last_sent, added_at";
const GROUP_COLUMNS: &str = "chat_id, title, is_active, quizzes_received, manual_quizzes_received, member_count, last_activity, added_at";
const REPORT_COLUMNS: &str = "id, status, question, options, correct_option, reporter_id, reporter_username, reporter_name, chat_id, message_id, group_name, reported_at, action_taken, action_time, deleted_quizzes, additional_deleted, total_deleted";

impl QuizStore for Connection {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        log::debug!("Adding quiz {}", quiz.id());
        sqlx::query(
            "INSERT INTO quizzes (id, question, options, correct_option, is_active, sent_count, manual_sent_count, last_sent, added_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(quiz.id())
        .bind(quiz.question())
        .bind(quiz.options().to_vec())
        .bind(quiz.correct_option() as i16)
        .bind(quiz.is_active())
        .bind(quiz.sent_count() as i64)
        .bind(quiz.manual_sent_count() as i64)
        .bind(quiz.last_sent())
        .bind(quiz.added_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retreive_quizzes(&self) -> Result<Vec<Quiz>> {
        let records = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes ORDER BY added_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Quiz::from).collect())
    }

    async fn retreive_active_quizzes(&self) -> Result<Vec<Quiz>> {
        let records = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE is_active ORDER BY added_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Quiz::from).collect())
    }

    async fn record_quiz_sent(&self, id: Uuid, kind: SendKind, at: DateTime<Utc>) -> Result<()> {
        let query = match kind {
            SendKind::Scheduled => {
                "UPDATE quizzes SET sent_count = sent_count + 1, last_sent = $2 WHERE id = $1"
            }
            SendKind::Manual => {
                "UPDATE quizzes SET manual_sent_count = manual_sent_count + 1, last_sent = $2 WHERE id = $1"
            }
        };
        sqlx::query(query).bind(id).bind(at).execute(&self.pool).await?;

        Ok(())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_quizzes(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM quizzes").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

impl GroupStore for Connection {
    async fn retreive_group(&self, chat_id: i64) -> Result<Option<Group>> {
        let record = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {GROUP_COLUMNS} FROM chat_groups WHERE chat_id = $1"
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::from))
    }

    async fn retreive_groups(&self) -> Result<Vec<Group>> {
        let records = sqlx::query_as::<_, GroupRecord>(&format!(
            "SELECT {GROUP_COLUMNS} FROM chat_groups ORDER BY added_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Group::from).collect())
    }

    async fn save_group(&self, group: &Group) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_groups (chat_id, title, is_active, quizzes_received, manual_quizzes_received, member_count, last_activity, added_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (chat_id) DO UPDATE SET \
                title = EXCLUDED.title, \
                is_active = EXCLUDED.is_active, \
                quizzes_received = EXCLUDED.quizzes_received, \
                manual_quizzes_received = EXCLUDED.manual_quizzes_received, \
                member_count = EXCLUDED.member_count, \
                last_activity = EXCLUDED.last_activity",
        )
        .bind(group.chat_id)
        .bind(&group.title)
        .bind(group.is_active)
        .bind(group.quizzes_received as i64)
        .bind(group.manual_quizzes_received as i64)
        .bind(group.member_count as i32)
        .bind(group.last_activity)
        .bind(group.added_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_group_active(&self, chat_id: i64, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE chat_groups SET is_active = $2 WHERE chat_id = $1")
            .bind(chat_id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_group_delivery(&self, chat_id: i64, kind: SendKind, at: DateTime<Utc>) -> Result<()> {
        let query = match kind {
            SendKind::Scheduled => {
                "UPDATE chat_groups SET quizzes_received = quizzes_received + 1, last_activity = $2 WHERE chat_id = $1"
            }
            SendKind::Manual => {
                "UPDATE chat_groups SET manual_quizzes_received = manual_quizzes_received + 1, last_activity = $2 WHERE chat_id = $1"
            }
        };
        sqlx::query(query).bind(chat_id).bind(at).execute(&self.pool).await?;

        Ok(())
    }

    async fn delete_inactive_groups(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chat_groups WHERE NOT is_active")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn activate_all_groups(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE chat_groups SET is_active = TRUE")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Connection {
    async fn load_document<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned + Send + Unpin + 'static,
    {
        let document: Option<(Json<T>,)> =
            sqlx::query_as("SELECT document FROM singletons WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(document.map(|(Json(document),)| document))
    }

    async fn save_document<T>(&self, key: &str, document: &T) -> Result<()>
    where
        T: serde::Serialize + Sync,
    {
        sqlx::query(
            "INSERT INTO singletons (key, document) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(key)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SingletonStore for Connection {
    async fn load_settings(&self) -> Result<Option<Settings>> {
        self.load_document(SETTINGS_KEY).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save_document(SETTINGS_KEY, settings).await
    }

    async fn load_stats(&self) -> Result<Option<Stats>> {
        self.load_document(STATS_KEY).await
    }

    async fn save_stats(&self, stats: &Stats) -> Result<()> {
        self.save_document(STATS_KEY, stats).await
    }
}

impl ReportStore for Connection {
    async fn insert_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            "INSERT INTO quiz_reports (id, status, question, options, correct_option, reporter_id, reporter_username, reporter_name, chat_id, message_id, group_name, reported_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(report.id)
        .bind(report.status.as_str())
        .bind(&report.snapshot.question)
        .bind(report.snapshot.options.clone())
        .bind(report.snapshot.correct_option as i16)
        .bind(report.reporter.user_id as i64)
        .bind(report.reporter.username.as_deref())
        .bind(&report.reporter.first_name)
        .bind(report.chat_id)
        .bind(report.message_id)
        .bind(report.group_name.as_deref())
        .bind(report.reported_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retreive_report(&self, id: Uuid) -> Result<Option<Report>> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {REPORT_COLUMNS} FROM quiz_reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Report::try_from).transpose()
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            "UPDATE quiz_reports SET status = $2, action_taken = $3, action_time = $4, \
             deleted_quizzes = $5, additional_deleted = $6, total_deleted = $7 WHERE id = $1",
        )
        .bind(report.id)
        .bind(report.status.as_str())
        .bind(report.action_taken.map(|action| action.as_str()))
        .bind(report.action_time)
        .bind(report.deleted_quizzes as i64)
        .bind(report.additional_deleted as i64)
        .bind(report.total_deleted as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn retreive_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        let records = match status {
            Some(status) => {
                sqlx::query_as::<_, ReportRecord>(&format!(
                    "SELECT {REPORT_COLUMNS} FROM quiz_reports WHERE status = $1 ORDER BY reported_at"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReportRecord>(&format!(
                    "SELECT {REPORT_COLUMNS} FROM quiz_reports ORDER BY reported_at"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        records.into_iter().map(Report::try_from).collect()
    }

    async fn delete_resolved_reports(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM quiz_reports WHERE status <> 'pending'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
