//! services/bot/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the three repository ports from the `core` crate. It handles all interactions
//! with the SQLite store populated by the scraper, using `sqlx`.

use async_trait::async_trait;
use career_assistant_core::domain::{Course, Posting};
use career_assistant_core::ports::{
    CourseRepository, InternshipRepository, JobRepository, PortError, PortResult,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every repository port over one pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

/// The two posting tables share one schema.
#[derive(Debug, Clone, Copy)]
enum PostingTable {
    Internships,
    Jobs,
}

impl PostingTable {
    fn name(self) -> &'static str {
        match self {
            PostingTable::Internships => "internships",
            PostingTable::Jobs => "jobs",
        }
    }
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the tables if they do not exist yet.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        for table in [PostingTable::Internships, PostingTable::Jobs] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source TEXT NOT NULL,
                    company TEXT NOT NULL,
                    position TEXT NOT NULL,
                    location TEXT,
                    salary TEXT,
                    deadline TEXT,
                    job_type TEXT,
                    scraped_at TEXT NOT NULL,
                    UNIQUE(company, position)
                );
                "#,
                table.name()
            ))
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                title TEXT NOT NULL,
                duration TEXT NOT NULL DEFAULT '',
                module_count TEXT,
                level TEXT,
                scraped_at TEXT NOT NULL,
                UNIQUE(title, duration)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_postings(
        &self,
        table: PostingTable,
        keyword: &str,
        location: &str,
        limit: usize,
    ) -> PortResult<Vec<Posting>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT source, company, position, location, salary, deadline, job_type, scraped_at FROM {}",
            table.name()
        ));

        let keyword = keyword.trim();
        let location = location.trim();
        let mut joiner = " WHERE ";
        if !keyword.is_empty() {
            let pattern = like_pattern(keyword);
            query.push(joiner).push("(position LIKE ");
            query.push_bind(pattern.clone()).push(" ESCAPE '\\' OR company LIKE ");
            query.push_bind(pattern.clone()).push(" ESCAPE '\\' OR salary LIKE ");
            query.push_bind(pattern).push(" ESCAPE '\\')");
            joiner = " AND ";
        }
        if !location.is_empty() {
            query.push(joiner).push("location LIKE ");
            query.push_bind(like_pattern(location)).push(" ESCAPE '\\'");
        }
        query.push(" ORDER BY scraped_at DESC, id DESC LIMIT ");
        query.push_bind(limit as i64);

        let records = query
            .build_query_as::<PostingRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(
            table = table.name(),
            keyword,
            location,
            hits = records.len(),
            "Posting search finished."
        );
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save_postings(&self, table: PostingTable, postings: &[Posting]) -> PortResult<u64> {
        if postings.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT OR IGNORE INTO {} (source, company, position, location, salary, deadline, job_type, scraped_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            table.name()
        );
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut inserted = 0;
        for posting in postings {
            let result = sqlx::query(&sql)
                .bind(&posting.source)
                .bind(&posting.company)
                .bind(&posting.position)
                .bind(&posting.location)
                .bind(&posting.salary)
                .bind(&posting.deadline)
                .bind(&posting.job_type)
                .bind(posting.scraped_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(inserted)
    }
}

/// Builds a case-insensitive substring pattern with LIKE wildcards escaped.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PostingRecord {
    source: String,
    company: String,
    position: String,
    location: Option<String>,
    salary: Option<String>,
    deadline: Option<String>,
    job_type: Option<String>,
    scraped_at: DateTime<Utc>,
}
impl PostingRecord {
    fn to_domain(self) -> Posting {
        Posting {
            source: self.source,
            company: self.company,
            position: self.position,
            location: self.location,
            salary: self.salary,
            deadline: self.deadline,
            job_type: self.job_type,
            scraped_at: self.scraped_at,
        }
    }
}

#[derive(FromRow)]
struct CourseRecord {
    source: String,
    title: String,
    // Stored as '' when unknown so that the uniqueness key never contains NULL.
    duration: String,
    module_count: Option<String>,
    level: Option<String>,
    scraped_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            source: self.source,
            title: self.title,
            duration: Some(self.duration).filter(|d| !d.is_empty()),
            module_count: self.module_count,
            level: self.level,
            scraped_at: self.scraped_at,
        }
    }
}

//=========================================================================================
// Repository Trait Implementations
//=========================================================================================

#[async_trait]
impl InternshipRepository for DbAdapter {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>> {
        self.search_postings(PostingTable::Internships, keyword, location, limit)
            .await
    }

    async fn save(&self, postings: &[Posting]) -> PortResult<u64> {
        self.save_postings(PostingTable::Internships, postings).await
    }
}

#[async_trait]
impl JobRepository for DbAdapter {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>> {
        self.search_postings(PostingTable::Jobs, keyword, location, limit)
            .await
    }

    async fn save(&self, postings: &[Posting]) -> PortResult<u64> {
        self.save_postings(PostingTable::Jobs, postings).await
    }
}

#[async_trait]
impl CourseRepository for DbAdapter {
    async fn search(&self, keyword: &str, limit: usize) -> PortResult<Vec<Course>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT source, title, duration, module_count, level, scraped_at FROM courses",
        );

        let keyword = keyword.trim();
        if !keyword.is_empty() {
            let pattern = like_pattern(keyword);
            query.push(" WHERE (title LIKE ");
            query.push_bind(pattern.clone()).push(" ESCAPE '\\' OR source LIKE ");
            query.push_bind(pattern.clone()).push(" ESCAPE '\\' OR duration LIKE ");
            query.push_bind(pattern).push(" ESCAPE '\\')");
        }
        query.push(" ORDER BY scraped_at DESC, id DESC LIMIT ");
        query.push_bind(limit as i64);

        let records = query
            .build_query_as::<CourseRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(keyword, hits = records.len(), "Course search finished.");
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save(&self, courses: &[Course]) -> PortResult<u64> {
        if courses.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut inserted = 0;
        for course in courses {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO courses (source, title, duration, module_count, level, scraped_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&course.source)
            .bind(&course.title)
            .bind(course.duration.as_deref().unwrap_or(""))
            .bind(&course.module_count)
            .bind(&course.level)
            .bind(course.scraped_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(inserted)
    }
}
