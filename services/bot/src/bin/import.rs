//! services/bot/src/bin/import.rs
//!
//! Loads scraped records from a JSON array into the store.
//!
//! Usage: `import <internship|job|course> <file.json>`
//!
//! Both the scraper's Indonesian keys (`sumber`, `perusahaan`, `posisi`, ...) and their
//! English equivalents are accepted. Records already present are skipped.

use bot_lib::{adapters::DbAdapter, config::DEFAULT_DATABASE_URL, error::BotError};
use career_assistant_core::domain::{Category, Course, Posting};
use career_assistant_core::ports::{CourseRepository, InternshipRepository, JobRepository};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Deserialize)]
struct PostingEntry {
    #[serde(alias = "sumber")]
    source: String,
    #[serde(alias = "perusahaan")]
    company: String,
    #[serde(alias = "posisi")]
    position: String,
    #[serde(default, alias = "lokasi")]
    location: Option<String>,
    #[serde(default, alias = "gaji")]
    salary: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    job_type: Option<String>,
    #[serde(default, alias = "tanggal_scrape")]
    scraped_at: Option<DateTime<Utc>>,
}

impl PostingEntry {
    fn into_domain(self, now: DateTime<Utc>) -> Posting {
        Posting {
            source: self.source,
            company: self.company,
            position: self.position,
            location: self.location,
            salary: self.salary,
            deadline: self.deadline,
            job_type: self.job_type,
            scraped_at: self.scraped_at.unwrap_or(now),
        }
    }
}

#[derive(Deserialize)]
struct CourseEntry {
    #[serde(alias = "sumber")]
    source: String,
    title: String,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default, alias = "module_total")]
    module_count: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default, alias = "tanggal_scrape")]
    scraped_at: Option<DateTime<Utc>>,
}

impl CourseEntry {
    fn into_domain(self, now: DateTime<Utc>) -> Course {
        Course {
            source: self.source,
            title: self.title,
            duration: self.duration,
            module_count: self.module_count,
            level: self.level,
            scraped_at: self.scraped_at.unwrap_or(now),
        }
    }
}

fn parse_postings(raw: &str, now: DateTime<Utc>) -> Result<Vec<Posting>, serde_json::Error> {
    let entries: Vec<PostingEntry> = serde_json::from_str(raw)?;
    Ok(entries.into_iter().map(|e| e.into_domain(now)).collect())
}

fn parse_courses(raw: &str, now: DateTime<Utc>) -> Result<Vec<Course>, serde_json::Error> {
    let entries: Vec<CourseEntry> = serde_json::from_str(raw)?;
    Ok(entries.into_iter().map(|e| e.into_domain(now)).collect())
}

#[tokio::main]
async fn main() -> Result<(), BotError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(category), Some(path)) = (args.next(), args.next()) else {
        return Err(BotError::Internal(
            "usage: import <internship|job|course> <file.json>".to_string(),
        ));
    };
    let category: Category = category.parse().map_err(BotError::Internal)?;

    let raw = tokio::fs::read_to_string(&path).await?;
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    let db = DbAdapter::new(db_pool);
    db.run_migrations().await?;

    let now = Utc::now();
    let (read, inserted) = match category {
        Category::Internship => {
            let postings = parse_postings(&raw, now)?;
            (postings.len(), InternshipRepository::save(&db, &postings).await?)
        }
        Category::Job => {
            let postings = parse_postings(&raw, now)?;
            (postings.len(), JobRepository::save(&db, &postings).await?)
        }
        Category::Course => {
            let courses = parse_courses(&raw, now)?;
            (courses.len(), CourseRepository::save(&db, &courses).await?)
        }
    };

    info!(
        category = category.label(),
        path = %path,
        read,
        inserted,
        skipped = read as u64 - inserted,
        "Import finished."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraper_keys_are_accepted() {
        let raw = r#"[{
            "sumber": "Glints",
            "perusahaan": "Bukalapak",
            "posisi": "Data Analyst Intern",
            "lokasi": "Jakarta",
            "gaji": null,
            "deadline": "30 Juni"
        }]"#;
        let now = Utc::now();

        let postings = parse_postings(raw, now).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].company, "Bukalapak");
        assert_eq!(postings[0].salary, None);
        assert_eq!(postings[0].scraped_at, now);
    }

    #[test]
    fn english_keys_and_course_modules_are_accepted() {
        let raw = r#"[{
            "source": "Dicoding",
            "title": "Belajar Dasar AI",
            "duration": "25 Jam",
            "module_total": "8",
            "scraped_at": "2025-01-02T03:04:05Z"
        }]"#;

        let courses = parse_courses(raw, Utc::now()).unwrap();
        assert_eq!(courses[0].module_count.as_deref(), Some("8"));
        assert_eq!(courses[0].scraped_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn entries_without_required_keys_are_rejected() {
        assert!(parse_postings(r#"[{"sumber": "Glints"}]"#, Utc::now()).is_err());
    }
}
