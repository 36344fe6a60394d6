use std::sync::Arc;

use async_trait::async_trait;
use records_core::{RecordsError, RecordsResult};
use records_domain::{
    entities::{Course, NewCourse},
    repositories::CourseRepository,
};
use sqlx::{sqlite::SqliteConnection, Row};
use tracing::debug;

use crate::database::connection_manager::ConnectionManager;

pub struct SqliteCourseRepository {
    connections: Arc<ConnectionManager>,
}

impl SqliteCourseRepository {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    fn row_to_course(row: &sqlx::sqlite::SqliteRow) -> RecordsResult<Course> {
        Ok(Course {
            id: row.try_get("course_id")?,
            course_code: row.try_get("course_code")?,
            course_name: row.try_get("course_name")?,
            credits: row.try_get("credits")?,
            instructor: row.try_get("instructor")?,
        })
    }

    async fn insert(conn: &mut SqliteConnection, course: NewCourse) -> RecordsResult<i64> {
        let result = sqlx::query(
            "INSERT INTO courses (course_code, course_name, credits, instructor) VALUES (?, ?, ?, ?)",
        )
        .bind(&course.course_code)
        .bind(&course.course_name)
        .bind(course.credits)
        .bind(&course.instructor)
        .execute(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        Ok(result.last_insert_rowid())
    }

    async fn select_by_id(conn: &mut SqliteConnection, id: i64) -> RecordsResult<Course> {
        let row = sqlx::query(
            "SELECT course_id, course_code, course_name, credits, instructor FROM courses WHERE course_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        match row {
            Some(row) => Self::row_to_course(&row),
            None => Err(RecordsError::not_found("课程", id)),
        }
    }

    async fn select_all(conn: &mut SqliteConnection) -> RecordsResult<Vec<Course>> {
        let rows = sqlx::query(
            "SELECT course_id, course_code, course_name, credits, instructor FROM courses ORDER BY course_id",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        rows.iter().map(Self::row_to_course).collect()
    }

    async fn update_row(conn: &mut SqliteConnection, course: Course) -> RecordsResult<bool> {
        let result = sqlx::query(
            "UPDATE courses SET course_code = ?, course_name = ?, credits = ?, instructor = ? WHERE course_id = ?",
        )
        .bind(&course.course_code)
        .bind(&course.course_name)
        .bind(course.credits)
        .bind(&course.instructor)
        .bind(course.id)
        .execute(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(conn: &mut SqliteConnection, id: i64) -> RecordsResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE course_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CourseRepository for SqliteCourseRepository {
    async fn create(&self, course: &NewCourse) -> RecordsResult<i64> {
        let course = course.clone();
        let id = self
            .connections
            .transaction("创建课程", move |conn| Box::pin(Self::insert(conn, course)))
            .await?;

        debug!("创建课程成功: {}", id);
        Ok(id)
    }

    async fn read(&self, id: i64) -> RecordsResult<Course> {
        self.connections
            .transaction("查询课程", move |conn| Box::pin(Self::select_by_id(conn, id)))
            .await
    }

    async fn read_all(&self) -> RecordsResult<Vec<Course>> {
        self.connections
            .transaction("查询全部课程", |conn| Box::pin(Self::select_all(conn)))
            .await
    }

    async fn update(&self, course: &Course) -> RecordsResult<bool> {
        let course = course.clone();
        self.connections
            .transaction("更新课程", move |conn| Box::pin(Self::update_row(conn, course)))
            .await
    }

    async fn delete(&self, id: i64) -> RecordsResult<bool> {
        let deleted = self
            .connections
            .transaction("删除课程", move |conn| Box::pin(Self::delete_row(conn, id)))
            .await?;

        debug!("删除课程 {}: {}", id, deleted);
        Ok(deleted)
    }
}
