use std::sync::Arc;

use async_trait::async_trait;
use records_core::{RecordsError, RecordsResult};
use records_domain::{
    entities::{Grade, NewGrade},
    repositories::GradeRepository,
};
use sqlx::{sqlite::SqliteConnection, Row};
use tracing::debug;

use crate::database::connection_manager::ConnectionManager;

pub struct SqliteGradeRepository {
    connections: Arc<ConnectionManager>,
}

#[derive(Clone, Copy)]
enum GradeOwner {
    Student(i64),
    Course(i64),
}

impl SqliteGradeRepository {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    fn row_to_grade(row: &sqlx::sqlite::SqliteRow) -> RecordsResult<Grade> {
        Ok(Grade {
            id: row.try_get("grade_id")?,
            student_id: row.try_get("student_id")?,
            course_id: row.try_get("course_id")?,
            marks: row.try_get("marks")?,
            grade: row.try_get("grade")?,
        })
    }

    async fn insert(conn: &mut SqliteConnection, grade: NewGrade) -> RecordsResult<i64> {
        let result = sqlx::query(
            "INSERT INTO grades (student_id, course_id, marks, grade) VALUES (?, ?, ?, ?)",
        )
        .bind(grade.student_id)
        .bind(grade.course_id)
        .bind(grade.marks)
        .bind(grade.letter())
        .execute(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        Ok(result.last_insert_rowid())
    }

    async fn select_by_id(conn: &mut SqliteConnection, id: i64) -> RecordsResult<Grade> {
        let row = sqlx::query(
            "SELECT grade_id, student_id, course_id, marks, grade FROM grades WHERE grade_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        match row {
            Some(row) => Self::row_to_grade(&row),
            None => Err(RecordsError::not_found("成绩", id)),
        }
    }

    async fn select_by_owner(
        conn: &mut SqliteConnection,
        owner: GradeOwner,
    ) -> RecordsResult<Vec<Grade>> {
        let (sql, id) = match owner {
            GradeOwner::Student(id) => (
                "SELECT grade_id, student_id, course_id, marks, grade FROM grades WHERE student_id = ? ORDER BY grade_id",
                id,
            ),
            GradeOwner::Course(id) => (
                "SELECT grade_id, student_id, course_id, marks, grade FROM grades WHERE course_id = ? ORDER BY grade_id",
                id,
            ),
        };

        let rows = sqlx::query(sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map_err(RecordsError::Database)?;

        rows.iter().map(Self::row_to_grade).collect()
    }

    async fn update_row(conn: &mut SqliteConnection, grade: Grade) -> RecordsResult<bool> {
        let result = sqlx::query("UPDATE grades SET marks = ?, grade = ? WHERE grade_id = ?")
            .bind(grade.marks)
            .bind(grade.grade)
            .bind(grade.id)
            .execute(&mut *conn)
            .await
            .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(conn: &mut SqliteConnection, id: i64) -> RecordsResult<bool> {
        let result = sqlx::query("DELETE FROM grades WHERE grade_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GradeRepository for SqliteGradeRepository {
    async fn create(&self, grade: &NewGrade) -> RecordsResult<i64> {
        let grade = grade.clone();
        let id = self
            .connections
            .transaction("创建成绩", move |conn| Box::pin(Self::insert(conn, grade)))
            .await?;

        debug!("创建成绩成功: {}", id);
        Ok(id)
    }

    async fn read(&self, id: i64) -> RecordsResult<Grade> {
        self.connections
            .transaction("查询成绩", move |conn| Box::pin(Self::select_by_id(conn, id)))
            .await
    }

    async fn by_student(&self, student_id: i64) -> RecordsResult<Vec<Grade>> {
        self.connections
            .transaction("查询学生成绩", move |conn| {
                Box::pin(Self::select_by_owner(conn, GradeOwner::Student(student_id)))
            })
            .await
    }

    async fn by_course(&self, course_id: i64) -> RecordsResult<Vec<Grade>> {
        self.connections
            .transaction("查询课程成绩", move |conn| {
                Box::pin(Self::select_by_owner(conn, GradeOwner::Course(course_id)))
            })
            .await
    }

    async fn update(&self, grade: &Grade) -> RecordsResult<bool> {
        let grade = grade.clone();
        self.connections
            .transaction("更新成绩", move |conn| Box::pin(Self::update_row(conn, grade)))
            .await
    }

    async fn delete(&self, id: i64) -> RecordsResult<bool> {
        let deleted = self
            .connections
            .transaction("删除成绩", move |conn| Box::pin(Self::delete_row(conn, id)))
            .await?;

        debug!("删除成绩 {}: {}", id, deleted);
        Ok(deleted)
    }
}
