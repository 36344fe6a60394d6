use std::sync::Arc;

use async_trait::async_trait;
use records_core::{RecordsError, RecordsResult};
use records_domain::{
    entities::{NewStudent, Student},
    repositories::StudentRepository,
};
use sqlx::{sqlite::SqliteConnection, Row};
use tracing::debug;

use crate::database::connection_manager::ConnectionManager;

pub struct SqliteStudentRepository {
    connections: Arc<ConnectionManager>,
}

impl SqliteStudentRepository {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> RecordsResult<Student> {
        Ok(Student {
            id: row.try_get("student_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            date_of_birth: row.try_get("date_of_birth")?,
            department: row.try_get("department")?,
        })
    }

    async fn insert(conn: &mut SqliteConnection, student: NewStudent) -> RecordsResult<i64> {
        let result = sqlx::query(
            "INSERT INTO students (name, email, date_of_birth, department) VALUES (?, ?, ?, ?)",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.date_of_birth)
        .bind(&student.department)
        .execute(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        Ok(result.last_insert_rowid())
    }

    async fn select_by_id(conn: &mut SqliteConnection, id: i64) -> RecordsResult<Student> {
        let row = sqlx::query(
            "SELECT student_id, name, email, date_of_birth, department FROM students WHERE student_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        match row {
            Some(row) => Self::row_to_student(&row),
            None => Err(RecordsError::not_found("学生", id)),
        }
    }

    async fn select_all(conn: &mut SqliteConnection) -> RecordsResult<Vec<Student>> {
        let rows = sqlx::query(
            "SELECT student_id, name, email, date_of_birth, department FROM students ORDER BY student_id",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        rows.iter().map(Self::row_to_student).collect()
    }

    async fn select_by_name(conn: &mut SqliteConnection, pattern: String) -> RecordsResult<Vec<Student>> {
        let rows = sqlx::query(
            "SELECT student_id, name, email, date_of_birth, department FROM students WHERE name LIKE ? ORDER BY student_id",
        )
        .bind(&pattern)
        .fetch_all(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        rows.iter().map(Self::row_to_student).collect()
    }

    async fn update_row(conn: &mut SqliteConnection, student: Student) -> RecordsResult<bool> {
        let result = sqlx::query(
            "UPDATE students SET name = ?, email = ?, date_of_birth = ?, department = ? WHERE student_id = ?",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.date_of_birth)
        .bind(&student.department)
        .bind(student.id)
        .execute(&mut *conn)
        .await
        .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(conn: &mut SqliteConnection, id: i64) -> RecordsResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE student_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(RecordsError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentRepository {
    async fn create(&self, student: &NewStudent) -> RecordsResult<i64> {
        let student = student.clone();
        let id = self
            .connections
            .transaction("创建学生", move |conn| Box::pin(Self::insert(conn, student)))
            .await?;

        debug!("创建学生成功: {}", id);
        Ok(id)
    }

    async fn read(&self, id: i64) -> RecordsResult<Student> {
        self.connections
            .transaction("查询学生", move |conn| Box::pin(Self::select_by_id(conn, id)))
            .await
    }

    async fn read_all(&self) -> RecordsResult<Vec<Student>> {
        self.connections
            .transaction("查询全部学生", |conn| Box::pin(Self::select_all(conn)))
            .await
    }

    async fn update(&self, student: &Student) -> RecordsResult<bool> {
        let id = student.id;
        let student = student.clone();
        let updated = self
            .connections
            .transaction("更新学生", move |conn| Box::pin(Self::update_row(conn, student)))
            .await?;

        debug!("更新学生 {}: {}", id, updated);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> RecordsResult<bool> {
        let deleted = self
            .connections
            .transaction("删除学生", move |conn| Box::pin(Self::delete_row(conn, id)))
            .await?;

        debug!("删除学生 {}: {}", id, deleted);
        Ok(deleted)
    }

    async fn search_by_name(&self, fragment: &str) -> RecordsResult<Vec<Student>> {
        let pattern = format!("%{fragment}%");
        self.connections
            .transaction("按姓名搜索学生", move |conn| {
                Box::pin(Self::select_by_name(conn, pattern))
            })
            .await
    }
}
