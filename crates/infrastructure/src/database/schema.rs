use records_core::RecordsResult;
use sqlx::sqlite::SqliteConnection;
use tracing::info;

use super::connection_manager::ConnectionManager;

const CREATE_STUDENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS students (
        student_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        date_of_birth DATE NOT NULL,
        department TEXT NOT NULL
    )
"#;

const CREATE_COURSES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        course_id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_code TEXT UNIQUE NOT NULL,
        course_name TEXT NOT NULL,
        credits INTEGER NOT NULL,
        instructor TEXT NOT NULL
    )
"#;

const CREATE_GRADES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS grades (
        grade_id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL,
        course_id INTEGER NOT NULL,
        marks REAL NOT NULL,
        grade TEXT NOT NULL,
        FOREIGN KEY (student_id) REFERENCES students(student_id) ON DELETE CASCADE,
        FOREIGN KEY (course_id) REFERENCES courses(course_id) ON DELETE CASCADE,
        UNIQUE(student_id, course_id)
    )
"#;

const TABLES: [(&str, &str); 3] = [
    ("students", CREATE_STUDENTS_TABLE),
    ("courses", CREATE_COURSES_TABLE),
    ("grades", CREATE_GRADES_TABLE),
];

/// 建表，可重复执行；三张表在同一个事务中创建
pub async fn initialize_schema(connections: &ConnectionManager) -> RecordsResult<()> {
    connections
        .transaction("初始化数据库表结构", |conn| Box::pin(create_tables(conn)))
        .await?;

    info!("数据库初始化完成");
    Ok(())
}

async fn create_tables(conn: &mut SqliteConnection) -> RecordsResult<()> {
    for (table, statement) in TABLES {
        sqlx::query(statement).execute(&mut *conn).await?;
        info!("数据表已创建/校验: {}", table);
    }
    Ok(())
}
