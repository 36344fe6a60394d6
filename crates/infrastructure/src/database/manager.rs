use std::sync::Arc;

use records_core::{DatabaseConfig, RecordsResult};
use records_domain::repositories::{CourseRepository, GradeRepository, StudentRepository};
use tracing::info;

use super::connection_manager::{ConnectionManager, ConnectionState};
use super::schema;
use super::sqlite::{SqliteCourseRepository, SqliteGradeRepository, SqliteStudentRepository};

/// 持有唯一的 [`ConnectionManager`]，所有仓储共享它
pub struct DatabaseManager {
    connections: Arc<ConnectionManager>,
}

impl DatabaseManager {
    pub fn new(config: &DatabaseConfig) -> RecordsResult<Self> {
        let connections = Arc::new(ConnectionManager::new(config)?);
        info!("数据库管理器已创建: {}", config.url);
        Ok(Self { connections })
    }

    pub fn from_url(url: &str) -> RecordsResult<Self> {
        Ok(Self {
            connections: Arc::new(ConnectionManager::from_url(url)?),
        })
    }

    pub async fn initialize_schema(&self) -> RecordsResult<()> {
        schema::initialize_schema(&self.connections).await
    }

    pub fn connections(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.connections)
    }

    pub async fn state(&self) -> ConnectionState {
        self.connections.state().await
    }

    pub fn student_repository(&self) -> Arc<dyn StudentRepository> {
        Arc::new(SqliteStudentRepository::new(self.connections()))
    }

    pub fn course_repository(&self) -> Arc<dyn CourseRepository> {
        Arc::new(SqliteCourseRepository::new(self.connections()))
    }

    pub fn grade_repository(&self) -> Arc<dyn GradeRepository> {
        Arc::new(SqliteGradeRepository::new(self.connections()))
    }

    pub async fn close(&self) {
        self.connections.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repositories_share_one_connection() {
        let manager = DatabaseManager::from_url("sqlite::memory:").unwrap();
        manager.initialize_schema().await.unwrap();
        // 重复初始化不报错
        manager.initialize_schema().await.unwrap();

        let students = manager.student_repository();
        let courses = manager.course_repository();
        assert!(students.read_all().await.unwrap().is_empty());
        assert!(courses.read_all().await.unwrap().is_empty());

        assert_eq!(manager.connections().stats().await.connections_opened, 1);
        assert_eq!(manager.state().await, ConnectionState::Open);

        manager.close().await;
        assert_eq!(manager.state().await, ConnectionState::Closed);
    }
}
