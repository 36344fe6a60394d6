use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use records_core::{RecordsError, RecordsResult};
use records_domain::entities::Student;
use records_domain::repositories::StudentRepository;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::task::{BatchTask, ChunkHandler};

/// 整理学生姓名并模拟一段耗时处理
pub struct StudentNameHandler {
    delay: Duration,
}

impl StudentNameHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn sorted_names(students: &[Student]) -> Vec<&str> {
        let mut names: Vec<&str> = students
            .iter()
            .map(|student| student.name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl ChunkHandler<Student> for StudentNameHandler {
    fn name(&self) -> &str {
        "student-names"
    }

    async fn handle(&self, task: &BatchTask<Student>, cancel: &CancellationToken) -> RecordsResult<usize> {
        let names = Self::sorted_names(task.records());
        debug!("任务 '{}' 学生姓名: {:?}", task.label(), names);

        tokio::select! {
            _ = cancel.cancelled() => return Err(RecordsError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        Ok(names.len())
    }
}

/// 去掉姓名首尾空白并把邮箱转为小写，有变化的学生写回数据库
pub struct ContactNormalizationHandler {
    students: Arc<dyn StudentRepository>,
}

impl ContactNormalizationHandler {
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    pub fn normalize(student: &Student) -> Student {
        Student {
            name: student.name.trim().to_string(),
            email: student.email.trim().to_lowercase(),
            ..student.clone()
        }
    }
}

#[async_trait]
impl ChunkHandler<Student> for ContactNormalizationHandler {
    fn name(&self) -> &str {
        "contact-normalization"
    }

    async fn handle(&self, task: &BatchTask<Student>, cancel: &CancellationToken) -> RecordsResult<usize> {
        let mut updated = 0;

        for student in task.records() {
            if cancel.is_cancelled() {
                return Err(RecordsError::Cancelled);
            }

            let normalized = Self::normalize(student);
            if normalized != *student && self.students.update(&normalized).await? {
                updated += 1;
            }
        }

        info!(
            "任务 '{}' 规范化了 {} / {} 个学生的联系信息",
            task.label(),
            updated,
            task.len()
        );
        Ok(task.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn student(name: &str, email: &str) -> Student {
        Student {
            id: 1,
            name: name.to_string(),
            email: email.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            department: "CS".to_string(),
        }
    }

    #[test]
    fn test_sorted_names_skip_empty() {
        let students = vec![student("Zoe", "z@x"), student("", "e@x"), student("Adam", "a@x")];
        assert_eq!(StudentNameHandler::sorted_names(&students), vec!["Adam", "Zoe"]);
    }

    #[test]
    fn test_normalize() {
        let normalized = ContactNormalizationHandler::normalize(&student("  Ann ", " Ann@Example.COM"));
        assert_eq!(normalized.name, "Ann");
        assert_eq!(normalized.email, "ann@example.com");
        assert_eq!(normalized.id, 1);
    }

    #[tokio::test]
    async fn test_name_handler_stops_waiting_on_cancel() {
        let handler = StudentNameHandler::new(Duration::from_secs(30));
        let task = BatchTask::new(1, 0, Arc::from(vec![student("Ann", "a@x")]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = handler.handle(&task, &cancel).await;
        assert!(matches!(result, Err(RecordsError::Cancelled)));
    }
}
