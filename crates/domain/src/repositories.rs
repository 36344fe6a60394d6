//! 领域仓储抽象
//!
//! 每个方法对应共享连接上的一次完整事务：成功提交，失败回滚。

use async_trait::async_trait;
use records_core::RecordsResult;

use crate::entities::{Course, Grade, NewCourse, NewGrade, NewStudent, Student};

/// 学生仓储抽象
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// 返回新学生的ID
    async fn create(&self, student: &NewStudent) -> RecordsResult<i64>;
    /// 不存在时返回 `NotFound`
    async fn read(&self, id: i64) -> RecordsResult<Student>;
    async fn read_all(&self) -> RecordsResult<Vec<Student>>;
    async fn update(&self, student: &Student) -> RecordsResult<bool>;
    async fn delete(&self, id: i64) -> RecordsResult<bool>;
    async fn search_by_name(&self, fragment: &str) -> RecordsResult<Vec<Student>>;
}

/// 课程仓储抽象
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: &NewCourse) -> RecordsResult<i64>;
    async fn read(&self, id: i64) -> RecordsResult<Course>;
    async fn read_all(&self) -> RecordsResult<Vec<Course>>;
    async fn update(&self, course: &Course) -> RecordsResult<bool>;
    async fn delete(&self, id: i64) -> RecordsResult<bool>;
}

/// 成绩仓储抽象
#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn create(&self, grade: &NewGrade) -> RecordsResult<i64>;
    /// 不存在时返回 `NotFound`
    async fn read(&self, id: i64) -> RecordsResult<Grade>;
    async fn by_student(&self, student_id: i64) -> RecordsResult<Vec<Grade>>;
    async fn by_course(&self, course_id: i64) -> RecordsResult<Vec<Grade>>;
    /// 更新分数和等级
    async fn update(&self, grade: &Grade) -> RecordsResult<bool>;
    async fn delete(&self, id: i64) -> RecordsResult<bool>;
}
