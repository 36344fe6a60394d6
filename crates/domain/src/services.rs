//! # 领域服务
//!
//! 输入校验在写入仓储之前完成；校验失败返回 `Validation`，不会触碰数据库。

use std::sync::Arc;

use chrono::NaiveDate;
use records_core::{RecordsError, RecordsResult};
use tracing::{info, warn};

use crate::entities::{Course, Grade, GradeLetter, NewCourse, NewGrade, NewStudent, Student};
use crate::repositories::{CourseRepository, GradeRepository, StudentRepository};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn require_non_empty(value: &str, message: &str) -> RecordsResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordsError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_email(email: &str) -> RecordsResult<String> {
    if !email.contains('@') {
        return Err(RecordsError::Validation(format!("邮箱格式无效: {email}")));
    }
    Ok(email.trim().to_string())
}

pub fn parse_date(value: &str) -> RecordsResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| RecordsError::Validation(format!("日期格式无效 (需要 YYYY-MM-DD): {value}: {e}")))
}

fn validate_marks(marks: f64) -> RecordsResult<()> {
    if !(0.0..=100.0).contains(&marks) {
        return Err(RecordsError::Validation(format!(
            "分数必须在0到100之间: {marks}"
        )));
    }
    Ok(())
}

pub struct StudentService {
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    pub async fn add_student(
        &self,
        name: &str,
        email: &str,
        date_of_birth: &str,
        department: &str,
    ) -> RecordsResult<Student> {
        let new_student = NewStudent {
            name: require_non_empty(name, "学生姓名不能为空")?,
            email: validate_email(email)?,
            date_of_birth: parse_date(date_of_birth)?,
            department: department.trim().to_string(),
        };

        let id = self.students.create(&new_student).await?;
        info!("添加学生成功: {} (ID: {})", new_student.name, id);

        Ok(Student {
            id,
            name: new_student.name,
            email: new_student.email,
            date_of_birth: new_student.date_of_birth,
            department: new_student.department,
        })
    }

    pub async fn get_student(&self, id: i64) -> RecordsResult<Student> {
        self.students.read(id).await.inspect_err(|e| {
            if e.is_not_found() {
                warn!("学生不存在: {}", id);
            }
        })
    }

    pub async fn list_students(&self) -> RecordsResult<Vec<Student>> {
        self.students.read_all().await
    }

    pub async fn update_student(&self, student: Student) -> RecordsResult<bool> {
        let student = Student {
            id: student.id,
            name: require_non_empty(&student.name, "学生姓名不能为空")?,
            email: validate_email(&student.email)?,
            date_of_birth: student.date_of_birth,
            department: student.department.trim().to_string(),
        };

        let updated = self.students.update(&student).await?;
        if updated {
            info!("更新学生成功: {}", student.id);
        } else {
            warn!("更新学生时未找到记录: {}", student.id);
        }
        Ok(updated)
    }

    pub async fn delete_student(&self, id: i64) -> RecordsResult<bool> {
        let deleted = self.students.delete(id).await?;
        if deleted {
            info!("删除学生成功: {}", id);
        } else {
            warn!("删除学生时未找到记录: {}", id);
        }
        Ok(deleted)
    }

    pub async fn search_students(&self, fragment: &str) -> RecordsResult<Vec<Student>> {
        self.students.search_by_name(fragment.trim()).await
    }
}

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    pub async fn add_course(
        &self,
        course_code: &str,
        course_name: &str,
        credits: i32,
        instructor: &str,
    ) -> RecordsResult<Course> {
        let new_course = NewCourse {
            course_code: require_non_empty(course_code, "课程代码不能为空")?,
            course_name: require_non_empty(course_name, "课程名称不能为空")?,
            credits,
            instructor: instructor.trim().to_string(),
        };

        let id = self.courses.create(&new_course).await?;
        info!("添加课程成功: {} (ID: {})", new_course.course_code, id);

        Ok(Course {
            id,
            course_code: new_course.course_code,
            course_name: new_course.course_name,
            credits: new_course.credits,
            instructor: new_course.instructor,
        })
    }

    pub async fn get_course(&self, id: i64) -> RecordsResult<Course> {
        self.courses.read(id).await
    }

    pub async fn list_courses(&self) -> RecordsResult<Vec<Course>> {
        self.courses.read_all().await
    }

    pub async fn update_course(&self, course: Course) -> RecordsResult<bool> {
        let course = Course {
            id: course.id,
            course_code: require_non_empty(&course.course_code, "课程代码不能为空")?,
            course_name: require_non_empty(&course.course_name, "课程名称不能为空")?,
            credits: course.credits,
            instructor: course.instructor.trim().to_string(),
        };

        let updated = self.courses.update(&course).await?;
        if updated {
            info!("更新课程成功: {}", course.id);
        } else {
            warn!("更新课程时未找到记录: {}", course.id);
        }
        Ok(updated)
    }

    pub async fn delete_course(&self, id: i64) -> RecordsResult<bool> {
        let deleted = self.courses.delete(id).await?;
        if deleted {
            info!("删除课程成功: {}", id);
        }
        Ok(deleted)
    }
}

pub struct GradeService {
    grades: Arc<dyn GradeRepository>,
}

impl GradeService {
    pub fn new(grades: Arc<dyn GradeRepository>) -> Self {
        Self { grades }
    }

    pub async fn add_grade(
        &self,
        student_id: i64,
        course_id: i64,
        marks: f64,
    ) -> RecordsResult<Grade> {
        validate_marks(marks)?;

        let new_grade = NewGrade {
            student_id,
            course_id,
            marks,
        };
        let id = self.grades.create(&new_grade).await?;
        let grade = new_grade.letter();
        info!(
            "添加成绩成功: 学生 {} 课程 {} -> {} ({})",
            student_id, course_id, marks, grade
        );

        Ok(Grade {
            id,
            student_id,
            course_id,
            marks,
            grade,
        })
    }

    pub async fn get_grade(&self, id: i64) -> RecordsResult<Grade> {
        self.grades.read(id).await
    }

    pub async fn update_grade(&self, grade: Grade) -> RecordsResult<bool> {
        validate_marks(grade.marks)?;
        let grade = Grade {
            grade: GradeLetter::from_marks(grade.marks),
            ..grade
        };
        self.grades.update(&grade).await
    }

    pub async fn student_grades(&self, student_id: i64) -> RecordsResult<Vec<Grade>> {
        self.grades.by_student(student_id).await
    }

    pub async fn course_grades(&self, course_id: i64) -> RecordsResult<Vec<Grade>> {
        self.grades.by_course(course_id).await
    }

    pub async fn delete_grade(&self, id: i64) -> RecordsResult<bool> {
        self.grades.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockStudentRepository {
        students: Mutex<Vec<Student>>,
    }

    #[async_trait]
    impl StudentRepository for MockStudentRepository {
        async fn create(&self, student: &NewStudent) -> RecordsResult<i64> {
            let mut students = self.students.lock().await;
            let id = students.len() as i64 + 1;
            students.push(Student {
                id,
                name: student.name.clone(),
                email: student.email.clone(),
                date_of_birth: student.date_of_birth,
                department: student.department.clone(),
            });
            Ok(id)
        }

        async fn read(&self, id: i64) -> RecordsResult<Student> {
            self.students
                .lock()
                .await
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| RecordsError::not_found("学生", id))
        }

        async fn read_all(&self) -> RecordsResult<Vec<Student>> {
            Ok(self.students.lock().await.clone())
        }

        async fn update(&self, student: &Student) -> RecordsResult<bool> {
            let mut students = self.students.lock().await;
            match students.iter_mut().find(|s| s.id == student.id) {
                Some(existing) => {
                    *existing = student.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, id: i64) -> RecordsResult<bool> {
            let mut students = self.students.lock().await;
            let before = students.len();
            students.retain(|s| s.id != id);
            Ok(students.len() < before)
        }

        async fn search_by_name(&self, fragment: &str) -> RecordsResult<Vec<Student>> {
            Ok(self
                .students
                .lock()
                .await
                .iter()
                .filter(|s| s.name.contains(fragment))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MockGradeRepository {
        grades: Mutex<Vec<Grade>>,
    }

    #[async_trait]
    impl GradeRepository for MockGradeRepository {
        async fn create(&self, grade: &NewGrade) -> RecordsResult<i64> {
            let mut grades = self.grades.lock().await;
            let id = grades.len() as i64 + 1;
            grades.push(Grade {
                id,
                student_id: grade.student_id,
                course_id: grade.course_id,
                marks: grade.marks,
                grade: grade.letter(),
            });
            Ok(id)
        }

        async fn read(&self, id: i64) -> RecordsResult<Grade> {
            self.grades
                .lock()
                .await
                .iter()
                .find(|g| g.id == id)
                .cloned()
                .ok_or_else(|| RecordsError::not_found("成绩", id))
        }

        async fn by_student(&self, student_id: i64) -> RecordsResult<Vec<Grade>> {
            Ok(self
                .grades
                .lock()
                .await
                .iter()
                .filter(|g| g.student_id == student_id)
                .cloned()
                .collect())
        }

        async fn by_course(&self, course_id: i64) -> RecordsResult<Vec<Grade>> {
            Ok(self
                .grades
                .lock()
                .await
                .iter()
                .filter(|g| g.course_id == course_id)
                .cloned()
                .collect())
        }

        async fn update(&self, grade: &Grade) -> RecordsResult<bool> {
            let mut grades = self.grades.lock().await;
            match grades.iter_mut().find(|g| g.id == grade.id) {
                Some(existing) => {
                    *existing = grade.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, id: i64) -> RecordsResult<bool> {
            let mut grades = self.grades.lock().await;
            let before = grades.len();
            grades.retain(|g| g.id != id);
            Ok(grades.len() < before)
        }
    }

    #[derive(Default)]
    struct MockCourseRepository {
        courses: Mutex<Vec<Course>>,
    }

    #[async_trait]
    impl CourseRepository for MockCourseRepository {
        async fn create(&self, course: &NewCourse) -> RecordsResult<i64> {
            let mut courses = self.courses.lock().await;
            let id = courses.len() as i64 + 1;
            courses.push(Course {
                id,
                course_code: course.course_code.clone(),
                course_name: course.course_name.clone(),
                credits: course.credits,
                instructor: course.instructor.clone(),
            });
            Ok(id)
        }

        async fn read(&self, id: i64) -> RecordsResult<Course> {
            self.courses
                .lock()
                .await
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| RecordsError::not_found("课程", id))
        }

        async fn read_all(&self) -> RecordsResult<Vec<Course>> {
            Ok(self.courses.lock().await.clone())
        }

        async fn update(&self, course: &Course) -> RecordsResult<bool> {
            let mut courses = self.courses.lock().await;
            match courses.iter_mut().find(|c| c.id == course.id) {
                Some(existing) => {
                    *existing = course.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, id: i64) -> RecordsResult<bool> {
            let mut courses = self.courses.lock().await;
            let before = courses.len();
            courses.retain(|c| c.id != id);
            Ok(courses.len() < before)
        }
    }

    fn student_service() -> (StudentService, Arc<MockStudentRepository>) {
        let repo = Arc::new(MockStudentRepository::default());
        (StudentService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_add_student_trims_fields() {
        let (service, repo) = student_service();

        let student = service
            .add_student("  Alice  ", " alice@example.com ", "2001-05-17", " CS ")
            .await
            .unwrap();

        assert_eq!(student.id, 1);
        assert_eq!(student.name, "Alice");
        assert_eq!(student.email, "alice@example.com");
        assert_eq!(student.department, "CS");
        assert_eq!(repo.read(1).await.unwrap(), student);
    }

    #[tokio::test]
    async fn test_add_student_validation() {
        let (service, repo) = student_service();

        let err = service
            .add_student("   ", "a@b.c", "2001-05-17", "CS")
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Validation(_)));

        let err = service
            .add_student("Bob", "bob.example.com", "2001-05-17", "CS")
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Validation(_)));

        let err = service
            .add_student("Bob", "bob@example.com", "17/05/2001", "CS")
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Validation(_)));

        assert!(repo.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_student() {
        let (service, _repo) = student_service();
        let mut student = service
            .add_student("Carol", "carol@example.com", "2000-01-01", "EE")
            .await
            .unwrap();

        student.name = " Caroline ".to_string();
        assert!(service.update_student(student.clone()).await.unwrap());
        assert_eq!(service.get_student(student.id).await.unwrap().name, "Caroline");

        student.email = "invalid".to_string();
        assert!(service.update_student(student.clone()).await.is_err());

        assert!(service.delete_student(student.id).await.unwrap());
        assert!(!service.delete_student(student.id).await.unwrap());
        assert!(service.get_student(student.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_students_trims_fragment() {
        let (service, _repo) = student_service();
        service
            .add_student("Alice Smith", "alice@example.com", "2001-05-17", "CS")
            .await
            .unwrap();
        service
            .add_student("Bob Jones", "bob@example.com", "2001-05-17", "CS")
            .await
            .unwrap();

        let found = service.search_students(" Smith ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Alice Smith");
    }

    #[tokio::test]
    async fn test_grade_service_computes_letter() {
        let service = GradeService::new(Arc::new(MockGradeRepository::default()));

        let grade = service.add_grade(1, 2, 85.5).await.unwrap();
        assert_eq!(grade.grade, GradeLetter::A);

        let updated = Grade {
            marks: 92.0,
            grade: GradeLetter::F,
            ..grade.clone()
        };
        assert!(service.update_grade(updated).await.unwrap());

        let grades = service.student_grades(1).await.unwrap();
        assert_eq!(grades[0].grade, GradeLetter::APlus);
        assert_eq!(service.course_grades(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_grade_marks_out_of_range() {
        let service = GradeService::new(Arc::new(MockGradeRepository::default()));

        assert!(matches!(
            service.add_grade(1, 1, 100.5).await,
            Err(RecordsError::Validation(_))
        ));
        assert!(matches!(
            service.add_grade(1, 1, -1.0).await,
            Err(RecordsError::Validation(_))
        ));
        assert!(service.add_grade(1, 1, 0.0).await.is_ok());
        assert!(service.add_grade(1, 2, 100.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_course_validates_and_trims() {
        let service = CourseService::new(Arc::new(MockCourseRepository::default()));
        let course = service
            .add_course("CS101", "Programming", 4, "Dr. Rao")
            .await
            .unwrap();

        let renamed = Course {
            course_name: "  Systems Programming ".to_string(),
            credits: 5,
            instructor: " Dr. Iyer ".to_string(),
            ..course.clone()
        };
        assert!(service.update_course(renamed).await.unwrap());

        let stored = service.get_course(course.id).await.unwrap();
        assert_eq!(stored.course_name, "Systems Programming");
        assert_eq!(stored.instructor, "Dr. Iyer");
        assert_eq!(stored.credits, 5);

        let blank = Course {
            course_code: " ".to_string(),
            ..stored.clone()
        };
        assert!(matches!(
            service.update_course(blank).await,
            Err(RecordsError::Validation(_))
        ));

        let missing = Course { id: 42, ..stored };
        assert!(!service.update_course(missing).await.unwrap());
        assert!(service.get_course(42).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_grade_then_update_marks() {
        let service = GradeService::new(Arc::new(MockGradeRepository::default()));
        let grade = service.add_grade(3, 4, 55.0).await.unwrap();

        let mut stored = service.get_grade(grade.id).await.unwrap();
        assert_eq!(stored.grade, GradeLetter::D);
        stored.marks = 81.0;
        assert!(service.update_grade(stored).await.unwrap());
        assert_eq!(service.get_grade(grade.id).await.unwrap().grade, GradeLetter::A);

        assert!(service.get_grade(77).await.unwrap_err().is_not_found());
    }
}
