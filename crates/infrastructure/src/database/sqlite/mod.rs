pub mod sqlite_course_repository;
pub mod sqlite_grade_repository;
pub mod sqlite_student_repository;

pub use sqlite_course_repository::SqliteCourseRepository;
pub use sqlite_grade_repository::SqliteGradeRepository;
pub use sqlite_student_repository::SqliteStudentRepository;
