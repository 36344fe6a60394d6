//! 文本报表
//!
//! 报表内容由纯函数生成，写文件只发生在 `generate_*` 中。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use records_core::RecordsResult;
use records_domain::entities::{Course, Grade, Student};
use records_domain::repositories::{CourseRepository, GradeRepository, StudentRepository};
use tracing::{info, warn};

const RULE_WIDTH: usize = 50;
const GENERATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 汇总报表的统计数据
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub total_students: usize,
    pub total_courses: usize,
    pub total_grades: usize,
    /// (平均分, 最高分, 最低分)，没有成绩时为 None
    pub marks: Option<(f64, f64, f64)>,
}

impl SummaryStatistics {
    pub fn from_grades(total_students: usize, total_courses: usize, grades: &[Grade]) -> Self {
        let marks = if grades.is_empty() {
            None
        } else {
            let sum: f64 = grades.iter().map(|g| g.marks).sum();
            let max = grades.iter().map(|g| g.marks).fold(f64::MIN, f64::max);
            let min = grades.iter().map(|g| g.marks).fold(f64::MAX, f64::min);
            Some((sum / grades.len() as f64, max, min))
        };

        Self {
            total_students,
            total_courses,
            total_grades: grades.len(),
            marks,
        }
    }
}

pub struct ReportService {
    students: Arc<dyn StudentRepository>,
    courses: Arc<dyn CourseRepository>,
    grades: Arc<dyn GradeRepository>,
    directory: PathBuf,
}

impl ReportService {
    pub fn new(
        students: Arc<dyn StudentRepository>,
        courses: Arc<dyn CourseRepository>,
        grades: Arc<dyn GradeRepository>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            students,
            courses,
            grades,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn generate_student_report(&self, student_id: i64) -> RecordsResult<PathBuf> {
        let student = self.students.read(student_id).await?;
        let grades = self.grades.by_student(student_id).await?;

        let mut graded = Vec::with_capacity(grades.len());
        for grade in grades {
            let course = match self.courses.read(grade.course_id).await {
                Ok(course) => Some(course),
                Err(e) if e.is_not_found() => {
                    warn!("报表中的课程 {} 不存在", grade.course_id);
                    None
                }
                Err(e) => return Err(e),
            };
            graded.push((grade, course));
        }

        let now = Local::now().naive_local();
        let lines = student_report_lines(&student, &graded, now);
        let path = self
            .directory
            .join(format!("student_{}_{}.txt", student_id, now.format(FILE_STAMP_FORMAT)));
        self.write_lines(&path, &lines).await?;

        info!("学生报表已生成: {}", path.display());
        Ok(path)
    }

    pub async fn generate_summary_report(&self) -> RecordsResult<PathBuf> {
        let students = self.students.read_all().await?;
        let courses = self.courses.read_all().await?;

        let mut all_grades = Vec::new();
        for student in &students {
            all_grades.extend(self.grades.by_student(student.id).await?);
        }

        let statistics = SummaryStatistics::from_grades(students.len(), courses.len(), &all_grades);
        let now = Local::now().naive_local();
        let lines = summary_report_lines(&statistics, now);
        let path = self
            .directory
            .join(format!("summary_{}.txt", now.format(FILE_STAMP_FORMAT)));
        self.write_lines(&path, &lines).await?;

        info!("汇总报表已生成: {}", path.display());
        Ok(path)
    }

    async fn write_lines(&self, path: &Path, lines: &[String]) -> RecordsResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let mut content = lines.join("\n");
        content.push('\n');
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn rule(ch: char) -> String {
    std::iter::repeat(ch).take(RULE_WIDTH).collect()
}

fn header(title: &str, generated_at: NaiveDateTime) -> Vec<String> {
    vec![
        rule('='),
        title.to_string(),
        rule('='),
        format!("Generated: {}", generated_at.format(GENERATED_FORMAT)),
        String::new(),
    ]
}

pub fn student_report_lines(
    student: &Student,
    grades: &[(Grade, Option<Course>)],
    generated_at: NaiveDateTime,
) -> Vec<String> {
    let mut lines = header("STUDENT REPORT", generated_at);
    lines.push(format!("Student ID: {}", student.id));
    lines.push(format!("Name: {}", student.name));
    lines.push(format!("Email: {}", student.email));
    lines.push(format!("Department: {}", student.department));
    lines.push(format!("Age: {}", student.age_on(generated_at.date())));
    lines.push(String::new());
    lines.push("Grades:".to_string());
    lines.push(rule('-'));

    for (grade, course) in grades {
        let line = match course {
            Some(course) => format!(
                "  {} ({}): {:.2} - {}",
                course.course_name, course.course_code, grade.marks, grade.grade
            ),
            None => format!(
                "  Course ID {}: {} - {}",
                grade.course_id, grade.marks, grade.grade
            ),
        };
        lines.push(line);
    }

    let average = if grades.is_empty() {
        0.0
    } else {
        grades.iter().map(|(g, _)| g.marks).sum::<f64>() / grades.len() as f64
    };

    lines.push(String::new());
    lines.push(format!("Average Marks: {average:.2}"));
    lines.push(rule('='));
    lines
}

pub fn summary_report_lines(statistics: &SummaryStatistics, generated_at: NaiveDateTime) -> Vec<String> {
    let mut lines = header("SUMMARY REPORT", generated_at);
    lines.push(format!("Total Students: {}", statistics.total_students));
    lines.push(format!("Total Courses: {}", statistics.total_courses));
    lines.push(format!("Total Grades Recorded: {}", statistics.total_grades));
    lines.push(String::new());

    if let Some((average, max, min)) = statistics.marks {
        lines.push("Statistics:".to_string());
        lines.push(format!("  Average Marks: {average:.2}"));
        lines.push(format!("  Maximum Marks: {max:.2}"));
        lines.push(format!("  Minimum Marks: {min:.2}"));
    }

    lines.push(rule('='));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use records_domain::entities::GradeLetter;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    fn grade(id: i64, course_id: i64, marks: f64) -> Grade {
        Grade {
            id,
            student_id: 1,
            course_id,
            marks,
            grade: GradeLetter::from_marks(marks),
        }
    }

    #[test]
    fn test_student_report_lines() {
        let student = Student {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2003, 8, 1).unwrap(),
            department: "CS".to_string(),
        };
        let course = Course {
            id: 10,
            course_code: "CS101".to_string(),
            course_name: "Programming".to_string(),
            credits: 4,
            instructor: "Dr. Rao".to_string(),
        };
        let grades = vec![(grade(1, 10, 91.0), Some(course)), (grade(2, 11, 70.5), None)];

        let lines = student_report_lines(&student, &grades, generated_at());

        assert_eq!(lines[1], "STUDENT REPORT");
        assert_eq!(lines[3], "Generated: 2024-03-09T14:05:00");
        assert!(lines.contains(&"Age: 21".to_string()));
        assert!(lines.contains(&"  Programming (CS101): 91.00 - A+".to_string()));
        assert!(lines.contains(&"  Course ID 11: 70.5 - B".to_string()));
        assert!(lines.contains(&"Average Marks: 80.75".to_string()));
        assert_eq!(lines.last().unwrap(), &"=".repeat(50));
    }

    #[test]
    fn test_summary_without_grades_omits_statistics() {
        let statistics = SummaryStatistics::from_grades(2, 1, &[]);
        let lines = summary_report_lines(&statistics, generated_at());

        assert!(lines.contains(&"Total Students: 2".to_string()));
        assert!(lines.contains(&"Total Grades Recorded: 0".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Statistics")));
    }

    #[test]
    fn test_summary_statistics() {
        let grades = vec![grade(1, 1, 40.0), grade(2, 2, 95.0), grade(3, 3, 66.0)];
        let statistics = SummaryStatistics::from_grades(3, 3, &grades);
        assert_eq!(statistics.marks, Some((67.0, 95.0, 40.0)));

        let lines = summary_report_lines(&statistics, generated_at());
        assert!(lines.contains(&"  Average Marks: 67.00".to_string()));
        assert!(lines.contains(&"  Maximum Marks: 95.00".to_string()));
        assert!(lines.contains(&"  Minimum Marks: 40.00".to_string()));
    }
}
