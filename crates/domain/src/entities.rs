use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub department: String,
}

impl Student {
    /// 按年份差计算年龄，不考虑生日是否已过
    pub fn age_on(&self, date: NaiveDate) -> i32 {
        date.year() - self.date_of_birth.year()
    }

    pub fn display_info(&self) -> String {
        format!("Student: {} ({}) - {}", self.name, self.id, self.department)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub credits: i32,
    pub instructor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub credits: i32,
    pub instructor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub marks: f64,
    pub grade: GradeLetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGrade {
    pub student_id: i64,
    pub course_id: i64,
    pub marks: f64,
}

impl NewGrade {
    pub fn letter(&self) -> GradeLetter {
        GradeLetter::from_marks(self.marks)
    }
}

/// 等级成绩，按分数下限划分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeLetter {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl GradeLetter {
    pub fn from_marks(marks: f64) -> Self {
        if marks >= 90.0 {
            GradeLetter::APlus
        } else if marks >= 80.0 {
            GradeLetter::A
        } else if marks >= 70.0 {
            GradeLetter::B
        } else if marks >= 60.0 {
            GradeLetter::C
        } else if marks >= 50.0 {
            GradeLetter::D
        } else {
            GradeLetter::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLetter::APlus => "A+",
            GradeLetter::A => "A",
            GradeLetter::B => "B",
            GradeLetter::C => "C",
            GradeLetter::D => "D",
            GradeLetter::F => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(GradeLetter::APlus),
            "A" => Some(GradeLetter::A),
            "B" => Some(GradeLetter::B),
            "C" => Some(GradeLetter::C),
            "D" => Some(GradeLetter::D),
            "F" => Some(GradeLetter::F),
            _ => None,
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Sqlite> for GradeLetter {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for GradeLetter {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        GradeLetter::parse(s).ok_or_else(|| format!("Invalid grade letter: {s}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for GradeLetter {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub name: String,
    pub email: String,
    pub department: String,
    pub employee_id: String,
}

/// 系统中的人员：讲师或学生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Person {
    Instructor(Instructor),
    Student(Student),
}

impl Person {
    pub fn name(&self) -> &str {
        match self {
            Person::Instructor(instructor) => &instructor.name,
            Person::Student(student) => &student.name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Person::Instructor(instructor) => &instructor.email,
            Person::Student(student) => &student.email,
        }
    }

    pub fn display_info(&self) -> String {
        match self {
            Person::Instructor(instructor) => format!(
                "Instructor: {} ({}) - {}",
                instructor.name, instructor.employee_id, instructor.department
            ),
            Person::Student(student) => student.display_info(),
        }
    }
}
