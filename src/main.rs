use anyhow::{Context, Result};
use chrono::Local;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use records_core::{init_logging, AppConfig, LogLevel, OutputFormat, RecordsError};
use records_domain::services::parse_date;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use campus_records::app::{Application, ProcessOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let mut config = AppConfig::load(config_path).context("加载配置失败")?;

    // 命令行参数覆盖配置文件中的日志设置
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format
            .parse::<OutputFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let _logging_guard = init_logging(&config.logging)?;

    info!("启动学生记录管理系统");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let app = Application::new(config).await?;
    let result = run_command(&app, &matches).await;
    app.shutdown().await;
    result
}

fn build_cli() -> Command {
    let json_flag = Arg::new("json")
        .long("json")
        .help("以JSON格式输出")
        .action(ArgAction::SetTrue);

    Command::new("campus-records")
        .version("1.0.0")
        .about("学生/课程/成绩记录管理系统")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty", "text"])
                .global(true),
        )
        .subcommand(
            Command::new("init").about("初始化数据库表结构").arg(
                Arg::new("write-config")
                    .long("write-config")
                    .value_name("FILE")
                    .help("把当前生效的配置写入TOML文件"),
            ),
        )
        .subcommand(
            Command::new("student")
                .about("学生管理")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("添加学生")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(
                            Arg::new("dob")
                                .long("dob")
                                .value_name("YYYY-MM-DD")
                                .required(true),
                        )
                        .arg(Arg::new("department").long("department").required(true)),
                )
                .subcommand(Command::new("show").about("查看学生详情").arg(id_arg()))
                .subcommand(Command::new("list").about("列出全部学生").arg(json_flag.clone()))
                .subcommand(
                    Command::new("search")
                        .about("按姓名搜索学生")
                        .arg(Arg::new("name").required(true))
                        .arg(json_flag.clone()),
                )
                .subcommand(
                    Command::new("update")
                        .about("更新学生信息，未给出的字段保持不变")
                        .arg(id_arg())
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("dob").long("dob").value_name("YYYY-MM-DD"))
                        .arg(Arg::new("department").long("department")),
                )
                .subcommand(Command::new("delete").about("删除学生").arg(id_arg())),
        )
        .subcommand(
            Command::new("course")
                .about("课程管理")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("添加课程")
                        .arg(Arg::new("code").long("code").required(true))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("credits")
                                .long("credits")
                                .value_parser(value_parser!(i32))
                                .required(true),
                        )
                        .arg(Arg::new("instructor").long("instructor").default_value("")),
                )
                .subcommand(Command::new("list").about("列出全部课程").arg(json_flag.clone()))
                .subcommand(
                    Command::new("update")
                        .about("更新课程信息，未给出的字段保持不变")
                        .arg(id_arg())
                        .arg(Arg::new("code").long("code"))
                        .arg(Arg::new("name").long("name"))
                        .arg(
                            Arg::new("credits")
                                .long("credits")
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(Arg::new("instructor").long("instructor")),
                )
                .subcommand(Command::new("delete").about("删除课程").arg(id_arg())),
        )
        .subcommand(
            Command::new("grade")
                .about("成绩管理")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("录入成绩")
                        .arg(
                            Arg::new("student")
                                .long("student")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("course")
                                .long("course")
                                .value_parser(value_parser!(i64))
                                .required(true),
                        )
                        .arg(
                            Arg::new("marks")
                                .long("marks")
                                .value_parser(value_parser!(f64))
                                .required(true),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("按学生或课程列出成绩")
                        .arg(
                            Arg::new("student")
                                .long("student")
                                .value_parser(value_parser!(i64))
                                .conflicts_with("course"),
                        )
                        .arg(
                            Arg::new("course")
                                .long("course")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(json_flag),
                )
                .subcommand(
                    Command::new("update")
                        .about("修改成绩分数，等级随之重新计算")
                        .arg(id_arg())
                        .arg(
                            Arg::new("marks")
                                .long("marks")
                                .value_parser(value_parser!(f64))
                                .required(true),
                        ),
                )
                .subcommand(Command::new("delete").about("删除成绩").arg(id_arg())),
        )
        .subcommand(
            Command::new("report")
                .about("生成报表")
                .subcommand_required(true)
                .subcommand(Command::new("student").about("学生报表").arg(id_arg()))
                .subcommand(Command::new("summary").about("汇总报表")),
        )
        .subcommand(
            Command::new("process")
                .about("用任务池并发处理全部学生记录")
                .arg(
                    Arg::new("pool-size")
                        .short('p')
                        .long("pool-size")
                        .value_name("N")
                        .help("工作线程数，默认取配置中的 worker.pool_size")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("normalize")
                        .long("normalize")
                        .help("规范化学生联系信息并写回数据库")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn id_arg() -> Arg {
    Arg::new("id")
        .value_parser(value_parser!(i64))
        .required(true)
}

async fn run_command(app: &Application, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("init", sub)) => {
            if let Some(path) = sub.get_one::<String>("write-config") {
                let content = app.config().to_toml()?;
                tokio::fs::write(path, content)
                    .await
                    .with_context(|| format!("写入配置文件失败: {path}"))?;
                println!("配置已写入 {path}");
            }
            println!("数据库已初始化: {}", app.config().database.url);
            Ok(())
        }
        Some(("student", sub)) => run_student(app, sub).await,
        Some(("course", sub)) => run_course(app, sub).await,
        Some(("grade", sub)) => run_grade(app, sub).await,
        Some(("report", sub)) => run_report(app, sub).await,
        Some(("process", sub)) => run_process(app, sub).await,
        _ => Err(anyhow::anyhow!("缺少子命令")),
    }
}

async fn run_student(app: &Application, matches: &ArgMatches) -> Result<()> {
    let students = app.students();
    match matches.subcommand() {
        Some(("add", sub)) => {
            let student = students
                .add_student(
                    required(sub, "name")?,
                    required(sub, "email")?,
                    required(sub, "dob")?,
                    required(sub, "department")?,
                )
                .await?;
            println!("已添加 {}", student.display_info());
        }
        Some(("show", sub)) => {
            let student = students.get_student(id(sub)?).await?;
            println!("{}", student.display_info());
            println!("Email: {}", student.email);
            println!("Date of Birth: {}", student.date_of_birth);
            println!("Age: {}", student.age_on(Local::now().date_naive()));
        }
        Some(("list", sub)) => {
            let list = students.list_students().await?;
            print_list(&list, sub, |s| s.display_info())?;
        }
        Some(("search", sub)) => {
            let list = students.search_students(required(sub, "name")?).await?;
            print_list(&list, sub, |s| s.display_info())?;
        }
        Some(("update", sub)) => {
            let mut student = students.get_student(id(sub)?).await?;
            if let Some(name) = sub.get_one::<String>("name") {
                student.name = name.clone();
            }
            if let Some(email) = sub.get_one::<String>("email") {
                student.email = email.clone();
            }
            if let Some(dob) = sub.get_one::<String>("dob") {
                student.date_of_birth = parse_date(dob)?;
            }
            if let Some(department) = sub.get_one::<String>("department") {
                student.department = department.clone();
            }
            report_change(students.update_student(student).await?, "学生已更新", "学生不存在");
        }
        Some(("delete", sub)) => {
            report_change(students.delete_student(id(sub)?).await?, "学生已删除", "学生不存在");
        }
        _ => return Err(anyhow::anyhow!("未知的 student 子命令")),
    }
    Ok(())
}

async fn run_course(app: &Application, matches: &ArgMatches) -> Result<()> {
    let courses = app.courses();
    match matches.subcommand() {
        Some(("add", sub)) => {
            let credits = *sub
                .get_one::<i32>("credits")
                .context("缺少参数 credits")?;
            let course = courses
                .add_course(
                    required(sub, "code")?,
                    required(sub, "name")?,
                    credits,
                    required(sub, "instructor")?,
                )
                .await?;
            println!("已添加课程 {} ({})", course.course_name, course.id);
        }
        Some(("list", sub)) => {
            let list = courses.list_courses().await?;
            print_list(&list, sub, |c| {
                format!(
                    "{} {} - {} 学分 - {}",
                    c.id, c.course_code, c.credits, c.course_name
                )
            })?;
        }
        Some(("update", sub)) => {
            let mut course = courses.get_course(id(sub)?).await?;
            if let Some(code) = sub.get_one::<String>("code") {
                course.course_code = code.clone();
            }
            if let Some(name) = sub.get_one::<String>("name") {
                course.course_name = name.clone();
            }
            if let Some(&credits) = sub.get_one::<i32>("credits") {
                course.credits = credits;
            }
            if let Some(instructor) = sub.get_one::<String>("instructor") {
                course.instructor = instructor.clone();
            }
            report_change(courses.update_course(course).await?, "课程已更新", "课程不存在");
        }
        Some(("delete", sub)) => {
            report_change(courses.delete_course(id(sub)?).await?, "课程已删除", "课程不存在");
        }
        _ => return Err(anyhow::anyhow!("未知的 course 子命令")),
    }
    Ok(())
}

async fn run_grade(app: &Application, matches: &ArgMatches) -> Result<()> {
    let grades = app.grades();
    match matches.subcommand() {
        Some(("add", sub)) => {
            let student_id = *sub.get_one::<i64>("student").context("缺少参数 student")?;
            let course_id = *sub.get_one::<i64>("course").context("缺少参数 course")?;
            let marks = *sub.get_one::<f64>("marks").context("缺少参数 marks")?;
            let grade = grades.add_grade(student_id, course_id, marks).await?;
            println!("已录入成绩 {} ({})", grade.marks, grade.grade);
        }
        Some(("list", sub)) => {
            let list = if let Some(student_id) = sub.get_one::<i64>("student") {
                grades.student_grades(*student_id).await?
            } else if let Some(course_id) = sub.get_one::<i64>("course") {
                grades.course_grades(*course_id).await?
            } else {
                return Err(anyhow::anyhow!("需要指定 --student 或 --course"));
            };
            print_list(&list, sub, |g| {
                format!(
                    "{}: 学生 {} 课程 {} - {:.2} ({})",
                    g.id, g.student_id, g.course_id, g.marks, g.grade
                )
            })?;
        }
        Some(("update", sub)) => {
            let mut grade = grades.get_grade(id(sub)?).await?;
            grade.marks = *sub.get_one::<f64>("marks").context("缺少参数 marks")?;
            report_change(grades.update_grade(grade).await?, "成绩已更新", "成绩不存在");
        }
        Some(("delete", sub)) => {
            report_change(grades.delete_grade(id(sub)?).await?, "成绩已删除", "成绩不存在");
        }
        _ => return Err(anyhow::anyhow!("未知的 grade 子命令")),
    }
    Ok(())
}

async fn run_report(app: &Application, matches: &ArgMatches) -> Result<()> {
    let path = match matches.subcommand() {
        Some(("student", sub)) => app.reports().generate_student_report(id(sub)?).await?,
        Some(("summary", _)) => app.reports().generate_summary_report().await?,
        _ => return Err(anyhow::anyhow!("未知的 report 子命令")),
    };
    println!("报表已生成: {}", path.display());
    Ok(())
}

async fn run_process(app: &Application, matches: &ArgMatches) -> Result<()> {
    let pool_size = match matches.get_one::<i64>("pool-size") {
        Some(&size) if size <= 0 => {
            return Err(RecordsError::Configuration(format!(
                "工作线程数必须为正数: {size}"
            ))
            .into());
        }
        Some(&size) => Some(usize::try_from(size).context("工作线程数超出范围")?),
        None => None,
    };

    let options = ProcessOptions {
        pool_size,
        normalize: matches.get_flag("normalize"),
    };

    // 收到中断信号时放弃等待，任务池在析构时取消剩余任务
    let summary = tokio::select! {
        summary = app.process_students(options) => summary?,
        _ = signal::ctrl_c() => {
            warn!("收到Ctrl+C信号，停止批处理");
            return Err(RecordsError::Cancelled.into());
        }
    };

    println!(
        "分发批次 {}: {} 个任务 / {} 条记录",
        summary.receipt.batch,
        summary.receipt.task_count(),
        summary.receipt.record_count()
    );
    println!("关闭结果: {:?}", summary.outcome);
    println!(
        "完成 {} / 失败 {} / 取消 {}",
        summary.stats.completed, summary.stats.failed, summary.stats.cancelled
    );
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("缺少参数 {name}"))
}

fn id(matches: &ArgMatches) -> Result<i64> {
    matches.get_one::<i64>("id").copied().context("缺少参数 id")
}

fn print_list<T, F>(items: &[T], matches: &ArgMatches, line: F) -> Result<()>
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("(空)");
    }
    for item in items {
        println!("{}", line(item));
    }
    Ok(())
}

fn report_change(changed: bool, done: &str, missing: &str) {
    if changed {
        println!("{done}");
    } else {
        println!("{missing}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_process_accepts_negative_pool_size_for_validation() {
        let matches = build_cli()
            .try_get_matches_from(["campus-records", "process", "--pool-size", "-2"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<i64>("pool-size"), Some(&-2));
    }

    #[test]
    fn test_update_subcommands_parse() {
        let matches = build_cli()
            .try_get_matches_from(["campus-records", "course", "update", "3", "--credits", "5"])
            .unwrap();
        let (_, course) = matches.subcommand().unwrap();
        let (name, update) = course.subcommand().unwrap();
        assert_eq!(name, "update");
        assert_eq!(update.get_one::<i64>("id"), Some(&3));
        assert_eq!(update.get_one::<i32>("credits"), Some(&5));
        assert!(update.get_one::<String>("name").is_none());

        let result = build_cli().try_get_matches_from(["campus-records", "grade", "update", "1"]);
        assert!(result.is_err());

        let matches = build_cli()
            .try_get_matches_from(["campus-records", "student", "show", "7"])
            .unwrap();
        let (_, student) = matches.subcommand().unwrap();
        assert_eq!(student.subcommand_name(), Some("show"));
    }

    #[test]
    fn test_grade_list_rejects_both_filters() {
        let result = build_cli().try_get_matches_from([
            "campus-records",
            "grade",
            "list",
            "--student",
            "1",
            "--course",
            "2",
        ]);
        assert!(result.is_err());
    }
}
