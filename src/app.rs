use std::sync::Arc;

use anyhow::{Context, Result};
use records_core::AppConfig;
use records_domain::entities::Student;
use records_domain::services::{CourseService, GradeService, StudentService};
use records_infrastructure::{DatabaseManager, ReportService};
use records_worker::{
    ChunkHandler, ContactNormalizationHandler, DispatchReceipt, SchedulerStats, ShutdownOutcome,
    StudentNameHandler, TaskScheduler,
};
use tracing::info;

/// 批处理选项，未指定的值取自配置
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub pool_size: Option<usize>,
    /// 规范化联系信息并写回数据库，而不是只整理姓名
    pub normalize: bool,
}

#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub receipt: DispatchReceipt,
    pub outcome: ShutdownOutcome,
    pub stats: SchedulerStats,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    students: StudentService,
    courses: CourseService,
    grades: GradeService,
    reports: ReportService,
}

impl Application {
    /// 创建应用实例并确保表结构存在
    pub async fn new(config: AppConfig) -> Result<Self> {
        let database = DatabaseManager::new(&config.database).context("创建数据库管理器失败")?;
        database
            .initialize_schema()
            .await
            .context("初始化数据库失败")?;

        let students = StudentService::new(database.student_repository());
        let courses = CourseService::new(database.course_repository());
        let grades = GradeService::new(database.grade_repository());
        let reports = ReportService::new(
            database.student_repository(),
            database.course_repository(),
            database.grade_repository(),
            config.reports.directory_path(),
        );

        info!("应用程序初始化完成");

        Ok(Self {
            config,
            database,
            students,
            courses,
            grades,
            reports,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn students(&self) -> &StudentService {
        &self.students
    }

    pub fn courses(&self) -> &CourseService {
        &self.courses
    }

    pub fn grades(&self) -> &GradeService {
        &self.grades
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }

    /// 把全部学生分发给任务池，再按配置的时限关闭任务池
    pub async fn process_students(&self, options: ProcessOptions) -> Result<ProcessSummary> {
        let worker = &self.config.worker;
        let pool_size = options.pool_size.unwrap_or(worker.pool_size);

        let handler: Arc<dyn ChunkHandler<Student>> = if options.normalize {
            Arc::new(ContactNormalizationHandler::new(
                self.database.student_repository(),
            ))
        } else {
            Arc::new(StudentNameHandler::new(worker.simulated_delay()))
        };

        let students = self
            .students
            .list_students()
            .await
            .context("加载学生列表失败")?;

        let scheduler = TaskScheduler::new(pool_size, handler).context("创建任务池失败")?;
        let receipt = scheduler.dispatch(&students).context("分发任务失败")?;

        let outcome = scheduler
            .shutdown(worker.graceful_timeout(), worker.forced_timeout())
            .await;
        let stats = scheduler.stats();

        info!(
            "批处理结束: {:?}, 完成 {} / 失败 {} / 取消 {}",
            outcome, stats.completed, stats.failed, stats.cancelled
        );

        Ok(ProcessSummary {
            receipt,
            outcome,
            stats,
        })
    }

    pub async fn shutdown(&self) {
        self.database.close().await;
        info!("应用程序已关闭");
    }
}
