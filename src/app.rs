//! 命令行入口的业务编排
//!
//! [`Cli`] 定义命令行参数，[`App`] 持有配置与数据源并执行各个子命令。

use crate::api::{
    Disposition, MailingApi, MailingListFilter, MailingStatsFilter, MailingStatsResponse,
    RecordingFilter, build_api,
};
use crate::compare::{
    ExportEvent, ExportOutcome, MailingSelection, PaginatedExporter, load_mailings,
};
use crate::config::{ArtifactFormat, Config};
use crate::dashboard::{
    RecordingsView, calls_per_day, disposition_breakdown, duration_secs, format_duration,
    load_lists, load_mailing_stats, load_recordings,
};
use crate::error::{CallMetricsError, Result};
use crate::upload::{QueueEvent, QueueProcessor, RunReport, SourceFile, UploadQueue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 呼叫中心面板命令行工具
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "callmetrics-cli", author, version, about)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 上传名单文件
    Upload {
        /// 表格文件 (csv/xlsx/xls/ods)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// 名单名称，仅上传单个文件时有效
        #[arg(short, long)]
        name: Option<String>,
    },
    /// 列出名单
    Mailings {
        #[arg(long, default_value = "")]
        nome: String,
        #[arg(long, default_value = "")]
        data: String,
    },
    /// 导出所选名单的兼容数据
    Export {
        #[arg(required = true)]
        mailings: Vec<String>,
        #[arg(long)]
        out_dir: Option<String>,
        #[arg(long)]
        format: Option<ArtifactFormat>,
    },
    /// 查询通话录音
    Recordings {
        #[arg(long, default_value = "")]
        start_date: String,
        #[arg(long, default_value = "")]
        end_date: String,
        #[arg(long, default_value = "")]
        lista: String,
        #[arg(long)]
        disposition: Option<Disposition>,
        /// 只显示没有拨号列表的通话
        #[arg(long)]
        sem_lista: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// 名单导入统计
    Stats {
        #[arg(long, default_value = "")]
        start_date: String,
        #[arg(long, default_value = "")]
        end_date: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// 列出拨号列表
    Lists,
}

/// 持有配置和数据源的应用
pub struct App {
    config: Config,
    api: Arc<dyn MailingApi>,
    cancel: CancellationToken,
}

impl App {
    /// 根据配置创建数据源
    pub fn new(config: Config) -> Result<Self> {
        let api = build_api(&config.api)?;
        Ok(Self::with_api(config, api))
    }

    pub fn with_api(config: Config, api: Arc<dyn MailingApi>) -> Self {
        Self { config, api, cancel: CancellationToken::new() }
    }

    /// 取消正在进行的上传或导出
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 执行一个子命令
    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Upload { files, name } => {
                let report = self.upload(&files, name).await?;
                println!(
                    "\n上传结束: 完成 {} 个, 失败 {} 个, 新增 {} 条, 重复 {} 条",
                    report.completed, report.failed, report.novos, report.duplicados
                );
            }
            Command::Mailings { nome, data } => {
                let names = self.mailings(&MailingListFilter { nome, data }).await;
                if names.is_empty() {
                    println!("没有找到名单");
                }
                for name in names {
                    println!("{name}");
                }
            }
            Command::Export { mailings, out_dir, format } => {
                match self.export(mailings, out_dir, format).await {
                    Ok(outcome) => {
                        println!("导出完成: {} ({} 条记录)", outcome.path.display(), outcome.rows)
                    }
                    Err(e) if e.is_no_data() => println!("{e}"),
                    Err(e) => return Err(e),
                }
            }
            Command::Recordings {
                start_date,
                end_date,
                lista,
                disposition,
                sem_lista,
                page,
                limit,
            } => {
                let filter = RecordingFilter {
                    start_date,
                    end_date,
                    lista_nome: lista,
                    disposition,
                    sem_lista,
                    page,
                    limit: limit.unwrap_or(self.config.dashboard.page_size),
                };
                print_recordings(&self.recordings(&filter).await);
            }
            Command::Stats { start_date, end_date, page, limit } => {
                let filter = MailingStatsFilter {
                    start_date,
                    end_date,
                    page,
                    limit: limit.unwrap_or(self.config.dashboard.page_size),
                };
                print_mailing_stats(&self.mailing_stats(&filter).await);
            }
            Command::Lists => {
                for name in load_lists(self.api.as_ref()).await {
                    println!("{name}");
                }
            }
        }
        Ok(())
    }

    /// 把文件加入队列并处理，进度逐行输出
    pub async fn upload(&self, files: &[PathBuf], name: Option<String>) -> Result<RunReport> {
        let queue = UploadQueue::new();
        let mut ids = Vec::with_capacity(files.len());
        for path in files {
            ids.push(queue.add_file(SourceFile::from_path(path).await?));
        }
        if let Some(name) = name {
            if ids.len() != 1 {
                return Err(CallMetricsError::config_error("--name 只能用于单个文件"));
            }
            queue.rename(ids[0], name);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    QueueEvent::ItemStarted { mailing_name, .. } => {
                        println!("开始处理名单 {mailing_name}")
                    }
                    QueueEvent::ItemProgress {
                        status,
                        progress,
                        processed_rows,
                        total_rows,
                        ..
                    } => {
                        println!(
                            "  {:<10} {:>3}%  {}/{}",
                            status.label(),
                            progress,
                            processed_rows,
                            total_rows.map(|t| t.to_string()).unwrap_or_else(|| "?".into())
                        )
                    }
                    QueueEvent::ItemCompleted { stats, .. } => {
                        println!("  完成: 新增 {}, 重复 {}", stats.novos, stats.duplicados)
                    }
                    QueueEvent::ItemFailed { message, .. } => println!("  失败: {message}"),
                    QueueEvent::RunFinished(_) => break,
                }
            }
        });

        let processor = QueueProcessor::new(self.api.clone(), self.config.upload.clone())
            .with_observer(tx)
            .with_cancellation(self.cancel.clone());
        let report = processor.run(&queue).await;
        drop(processor);
        let _ = printer.await;
        report
    }

    pub async fn mailings(&self, filter: &MailingListFilter) -> Vec<String> {
        load_mailings(self.api.as_ref(), filter).await
    }

    /// 导出兼容数据；命令行参数覆盖配置中的目录和格式
    pub async fn export(
        &self,
        mailings: Vec<String>,
        out_dir: Option<String>,
        format: Option<ArtifactFormat>,
    ) -> Result<ExportOutcome> {
        let mut settings = self.config.export.clone();
        if let Some(out_dir) = out_dir {
            settings.out_dir = out_dir;
        }
        if let Some(format) = format {
            settings.format = format;
        }
        let selection: MailingSelection = mailings.into_iter().collect();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ExportEvent::PageFetched { page, total_pages, accumulated, .. } => {
                        println!("  第 {page}/{total_pages} 页, 累计 {accumulated} 条")
                    }
                    ExportEvent::Writing { rows } => println!("  生成文件 ({rows} 条)..."),
                    ExportEvent::Finished { .. } => {}
                }
            }
        });

        let exporter = PaginatedExporter::new(self.api.clone(), settings)
            .with_observer(tx)
            .with_cancellation(self.cancel.clone());
        // 文件名使用 UTC 日期
        let today = chrono::Utc::now().date_naive();
        let outcome = exporter.export(&selection, today).await;
        drop(exporter);
        let _ = printer.await;
        outcome
    }

    pub async fn recordings(&self, filter: &RecordingFilter) -> RecordingsView {
        load_recordings(self.api.as_ref(), filter).await
    }

    pub async fn mailing_stats(&self, filter: &MailingStatsFilter) -> MailingStatsResponse {
        load_mailing_stats(self.api.as_ref(), filter).await
    }
}

fn print_recordings(view: &RecordingsView) {
    println!(
        "总计 {} 条 | 接通率 {}% | 平均时长 {}s",
        view.stats.total, view.stats.success_rate, view.stats.average_duration
    );
    for row in &view.rows {
        println!(
            "{:<20} {:<14} {:<12} {:>6} {}",
            row.calldate,
            row.dst,
            row.disposition,
            format_duration(duration_secs(&row.duration)),
            row.lista_nome.as_deref().unwrap_or("-")
        );
    }
    println!("第 {}/{} 页", view.pagination.pagina_atual, view.pagination.total_pages);
    for (disposition, count) in disposition_breakdown(&view.rows) {
        let label = disposition
            .parse::<Disposition>()
            .map(|d| d.label().to_string())
            .unwrap_or(disposition);
        println!("  {label}: {count}");
    }
    for (day, count) in calls_per_day(&view.rows, 10) {
        println!("  {day}: {count}");
    }
}

fn print_mailing_stats(stats: &MailingStatsResponse) {
    let totals = &stats.totais_gerais;
    println!(
        "名单 {} 个 | 记录 {} | 唯一电话 {} | 重复 {} ({:.2}%)",
        stats.total_mailings,
        totals.total_registros,
        totals.total_telefones_unicos,
        totals.total_duplicados,
        totals.taxa_duplicacao_geral
    );
    for stat in &stats.estatisticas {
        println!(
            "{:<30} {:>8} {:>8} {:>8} {:>6.2}%  {}",
            stat.nome_malling,
            stat.total_registros,
            stat.total_telefones_unicos,
            stat.total_duplicados,
            stat.taxa_duplicacao,
            stat.data_ultima_insercao
        );
    }
}
