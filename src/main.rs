//! EnvReg 主程序入口
//!
//! - 入口代码简洁，逻辑委托给各命令处理器
//! - 错误处理：详细/安静错误模式，通过 --verbose 切换

use clap::Parser;
use envreg::app::Application;
use envreg::application::services::Operation;
use envreg::cli::{self, Cli, Commands};
use envreg::commands::backup::BackupCommand;
use envreg::commands::commit::CommitCommand;
use envreg::commands::convert::ConvertCommand;
use envreg::commands::diff::DiffCommand;
use envreg::commands::list::ListCommand;
use envreg::commands::restore::RestoreCommand;
use envreg::commands::stage::{StageCommand, StageEdit};
use envreg::commands::status::StatusCommand;
use envreg::commands::{CommandContext, CommandHandler};
use envreg::config::AppConfig;
use envreg::domain::models::OutputFormat;
use envreg::domain::{DomainError, Result};
use envreg::infrastructure::paths;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()).await {
        Ok(config) => config.with_overrides(cli.verbose, cli.dry_run),
        Err(e) => {
            e.report(cli.verbose);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let verbose = config.verbose;
    let ctx = CommandContext {
        verbose,
        dry_run: config.dry_run,
    };

    let config_path = cli.config.clone();
    let result = match Application::new(config).await {
        Ok(app) => run_command(cli.command, &app, config_path, &ctx).await,
        Err(e) => Err(match e.downcast::<DomainError>() {
            Ok(domain) => domain,
            Err(other) => DomainError::Gateway(format!("{:#}", other)),
        }),
    };

    if let Err(e) = result {
        e.report(verbose);
        std::process::exit(1);
    }
}

/// 日志输出到 stderr：RUST_LOG 优先，其次配置文件，最后按 --verbose 选择
fn init_logging(config: &AppConfig) {
    let directive = config.log_directive();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&directive))
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// 运行具体命令
async fn run_command(
    command: Commands,
    app: &Application,
    config_path: Option<std::path::PathBuf>,
    ctx: &CommandContext,
) -> Result<()> {
    let controller = app.controller.clone();

    let handler: Box<dyn CommandHandler> = match command {
        Commands::List {
            scope,
            format,
            filter,
            pattern,
        } => {
            let scope = scope.as_deref().map(cli::parse_scope).transpose()?;
            Box::new(ListCommand::new(
                controller,
                scope,
                OutputFormat::from(format.as_str()),
                filter,
                pattern,
            ))
        }

        Commands::Backup { file } => {
            let path = match file {
                Some(path) => path,
                None => {
                    let format = app.config.backup_format()?;
                    paths::default_backup_path(app.config.backup_dir.as_deref())?
                        .with_extension(format.extension())
                }
            };
            Box::new(BackupCommand::new(controller, path))
        }

        Commands::Convert { input, output } => Box::new(ConvertCommand::new(input, output)),

        Commands::Diff {
            file,
            filter,
            pattern,
            format,
        } => Box::new(DiffCommand::new(
            controller,
            file,
            filter,
            pattern,
            OutputFormat::from(format.as_str()),
        )),

        Commands::Stage {
            file,
            name,
            scope,
            value,
            kind,
            push,
            pull,
            replace,
        } => {
            let edit = StageEdit {
                value,
                kind: kind.as_deref().map(cli::parse_kind).transpose()?,
                push,
                pull,
                replace: replace.as_deref().map(cli::parse_replacement).transpose()?,
            };
            Box::new(StageCommand::new(
                controller,
                file,
                name,
                cli::parse_scope(&scope)?,
                edit,
            ))
        }

        Commands::Write {
            file,
            keys,
            skip_diff,
            yes,
        } => Box::new(
            CommitCommand::new(controller, file, Operation::Write, keys, app.is_elevated())
                .skip_diff(skip_diff && yes),
        ),

        Commands::Modify { file, keys } => Box::new(CommitCommand::new(
            controller,
            file,
            Operation::Modify,
            keys,
            app.is_elevated(),
        )),

        Commands::Delete {
            file,
            keys,
            skip_diff,
            yes,
        } => Box::new(
            CommitCommand::new(controller, file, Operation::Delete, keys, app.is_elevated())
                .skip_diff(skip_diff && yes),
        ),

        Commands::Apply { file } => Box::new(CommitCommand::new(
            controller,
            file,
            Operation::ApplyAll,
            Vec::new(),
            app.is_elevated(),
        )),

        Commands::Restore { file, keys } => Box::new(RestoreCommand::new(controller, file, keys)),

        Commands::Status => Box::new(StatusCommand::new(app.config.clone(), config_path)),
    };

    handler.execute(ctx).await
}
