use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use stanli_config::{AppConfig, ConfigError};
use stanli_core::package;
use stanli_engine::drawing::Drawing;
use stanli_io::{DescriptionFacade, DrawingLoader, TexFacade};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 将图描述（TOML / JSON）渲染为 stanli TikZ 命令。
#[derive(Debug, Parser)]
#[command(name = "stanli-app", version)]
struct Cli {
    /// 配置文件路径，缺省时自动发现
    #[arg(long)]
    config: Option<PathBuf>,
    /// 覆盖宏包 `.sty` 路径，优先于配置文件
    #[arg(long, value_name = "STY")]
    package: Option<PathBuf>,
    /// 输出完整文档
    #[arg(long)]
    standalone: bool,
    #[arg(long, value_name = "CLASS")]
    document_class: Option<String>,
    /// 存在未声明的点引用时失败
    #[arg(long)]
    check: bool,
    /// 输出文件，缺省写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// 图描述文件；缺省渲染内置示例
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config = load_configuration(cli.config.clone());
    init_logging(&config);
    info!("启动 stanli 渲染");

    if let Err(err) = run(&cli, &config) {
        error!(error = %err, "渲染失败");
        eprintln!("错误: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    // 必须在构造任何实体之前完成，实体在构造时捕获宏包标识。
    if let Some(sty_path) = cli.package.as_ref().or(config.package.sty_path.as_ref()) {
        let active = package::update_global(sty_path);
        info!(package = %active, "已覆盖宏包标识");
    }

    let drawing = match &cli.input {
        Some(path) => DescriptionFacade::new()
            .load(path)
            .with_context(|| format!("加载图描述 {} 失败", path.display()))?,
        None => {
            let mut drawing = Drawing::new();
            drawing.populate_demo();
            drawing
        }
    };

    let unresolved = drawing.unresolved_references();
    if cli.check && !unresolved.is_empty() {
        let names: Vec<String> = unresolved
            .iter()
            .map(|r| format!("#{} {}.{} -> {}", r.entity.get(), r.kind, r.field, r.name))
            .collect();
        bail!("存在未声明的点引用: {}", names.join(", "));
    }

    let facade = if cli.standalone || config.output.standalone {
        let class = cli
            .document_class
            .clone()
            .unwrap_or_else(|| config.output.document_class.clone());
        TexFacade::document(class)
    } else {
        TexFacade::picture()
    };
    let text = facade.render(&drawing)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &text).with_context(|| format!("写入 {} 失败", path.display()))?;
            info!(path = %path.display(), entities = drawing.len(), "已写出 TeX");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出保留给 TeX 内容
    let subscriber = fmt().with_env_filter(filter).with_writer(io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
