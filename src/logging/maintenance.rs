//! 历史日志整理: 压缩与过期删除.

use super::{LoggingConfig, build_current_log_path};
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 整理日志目录
///
/// 早于 `retention_days` 的日志被删除; 开启 `compress_history` 时,
/// 今天之前的未压缩日志被压缩为 `.log.gz`. 返回处理的文件数.
pub fn run_maintenance(config: &LoggingConfig) -> Result<usize> {
    let today = Local::now().date_naive();
    cleanup_logs(config, today)
}

fn cleanup_logs(config: &LoggingConfig, today: NaiveDate) -> Result<usize> {
    let directory = Path::new(&config.directory);
    if !directory.exists() {
        return Ok(0);
    }

    let cutoff = today - ChronoDuration::days(config.retention_days);
    let current = build_current_log_path(directory, &config.file_prefix, today);
    let mut handled = 0;

    let entries = fs::read_dir(directory)
        .with_context(|| format!("读取日志目录失败, path={}", directory.display()))?;
    for entry in entries {
        let entry = entry?;
        let file_path = entry.path();
        if file_path == current {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((date, compressed)) = parse_rotated_log_name(&file_name, &config.file_prefix)
        else {
            continue;
        };

        if date < cutoff {
            match fs::remove_file(&file_path) {
                Ok(()) => handled += 1,
                Err(err) => warn!("删除过期日志失败: {}, {}", file_path.display(), err),
            }
            continue;
        }

        if config.compress_history && !compressed && date < today {
            match compress_to_gz(&file_path) {
                Ok(()) => handled += 1,
                Err(err) => warn!("压缩历史日志失败: {:#}", err),
            }
        }
    }

    Ok(handled)
}

fn compress_to_gz(path: &Path) -> Result<()> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(());
    }

    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)
        .with_context(|| format!("写入压缩日志失败, path={}", gz_path.display()))?;
    encoder.finish()?;

    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(())
}

fn parse_rotated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let with_dot = file_name.strip_prefix(prefix)?.strip_prefix('.')?;

    if let Some(date_part) = with_dot.strip_suffix(".log") {
        return Some((parse_date(date_part)?, false));
    }
    if let Some(date_part) = with_dot.strip_suffix(".log.gz") {
        return Some((parse_date(date_part)?, true));
    }
    None
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
