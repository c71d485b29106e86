use anyhow::{anyhow, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::{
    roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::fs;
use std::path::Path;

const LOG_FILE_SIZE_LIMIT: u64 = 10 * 1024 * 1024;
const LOG_ARCHIVE_COUNT: u32 = 3;

/// Crates that are too chatty at the root level; sqlx logs every statement
const QUIET_TARGETS: [&str; 3] = ["sqlx", "reqwest", "hyper"];

/// Console plus rolling `<log_dir>/logs/sync.log`, at the level from settings
pub fn build_config(log_dir: &Path, level: LevelFilter) -> Result<Config> {
    let logs_dir = log_dir.join("logs");
    fs::create_dir_all(&logs_dir)?;

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{h({l})} {d(%Y-%m-%d %H:%M:%S)} {M} - {m}{n}",
        )))
        .build();

    let archive_pattern = logs_dir.join("sync.{}.log.gz");
    let roller = FixedWindowRoller::builder().base(1).build(
        archive_pattern
            .to_str()
            .ok_or_else(|| anyhow!("Non utf-8 log directory"))?,
        LOG_ARCHIVE_COUNT,
    )?;
    let policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(LOG_FILE_SIZE_LIMIT)),
        Box::new(roller),
    );

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {M}::{m}{n}")))
        .build(logs_dir.join("sync.log"), Box::new(policy))?;

    let quiet_level = level.min(LevelFilter::Warn);
    let mut builder = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file", Box::new(file)));
    for target in QUIET_TARGETS {
        builder = builder.logger(Logger::builder().build(target, quiet_level));
    }

    let config = builder.build(
        Root::builder()
            .appender("stdout")
            .appender("file")
            .build(level),
    )?;
    Ok(config)
}

pub async fn setup_logging(log_dir: &Path, level: LevelFilter) -> Result<()> {
    log4rs::init_config(build_config(log_dir, level)?)?;
    Ok(())
}
