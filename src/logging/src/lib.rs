use log::info;

fn builder() -> env_logger::Builder {
    use chrono::Utc;
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        let level_style = buf.default_level_style(record.level());
        writeln!(
            buf,
            "[{} {} {}:{}] {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            level_style.value(record.level()),
            record.file().unwrap_or("<unnamed>"),
            record.line().unwrap_or(0),
            &record.args()
        )
    });
    builder
}

/// Install the global logger. Panics if a logger is already set.
pub fn init_log() {
    builder().init();
    info!("env_logger initialized");
}

/// Like `init_log`, but tolerates being called more than once, e.g. from
/// several tests in the same binary.
pub fn try_init_log() {
    if builder().is_test(true).try_init().is_ok() {
        info!("env_logger initialized");
    }
}
