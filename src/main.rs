use std::{
    fs,
    process::ExitCode,
    time::{Duration, Instant},
};

use cachesim::{
    error::{Error, Result},
    trace::{Trace, TraceSource},
    Cache, CacheConfig, CacheStats, Config, LogWriteBack, Record,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(pico_args::Arguments::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(mut args: pico_args::Arguments) -> Result<()> {
    let limit: Option<u64> = args.opt_value_from_str("-i")?;
    let heartbeat_int: u64 = args.opt_value_from_str("--heartbeat")?.unwrap_or(0);

    let config = read_config(&mut args)?;
    let mut caches: Vec<(Cache<LogWriteBack>, Duration)> = config
        .to_caches()?
        .into_iter()
        .map(|cache| (cache, Duration::ZERO))
        .collect();

    let stats_path: Option<String> = args.opt_value_from_str("--json")?;
    let trace_path: String = args
        .opt_value_from_str("-t")?
        .ok_or(Error::MissingArgument("-t <trace>"))?;
    let records_per_block: usize = args
        .opt_value_from_str("--buffer-size")?
        .unwrap_or(1024 * 16);
    let blocks_per_queue: usize = args.opt_value_from_str("--queue-size")?.unwrap_or(32);

    let unused = args.finish();
    if !unused.is_empty() {
        warn!("ignoring unused arguments: {unused:?}");
    }

    let trace = Trace::open(
        TraceSource::from(trace_path.as_str()),
        records_per_block,
        blocks_per_queue,
    )?;
    info!(source = %trace_path, caches = caches.len(), "simulating");

    let mut processed = 0;
    let mut next_heartbeat = heartbeat_int;
    for block in trace.rec.iter() {
        let done = operate(&mut caches, &block, &mut processed, limit);
        if heartbeat_int != 0 && processed >= next_heartbeat {
            info!("records: {processed}");
            while next_heartbeat <= processed {
                next_heartbeat += heartbeat_int;
            }
        }
        if done {
            break;
        }
    }

    let summary = trace.finish()?;
    info!(
        lines = summary.lines,
        skipped = summary.skipped,
        "ran {processed} records"
    );

    for (cache, elapsed) in &caches {
        println!(
            "{}: miss rate {:.2}%, {:.2}s",
            cache.name(),
            cache.miss_rate(),
            elapsed.as_secs_f64()
        );
    }

    if let Some(stats_path) = stats_path {
        let stats = caches
            .iter()
            .map(|(cache, elapsed)| CacheStats {
                elapsed_secs: elapsed.as_secs_f64(),
                ..cache.make_stats()
            })
            .collect::<Vec<_>>();
        let stats_file = fs::File::create(stats_path)?;
        serde_json::to_writer_pretty(stats_file, &stats)?;
    }
    Ok(())
}

/// `--config <json>`, `-p <path>`, or a single cache from `-s -l -a -r`.
fn read_config(args: &mut pico_args::Arguments) -> Result<Config> {
    if let Some(config_str) = args.opt_value_from_str::<_, String>("--config")? {
        return Ok(serde_json::from_str(&config_str)?);
    }
    if let Some(config_path) = args.opt_value_from_str::<_, String>("-p")? {
        let config_str = fs::read_to_string(config_path)?;
        return Ok(serde_json::from_str(&config_str)?);
    }

    let cache_size: u64 = args
        .opt_value_from_str("-s")?
        .ok_or(Error::MissingArgument("-s <cache size>, --config or -p"))?;
    let line_size: u64 = args
        .opt_value_from_str("-l")?
        .ok_or(Error::MissingArgument("-l <line size>"))?;
    let ways: u32 = args
        .opt_value_from_str("-a")?
        .ok_or(Error::MissingArgument("-a <ways>"))?;
    let policy: String = args
        .opt_value_from_str("-r")?
        .unwrap_or_else(|| "LRU".to_owned());

    Ok(Config::single(CacheConfig::new(
        cache_size, line_size, ways, &policy,
    )))
}

/// Feeds `records` to every cache, timing each one. Returns true once
/// `limit` is reached; records past the limit are not applied.
fn operate(
    caches: &mut [(Cache<LogWriteBack>, Duration)],
    records: &[Record],
    processed: &mut u64,
    limit: Option<u64>,
) -> bool {
    let take = limit.map_or(records.len(), |limit| {
        let left = limit.saturating_sub(*processed);
        usize::try_from(left).map_or(records.len(), |left| left.min(records.len()))
    });
    let records = &records[..take];

    for (cache, elapsed) in caches.iter_mut() {
        let start = Instant::now();
        for record in records {
            cache.access(record.address, record.kind);
        }
        *elapsed += start.elapsed();
    }
    *processed += take as u64;

    limit.is_some_and(|limit| *processed >= limit)
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, io::Write as _};

    use cachesim::{AccessKind, ConfigError};
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(list: &[&str]) -> pico_args::Arguments {
        pico_args::Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    fn sim(config: Config) -> Vec<(Cache<LogWriteBack>, Duration)> {
        config
            .to_caches()
            .unwrap()
            .into_iter()
            .map(|cache| (cache, Duration::ZERO))
            .collect()
    }

    fn reads(addresses: &[u64]) -> Vec<Record> {
        addresses
            .iter()
            .map(|&address| Record {
                address,
                kind: AccessKind::Read,
            })
            .collect()
    }

    #[test]
    fn single_cache_from_flags() {
        let config = read_config(&mut args(&["-s", "1024", "-l", "64", "-a", "4", "-r", "fifo"]))
            .unwrap();
        assert_eq!(config, Config::single(CacheConfig::new(1024, 64, 4, "fifo")));
    }

    #[test]
    fn policy_flag_defaults_to_lru() {
        let config = read_config(&mut args(&["-s", "1024", "-l", "64", "-a", "4"])).unwrap();
        assert_eq!(config.caches[0].policy, "LRU");
    }

    #[test]
    fn inline_config_wins_over_flags() {
        let json = r#"{ "caches": [ { "name": "a", "cache_size": 256, "line_size": 16, "ways": 2 } ] }"#;
        let config = read_config(&mut args(&["--config", json, "-s", "1024"])).unwrap();
        assert_eq!(config.caches.len(), 1);
        assert_eq!(config.caches[0].name, "a");
    }

    #[test]
    fn config_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "caches": [
                { "cache_size": 256, "line_size": 16, "ways": 2, "policy": "LFU" },
                { "cache_size": 512, "line_size": 16, "ways": 4, "policy": "FIFO" }
            ] }"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();
        let config = read_config(&mut args(&["-p", path])).unwrap();
        assert_eq!(
            config.caches,
            vec![
                CacheConfig::new(256, 16, 2, "LFU"),
                CacheConfig::new(512, 16, 4, "FIFO"),
            ]
        );
    }

    #[test]
    fn missing_geometry_flags() {
        let err = read_config(&mut args(&["-s", "1024", "-a", "4"])).unwrap_err();
        assert!(matches!(err, Error::MissingArgument("-l <line size>")));
    }

    #[test]
    fn invalid_cache_aborts_before_trace_opens() {
        // The trace does not exist; the config error must win.
        let err = run(args(&["-s", "1024", "-l", "48", "-a", "1", "-t", "/nonexistent/trace"]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::SizeNotMultiple {
                cache_size: 1024,
                line_size: 48
            })
        ));

        let err = run(args(&["-s", "1024", "-l", "64", "-a", "1", "-t", "/nonexistent/trace"]))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn limit_inside_block_stops_there() {
        let mut caches = sim(Config::single(CacheConfig::new(64, 1, 1, "LRU")));
        let mut processed = 0;

        let done = operate(&mut caches, &reads(&[0, 1, 2, 3, 4]), &mut processed, Some(3));
        assert!(done);
        assert_eq!(processed, 3);
        assert_eq!(caches[0].0.stats().accesses(), 3);

        // Nothing more is applied once the limit is met.
        let done = operate(&mut caches, &reads(&[5, 6]), &mut processed, Some(3));
        assert!(done);
        assert_eq!(processed, 3);
        assert_eq!(caches[0].0.stats().accesses(), 3);
    }

    #[test]
    fn unlimited_feeds_every_cache() {
        let mut caches = sim(Config {
            caches: vec![
                CacheConfig::new(64, 1, 1, "LRU"),
                CacheConfig::new(64, 1, 2, "FIFO"),
            ],
        });
        let mut processed = 0;
        assert!(!operate(&mut caches, &reads(&[0, 1, 0]), &mut processed, None));
        assert!(!operate(&mut caches, &reads(&[1]), &mut processed, None));
        assert_eq!(processed, 4);
        for (cache, _) in &caches {
            assert_eq!(cache.stats().accesses(), 4);
            assert_eq!(cache.stats().hits(), 2);
        }
    }
}
