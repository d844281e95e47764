use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;

/// Log target used for text printed by guest code.
pub const GUEST_LOG_TARGET: &str = "nabu_script::guest";

/// Modules quieted by [`LoggingConfig::quiet_gpu_stack`].
const GPU_STACK: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g.
/// "nabu_bridge=debug,wgpu_core=warn") and overrides everything else here.
/// Without it `RUST_LOG` is honored, then the defaults below apply.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Default level for the host and bridge.
    pub level: LevelFilter,
    /// Level for guest `print` output.
    pub guest_level: LevelFilter,
    /// Caps wgpu and naga at `Warn`.
    pub quiet_gpu_stack: bool,
    /// Routes output through the test harness capture.
    pub is_test: bool,
}

impl LoggingConfig {
    /// Settings for integration tests: debug output, captured per test.
    pub fn for_tests() -> Self {
        Self {
            level: LevelFilter::Debug,
            is_test: true,
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            level: LevelFilter::Info,
            guest_level: LevelFilter::Info,
            quiet_gpu_stack: true,
            is_test: false,
        }
    }
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the global logger.
///
/// Returns `true` if this call installed it. Later calls, or a logger set up
/// elsewhere, leave the existing one in place.
pub fn init_logging(config: LoggingConfig) -> bool {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }

    let mut builder = env_logger::Builder::new();
    builder.write_style(config.write_style);
    builder.is_test(config.is_test);

    match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder.filter_level(config.level);
            builder.filter_module(GUEST_LOG_TARGET, config.guest_level);
            if config.quiet_gpu_stack {
                for module in GPU_STACK {
                    builder.filter_module(module, config.level.min(LevelFilter::Warn));
                }
            }
        }
    }

    builder.try_init().is_ok()
}
