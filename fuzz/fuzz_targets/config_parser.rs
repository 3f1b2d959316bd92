#![no_main]

use libfuzzer_sys::fuzz_target;
use loop_profiler::ProfilerConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and validation must reject bad input without panicking
        if let Ok(config) = ProfilerConfig::from_toml_str(input) {
            assert!(config.interval > 0.0);
            assert!(config.max_samples > 0);
            let _ = config.interval_duration();
        }
    }
});
