#![no_main]

use libfuzzer_sys::fuzz_target;

/// Fuzz target for the full loading pipeline
///
/// Arbitrary text must never panic: it either loads or yields an error, and
/// a rejected document always carries at least one violation or a
/// parse error.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let table = experimento::config::scan_anchors(text);
    let anchor_problems = table.check();

    match experimento::load_config_str(text) {
        Ok(config) => {
            assert!(anchor_problems.is_empty());
            assert_eq!(
                config.model.metrics.iter().filter(|m| m.is_main_metric).count(),
                1
            );
            assert!(!config.model.nodes.is_empty());
        }
        Err(experimento::Error::Invalid(errors)) => assert!(!errors.is_empty()),
        Err(_) => {}
    }
});
