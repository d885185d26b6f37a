//! `EventLogger::init` installs the process-global subscriber, so this test
//! runs in its own binary to avoid racing `#[traced_test]` for the slot.

use churnsim_telemetry::EventLogger;

#[test]
fn second_init_is_refused() {
    let _ = EventLogger::init("warn");
    assert!(!EventLogger::init("debug"));
}
