//! Console scripts driven against a real driver on the simulated platform.

use rsb_bench::console::Console;
use rsb_bench::platform::SimPlatform;

use rsb_core::config::DriverConfig;
use rsb_core::sim::SinkEvent;

use models::OperatingState;

use std::time::Duration;

const WAIT_BUDGET: Duration = Duration::from_secs(10);

async fn console() -> Console {
    let config = DriverConfig::default();
    let platform = SimPlatform::new(&config);
    let driver = platform.attach(config).await.expect("attach");
    Console::new(platform, driver)
}

async fn run(console: &Console, script: &str) -> String {
    let mut output = Vec::new();
    console
        .run(script.as_bytes(), &mut output)
        .await
        .expect("script should run");
    String::from_utf8(output).expect("utf-8 output")
}

async fn wait_for_state(console: &Console, state: OperatingState) {
    let mut states = console.driver().device().subscribe();
    tokio::time::timeout(WAIT_BUDGET, states.wait_for(|current| *current == state))
        .await
        .unwrap_or_else(|_| panic!("Device never reached {state}"))
        .expect("state channel closed");
}

/// **VALUE**: Verifies a scripted session walks the driver through its full cycle.
///
/// **WHY THIS MATTERS**: The console is how the driver is exercised by hand. If
/// its commands did not reach the notifiers, the bench would show a device that
/// never leaves `Init`.
///
/// **BUG THIS CATCHES**: Would catch commands wired to the wrong notifier, or an
/// `enable` write that never reaches the delivery queue.
#[tokio::test]
async fn given_script_when_run_then_driver_follows_companion_lifecycle() {
    // GIVEN: A freshly attached driver
    let console = console().await;

    // WHEN: The link comes up and the companion powers on
    run(&console, "link up\npowerup\n").await;

    // THEN: The device is configured
    wait_for_state(&console, OperatingState::RsbConfigured).await;

    // WHEN: Delivery is enabled
    run(&console, "enable 1\n").await;

    // THEN: The device is enabled
    wait_for_state(&console, OperatingState::RsbEnabled).await;

    // WHEN: The companion crashes
    run(&console, "crash\n").await;

    // THEN: The device falls back to Init
    wait_for_state(&console, OperatingState::Init).await;

    console.close().await;
}

/// **VALUE**: Verifies `status` prints the snapshot and bad lines don't stop the run.
///
/// **WHY THIS MATTERS**: A typo halfway through a long script should be reported
/// and skipped, and the status line is what scripts grep for.
///
/// **BUG THIS CATCHES**: Would catch the loop returning on the first parse error,
/// or `status` printing debug output instead of JSON.
#[tokio::test]
async fn given_bad_line_when_run_then_error_reported_and_status_printed() {
    // GIVEN: An attached driver
    let console = console().await;

    // WHEN: Running a script with a typo followed by status
    let output = run(&console, "bogus\n\nstatus\nquit\nstatus\n").await;

    // THEN: One error, one status line, nothing after quit
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2, "output: {output}");
    assert!(lines[0].starts_with("error:"));
    assert!(lines[1].contains("\"state\":\"Init\""), "status: {}", lines[1]);

    console.close().await;
}

/// **VALUE**: Verifies wheel lines become wheel reports on the input sink.
///
/// **WHY THIS MATTERS**: Wheel movement is the only event that reaches user space.
///
/// **BUG THIS CATCHES**: Would catch the console building events with the wrong
/// sub-id, which the reporter would then drop as diagnostic.
#[tokio::test]
async fn given_wheel_line_when_run_then_sink_receives_wheel_and_sync() {
    // GIVEN: An attached driver
    let console = console().await;

    // WHEN: Sending a wheel event and a diagnostic event
    run(&console, "wheel 4\nevent 9 1\n").await;

    // THEN: Only the wheel event reaches the sink
    assert_eq!(
        console.platform().sink.events(),
        vec![SinkEvent::Wheel(4), SinkEvent::Sync]
    );

    console.close().await;
}
