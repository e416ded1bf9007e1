//! Tests for mutual exclusion on the template.

use std::time::Duration;

use zonekit_cli::application::ports::ChannelConnector;
use zonekit_cli::application::services::template_lease::{LeaseSettings, TemplateLease};
use zonekit_cli::domain::ZoneError;

use crate::helpers::{FakeHost, TEMPLATE, config};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

fn settings(timeout_ms: u64) -> LeaseSettings {
    LeaseSettings {
        timeout: Duration::from_millis(timeout_ms),
        poll: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn test_second_acquirer_waits_for_release() {
    let host = FakeHost::legacy();
    let connector = host.connector();
    let target = config().control_target();
    let first_channel = connector.connect(&target).await.expect("connect");
    let second_channel = connector.connect(&target).await.expect("connect");

    let first = TemplateLease::acquire(&first_channel, TEMPLATE, settings(1000), COMMAND_TIMEOUT)
        .await
        .expect("first acquire");

    let waiter = TemplateLease::acquire(&second_channel, TEMPLATE, settings(5000), COMMAND_TIMEOUT);
    let releaser = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        first
            .release(&first_channel, COMMAND_TIMEOUT)
            .await
            .expect("release");
    };
    let (second, ()) = tokio::join!(waiter, releaser);
    let second = second.expect("second acquire after release");

    assert!(host.count("mkdir") >= 3, "second run must have polled");
    second
        .release(&second_channel, COMMAND_TIMEOUT)
        .await
        .expect("release");
    assert!(host.state().leases.is_empty());
}

#[tokio::test]
async fn test_lease_held_past_timeout_fails() {
    let host = FakeHost::legacy();
    host.state()
        .leases
        .insert(format!("/var/tmp/zonekit-{TEMPLATE}.lease"));
    let channel = host
        .connector()
        .connect(&config().control_target())
        .await
        .expect("connect");

    let err = TemplateLease::acquire(&channel, TEMPLATE, settings(150), COMMAND_TIMEOUT)
        .await
        .expect_err("timeout");
    assert!(matches!(
        err.downcast_ref::<ZoneError>(),
        Some(ZoneError::LeaseTimeout { .. })
    ));
}

#[tokio::test]
async fn test_releasing_a_missing_lease_is_an_error() {
    let host = FakeHost::legacy();
    let channel = host
        .connector()
        .connect(&config().control_target())
        .await
        .expect("connect");
    let lease = TemplateLease::acquire(&channel, TEMPLATE, settings(100), COMMAND_TIMEOUT)
        .await
        .expect("acquire");
    host.state().leases.clear();

    let err = lease
        .release(&channel, COMMAND_TIMEOUT)
        .await
        .expect_err("lease vanished");
    assert!(matches!(
        err.downcast_ref::<ZoneError>(),
        Some(ZoneError::ControllerCommand { operation: "release lease", .. })
    ));
}
