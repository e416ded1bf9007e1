//! Tests for the zone handle state machine.

use zonekit_cli::application::ports::ChannelConnector;
use zonekit_cli::application::services::zone_controller::{ZoneHandle, ZoneProfile};
use zonekit_cli::domain::{CapabilityTier, Role, ZoneError, ZoneStatus};

use crate::helpers::{FakeChannel, FakeHost, TEMPLATE, config, settings};

fn profile() -> ZoneProfile {
    ZoneProfile {
        address: "192.0.2.40".to_string(),
        password: "pw".to_string(),
        authorized_key: None,
    }
}

async fn handle(host: &FakeHost, role: Role, name: &str) -> ZoneHandle<FakeChannel> {
    let channel = host
        .connector()
        .connect(&config().control_target())
        .await
        .expect("connect");
    ZoneHandle::zone(channel, role, name, profile(), settings())
}

async fn control(host: &FakeHost) -> ZoneHandle<FakeChannel> {
    let channel = host
        .connector()
        .connect(&config().control_target())
        .await
        .expect("connect");
    ZoneHandle::control(channel, settings())
}

fn transition_error(err: &anyhow::Error) -> Option<ZoneStatus> {
    match err.downcast_ref::<ZoneError>() {
        Some(ZoneError::InvalidTransition { status, .. }) => Some(*status),
        _ => None,
    }
}

#[tokio::test]
async fn test_new_handle_status_is_unknown_until_refreshed() {
    let host = FakeHost::current().with_zone("z1", "installed");
    let mut zone = handle(&host, Role::Disposable, "z1").await;
    assert_eq!(zone.status(), ZoneStatus::Unknown);
    assert!(host.log().is_empty(), "constructing a handle must not query");

    assert_eq!(zone.refresh().await.expect("refresh"), ZoneStatus::Stopped);
    assert!(zone.exists().await.expect("exists"));
    assert!(!zone.running().await.expect("running"));
}

#[tokio::test]
async fn test_operations_from_unknown_are_rejected() {
    let host = FakeHost::current();
    let mut zone = handle(&host, Role::Disposable, "z1").await;

    let err = zone.create().await.expect_err("unknown status");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Unknown));
    let err = zone.halt().await.expect_err("unknown status");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Unknown));
    let err = zone.destroy().await.expect_err("unknown status");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Unknown));
    assert!(host.log().is_empty(), "rejected operations must not reach the host");
}

#[tokio::test]
async fn test_create_requires_absent() {
    let host = FakeHost::current().with_zone("z1", "running");
    let mut zone = handle(&host, Role::Disposable, "z1").await;
    zone.refresh().await.expect("refresh");
    let err = zone.create().await.expect_err("already running");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Running));
}

#[tokio::test]
async fn test_lifecycle_walks_the_state_machine() {
    let host = FakeHost::current();
    let mut zone = handle(&host, Role::Disposable, "z1").await;

    assert_eq!(zone.refresh().await.expect("refresh"), ZoneStatus::Absent);
    assert_eq!(zone.create().await.expect("create"), ZoneStatus::Running);
    assert_eq!(host.zone_state("z1").as_deref(), Some("running"));
    assert_eq!(zone.halt().await.expect("halt"), ZoneStatus::Stopped);
    assert_eq!(zone.destroy().await.expect("destroy"), ZoneStatus::Destroyed);
    assert!(host.zone_state("z1").is_none());

    let err = zone.halt().await.expect_err("destroyed is terminal");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Destroyed));
}

#[tokio::test]
async fn test_failed_step_leaves_status_unknown() {
    let host = FakeHost::current();
    host.state().fail_op = Some("install".to_string());
    let mut zone = handle(&host, Role::Disposable, "z1").await;
    zone.refresh().await.expect("refresh");

    zone.create().await.expect_err("install fails");
    assert_eq!(zone.status(), ZoneStatus::Unknown);
    assert_eq!(zone.refresh().await.expect("refresh"), ZoneStatus::Stopped);
}

#[tokio::test]
async fn test_destroy_cleans_up_after_failed_install() {
    let host = FakeHost::current();
    host.state().fail_op = Some("install".to_string());
    let mut zone = handle(&host, Role::Disposable, "z1").await;
    zone.refresh().await.expect("refresh");
    zone.create().await.expect_err("install fails");
    assert_eq!(host.zone_state("z1").as_deref(), Some("incomplete"));

    host.state().fail_op = None;
    zone.refresh().await.expect("refresh");
    assert_eq!(zone.listed_state(), Some("incomplete"));
    assert_eq!(zone.destroy().await.expect("destroy"), ZoneStatus::Destroyed);
    assert!(host.zone_state("z1").is_none());
    assert_eq!(host.count("uninstall -F"), 1);
}

#[tokio::test]
async fn test_halt_then_destroy_does_not_halt_twice() {
    let host = FakeHost::current().with_zone("z1", "running");
    let mut zone = handle(&host, Role::Disposable, "z1").await;
    zone.refresh().await.expect("refresh");
    zone.halt().await.expect("halt");
    assert_eq!(zone.listed_state(), Some("installed"));
    zone.destroy().await.expect("destroy");
    assert_eq!(host.count(" halt"), 1);
}

#[tokio::test]
async fn test_clone_requires_stopped_template() {
    let host = FakeHost::legacy().with_zone(TEMPLATE, "running");
    let mut template = handle(&host, Role::Template, TEMPLATE).await;
    let mut zone = handle(&host, Role::Disposable, "z2").await;
    template.refresh().await.expect("refresh");
    zone.refresh().await.expect("refresh");

    let err = zone.clone_from(&template).await.expect_err("template running");
    assert_eq!(transition_error(&err), Some(ZoneStatus::Running));
    assert_eq!(zone.status(), ZoneStatus::Absent);

    template.halt().await.expect("halt");
    assert_eq!(zone.clone_from(&template).await.expect("clone"), ZoneStatus::Running);
    assert_eq!(host.zone_state(TEMPLATE).as_deref(), Some("installed"));
}

#[tokio::test]
async fn test_control_handle_rejects_zone_operations() {
    let host = FakeHost::current();
    let mut ctl = control(&host).await;
    assert_eq!(ctl.name(), "global");
    assert_eq!(ctl.role(), Role::Control);

    let err = ctl.refresh().await.expect_err("control role");
    assert!(matches!(
        err.downcast_ref::<ZoneError>(),
        Some(ZoneError::ControlRole { .. })
    ));
    assert!(ctl.halt().await.is_err());
    assert!(ctl.destroy().await.is_err());
    assert!(host.log().is_empty());
}

#[tokio::test]
async fn test_verify_connection_reports_check_status() {
    let host = FakeHost::current();
    let ctl = control(&host).await;
    assert_eq!(ctl.verify_connection().await, 0);

    host.state().check_status = 7;
    assert_eq!(ctl.verify_connection().await, 7);
}

#[tokio::test]
async fn test_verify_connection_on_severed_channel_is_255() {
    use zonekit_cli::application::ports::SecureChannel;
    let host = FakeHost::current();
    let ctl = control(&host).await;
    ctl.channel().close().await.expect("close");
    assert_eq!(ctl.verify_connection().await, 255);
}

#[tokio::test]
async fn test_capability_tier_is_detected_once() {
    let host = FakeHost::legacy();
    let mut ctl = control(&host).await;
    assert_eq!(
        ctl.detect_capability_tier().await.expect("tier"),
        CapabilityTier::Legacy
    );
    assert_eq!(
        ctl.detect_capability_tier().await.expect("tier"),
        CapabilityTier::Legacy
    );
    assert_eq!(host.count("uname -r"), 1);
}

#[tokio::test]
async fn test_sever_closes_session_without_touching_zone() {
    let host = FakeHost::current().with_zone("z1", "running");
    let zone = handle(&host, Role::Disposable, "z1").await;
    zone.sever().await.expect("sever");
    assert_eq!(host.state().closed, 1);
    assert_eq!(host.zone_state("z1").as_deref(), Some("running"));
    assert!(host.log().is_empty());
}
