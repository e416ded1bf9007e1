//! Tests for the create workflow against the simulated zone host.

use zonekit_cli::application::services::create_zone;
use zonekit_cli::domain::{ExternalState, ZoneError};

use crate::helpers::{FakeHost, PUBLIC_KEY, RecordingReporter, StaticKeys, TEMPLATE, config};

async fn create(host: &FakeHost) -> anyhow::Result<ExternalState> {
    create_zone(
        &host.connector(),
        &StaticKeys,
        &config(),
        &RecordingReporter::default(),
        ExternalState::default(),
    )
    .await
}

fn assert_all_sessions_closed(host: &FakeHost) {
    let st = host.state();
    assert!(st.opened > 0, "no session was opened");
    assert_eq!(st.opened, st.closed, "sessions leaked");
}

// ── Current tier ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_current_tier_creates_zone_directly() {
    let host = FakeHost::current();
    let state = create(&host).await.expect("create");

    let zone_id = state.zone_id.clone().expect("zone id recorded");
    assert!(zone_id.starts_with("zonekit-"), "got: {zone_id}");
    assert_eq!(host.zone_state(&zone_id).as_deref(), Some("running"));
    assert_eq!(state.hostname.as_deref(), Some("192.0.2.20"));
    assert_eq!(state.username.as_deref(), Some("root"));
    assert_eq!(state.password.as_deref(), Some("zone-pw"));
    assert_eq!(state.ssh_key.as_deref(), Some(std::path::Path::new("/keys/id_rsa")));
    assert!(state.created_at.is_some());

    assert_eq!(host.count("mkdir"), 0, "current tier must not take the lease");
    assert!(host.zone_state(TEMPLATE).is_none(), "no template on current tier");
    assert_eq!(host.count(" clone "), 0);
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_public_key_is_injected_into_zone() {
    let host = FakeHost::current();
    create(&host).await.expect("create");
    let injected = host
        .log()
        .into_iter()
        .find(|c| c.starts_with("/usr/sbin/zlogin"))
        .expect("credentials injected");
    assert!(injected.contains("AAAAB3NzaC1yc2EAAAADAQABAAABAQC7"), "got: {injected}");
    assert!(PUBLIC_KEY.starts_with("ssh-rsa"));
}

#[tokio::test]
async fn test_root_password_reaches_host_only_as_shadow_hash() {
    let host = FakeHost::current();
    create(&host).await.expect("create");

    assert!(
        host.log().iter().all(|c| !c.contains("zone-pw")),
        "plaintext password on a remote command line"
    );
    let injected = host
        .log()
        .into_iter()
        .find(|c| c.starts_with("/usr/sbin/zlogin"))
        .expect("credentials injected");
    assert!(injected.contains("/etc/shadow"), "got: {injected}");
    let start = injected.find("$5$").expect("sha256-crypt hash");
    let hash: String = injected[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '$' | '.' | '/'))
        .collect();
    assert!(sha_crypt::sha256_check("zone-pw", &hash).is_ok(), "hash: {hash}");
}

#[tokio::test]
async fn test_existing_state_fields_are_kept() {
    let host = FakeHost::current();
    let input = ExternalState {
        username: Some("ignored".to_string()),
        ..ExternalState::default()
    };
    let state = create_zone(
        &host.connector(),
        &StaticKeys,
        &config(),
        &RecordingReporter::default(),
        input,
    )
    .await
    .expect("create");
    assert_eq!(state.username.as_deref(), Some("root"));
}

// ── Legacy tier ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_legacy_first_run_creates_template_once_and_leaves_it_halted() {
    let host = FakeHost::legacy();
    let state = create(&host).await.expect("create");

    assert_eq!(host.count(&format!("zonecfg -z {TEMPLATE} 'create")), 1);
    assert_eq!(host.count(&format!("zoneadm -z {TEMPLATE} install")), 1);
    assert_eq!(host.zone_state(TEMPLATE).as_deref(), Some("installed"));

    let zone_id = state.zone_id.expect("zone id");
    assert_eq!(host.count(&format!("zoneadm -z {zone_id} clone {TEMPLATE}")), 1);
    assert_eq!(host.zone_state(&zone_id).as_deref(), Some("running"));
    assert!(host.state().leases.is_empty(), "lease must be released");
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_legacy_second_run_reuses_template() {
    let host = FakeHost::legacy();
    let first = create(&host).await.expect("first create");
    let second = create(&host).await.expect("second create");

    assert_ne!(first.zone_id, second.zone_id);
    assert_eq!(
        host.count(&format!("zonecfg -z {TEMPLATE} 'create")),
        1,
        "template must only be created by the first run"
    );
    assert_eq!(host.count(&format!(" clone {TEMPLATE}")), 2);
}

#[tokio::test]
async fn test_legacy_running_template_is_halted_before_clone() {
    let host = FakeHost::legacy().with_zone(TEMPLATE, "running");
    create(&host).await.expect("create");

    let log = host.log();
    let halt = log
        .iter()
        .position(|c| c == &format!("/usr/sbin/zoneadm -z {TEMPLATE} halt"))
        .expect("template halted");
    let clone = log
        .iter()
        .position(|c| c.contains(" clone "))
        .expect("clone issued");
    assert!(halt < clone);
    assert_eq!(host.count(&format!("zonecfg -z {TEMPLATE} 'create")), 0);
}

#[tokio::test]
async fn test_legacy_failure_releases_lease_and_sessions() {
    let host = FakeHost::legacy();
    host.state().fail_op = Some("clone".to_string());

    let err = create(&host).await.expect_err("clone fails");
    let zone_err = err.downcast_ref::<ZoneError>().expect("zone error");
    assert!(
        matches!(zone_err, ZoneError::ControllerCommand { operation: "clone", .. }),
        "got: {zone_err:?}"
    );
    assert!(host.state().leases.is_empty(), "lease must be released on failure");
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_legacy_held_lease_times_out() {
    let host = FakeHost::legacy();
    host.state()
        .leases
        .insert(format!("/var/tmp/zonekit-{TEMPLATE}.lease"));

    let err = create(&host).await.expect_err("lease stays held");
    assert!(
        matches!(err.downcast_ref::<ZoneError>(), Some(ZoneError::LeaseTimeout { .. })),
        "got: {err:#}"
    );
    assert_eq!(host.count(" clone "), 0);
    // the other run's lease is untouched
    assert_eq!(host.state().leases.len(), 1);
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_stuck_lease_after_clone_still_records_zone() {
    let host = FakeHost::legacy();
    host.state().fail_op = Some("rmdir".to_string());
    let reporter = RecordingReporter::default();

    let state = create_zone(
        &host.connector(),
        &StaticKeys,
        &config(),
        &reporter,
        ExternalState::default(),
    )
    .await
    .expect("a cloned zone must be recorded");

    let zone_id = state.zone_id.expect("zone id recorded");
    assert_eq!(host.zone_state(&zone_id).as_deref(), Some("running"));
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1, "got: {warnings:?}");
    assert!(warnings[0].contains(".lease"), "got: {warnings:?}");
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_half_built_template_is_rebuilt() {
    let host = FakeHost::legacy().with_zone(TEMPLATE, "incomplete");
    let reporter = RecordingReporter::default();
    let state = create_zone(
        &host.connector(),
        &StaticKeys,
        &config(),
        &reporter,
        ExternalState::default(),
    )
    .await
    .expect("create");

    assert_eq!(
        host.operations_on(&format!("-z {TEMPLATE} "))
            .into_iter()
            .take(4)
            .map(|c| c.split('\'').next().unwrap_or_default().trim().to_string())
            .collect::<Vec<_>>(),
        vec![
            format!("/usr/sbin/zoneadm -z {TEMPLATE} uninstall -F"),
            format!("/usr/sbin/zonecfg -z {TEMPLATE} delete -F"),
            format!("/usr/sbin/zonecfg -z {TEMPLATE}"),
            format!("/usr/sbin/zoneadm -z {TEMPLATE} install"),
        ]
    );
    assert_eq!(host.zone_state(TEMPLATE).as_deref(), Some("installed"));
    assert!(reporter.warnings().iter().any(|w| w.contains("incomplete")));
    let zone_id = state.zone_id.expect("zone id");
    assert_eq!(host.zone_state(&zone_id).as_deref(), Some("running"));
}

#[tokio::test]
async fn test_unclonable_template_state_is_reported() {
    let host = FakeHost::legacy().with_zone(TEMPLATE, "ready");
    let err = create(&host).await.expect_err("ready template");
    assert!(
        matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::TemplateUnusable { state, .. }) if state == "ready"
        ),
        "got: {err:#}"
    );
    assert_eq!(host.count(" clone "), 0);
    assert!(host.state().leases.is_empty(), "lease must be released");
    assert_all_sessions_closed(&host);
}

// ── Control host failures ────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_control_host_is_fatal() {
    let host = FakeHost::current();
    host.state().reachable = false;

    let err = create(&host).await.expect_err("unreachable");
    assert!(
        matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::ControlHostUnreachable { status: 255, .. })
        ),
        "got: {err:#}"
    );
    assert!(host.log().is_empty());
}

#[tokio::test]
async fn test_failed_reachability_check_is_fatal_and_closes_session() {
    let host = FakeHost::current();
    host.state().check_status = 1;

    let err = create(&host).await.expect_err("check fails");
    assert!(
        matches!(
            err.downcast_ref::<ZoneError>(),
            Some(ZoneError::ControlHostUnreachable { status: 1, .. })
        ),
        "got: {err:#}"
    );
    assert_eq!(host.log(), vec!["true".to_string()]);
    assert_all_sessions_closed(&host);
}

#[tokio::test]
async fn test_unknown_release_is_reported() {
    let host = FakeHost::new("unknown");
    let err = create(&host).await.expect_err("unknown tier");
    assert!(
        matches!(err.downcast_ref::<ZoneError>(), Some(ZoneError::UnknownTier(_))),
        "got: {err:#}"
    );
    assert_all_sessions_closed(&host);
}
