//! Property-based tests for name generation and zone controller parsing.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use zonekit_cli::domain::zone::{
    ZoneListing, generate_zone_name, is_valid_zone_name, presence_from,
};
use zonekit_cli::domain::zonecmd;
use zonekit_cli::domain::{CapabilityTier, CommandResult, ZoneStatus};

// ============================================================================
// generate_zone_name() property tests
// ============================================================================

proptest! {
    /// Generated names are `<prefix>-` plus 16 hex chars and are legal zone names.
    #[test]
    fn prop_zone_name_has_valid_format(prefix in "[a-z][a-z0-9-]{0,31}") {
        let name = generate_zone_name(&prefix);
        let suffix = name.strip_prefix(&format!("{prefix}-")).expect("prefix kept");
        prop_assert_eq!(suffix.len(), 16);
        prop_assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()), "non-hex: {}", name);
        prop_assert!(is_valid_zone_name(&name), "illegal zone name: {}", name);
    }
}

#[test]
fn test_zone_name_uniqueness_batch() {
    let names: std::collections::HashSet<_> =
        (0..1000).map(|_| generate_zone_name("zonekit")).collect();
    assert_eq!(names.len(), 1000, "duplicate names generated");
}

// ============================================================================
// Tier classification
// ============================================================================

proptest! {
    /// Every release up to 5.10 is legacy, everything newer is current.
    #[test]
    fn prop_tier_boundary(major in 0u32..20, minor in 0u32..40) {
        let tier = CapabilityTier::from_release(&format!("{major}.{minor}\n")).expect("parses");
        let expected = if (major, minor) <= (5, 10) {
            CapabilityTier::Legacy
        } else {
            CapabilityTier::Current
        };
        prop_assert_eq!(tier, expected);
    }

    /// Non-numeric releases never classify.
    #[test]
    fn prop_non_numeric_release_is_unknown(release in "[a-z]{1,10}") {
        prop_assert!(CapabilityTier::from_release(&release).is_err());
    }
}

// ============================================================================
// zoneadm list parsing
// ============================================================================

proptest! {
    /// A successful listing always yields an existing status.
    #[test]
    fn prop_listing_reports_existing_zone(
        name in "[a-z][a-z0-9-]{0,20}",
        state in prop::sample::select(vec!["configured", "incomplete", "installed", "ready", "running"]),
    ) {
        let line = format!("-:{name}:{state}:/zones/{name}:uuid:native:shared\n");
        let result = CommandResult::from_streams(line.clone().into_bytes(), Vec::new(), 0);
        let status = presence_from(&name, &result).expect("parses");
        prop_assert!(status.exists());
        prop_assert_eq!(status == ZoneStatus::Running, state == "running");
        prop_assert_eq!(ZoneListing::parse(&line).expect("parses").name, name);
    }

    /// "No such zone" on any non-zero exit means absent.
    #[test]
    fn prop_no_such_zone_is_absent(code in 1i32..255, name in "[a-z]{1,10}") {
        let stderr = format!("zoneadm: {name}: No such zone configured\n");
        let result = CommandResult::from_streams(Vec::new(), stderr.into_bytes(), code);
        prop_assert_eq!(presence_from(&name, &result).expect("absent"), ZoneStatus::Absent);
    }
}

// ============================================================================
// Command quoting
// ============================================================================

proptest! {
    /// Hostile names never escape their single-quoted argument.
    #[test]
    fn prop_halt_quotes_hostile_names(name in "[a-z]{1,5}[;&|$ ][a-z ]{1,5}") {
        let cmd = zonecmd::halt(&name);
        let quoted = cmd
            .strip_prefix("/usr/sbin/zoneadm -z '")
            .and_then(|rest| rest.strip_suffix("' halt"));
        prop_assert!(quoted.is_some(), "unquoted: {}", cmd);
    }
}
