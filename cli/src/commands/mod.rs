//! Command implementations

pub mod create;
pub mod destroy;
pub mod exec;
pub mod keygen;
pub mod status;

use crate::domain::ExternalState;
use crate::output::OutputContext;

/// Print the connection details of a recorded zone. The password is never
/// echoed; it lives in the state file only.
pub(crate) fn print_record(state: &ExternalState, ctx: &OutputContext) {
    let Some(zone_id) = state.zone_id.as_deref() else {
        ctx.info("No zone recorded.");
        return;
    };
    ctx.header("Zone");
    ctx.kv("zone", zone_id);
    if let Some(host) = &state.hostname {
        ctx.kv("host", host);
    }
    if let Some(user) = &state.username {
        ctx.kv("username", user);
    }
    if let Some(key) = &state.ssh_key {
        ctx.kv("ssh key", &key.display().to_string());
    }
    if let Some(created) = &state.created_at {
        ctx.kv("created", &created.to_rfc3339());
    }
    if state.password.is_some() {
        ctx.kv("password", "(stored in state file)");
    }
}
