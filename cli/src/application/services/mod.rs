//! Application services: zone handles, the template lease, and the
//! create/destroy workflows built on them, plus ad-hoc control host commands.

pub mod provision;
pub mod remote_exec;
pub mod template_lease;
pub mod teardown;
pub mod zone_controller;

pub use provision::create_zone;
pub use remote_exec::run_on_control;
pub use teardown::destroy_zone;
