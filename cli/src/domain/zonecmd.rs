//! Command lines for the zone controller on the control host.
//!
//! Every builder returns one shell command string for the secure channel.
//! Values that come from configuration or generated names are always quoted.

use std::borrow::Cow;

use shell_escape::escape;

const ZONEADM: &str = "/usr/sbin/zoneadm";
const ZONECFG: &str = "/usr/sbin/zonecfg";
const ZLOGIN: &str = "/usr/sbin/zlogin";

/// Everything needed to configure a new zone.
#[derive(Debug, Clone)]
pub struct ZoneDefinition<'a> {
    pub name: &'a str,
    pub address: &'a str,
    /// Parent directory of zone roots, e.g. `/zones`.
    pub zone_root: &'a str,
    /// Physical interface the zone's address is plumbed on.
    pub interface: &'a str,
}

impl ZoneDefinition<'_> {
    fn zonepath(&self) -> String {
        format!("{}/{}", self.zone_root.trim_end_matches('/'), self.name)
    }
}

fn q(value: &str) -> Cow<'_, str> {
    escape(Cow::Borrowed(value))
}

#[must_use]
pub fn uname_release() -> String {
    "uname -r".to_string()
}

/// Trivial command used to prove the channel authenticates.
#[must_use]
pub fn reachability_check() -> String {
    "true".to_string()
}

#[must_use]
pub fn list(name: &str) -> String {
    format!("{ZONEADM} -z {} list -p", q(name))
}

/// Configure a brand-new zone from the blank template.
#[must_use]
pub fn configure(def: &ZoneDefinition<'_>) -> String {
    let script = format!(
        "create -b; set zonepath={}; set autoboot=false; set ip-type=shared; \
add net; set physical={}; set address={}; end; verify; commit",
        def.zonepath(),
        def.interface,
        def.address,
    );
    format!("{ZONECFG} -z {} {}", q(def.name), q(&script))
}

/// Configure a zone as a copy of `template`'s configuration.
#[must_use]
pub fn configure_from(def: &ZoneDefinition<'_>, template: &str) -> String {
    let script = format!(
        "create -t {template}; set zonepath={}; select net physical={}; set address={}; end; \
verify; commit",
        def.zonepath(),
        def.interface,
        def.address,
    );
    format!("{ZONECFG} -z {} {}", q(def.name), q(&script))
}

#[must_use]
pub fn install(name: &str) -> String {
    format!("{ZONEADM} -z {} install", q(name))
}

#[must_use]
pub fn clone(name: &str, template: &str) -> String {
    format!("{ZONEADM} -z {} clone {}", q(name), q(template))
}

#[must_use]
pub fn boot(name: &str) -> String {
    format!("{ZONEADM} -z {} boot", q(name))
}

#[must_use]
pub fn halt(name: &str) -> String {
    format!("{ZONEADM} -z {} halt", q(name))
}

#[must_use]
pub fn uninstall(name: &str) -> String {
    format!("{ZONEADM} -z {} uninstall -F", q(name))
}

#[must_use]
pub fn delete(name: &str) -> String {
    format!("{ZONECFG} -z {} delete -F", q(name))
}

/// Shell script, run inside a zone, that replaces root's password hash in
/// `/etc/shadow`.
///
/// `cat >` rewrites the file in place so its owner and mode are kept.
#[must_use]
pub fn set_root_hash_script(password_hash: &str) -> String {
    format!(
        "/usr/bin/nawk -F: -v OFS=: -v h={} '$1 == \"root\" {{ $2 = h }} {{ print }}' \
/etc/shadow > /etc/shadow.zonekit && cat /etc/shadow.zonekit > /etc/shadow && \
rm -f /etc/shadow.zonekit",
        q(password_hash)
    )
}

/// Install root's password hash and an authorized key inside a running zone.
///
/// Only the `crypt(3C)` hash reaches the control host's command line.
#[must_use]
pub fn inject_credentials(name: &str, password_hash: &str, authorized_key: Option<&str>) -> String {
    let mut script = set_root_hash_script(password_hash);
    if let Some(key) = authorized_key {
        script.push_str(&format!(
            " && mkdir -p /root/.ssh && chmod 700 /root/.ssh && echo {} >> /root/.ssh/authorized_keys \
&& chmod 600 /root/.ssh/authorized_keys",
            q(key.trim())
        ));
    }
    format!("{ZLOGIN} {} {}", q(name), q(&script))
}

#[must_use]
pub fn lease_path(template: &str) -> String {
    format!("/var/tmp/zonekit-{template}.lease")
}

/// Atomically take the template lease; fails if it is already held.
#[must_use]
pub fn lease_acquire(template: &str) -> String {
    format!("mkdir {}", q(&lease_path(template)))
}

#[must_use]
pub fn lease_release(template: &str) -> String {
    format!("rmdir {}", q(&lease_path(template)))
}
