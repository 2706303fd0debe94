//! Host identity, operating system and session probes.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::anonymize::{Anonymizer, IdentifyingMatcher, PLACEHOLDER};
use crate::error::Result;
use crate::group::{GroupArgs, InfoGroup, ProbeKind};
use crate::parse::{to_bool, to_float, to_int, to_str_list};
use crate::source::SourceCache;

const OS_RELEASE: &str = "/etc/os-release";
const UPTIME: &str = "/proc/uptime";
const LOADAVG: &str = "/proc/loadavg";

pub const HOST_INFO: ProbeKind = ProbeKind::new("HostInfo", host_info);
pub const OPERATING_SYSTEM_INFO: ProbeKind =
    ProbeKind::new("OperatingSystemInfo", operating_system_info);
pub const KERNEL_INFO: ProbeKind = ProbeKind::new("KernelInfo", kernel_info);
pub const UPTIME_INFO: ProbeKind = ProbeKind::new("Uptime", uptime);
pub const LOAD_AVG: ProbeKind = ProbeKind::new("LoadAvg", load_avg);
pub const USERS_INFO: ProbeKind = ProbeKind::new("UsersInfo", users_info);
pub const SHELL_ENVIRONMENT: ProbeKind = ProbeKind::new("ShellEnvironment", shell_environment);

fn host_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("HostInfo", args);
    group.add_command("Hostname", "hostname", "-s", None, None)?;
    group.mark_identifying(&["Hostname"]);
    if args.extended {
        group.add_command("Domainname", "hostname", "-d", None, None)?;
        group.add_command("FQDN", "hostname", "-f", None, None)?;
        group.mark_identifying(&["Domainname", "FQDN"]);
    }
    Ok(group)
}

fn operating_system_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("OperatingSystemInfo", args);
    // Anchored matching keeps NAME= from hitting PRETTY_NAME=.
    group.add_file("Name", OS_RELEASE, Some(r#"NAME="?([^"\n]+)"?"#), None)?;
    group.add_file("Version", OS_RELEASE, Some(r#"VERSION="?([^"\n]+)"?"#), None)?;
    if args.extended {
        group.add_file("URL", OS_RELEASE, Some(r#"HOME_URL="?([^"\n]+)"?"#), None)?;
        group.add_file("Codename", OS_RELEASE, Some(r#"VERSION_CODENAME="?([^"\n]+)"?"#), None)?;
    }
    group.require(&["Name", "Version"]);
    Ok(group)
}

fn kernel_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("KernelInfo", args);
    group.add_file("Version", "/proc/sys/kernel/osrelease", None, None)?;
    group.add_file("CommandLine", "/proc/cmdline", None, None)?;
    if args.extended {
        group.add_file("ASLR", "/proc/sys/kernel/randomize_va_space", None, Some(to_int))?;
        group.add_file("NmiWatchdog", "/proc/sys/kernel/nmi_watchdog", None, Some(to_bool))?;
        group.add_file("Tainted", "/proc/sys/kernel/tainted", None, Some(to_int))?;
    }
    group.require(&["Version", "CommandLine"]);
    Ok(group)
}

fn uptime(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("Uptime", args);
    group.add_file("Uptime", UPTIME, Some(r"([\d.]+)"), Some(to_float))?;
    if args.extended {
        group.add_file("CpusIdle", UPTIME, Some(r"[\d.]+\s+([\d.]+)"), Some(to_float))?;
    }
    Ok(group)
}

fn load_avg(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("LoadAvg", args);
    group.add_file("LoadAvg1m", LOADAVG, Some(r"([\d.]+)"), Some(to_float))?;
    group.add_file("LoadAvg5m", LOADAVG, Some(r"[\d.]+\s+([\d.]+)"), Some(to_float))?;
    group.add_file("LoadAvg15m", LOADAVG, Some(r"[\d.]+\s+[\d.]+\s+([\d.]+)"), Some(to_float))?;
    if args.extended {
        group.add_file(
            "RunningProcesses",
            LOADAVG,
            Some(r"[\d.]+\s+[\d.]+\s+[\d.]+\s+(\d+)"),
            Some(to_int),
        )?;
        group.add_file(
            "AllProcesses",
            LOADAVG,
            Some(r"[\d.]+\s+[\d.]+\s+[\d.]+\s+\d+/(\d+)"),
            Some(to_int),
        )?;
    }
    Ok(group)
}

fn users_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("UsersInfo", args);
    group.add_command("LoggedIn", "users", "", None, Some(to_str_list))?;
    group.mark_identifying(&["LoggedIn"]);
    group.on_update(count_users);
    Ok(group)
}

/// Session and distinct-user counts; taken from the raw output so they
/// survive anonymization of the user list.
fn count_users(group: &mut InfoGroup, cache: &mut SourceCache<'_>) {
    let (sessions, unique) = match cache.run_command("users", "") {
        Some(output) => {
            let names: Vec<&str> = output.split_whitespace().collect();
            let unique: BTreeSet<&str> = names.iter().copied().collect();
            (Value::from(names.len()), Value::from(unique.len()))
        }
        None => (Value::Null, Value::Null),
    };
    group.set_value("Sessions", sessions);
    group.set_value("UniqueUsers", unique);
}

fn shell_environment(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("ShellEnvironment", args);
    group.on_update(collect_environment);
    Ok(group)
}

fn collect_environment(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    let vars = environment_values(std::env::vars(), group.anonymous());
    for (key, value) in vars {
        group.set_value(key, value);
    }
}

/// Environment variables sorted by name.
///
/// When `anonymous`, identifying variables are replaced and the values of
/// those variables are masked wherever they appear in other variables.
pub fn environment_values(
    vars: impl IntoIterator<Item = (String, String)>,
    anonymous: bool,
) -> Map<String, Value> {
    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    vars.sort();

    let matcher = IdentifyingMatcher::with_builtins();
    let mut anonymizer = Anonymizer::new();
    if anonymous {
        anonymizer.add_secrets(
            vars.iter()
                .filter(|(k, v)| matcher.is_identifying(k) && v.len() > 2)
                .map(|(_, v)| v.clone()),
        );
    }

    vars.into_iter()
        .map(|(key, value)| {
            let value = if !anonymous {
                value
            } else if matcher.is_identifying(&key) {
                PLACEHOLDER.to_string()
            } else {
                anonymizer.mask(&value)
            };
            (key, Value::String(value))
        })
        .collect()
}
