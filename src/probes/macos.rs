//! macOS counterparts of the procfs/sysfs probes, via `sysctl` and
//! `sw_vers`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::error::Result;
use crate::group::{GroupArgs, InfoGroup, ProbeKind};
use crate::parse::{to_float, to_int, to_str_list};
use crate::source::SourceCache;

const SYSCTL: &str = "sysctl";

pub const CPU_INFO_MACOS: ProbeKind = ProbeKind::new("CpuInfoMacOS", cpu_info_macos);
pub const OS_INFO_MACOS: ProbeKind = ProbeKind::new("OperatingSystemInfoMacOS", os_info_macos);
pub const MEM_INFO_MACOS: ProbeKind = ProbeKind::new("MemInfoMacOS", mem_info_macos);
pub const UPTIME_MACOS: ProbeKind = ProbeKind::new("UptimeMacOS", uptime_macos);
pub const LOAD_AVG_MACOS: ProbeKind = ProbeKind::new("LoadAvgMacOS", load_avg_macos);

fn cpu_info_macos(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CpuInfo", args);
    group.add_command("Vendor", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.vendor:\s+(.+)"), None)?;
    group.add_command("Name", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.brand_string:\s+(.+)"), None)?;
    group.add_command("Family", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.family:\s+(\d+)"), Some(to_int))?;
    group.add_command("Model", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.model:\s+(\d+)"), Some(to_int))?;
    group.add_command("Stepping", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.stepping:\s+(\d+)"), Some(to_int))?;
    group.add_command("Cores", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.core_count:\s+(\d+)"), Some(to_int))?;
    group.add_command("Threads", SYSCTL, "machdep.cpu", Some(r"machdep\.cpu\.thread_count:\s+(\d+)"), Some(to_int))?;
    if args.extended {
        group.add_command(
            "Flags",
            SYSCTL,
            "machdep.cpu",
            Some(r"machdep\.cpu\.features:\s+(.+)"),
            Some(to_str_list),
        )?;
    }
    group.require(&["Name", "Cores", "Threads"]);
    Ok(group)
}

fn os_info_macos(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("OperatingSystemInfo", args);
    group.add_command("Name", "sw_vers", "", Some(r"ProductName:\s+(.+)"), None)?;
    group.add_command("Version", "sw_vers", "", Some(r"ProductVersion:\s+(.+)"), None)?;
    if args.extended {
        group.add_command("Build", "sw_vers", "", Some(r"BuildVersion:\s+(.+)"), None)?;
    }
    group.require(&["Name", "Version"]);
    Ok(group)
}

fn mem_info_macos(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("MemInfo", args);
    group.add_command("MemTotal", SYSCTL, "hw.memsize", Some(r"hw\.memsize:\s+(\d+)"), Some(to_int))?;
    if args.extended {
        group.add_command("PageSize", SYSCTL, "hw.pagesize", Some(r"hw\.pagesize:\s+(\d+)"), Some(to_int))?;
    }
    group.require(&["MemTotal"]);
    Ok(group)
}

fn uptime_macos(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("Uptime", args);
    // "{ sec = 1700000000, usec = 52000 } Tue Nov 14 22:13:20 2023"
    group.add_command("BootTime", SYSCTL, "-n kern.boottime", Some(r"sec = (\d+)"), Some(to_int))?;
    group.add_constant("Uptime", Value::Null);
    group.on_update(uptime_from_boottime);
    Ok(group)
}

fn uptime_from_boottime(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    let Some(boot) = group.value("BootTime").and_then(Value::as_u64) else {
        return;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    group.set_value("Uptime", now.saturating_sub(boot));
}

fn load_avg_macos(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("LoadAvg", args);
    // "{ 1.23 1.10 0.98 }"
    group.add_command("LoadAvg1m", SYSCTL, "-n vm.loadavg", Some(r"\{\s*([\d.]+)"), Some(to_float))?;
    group.add_command("LoadAvg5m", SYSCTL, "-n vm.loadavg", Some(r"\{\s*[\d.]+\s+([\d.]+)"), Some(to_float))?;
    group.add_command(
        "LoadAvg15m",
        SYSCTL,
        "-n vm.loadavg",
        Some(r"\{\s*[\d.]+\s+[\d.]+\s+([\d.]+)"),
        Some(to_float),
    )?;
    Ok(group)
}
