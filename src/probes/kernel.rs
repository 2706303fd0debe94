//! Kernel tunables: NUMA balancing, cgroups, writeback workqueue,
//! transparent hugepages, clock sources, IRQ affinity and CPU
//! vulnerability mitigations.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::group::{Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::scalar::title_case;
use crate::parse::{mask_to_list, to_bool, to_int, to_int_list, to_str_list};

const NUMA_BALANCING: &str = "/proc/sys/kernel/numa_balancing";
const CGROUP_V1_CPUSET: &str = "/sys/fs/cgroup/cpuset";
const CGROUP_ROOT: &str = "/sys/fs/cgroup";
const WRITEBACK: &str = "/sys/bus/workqueue/devices/writeback";
const THP: &str = "/sys/kernel/mm/transparent_hugepage";
const CLOCKSOURCES: &str = "/sys/devices/system/clocksource";
const IRQS: &str = "/proc/irq";
const VULNERABILITIES: &str = "/sys/devices/system/cpu/vulnerabilities";

pub const NUMA_BALANCING_INFO: ProbeKind = ProbeKind::new("NumaBalancing", numa_balancing);
pub const CGROUP_INFO: ProbeKind = ProbeKind::new("CgroupInfo", cgroup_info);
pub const WRITEBACK_INFO: ProbeKind = ProbeKind::new("Writeback", writeback);
pub const TRANSPARENT_HUGEPAGES: ProbeKind =
    ProbeKind::new("TransparentHugepages", transparent_hugepages);
pub const CLOCKSOURCE_INFO: ProbeKind = ProbeKind::new("ClocksourceInfo", clocksource_info);
pub const CLOCKSOURCE_CLASS: ProbeKind = ProbeKind::new("ClocksourceInfoClass", clocksource_class);
pub const IRQ_AFFINITY: ProbeKind = ProbeKind::new("IrqAffinity", irq_affinity);
pub const IRQ_AFFINITY_CLASS: ProbeKind = ProbeKind::new("IrqAffinityClass", irq_affinity_class);
pub const VULNERABILITIES_INFO: ProbeKind = ProbeKind::new("VulnerabilitiesInfo", vulnerabilities);

fn numa_balancing(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("NumaBalancing", args);
    group.add_file("Enabled", NUMA_BALANCING, None, Some(to_bool))?;
    if args.extended {
        for (key, file) in [
            ("ScanDelayMs", "numa_balancing_scan_delay_ms"),
            ("ScanPeriodMaxMs", "numa_balancing_scan_period_max_ms"),
            ("ScanPeriodMinMs", "numa_balancing_scan_period_min_ms"),
            ("ScanSizeMb", "numa_balancing_scan_size_mb"),
        ] {
            group.add_file(key, format!("/proc/sys/kernel/{file}"), None, Some(to_int))?;
        }
    }
    group.require(&["Enabled"]);
    Ok(group)
}

fn cgroup_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CgroupInfo", args);
    // cgroup v1 mounts a cpuset hierarchy; v2 keeps the files at the root
    // with an ".effective" variant.
    let (base, effective) = if Path::new(CGROUP_V1_CPUSET).is_dir() {
        (CGROUP_V1_CPUSET, "cpuset.effective_cpus")
    } else {
        (CGROUP_ROOT, "cpuset.cpus.effective")
    };
    group.add_file("CPUs", format!("{base}/cpuset.cpus"), None, Some(to_int_list))?;
    group.add_file("Mems", format!("{base}/cpuset.mems"), None, Some(to_int_list))?;
    if args.extended {
        group.add_file("EffectiveCPUs", format!("{base}/{effective}"), None, Some(to_int_list))?;
    }
    group.require(&["CPUs", "Mems"]);
    Ok(group)
}

fn writeback(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("Writeback", args);
    group.add_file("CPUmask", format!("{WRITEBACK}/cpumask"), None, Some(mask_to_list))?;
    group.add_file("MaxActive", format!("{WRITEBACK}/max_active"), None, Some(to_int))?;
    group.require(&["CPUmask", "MaxActive"]);
    Ok(group)
}

fn transparent_hugepages(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("TransparentHugepages", args);
    // The active setting is the bracketed one: "always [madvise] never".
    group.add_file("State", format!("{THP}/enabled"), Some(r".*\[(.*)\].*"), None)?;
    group.add_file("UseZeroPage", format!("{THP}/use_zero_page"), None, Some(to_bool))?;
    if args.extended {
        group.add_file("Defrag", format!("{THP}/defrag"), Some(r".*\[(.*)\].*"), None)?;
    }
    group.require(&["State", "UseZeroPage"]);
    Ok(group)
}

fn clocksource_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("ClocksourceInfo", args);
    group.set_discovery(Discovery::path_match(
        format!("{CLOCKSOURCES}/clocksource*"),
        r".*/clocksource(\d+)$",
        CLOCKSOURCE_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn clocksource_class(args: &GroupArgs) -> Result<InfoGroup> {
    let ident = args.int(IDENT_KEY)?;
    let base = format!("{CLOCKSOURCES}/clocksource{ident}");
    let mut group = InfoGroup::new(format!("Clocksource{ident}"), args);
    group.add_file("Current", format!("{base}/current_clocksource"), None, None)?;
    if args.extended {
        group.add_file("Available", format!("{base}/available_clocksource"), None, Some(to_str_list))?;
    }
    group.require(&["Current"]);
    Ok(group)
}

fn irq_affinity(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("IrqAffinity", args);
    group.add_file("DefaultSmpAffinity", format!("{IRQS}/default_smp_affinity"), None, Some(mask_to_list))?;
    group.require(&["DefaultSmpAffinity"]);
    // Hundreds of interrupts on large machines; listed only on request.
    if args.extended {
        group.set_discovery(Discovery::path_match(
            format!("{IRQS}/*"),
            r".*/irq/(\d+)$",
            IRQ_AFFINITY_CLASS,
            args.inherit(),
        )?);
    }
    Ok(group)
}

fn irq_affinity_class(args: &GroupArgs) -> Result<InfoGroup> {
    let ident = args.int(IDENT_KEY)?;
    let mut group = InfoGroup::new(format!("irq{ident}"), args);
    group.add_file("SMPAffinity", format!("{IRQS}/{ident}/smp_affinity"), None, Some(mask_to_list))?;
    Ok(group)
}

fn vulnerabilities(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("VulnerabilitiesInfo", args);
    for path in vulnerability_files(Path::new(VULNERABILITIES)) {
        if let Some(file) = path.file_name().and_then(|f| f.to_str()) {
            group.add_file(&title_case(file), &path, None, None)?;
        }
    }
    Ok(group)
}

/// One file per known vulnerability, sorted by name.
fn vulnerability_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no vulnerability listing");
            Vec::new()
        }
    };
    files.sort();
    files
}
