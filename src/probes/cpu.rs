//! Processor probes: identification, topology, frequencies, caches and
//! the likwid-based prefetcher and turbo readouts.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::group::{Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::{khz_list_to_hz_list, khz_to_hz, to_bool, to_bytes, to_int, to_int_list, to_str_list};
use crate::source::SourceCache;

const CPUINFO: &str = "/proc/cpuinfo";
const CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Hardware prefetchers reported by `likwid-features -l`.
const PREFETCHERS: &[&str] = &["HW_PREFETCHER", "CL_PREFETCHER", "DCU_PREFETCHER", "IP_PREFETCHER"];

static TURBO_STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"C(\d+) ([\d.]+ MHz)").unwrap());

pub const CPU_INFO: ProbeKind = ProbeKind::new("CpuInfo", cpu_info);
pub const CPU_TOPOLOGY: ProbeKind = ProbeKind::new("CpuTopology", cpu_topology);
pub const CPU_TOPOLOGY_CLASS: ProbeKind = ProbeKind::new("CpuTopologyClass", cpu_topology_class);
pub const CPU_FREQUENCY: ProbeKind = ProbeKind::new("CpuFrequency", cpu_frequency);
pub const CPU_FREQUENCY_CLASS: ProbeKind = ProbeKind::new("CpuFrequencyClass", cpu_frequency_class);
pub const CACHE_TOPOLOGY: ProbeKind = ProbeKind::new("CacheTopology", cache_topology);
pub const CACHE_TOPOLOGY_CLASS: ProbeKind = ProbeKind::new("CacheTopologyClass", cache_topology_class);
pub const PREFETCHER_INFO: ProbeKind = ProbeKind::new("PrefetcherInfo", prefetcher_info);
pub const PREFETCHER_CLASS: ProbeKind = ProbeKind::new("PrefetcherInfoClass", prefetcher_class);
pub const TURBO_INFO: ProbeKind = ProbeKind::new("TurboInfo", turbo_info);

fn cpu_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CpuInfo", args);
    let flags_key = match std::env::consts::ARCH {
        "aarch64" | "arm" => {
            group.add_file("Vendor", CPUINFO, Some(r"CPU implementer\s*:\s(.+)"), None)?;
            group.add_file("Family", CPUINFO, Some(r"CPU architecture\s*:\s(.+)"), Some(to_int))?;
            group.add_file("Model", CPUINFO, Some(r"CPU part\s*:\s(.+)"), None)?;
            group.add_file("Variant", CPUINFO, Some(r"CPU variant\s*:\s(.+)"), None)?;
            group.add_file("Stepping", CPUINFO, Some(r"CPU revision\s*:\s(.+)"), Some(to_int))?;
            group.require(&["Vendor", "Family", "Model", "Variant", "Stepping"]);
            "Features"
        }
        "powerpc64" => {
            group.add_constant("Vendor", "IBM");
            group.add_file("Name", CPUINFO, Some(r"cpu\s+:\s(.+)"), None)?;
            group.add_file("Model", CPUINFO, Some(r"model\s+:\s(.+)"), None)?;
            group.add_file("Stepping", CPUINFO, Some(r"revision\s+:\s(.+)"), None)?;
            group.require(&["Vendor", "Name", "Model", "Stepping"]);
            "flags"
        }
        _ => {
            group.add_file("Vendor", CPUINFO, Some(r"vendor_id\s+:\s(.+)"), None)?;
            group.add_file("Name", CPUINFO, Some(r"model name\s+:\s(.+)"), None)?;
            group.add_file("Family", CPUINFO, Some(r"cpu family\s+:\s(.+)"), Some(to_int))?;
            group.add_file("Model", CPUINFO, Some(r"model\s+:\s(.+)"), Some(to_int))?;
            group.add_file("Stepping", CPUINFO, Some(r"stepping\s+:\s(.+)"), Some(to_int))?;
            group.require(&["Vendor", "Name", "Family", "Model", "Stepping"]);
            "flags"
        }
    };
    group.add_file("SMT", format!("{CPU_ROOT}/smt/active"), None, Some(to_bool))?;
    if args.extended {
        group.add_file("Flags", CPUINFO, Some(&format!(r"{flags_key}\s+:\s(.+)")), Some(to_str_list))?;
        group.add_file("Bugs", CPUINFO, Some(r"bugs\s+:\s(.+)"), Some(to_str_list))?;
        group.add_file("Microcode", CPUINFO, Some(r"microcode\s+:\s(.+)"), None)?;
    }
    Ok(group)
}

fn cpu_topology(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CpuTopology", args);
    group.set_discovery(Discovery::path_match(
        format!("{CPU_ROOT}/cpu*"),
        r".*/cpu(\d+)$",
        CPU_TOPOLOGY_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn cpu_topology_class(args: &GroupArgs) -> Result<InfoGroup> {
    let hwthread = args.int(IDENT_KEY)?;
    let base = format!("{CPU_ROOT}/cpu{hwthread}/topology");
    let mut group = InfoGroup::new(format!("Cpu{hwthread}"), args);
    group.add_constant("HWThread", hwthread);
    group.add_constant("ThreadId", Value::Null);
    group.add_file("CoreId", format!("{base}/core_id"), None, Some(to_int))?;
    group.add_file("PackageId", format!("{base}/physical_package_id"), None, Some(to_int))?;
    if args.extended {
        group.add_file("DieId", format!("{base}/die_id"), None, Some(to_int))?;
        group.add_file("ThreadSiblings", format!("{base}/thread_siblings_list"), None, Some(to_int_list))?;
    }
    group.require(&["HWThread", "ThreadId", "CoreId", "PackageId"]);
    group.on_update(thread_id);
    Ok(group)
}

/// Position of the hardware thread among its core's siblings.
fn thread_id(group: &mut InfoGroup, cache: &mut SourceCache<'_>) {
    let Ok(hwthread) = group.args().int(IDENT_KEY) else {
        return;
    };
    let path = format!("{CPU_ROOT}/cpu{hwthread}/topology/thread_siblings_list");
    let position = cache
        .read_file(path)
        .and_then(|text| to_int_list(&text).ok())
        .and_then(|list| {
            list.as_array()
                .and_then(|items| items.iter().position(|v| v.as_i64() == Some(hwthread)))
        });
    group.set_value("ThreadId", position.map(Value::from).unwrap_or(Value::Null));
}

fn cpu_frequency(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CpuFrequency", args);
    group.set_discovery(Discovery::path_match(
        format!("{CPU_ROOT}/cpu*/cpufreq"),
        r".*/cpu(\d+)/cpufreq$",
        CPU_FREQUENCY_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn cpu_frequency_class(args: &GroupArgs) -> Result<InfoGroup> {
    let cpu = args.int(IDENT_KEY)?;
    let base = format!("{CPU_ROOT}/cpu{cpu}/cpufreq");
    let mut group = InfoGroup::new(format!("Cpu{cpu}"), args);
    group.add_file("MaxFreq", format!("{base}/scaling_max_freq"), None, Some(khz_to_hz))?;
    group.add_file("MinFreq", format!("{base}/scaling_min_freq"), None, Some(khz_to_hz))?;
    group.add_file("Governor", format!("{base}/scaling_governor"), None, None)?;
    if args.extended {
        group.add_file("BaseFreq", format!("{base}/base_frequency"), None, Some(khz_to_hz))?;
        group.add_file("Driver", format!("{base}/scaling_driver"), None, None)?;
        group.add_file(
            "AvailableGovernors",
            format!("{base}/scaling_available_governors"),
            None,
            Some(to_str_list),
        )?;
        group.add_file(
            "AvailableFrequencies",
            format!("{base}/scaling_available_frequencies"),
            None,
            Some(khz_list_to_hz_list),
        )?;
        group.add_file(
            "EnergyPerfPreference",
            format!("{base}/energy_performance_preference"),
            None,
            None,
        )?;
    }
    group.require(&["MaxFreq", "MinFreq", "Governor"]);
    Ok(group)
}

fn cache_topology(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CacheTopology", args);
    group.set_discovery(Discovery::path_match(
        format!("{CPU_ROOT}/cpu0/cache/index*"),
        r".*/index(\d+)$",
        CACHE_TOPOLOGY_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn cache_topology_class(args: &GroupArgs) -> Result<InfoGroup> {
    let index = args.int(IDENT_KEY)?;
    let base = format!("{CPU_ROOT}/cpu0/cache/index{index}");
    let mut group = InfoGroup::new(format!("Index{index}"), args);
    group.add_file("Size", format!("{base}/size"), None, Some(to_bytes))?;
    group.add_file("Level", format!("{base}/level"), None, Some(to_int))?;
    group.add_file("Type", format!("{base}/type"), None, None)?;
    group.add_constant("CpuList", Value::Null);
    if args.extended {
        group.add_file("Sets", format!("{base}/number_of_sets"), None, Some(to_int))?;
        group.add_file("Associativity", format!("{base}/ways_of_associativity"), None, Some(to_int))?;
        group.add_file("CoherencyLineSize", format!("{base}/coherency_line_size"), None, Some(to_int))?;
        group.add_file("PhysicalLineSize", format!("{base}/physical_line_partition"), None, Some(to_int))?;
    }
    group.require(&["Size", "Level", "Type"]);
    group.on_update(shared_cpu_lists);
    group.on_update(rename_cache);
    Ok(group)
}

/// Collect the distinct CPU sets sharing an instance of this cache.
fn shared_cpu_lists(group: &mut InfoGroup, cache: &mut SourceCache<'_>) {
    let Ok(index) = group.args().int(IDENT_KEY) else {
        return;
    };
    let pattern = format!("{CPU_ROOT}/cpu[0-9]*/cache/index{index}/shared_cpu_list");
    let lists: Vec<Value> = cache
        .glob(&pattern)
        .into_iter()
        .filter_map(|path| cache.read_file(path))
        .filter_map(|text| to_int_list(&text).ok())
        .collect();
    group.set_value("CpuList", distinct_lists(lists));
}

/// Deduplicate CPU lists and order them by their first CPU.
fn distinct_lists(lists: Vec<Value>) -> Value {
    let mut unique: Vec<Value> = Vec::new();
    for list in lists {
        if !unique.contains(&list) {
            unique.push(list);
        }
    }
    unique.sort_by_key(|list| list.get(0).and_then(Value::as_i64).unwrap_or(i64::MAX));
    Value::Array(unique)
}

/// Name the cache after its level and type: `L1D`, `L1I`, `L2`, ...
fn rename_cache(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    if let Some(name) = cache_name(group.value("Level"), group.value("Type")) {
        group.set_name(name);
    }
}

fn cache_name(level: Option<&Value>, kind: Option<&Value>) -> Option<String> {
    let level = level?.as_i64()?;
    let suffix = match kind?.as_str()? {
        "Data" => "D",
        "Instruction" => "I",
        _ => "",
    };
    Some(format!("L{level}{suffix}"))
}

/// Path of a likwid tool, honouring a configured installation prefix.
fn likwid_tool(args: &GroupArgs, tool: &str) -> String {
    match args.opt_str("likwid_path") {
        Some(prefix) => format!("{}/{tool}", prefix.trim_end_matches('/')),
        None => tool.to_string(),
    }
}

fn prefetcher_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("PrefetcherInfo", args);
    let mut child_args = args.inherit();
    if let Some(prefix) = args.opt_str("likwid_path") {
        child_args.set("likwid_path", prefix);
    }
    group.set_discovery(Discovery::path_match(
        format!("{CPU_ROOT}/cpu*"),
        r".*/cpu(\d+)$",
        PREFETCHER_CLASS,
        child_args,
    )?);
    Ok(group)
}

fn prefetcher_class(args: &GroupArgs) -> Result<InfoGroup> {
    let cpu = args.int(IDENT_KEY)?;
    let exe = likwid_tool(args, "likwid-features");
    let cmd_args = format!("-c {cpu} -l");
    let mut group = InfoGroup::new(format!("Cpu{cpu}"), args);
    for name in PREFETCHERS {
        group.add_command(name, &exe, &cmd_args, Some(&format!(r"{name}\s+(\w+)")), Some(to_bool))?;
    }
    group.require(PREFETCHERS);
    Ok(group)
}

fn turbo_info(args: &GroupArgs) -> Result<InfoGroup> {
    let exe = likwid_tool(args, "likwid-powermeter");
    let mut group = InfoGroup::new("TurboInfo", args);
    group.add_command("BaseClock", &exe, "-i", Some(r"Base clock:\s+([\d.]+ MHz)"), Some(khz_to_hz))?;
    group.add_command("MinClock", &exe, "-i", Some(r"Minimal clock:\s+([\d.]+ MHz)"), Some(khz_to_hz))?;
    group.require(&["BaseClock", "MinClock"]);
    group.on_update(turbo_steps);
    Ok(group)
}

/// One `<n>CoresActive` value per turbo step in the powermeter report.
fn turbo_steps(group: &mut InfoGroup, cache: &mut SourceCache<'_>) {
    let exe = likwid_tool(group.args(), "likwid-powermeter");
    let Some(report) = cache.run_command(&exe, "-i") else {
        return;
    };
    for (cores, freq) in turbo_step_values(&report) {
        group.set_value(format!("{cores}CoresActive"), freq);
    }
}

fn turbo_step_values(report: &str) -> Vec<(i64, Value)> {
    TURBO_STEP_RE
        .captures_iter(report)
        .filter_map(|caps| {
            let step: i64 = caps[1].parse().ok()?;
            let freq = khz_to_hz(&caps[2]).unwrap_or_else(|_| Value::String(caps[2].to_string()));
            Some((step + 1, freq))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockBackend;
    use serde_json::json;

    const X86_CPUINFO: &str = "processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 85
model name\t: Intel(R) Xeon(R) Gold 6148 CPU @ 2.40GHz
stepping\t: 4
microcode\t: 0x2006b06
flags\t\t: fpu vme de pse
bugs\t\t: spectre_v1 spectre_v2";

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn x86_cpuinfo_fields() {
        let mut backend = MockBackend::new();
        backend.add_file(CPUINFO, X86_CPUINFO);
        backend.add_file(format!("{CPU_ROOT}/smt/active"), "1");
        let mut group = CPU_INFO.build(&GroupArgs::new(true, false)).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("Vendor"), Some(&json!("GenuineIntel")));
        assert_eq!(group.value("Model"), Some(&json!(85)));
        assert_eq!(group.value("Family"), Some(&json!(6)));
        assert_eq!(group.value("Stepping"), Some(&json!(4)));
        assert_eq!(group.value("SMT"), Some(&json!(true)));
        assert_eq!(group.value("Flags"), Some(&json!(["fpu", "vme", "de", "pse"])));
        assert_eq!(group.value("Bugs"), Some(&json!(["spectre_v1", "spectre_v2"])));
        assert_eq!(backend.file_reads(CPUINFO), 1);
    }

    #[test]
    fn topology_thread_id_comes_from_siblings() {
        let base = format!("{CPU_ROOT}/cpu5/topology");
        let mut backend = MockBackend::new();
        backend.add_file(format!("{base}/core_id"), "1");
        backend.add_file(format!("{base}/physical_package_id"), "0");
        backend.add_file(format!("{base}/thread_siblings_list"), "1,5");

        let args = GroupArgs::new(true, false).with(IDENT_KEY, 5);
        let mut group = CPU_TOPOLOGY_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.name(), "Cpu5");
        assert_eq!(group.value("HWThread"), Some(&json!(5)));
        assert_eq!(group.value("ThreadId"), Some(&json!(1)));
        assert_eq!(group.value("ThreadSiblings"), Some(&json!([1, 5])));
        // The hook reuses the field's read.
        assert_eq!(backend.file_reads(format!("{base}/thread_siblings_list")), 1);
        let keys: Vec<&String> = group.data().keys().collect();
        assert_eq!(keys[..2], ["HWThread", "ThreadId"]);
    }

    #[test]
    fn topology_without_siblings_leaves_thread_id_null() {
        let args = GroupArgs::default().with(IDENT_KEY, 0);
        let mut group = CPU_TOPOLOGY_CLASS.build(&args).unwrap();
        group.update_with(&MockBackend::new());
        assert_eq!(group.value("ThreadId"), Some(&Value::Null));
    }

    #[test]
    fn frequencies_are_reported_in_hz() {
        let base = format!("{CPU_ROOT}/cpu0/cpufreq");
        let mut backend = MockBackend::new();
        backend.add_file(format!("{base}/scaling_max_freq"), "3700000");
        backend.add_file(format!("{base}/scaling_min_freq"), "1000000");
        backend.add_file(format!("{base}/scaling_governor"), "performance");
        backend.add_file(format!("{base}/scaling_available_frequencies"), "2400000 1200000");

        let args = GroupArgs::new(true, false).with(IDENT_KEY, 0);
        let mut group = CPU_FREQUENCY_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("MaxFreq"), Some(&json!(3_700_000_000u64)));
        assert_eq!(group.value("Governor"), Some(&json!("performance")));
        assert_eq!(
            group.value("AvailableFrequencies"),
            Some(&json!([2_400_000_000u64, 1_200_000_000u64]))
        );
    }

    #[test]
    fn cache_groups_rename_after_update() {
        let base = format!("{CPU_ROOT}/cpu0/cache/index1");
        let mut backend = MockBackend::new();
        backend.add_file(format!("{base}/size"), "32K");
        backend.add_file(format!("{base}/level"), "1");
        backend.add_file(format!("{base}/type"), "Instruction");

        let args = GroupArgs::default().with(IDENT_KEY, 1);
        let mut group = CACHE_TOPOLOGY_CLASS.build(&args).unwrap();
        assert_eq!(group.name(), "Index1");
        group.update_with(&backend);

        assert_eq!(group.name(), "L1I");
        assert_eq!(group.value("Size"), Some(&json!(32768)));
        assert_eq!(group.value("CpuList"), Some(&json!([])));
    }

    #[test]
    fn shared_cpu_lists_come_from_the_backend() {
        let mut backend = MockBackend::new();
        for (cpu, list) in [(0, "0-1"), (1, "0-1"), (2, "2-3"), (3, "2-3")] {
            backend.add_file(
                format!("{CPU_ROOT}/cpu{cpu}/cache/index2/shared_cpu_list"),
                list,
            );
        }
        backend.add_file(format!("{CPU_ROOT}/cpu0/cache/index3/shared_cpu_list"), "0-3");

        let args = GroupArgs::default().with(IDENT_KEY, 2);
        let mut group = CACHE_TOPOLOGY_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("CpuList"), Some(&json!([[0, 1], [2, 3]])));
        assert_eq!(
            backend.file_reads(format!("{CPU_ROOT}/cpu0/cache/index3/shared_cpu_list")),
            0
        );
    }

    #[test]
    fn cache_names() {
        assert_eq!(cache_name(Some(&json!(1)), Some(&json!("Data"))).as_deref(), Some("L1D"));
        assert_eq!(cache_name(Some(&json!(3)), Some(&json!("Unified"))).as_deref(), Some("L3"));
        assert_eq!(cache_name(Some(&Value::Null), Some(&json!("Data"))), None);
    }

    #[test]
    fn distinct_lists_dedup_and_order() {
        let lists = vec![json!([2, 3]), json!([0, 1]), json!([2, 3]), json!([0, 1])];
        assert_eq!(distinct_lists(lists), json!([[0, 1], [2, 3]]));
    }

    #[test]
    fn prefetcher_fields_share_one_invocation() {
        let mut backend = MockBackend::new();
        backend.add_command(
            "/opt/likwid/bin/likwid-features",
            "-c 2 -l",
            "Feature               CPU 2\nHW_PREFETCHER         on\nCL_PREFETCHER         on\nDCU_PREFETCHER        off\nIP_PREFETCHER         on",
        );
        let args = GroupArgs::default()
            .with("likwid_path", "/opt/likwid/bin/")
            .with(IDENT_KEY, 2);
        let mut group = PREFETCHER_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("HW_PREFETCHER"), Some(&json!(true)));
        assert_eq!(group.value("DCU_PREFETCHER"), Some(&json!(false)));
        assert_eq!(backend.command_runs("/opt/likwid/bin/likwid-features", "-c 2 -l"), 1);
    }

    #[test]
    fn turbo_steps_are_numbered_from_one() {
        let report = "Base clock:\t2400.00 MHz\nMinimal clock:\t1000.00 MHz\nTurbo Boost Steps:\nC0 3700.00 MHz\nC1 3500.00 MHz";
        let mut backend = MockBackend::new();
        backend.add_command("likwid-powermeter", "-i", report);
        let mut group = TURBO_INFO.build(&GroupArgs::default()).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("BaseClock"), Some(&json!(2_400_000_000u64)));
        assert_eq!(group.value("1CoresActive"), Some(&json!(3_700_000_000u64)));
        assert_eq!(group.value("2CoresActive"), Some(&json!(3_500_000_000u64)));
        assert_eq!(backend.command_runs("likwid-powermeter", "-i"), 1);
    }
}
