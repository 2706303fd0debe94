//! Memory probes: system totals, NUMA nodes and hugepage pools.

use crate::error::Result;
use crate::group::{Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::{to_bytes, to_int, to_int_list};

const MEMINFO: &str = "/proc/meminfo";
const NODE_ROOT: &str = "/sys/devices/system/node";
const HUGEPAGES: &str = "/sys/kernel/mm/hugepages";

/// Identity pattern of a hugepage pool directory, e.g. `hugepages-2048kB`.
const HUGEPAGE_POOL: &str = r".*/hugepages-(\d+[kKMG]B)$";

pub const MEM_INFO: ProbeKind = ProbeKind::new("MemInfo", mem_info);
pub const NUMA_INFO: ProbeKind = ProbeKind::new("NumaInfo", numa_info);
pub const NUMA_INFO_CLASS: ProbeKind = ProbeKind::new("NumaInfoClass", numa_info_class);
pub const NUMA_HUGEPAGES_CLASS: ProbeKind =
    ProbeKind::new("NumaInfoHugepagesClass", numa_hugepages_class);
pub const HUGEPAGES_INFO: ProbeKind = ProbeKind::new("Hugepages", hugepages);
pub const HUGEPAGES_CLASS: ProbeKind = ProbeKind::new("HugepagesClass", hugepages_class);

fn meminfo_pattern(prefix: &str, key: &str) -> String {
    format!(r"{prefix}{key}:\s+(\d+\s*[kKMG]?B?)")
}

fn mem_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("MemInfo", args);
    let mut keys = vec!["MemTotal", "MemFree", "MemAvailable", "SwapTotal", "SwapFree"];
    if args.extended {
        keys.extend(["Buffers", "Cached", "Dirty", "Writeback", "HugePages_Total", "Hugepagesize"]);
    }
    for key in keys {
        // HugePages_Total is a plain count.
        let converter = if key == "HugePages_Total" { to_int } else { to_bytes };
        group.add_file(key, MEMINFO, Some(&meminfo_pattern("", key)), Some(converter))?;
    }
    group.require(&["MemTotal", "SwapTotal"]);
    Ok(group)
}

fn numa_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("NumaInfo", args);
    group.set_discovery(Discovery::path_match(
        format!("{NODE_ROOT}/node*"),
        r".*/node(\d+)$",
        NUMA_INFO_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn numa_info_class(args: &GroupArgs) -> Result<InfoGroup> {
    let node = args.int(IDENT_KEY)?;
    let base = format!("{NODE_ROOT}/node{node}");
    let meminfo = format!("{base}/meminfo");
    let prefix = format!(r"Node {node} ");

    let mut group = InfoGroup::new(format!("NumaNode{node}"), args);
    group.add_file("MemTotal", &meminfo, Some(&meminfo_pattern(&prefix, "MemTotal")), Some(to_bytes))?;
    group.add_file("MemFree", &meminfo, Some(&meminfo_pattern(&prefix, "MemFree")), Some(to_bytes))?;
    group.add_file("MemUsed", &meminfo, Some(&meminfo_pattern(&prefix, "MemUsed")), Some(to_bytes))?;
    group.add_file("Distances", format!("{base}/distance"), None, Some(to_int_list))?;
    group.add_file("CpuList", format!("{base}/cpulist"), None, Some(to_int_list))?;
    if args.extended {
        group.add_file("Writeback", &meminfo, Some(&meminfo_pattern(&prefix, "Writeback")), Some(to_bytes))?;
    }
    group.require(&["MemTotal", "Distances", "CpuList"]);
    group.set_discovery(Discovery::path_match(
        format!("{base}/hugepages/hugepages-*"),
        HUGEPAGE_POOL,
        NUMA_HUGEPAGES_CLASS,
        args.inherit().with("node", node),
    )?);
    Ok(group)
}

fn numa_hugepages_class(args: &GroupArgs) -> Result<InfoGroup> {
    let node = args.int("node")?;
    let size = args.str(IDENT_KEY)?;
    let base = format!("{NODE_ROOT}/node{node}/hugepages/hugepages-{size}");
    let mut group = InfoGroup::new(format!("Hugepages-{size}"), args);
    group.add_file("Count", format!("{base}/nr_hugepages"), None, Some(to_int))?;
    group.add_file("Free", format!("{base}/free_hugepages"), None, Some(to_int))?;
    group.require(&["Count"]);
    Ok(group)
}

fn hugepages(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("Hugepages", args);
    group.set_discovery(Discovery::path_match(
        format!("{HUGEPAGES}/hugepages-*"),
        HUGEPAGE_POOL,
        HUGEPAGES_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn hugepages_class(args: &GroupArgs) -> Result<InfoGroup> {
    let size = args.str(IDENT_KEY)?;
    let base = format!("{HUGEPAGES}/hugepages-{size}");
    let mut group = InfoGroup::new(format!("Hugepages-{size}"), args);
    group.add_file("Count", format!("{base}/nr_hugepages"), None, Some(to_int))?;
    group.add_file("Free", format!("{base}/free_hugepages"), None, Some(to_int))?;
    group.add_file("Reserved", format!("{base}/resv_hugepages"), None, Some(to_int))?;
    group.require(&["Count"]);
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockBackend;
    use serde_json::json;

    const MEMINFO_TEXT: &str = "MemTotal:       16318460 kB
MemFree:         9183012 kB
MemAvailable:   12467592 kB
Buffers:          254960 kB
Cached:          3146012 kB
SwapTotal:       2097148 kB
SwapFree:        2097148 kB
HugePages_Total:       0
Hugepagesize:       2048 kB";

    #[test]
    fn meminfo_values_are_bytes() {
        let mut backend = MockBackend::new();
        backend.add_file(MEMINFO, MEMINFO_TEXT);
        let mut group = MEM_INFO.build(&GroupArgs::new(true, false)).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("MemTotal"), Some(&json!(16318460u64 * 1024)));
        assert_eq!(group.value("SwapFree"), Some(&json!(2097148u64 * 1024)));
        assert_eq!(group.value("HugePages_Total"), Some(&json!(0)));
        assert_eq!(group.value("Hugepagesize"), Some(&json!(2048 * 1024)));
        assert_eq!(backend.file_reads(MEMINFO), 1);
    }

    #[test]
    fn numa_node_reads_its_meminfo() {
        let base = format!("{NODE_ROOT}/node1");
        let mut backend = MockBackend::new();
        backend.add_file(
            format!("{base}/meminfo"),
            "Node 1 MemTotal:       8159232 kB\nNode 1 MemFree:        4079616 kB\nNode 1 MemUsed:        4079616 kB",
        );
        backend.add_file(format!("{base}/distance"), "21 10");
        backend.add_file(format!("{base}/cpulist"), "8-15");

        let args = GroupArgs::default().with(IDENT_KEY, 1);
        let mut group = NUMA_INFO_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.name(), "NumaNode1");
        assert_eq!(group.value("MemTotal"), Some(&json!(8159232u64 * 1024)));
        assert_eq!(group.value("Distances"), Some(&json!([21, 10])));
        assert_eq!(group.value("CpuList"), Some(&json!([8, 9, 10, 11, 12, 13, 14, 15])));
    }

    #[test]
    fn numa_hugepages_know_their_node() {
        let base = format!("{NODE_ROOT}/node0/hugepages/hugepages-2048kB");
        let mut backend = MockBackend::new();
        backend.add_file(format!("{base}/nr_hugepages"), "16");
        backend.add_file(format!("{base}/free_hugepages"), "8");

        let args = GroupArgs::default().with("node", 0).with(IDENT_KEY, "2048kB");
        let mut group = NUMA_HUGEPAGES_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.name(), "Hugepages-2048kB");
        assert_eq!(group.value("Count"), Some(&json!(16)));
        assert_eq!(group.value("Free"), Some(&json!(8)));
        assert_eq!(
            group.meta(),
            r#"NumaInfoHugepagesClass(node=0, ident="2048kB")"#
        );
    }

    #[test]
    fn hugepage_pool_needs_string_identity() {
        let args = GroupArgs::default().with(IDENT_KEY, 2048);
        assert!(HUGEPAGES_CLASS.build(&args).is_err());
    }
}
