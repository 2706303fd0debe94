//! Rebuilding documents of the built-in probe kinds.

use machinestate::group::{GroupArgs, InfoGroup, ProbeRegistry, IDENT_KEY};
use machinestate::probes::{
    CACHE_TOPOLOGY, CACHE_TOPOLOGY_CLASS, HOST_INFO, MACHINE_STATE, POWERCAP_CLASS,
    POWERCAP_CONSTRAINT, POWERCAP_INFO, POWERCAP_PACKAGE,
};
use machinestate::source::MockBackend;
use serde_json::{json, Value};

const CPU0_CACHE: &str = "/sys/devices/system/cpu/cpu0/cache/index0";
const PACKAGE0: &str = "/sys/devices/virtual/powercap/intel-rapl/intel-rapl:0";
const DRAM: &str = "/sys/devices/virtual/powercap/intel-rapl/intel-rapl:0/intel-rapl:0:0";

fn rapl_host() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.add_command("hostname", "-s", "node042");
    backend.add_file(format!("{CPU0_CACHE}/size"), "48K");
    backend.add_file(format!("{CPU0_CACHE}/level"), "1");
    backend.add_file(format!("{CPU0_CACHE}/type"), "Data");
    backend.add_file(format!("{CPU0_CACHE}/shared_cpu_list"), "0,4");
    for (base, name, limit) in [(PACKAGE0, "package-0", "125000000"), (DRAM, "dram", "0")] {
        backend.add_file(format!("{base}/name"), name);
        backend.add_file(format!("{base}/enabled"), "1");
        backend.add_file(format!("{base}/constraint_0_name"), "long_term");
        backend.add_file(format!("{base}/constraint_0_power_limit_uw"), limit);
        backend.add_file(format!("{base}/constraint_0_time_window_us"), "27983872");
    }
    backend
}

/// A collected tree of built-in kinds, assembled without live discovery.
fn collected_tree() -> InfoGroup {
    let args = GroupArgs::new(true, false);
    let mut root = MACHINE_STATE.build(&args).unwrap();
    root.push_child(HOST_INFO.build(&args).unwrap());

    let mut caches = CACHE_TOPOLOGY.build(&args).unwrap();
    caches.push_child(CACHE_TOPOLOGY_CLASS.build(&args.clone().with(IDENT_KEY, 0)).unwrap());
    root.push_child(caches);

    let package_args = args.clone().with("package", 0);
    let mut dram = POWERCAP_CLASS.build(&package_args.clone().with(IDENT_KEY, 0)).unwrap();
    dram.push_child(
        POWERCAP_CONSTRAINT
            .build(&package_args.clone().with("domain", 0).with(IDENT_KEY, 0))
            .unwrap(),
    );
    let mut package = POWERCAP_PACKAGE.build(&args.clone().with(IDENT_KEY, 0)).unwrap();
    package.push_child(dram);
    package.push_child(POWERCAP_CONSTRAINT.build(&package_args.with(IDENT_KEY, 0)).unwrap());
    let mut powercap = POWERCAP_INFO.build(&args).unwrap();
    powercap.push_child(package);
    root.push_child(powercap);

    root.update_with(&rapl_host());
    root
}

#[test]
fn builtin_tree_rebuilds_to_the_same_document() {
    let tree = collected_tree();
    let document = tree.get(true);
    assert_eq!(document["CacheTopology"]["L1D"]["CpuList"], json!([[0, 4]]));
    assert_eq!(
        document["PowercapInfo"]["Package0"]["Dram"]["Constraint0"]["PowerLimitUw"],
        json!(0)
    );

    let rebuilt = InfoGroup::from_document(&document, &ProbeRegistry::new()).unwrap();
    assert_eq!(rebuilt.get(true), document);
    assert!(rebuilt.compare(document.clone()).unwrap().is_empty());
    assert!(rebuilt.compare(tree.get(true)).unwrap().unmatched.is_empty());
}

#[test]
fn rebuilt_tree_still_checks_power_limits() {
    let document = collected_tree().get(true);
    let rebuilt = InfoGroup::from_document(&document, &ProbeRegistry::new()).unwrap();

    let mut reference: Value = document.clone();
    reference["PowercapInfo"]["Package0"]["Constraint0"]["PowerLimitUw"] = json!(65000000);
    reference["PowercapInfo"]["Package0"]["Dram"]["Constraint0"]["PowerLimitUw"] = json!(1);

    let diff = rebuilt.compare(reference).unwrap();
    let paths: Vec<&str> = diff.mismatches.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "PowercapInfo.Package0.Dram.Constraint0.PowerLimitUw",
            "PowercapInfo.Package0.Constraint0.PowerLimitUw",
        ]
    );
}

#[test]
fn rebuilt_cache_keeps_required_fields() {
    let document = collected_tree().get(true);
    let rebuilt = InfoGroup::from_document(&document, &ProbeRegistry::new()).unwrap();

    let mut reference = document.clone();
    reference["CacheTopology"]["L1D"]["Size"] = json!(32768);
    let diff = rebuilt.compare(reference).unwrap();
    assert_eq!(diff.mismatches.len(), 1);
    assert_eq!(diff.mismatches[0].path, "CacheTopology.L1D.Size");
}
