//! The root aggregator: one child per subsystem of the host.

use std::path::Path;

use tracing::{debug, info};

use super::accelerators::NVIDIA_SMI_INFO;
use super::cpu::{
    CACHE_TOPOLOGY, CPU_FREQUENCY, CPU_INFO, CPU_TOPOLOGY, PREFETCHER_INFO, TURBO_INFO,
};
use super::dmi::{DEFAULT_DMIFILE, DMIDECODE_FILE};
use super::executable::EXECUTABLE_INFO;
use super::kernel::{
    CGROUP_INFO, CLOCKSOURCE_INFO, IRQ_AFFINITY, NUMA_BALANCING_INFO, TRANSPARENT_HUGEPAGES,
    VULNERABILITIES_INFO, WRITEBACK_INFO,
};
use super::macos::{CPU_INFO_MACOS, LOAD_AVG_MACOS, MEM_INFO_MACOS, OS_INFO_MACOS, UPTIME_MACOS};
use super::memory::{HUGEPAGES_INFO, MEM_INFO, NUMA_INFO};
use super::power::POWERCAP_INFO;
use super::software::{COMPILER_INFO, DEFAULT_MODULECMD, MODULES_INFO, MPI_INFO, PYTHON_INFO};
use super::system::{
    HOST_INFO, KERNEL_INFO, LOAD_AVG, OPERATING_SYSTEM_INFO, SHELL_ENVIRONMENT, UPTIME_INFO,
    USERS_INFO,
};
use crate::config::MachineStateConfig;
use crate::error::Result;
use crate::group::{ChildSpec, Discovery, GroupArgs, InfoGroup, ProbeKind};
use crate::source::{which, SystemBackend};

pub const MACHINE_STATE: ProbeKind = ProbeKind::new("MachineState", machine_state);

/// Operating system family the collection runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOS,
    Other,
}

impl Platform {
    /// Detect the current platform.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOS
        } else {
            Platform::Other
        }
    }
}

/// What the optional subsystems need to know about the host.
///
/// Separated from detection so the subsystem list can be checked without
/// the tools being installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub modules: bool,
    pub nvidia_smi: bool,
    pub likwid_features: bool,
    pub likwid_powermeter: bool,
    pub dmifile: bool,
}

impl Capabilities {
    /// Probe PATH and the filesystem for everything the optional
    /// subsystems depend on.
    pub fn detect(args: &GroupArgs) -> Self {
        let likwid = |tool: &str| {
            let exe = match args.opt_str("likwid_path") {
                Some(prefix) => format!("{}/{tool}", prefix.trim_end_matches('/')),
                None => tool.to_string(),
            };
            which(&exe).is_some()
        };
        let likwid_enable = args.flag("likwid_enable", true);
        Self {
            modules: which(args.opt_str("modulecmd").unwrap_or(DEFAULT_MODULECMD)).is_some()
                || std::env::var_os("MODULESHOME").is_some(),
            nvidia_smi: which("nvidia-smi").is_some(),
            likwid_features: likwid_enable && likwid("likwid-features"),
            likwid_powermeter: likwid_enable && likwid("likwid-powermeter"),
            dmifile: Path::new(args.opt_str("dmifile").unwrap_or(DEFAULT_DMIFILE)).is_file(),
        }
    }
}

/// Constructor arguments of the root for a configuration.
///
/// Settings left at their defaults are omitted so they stay out of the
/// meta string.
pub fn root_args(config: &MachineStateConfig) -> GroupArgs {
    let mut args = GroupArgs::new(config.extended, config.anonymous);
    if let Some(executable) = &config.executable {
        args.set("executable", executable.display().to_string());
    }
    if config.dmifile.as_path() != Path::new(DEFAULT_DMIFILE) {
        args.set("dmifile", config.dmifile.display().to_string());
    }
    if !config.likwid_enable {
        args.set("likwid_enable", false);
    }
    if let Some(path) = &config.likwid_path {
        args.set("likwid_path", path.display().to_string());
    }
    if config.modulecmd != DEFAULT_MODULECMD {
        args.set("modulecmd", config.modulecmd.as_str());
    }
    args
}

fn machine_state(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("MachineState", args);
    let capabilities = Capabilities::detect(args);
    group.set_discovery(Discovery::children(subsystems(
        args,
        Platform::current(),
        &capabilities,
    )));
    Ok(group)
}

/// The children of the root for a platform and set of capabilities.
///
/// Core subsystems are mandatory; anything depending on optional tools,
/// files or user input is optional.
pub fn subsystems(
    args: &GroupArgs,
    platform: Platform,
    capabilities: &Capabilities,
) -> Vec<ChildSpec> {
    let plain = args.inherit();
    let mandatory = |kinds: &[ProbeKind]| {
        kinds
            .iter()
            .map(|kind| ChildSpec::mandatory(*kind, plain.clone()))
            .collect::<Vec<_>>()
    };

    let mut children = match platform {
        Platform::Linux => mandatory(&[
            HOST_INFO,
            CPU_INFO,
            OPERATING_SYSTEM_INFO,
            KERNEL_INFO,
            UPTIME_INFO,
            CPU_TOPOLOGY,
            NUMA_BALANCING_INFO,
            LOAD_AVG,
            MEM_INFO,
            CGROUP_INFO,
            WRITEBACK_INFO,
            CPU_FREQUENCY,
            NUMA_INFO,
            CACHE_TOPOLOGY,
            TRANSPARENT_HUGEPAGES,
            POWERCAP_INFO,
            HUGEPAGES_INFO,
            COMPILER_INFO,
            PYTHON_INFO,
            MPI_INFO,
            SHELL_ENVIRONMENT,
            CLOCKSOURCE_INFO,
            USERS_INFO,
            IRQ_AFFINITY,
            VULNERABILITIES_INFO,
        ]),
        Platform::MacOS => mandatory(&[
            HOST_INFO,
            CPU_INFO_MACOS,
            OS_INFO_MACOS,
            MEM_INFO_MACOS,
            UPTIME_MACOS,
            LOAD_AVG_MACOS,
            COMPILER_INFO,
            PYTHON_INFO,
            MPI_INFO,
            SHELL_ENVIRONMENT,
            USERS_INFO,
        ]),
        Platform::Other => mandatory(&[
            HOST_INFO,
            COMPILER_INFO,
            PYTHON_INFO,
            MPI_INFO,
            SHELL_ENVIRONMENT,
        ]),
    };

    if capabilities.modules {
        let mut module_args = plain.clone();
        if let Some(cmd) = args.opt_str("modulecmd") {
            module_args.set("modulecmd", cmd);
        }
        children.push(ChildSpec::optional(MODULES_INFO, module_args));
    }
    if capabilities.nvidia_smi {
        children.push(ChildSpec::optional(NVIDIA_SMI_INFO, plain.clone()));
    }
    let mut likwid_args = plain.clone();
    if let Some(prefix) = args.opt_str("likwid_path") {
        likwid_args.set("likwid_path", prefix);
    }
    if capabilities.likwid_features {
        children.push(ChildSpec::optional(PREFETCHER_INFO, likwid_args.clone()));
    }
    if capabilities.likwid_powermeter {
        children.push(ChildSpec::optional(TURBO_INFO, likwid_args));
    }
    if capabilities.dmifile {
        let mut dmi_args = plain.clone();
        if let Some(dmifile) = args.opt_str("dmifile") {
            dmi_args.set("dmifile", dmifile);
        }
        children.push(ChildSpec::optional(DMIDECODE_FILE, dmi_args));
    }
    if let Some(executable) = args.opt_str("executable") {
        children.push(ChildSpec::optional(
            EXECUTABLE_INFO,
            plain.with("executable", executable),
        ));
    }
    children
}

/// Root group for `config`, with the auxiliary blobs attached as constant
/// top-level fields. Children are not discovered yet.
pub fn build_machine_state(config: &MachineStateConfig) -> Result<InfoGroup> {
    let mut root = MACHINE_STATE.build(&root_args(config))?;
    for (name, blob) in &config.auxiliary {
        root.add_constant(name, blob.clone());
    }
    Ok(root)
}

/// Build, discover and acquire the whole tree for `config`.
pub fn collect(config: &MachineStateConfig) -> Result<InfoGroup> {
    let mut root = build_machine_state(config)?;
    root.generate()?;
    debug!(subsystems = root.children().len(), "discovery complete");
    root.update_with(&SystemBackend::with_timeout(config.command_timeout()));
    info!(subsystems = root.children().len(), "machine state collected");
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_names(children: &[ChildSpec]) -> Vec<&'static str> {
        children.iter().map(|c| c.kind.name).collect()
    }

    #[test]
    fn root_args_carry_configuration() {
        let config = MachineStateConfig {
            extended: true,
            likwid_path: Some("/opt/likwid/bin".into()),
            ..Default::default()
        };
        let args = root_args(&config);
        assert!(args.extended);
        assert_eq!(args.opt_str("likwid_path"), Some("/opt/likwid/bin"));
        assert!(args.get("dmifile").is_none());
        assert!(args.get("executable").is_none());
    }

    #[test]
    fn default_settings_stay_out_of_meta() {
        let root = build_machine_state(&MachineStateConfig::default()).unwrap();
        assert_eq!(root.meta(), "MachineState()");

        let config = MachineStateConfig {
            likwid_enable: false,
            modulecmd: "/opt/lmod/bin/modulecmd".to_string(),
            ..Default::default()
        };
        let root = build_machine_state(&config).unwrap();
        assert_eq!(
            root.meta(),
            r#"MachineState(likwid_enable=false, modulecmd="/opt/lmod/bin/modulecmd")"#
        );
    }

    #[test]
    fn linux_core_subsystems_are_mandatory() {
        let children = subsystems(
            &GroupArgs::default(),
            Platform::Linux,
            &Capabilities::default(),
        );
        assert!(children.iter().all(|c| !c.optional));
        let names = kind_names(&children);
        assert_eq!(names[0], "HostInfo");
        assert!(names.contains(&"CacheTopology"));
        assert!(!names.contains(&"TurboInfo"));
    }

    #[test]
    fn optional_subsystems_follow_capabilities() {
        let capabilities = Capabilities {
            modules: true,
            nvidia_smi: true,
            likwid_features: true,
            likwid_powermeter: true,
            dmifile: true,
        };
        let args = GroupArgs::default()
            .with("likwid_path", "/opt/likwid/bin")
            .with("executable", "/bin/true");
        let children = subsystems(&args, Platform::Linux, &capabilities);
        let optional: Vec<&ChildSpec> = children.iter().filter(|c| c.optional).collect();
        assert_eq!(
            optional.iter().map(|c| c.kind.name).collect::<Vec<_>>(),
            vec![
                "ModulesInfo",
                "NvidiaSmiInfo",
                "PrefetcherInfo",
                "TurboInfo",
                "DmiDecodeFile",
                "ExecutableInfo"
            ]
        );
        let turbo = optional.iter().find(|c| c.kind.name == "TurboInfo").unwrap();
        assert_eq!(turbo.args.opt_str("likwid_path"), Some("/opt/likwid/bin"));
    }

    #[test]
    fn macos_uses_sysctl_probes() {
        let names = kind_names(&subsystems(
            &GroupArgs::default(),
            Platform::MacOS,
            &Capabilities::default(),
        ));
        assert!(names.contains(&"CpuInfoMacOS"));
        assert!(!names.contains(&"CpuTopology"));
    }

    #[test]
    fn auxiliary_blobs_become_root_fields() {
        let mut config = MachineStateConfig::default();
        config
            .auxiliary
            .insert("Benchmark".to_string(), serde_json::json!({"flops": 1.5e12}));
        let root = build_machine_state(&config).unwrap();
        assert_eq!(root.kind(), "MachineState");
        assert!(root.field("Benchmark").is_some());
    }

    #[test]
    fn disabled_likwid_is_never_detected() {
        let args = GroupArgs::default().with("likwid_enable", false);
        let capabilities = Capabilities::detect(&args);
        assert!(!capabilities.likwid_features);
        assert!(!capabilities.likwid_powermeter);
    }
}
