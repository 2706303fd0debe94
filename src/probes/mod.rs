//! Built-in probe kinds.
//!
//! Each submodule covers one area of the host and exposes its kinds as
//! [`ProbeKind`] constants. [`builtin_kinds`] lists all of them so
//! documents written by this crate can be rebuilt.

pub mod accelerators;
pub mod cpu;
pub mod dmi;
pub mod executable;
pub mod kernel;
pub mod macos;
pub mod memory;
pub mod power;
pub mod root;
pub mod software;
pub mod system;

pub use accelerators::{NVIDIA_SMI_CLASS, NVIDIA_SMI_INFO};
pub use cpu::{
    CACHE_TOPOLOGY, CACHE_TOPOLOGY_CLASS, CPU_FREQUENCY, CPU_FREQUENCY_CLASS, CPU_INFO,
    CPU_TOPOLOGY, CPU_TOPOLOGY_CLASS, PREFETCHER_CLASS, PREFETCHER_INFO, TURBO_INFO,
};
pub use dmi::{DEFAULT_DMIFILE, DMIDECODE_FILE};
pub use executable::{EXECUTABLE_EXEC, EXECUTABLE_INFO, EXECUTABLE_LIBRARIES};
pub use kernel::{
    CGROUP_INFO, CLOCKSOURCE_CLASS, CLOCKSOURCE_INFO, IRQ_AFFINITY, IRQ_AFFINITY_CLASS,
    NUMA_BALANCING_INFO, TRANSPARENT_HUGEPAGES, VULNERABILITIES_INFO, WRITEBACK_INFO,
};
pub use macos::{CPU_INFO_MACOS, LOAD_AVG_MACOS, MEM_INFO_MACOS, OS_INFO_MACOS, UPTIME_MACOS};
pub use memory::{
    HUGEPAGES_CLASS, HUGEPAGES_INFO, MEM_INFO, NUMA_HUGEPAGES_CLASS, NUMA_INFO, NUMA_INFO_CLASS,
};
pub use power::{POWERCAP_CLASS, POWERCAP_CONSTRAINT, POWERCAP_INFO, POWERCAP_PACKAGE};
pub use root::{
    build_machine_state, collect, root_args, subsystems, Capabilities, Platform, MACHINE_STATE,
};
pub use software::{
    COMPILER_CLASS, COMPILER_INFO, CXX_COMPILER_INFO, C_COMPILER_INFO, DEFAULT_MODULECMD,
    FORTRAN_COMPILER_INFO, MODULES_INFO, MPI_CLASS, MPI_INFO, PYTHON_CLASS, PYTHON_INFO,
};
pub use system::{
    HOST_INFO, KERNEL_INFO, LOAD_AVG, OPERATING_SYSTEM_INFO, SHELL_ENVIRONMENT, UPTIME_INFO,
    USERS_INFO,
};

use crate::error::Result;
use crate::group::{GroupArgs, InfoGroup, ProbeKind};

/// A plain group with no fields of its own, for hand-built trees.
pub const INFO_GROUP: ProbeKind = ProbeKind::new("InfoGroup", plain_group);

fn plain_group(args: &GroupArgs) -> Result<InfoGroup> {
    Ok(InfoGroup::new("InfoGroup", args))
}

/// Every kind this crate can write into a document.
pub fn builtin_kinds() -> Vec<ProbeKind> {
    vec![
        INFO_GROUP,
        MACHINE_STATE,
        HOST_INFO,
        OPERATING_SYSTEM_INFO,
        KERNEL_INFO,
        UPTIME_INFO,
        LOAD_AVG,
        USERS_INFO,
        SHELL_ENVIRONMENT,
        CPU_INFO,
        CPU_TOPOLOGY,
        CPU_TOPOLOGY_CLASS,
        CPU_FREQUENCY,
        CPU_FREQUENCY_CLASS,
        CACHE_TOPOLOGY,
        CACHE_TOPOLOGY_CLASS,
        PREFETCHER_INFO,
        PREFETCHER_CLASS,
        TURBO_INFO,
        MEM_INFO,
        NUMA_INFO,
        NUMA_INFO_CLASS,
        NUMA_HUGEPAGES_CLASS,
        HUGEPAGES_INFO,
        HUGEPAGES_CLASS,
        NUMA_BALANCING_INFO,
        CGROUP_INFO,
        WRITEBACK_INFO,
        TRANSPARENT_HUGEPAGES,
        CLOCKSOURCE_INFO,
        CLOCKSOURCE_CLASS,
        IRQ_AFFINITY,
        IRQ_AFFINITY_CLASS,
        VULNERABILITIES_INFO,
        POWERCAP_INFO,
        POWERCAP_PACKAGE,
        POWERCAP_CLASS,
        POWERCAP_CONSTRAINT,
        COMPILER_INFO,
        C_COMPILER_INFO,
        CXX_COMPILER_INFO,
        FORTRAN_COMPILER_INFO,
        COMPILER_CLASS,
        PYTHON_INFO,
        PYTHON_CLASS,
        MPI_INFO,
        MPI_CLASS,
        MODULES_INFO,
        NVIDIA_SMI_INFO,
        NVIDIA_SMI_CLASS,
        DMIDECODE_FILE,
        EXECUTABLE_INFO,
        EXECUTABLE_EXEC,
        EXECUTABLE_LIBRARIES,
        CPU_INFO_MACOS,
        OS_INFO_MACOS,
        MEM_INFO_MACOS,
        UPTIME_MACOS,
        LOAD_AVG_MACOS,
    ]
}
