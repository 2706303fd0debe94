//! NVIDIA GPUs, from the driver's procfs entries and `nvidia-smi`.

use crate::error::Result;
use crate::group::{Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::{khz_to_hz, to_bytes, to_float, to_int};

const GPU_ROOT: &str = "/proc/driver/nvidia/gpus";
const SMI: &str = "nvidia-smi";
const SMI_QUERY: &str = "clocks.max.sm,clocks.max.mem,power.limit,memory.total";

pub const NVIDIA_SMI_INFO: ProbeKind = ProbeKind::new("NvidiaSmiInfo", nvidia_smi_info);
pub const NVIDIA_SMI_CLASS: ProbeKind = ProbeKind::new("NvidiaSmiInfoClass", nvidia_smi_class);

fn nvidia_smi_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("NvidiaSmiInfo", args);
    group.add_command(
        "DriverVersion",
        SMI,
        "--query-gpu=driver_version --format=csv,noheader",
        Some(r"([\d.]+)"),
        None,
    )?;
    group.add_command("CudaVersion", SMI, "", Some(r"CUDA Version:\s*([\d.]+)"), None)?;
    group.require(&["DriverVersion", "CudaVersion"]);
    group.set_discovery(Discovery::path_match(
        format!("{GPU_ROOT}/*"),
        r".*/gpus/([0-9a-fA-F]+:[0-9a-fA-F]+:[0-9a-fA-F]+\.[0-9a-fA-F]+)$",
        NVIDIA_SMI_CLASS,
        args.inherit(),
    )?);
    Ok(group)
}

fn nvidia_smi_class(args: &GroupArgs) -> Result<InfoGroup> {
    let bus = args.str(IDENT_KEY)?;
    let information = format!("{GPU_ROOT}/{bus}/information");
    let query = format!("-i {bus} --query-gpu={SMI_QUERY} --format=csv,noheader");

    let mut group = InfoGroup::new(format!("Gpu-{bus}"), args);
    group.add_file("Model", &information, Some(r"Model:\s+(.+)"), None)?;
    group.add_file("IRQ", &information, Some(r"IRQ:\s+(\d+)"), Some(to_int))?;
    group.add_file("UUID", &information, Some(r"GPU UUID:\s+(.+)"), None)?;
    group.add_file("VideoBIOS", &information, Some(r"Video BIOS:\s+(.+)"), None)?;
    group.add_file("BusType", &information, Some(r"Bus Type:\s+(.+)"), None)?;
    // One CSV row: "1380 MHz, 877 MHz, 250.00 W, 16160 MiB".
    group.add_command("MaxSmClock", SMI, &query, Some(r"^([\d.]+ MHz)"), Some(khz_to_hz))?;
    group.add_command("MaxMemClock", SMI, &query, Some(r"^[^,]+,\s*([\d.]+ MHz)"), Some(khz_to_hz))?;
    group.add_command("PowerLimit", SMI, &query, Some(r"^[^,]+,[^,]+,\s*([\d.]+) W"), Some(to_float))?;
    group.add_command("MemTotal", SMI, &query, Some(r"^[^,]+,[^,]+,[^,]+,\s*(\d+ MiB)"), Some(to_bytes))?;
    group.mark_identifying(&["UUID"]);
    group.require(&["Model", "VideoBIOS", "MaxSmClock", "MaxMemClock", "MemTotal"]);
    Ok(group)
}
