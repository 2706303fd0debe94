//! RAPL power capping domains.

use crate::error::Result;
use crate::group::{ArgValue, Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::{to_bool, to_int, to_title};
use crate::source::SourceCache;

const RAPL_ROOT: &str = "/sys/devices/virtual/powercap/intel-rapl";

pub const POWERCAP_INFO: ProbeKind = ProbeKind::new("PowercapInfo", powercap_info);
pub const POWERCAP_PACKAGE: ProbeKind = ProbeKind::new("PowercapInfoPackage", powercap_package);
pub const POWERCAP_CLASS: ProbeKind = ProbeKind::new("PowercapInfoClass", powercap_class);
pub const POWERCAP_CONSTRAINT: ProbeKind =
    ProbeKind::new("PowercapInfoConstraint", powercap_constraint);

fn powercap_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("PowercapInfo", args);
    group.set_discovery(Discovery::path_match(
        format!("{RAPL_ROOT}/intel-rapl:*"),
        r".*/intel-rapl:(\d+)$",
        POWERCAP_PACKAGE,
        args.inherit(),
    )?);
    Ok(group)
}

/// Directory of a package, or of one of its subdomains.
fn domain_dir(package: i64, domain: Option<i64>) -> String {
    match domain {
        Some(domain) => format!("{RAPL_ROOT}/intel-rapl:{package}/intel-rapl:{package}:{domain}"),
        None => format!("{RAPL_ROOT}/intel-rapl:{package}"),
    }
}

fn powercap_package(args: &GroupArgs) -> Result<InfoGroup> {
    let package = args.int(IDENT_KEY)?;
    let base = domain_dir(package, None);
    let mut group = InfoGroup::new(format!("Package{package}"), args);
    declare_domain(&mut group, &base)?;
    group.set_discovery(Discovery::chain(vec![
        Discovery::path_match(
            format!("{base}/intel-rapl:{package}:*"),
            r".*/intel-rapl:\d+:(\d+)$",
            POWERCAP_CLASS,
            args.inherit().with("package", package),
        )?,
        constraints(&base, args.inherit().with("package", package))?,
    ]));
    Ok(group)
}

fn powercap_class(args: &GroupArgs) -> Result<InfoGroup> {
    let package = args.int("package")?;
    let domain = args.int(IDENT_KEY)?;
    let base = domain_dir(package, Some(domain));
    let mut group = InfoGroup::new(format!("Domain{domain}"), args);
    declare_domain(&mut group, &base)?;
    group.set_discovery(constraints(
        &base,
        args.inherit().with("package", package).with("domain", domain),
    )?);
    group.on_update(rename_domain);
    Ok(group)
}

fn declare_domain(group: &mut InfoGroup, base: &str) -> Result<()> {
    group.add_file("Name", format!("{base}/name"), None, Some(to_title))?;
    group.add_file("Enabled", format!("{base}/enabled"), None, Some(to_bool))?;
    group.require(&["Enabled"]);
    Ok(())
}

/// One child per `constraint_<n>_name` file of a domain directory.
fn constraints(base: &str, args: GroupArgs) -> Result<Discovery> {
    Discovery::path_match(
        format!("{base}/constraint_*_name"),
        r".*/constraint_(\d+)_name$",
        POWERCAP_CONSTRAINT,
        args,
    )
}

fn powercap_constraint(args: &GroupArgs) -> Result<InfoGroup> {
    let package = args.int("package")?;
    let domain = args.get("domain").and_then(ArgValue::as_int);
    let number = args.int(IDENT_KEY)?;
    let base = domain_dir(package, domain);
    let mut group = InfoGroup::new(format!("Constraint{number}"), args);
    group.add_file("Name", format!("{base}/constraint_{number}_name"), None, Some(to_title))?;
    group.add_file(
        "PowerLimitUw",
        format!("{base}/constraint_{number}_power_limit_uw"),
        None,
        Some(to_int),
    )?;
    group.add_file(
        "TimeWindowUs",
        format!("{base}/constraint_{number}_time_window_us"),
        None,
        Some(to_int),
    )?;
    group.require(&["Name", "PowerLimitUw"]);
    Ok(group)
}

/// Subdomains are known by the contents of their name file.
fn rename_domain(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    let name = match group.value("Name") {
        Some(serde_json::Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return,
    };
    group.set_name(name);
}
