//! Saved `dmidecode` output.
//!
//! Reading DMI tables needs root, so sites dump them once to a file that
//! unprivileged collection runs pick up.

use crate::error::Result;
use crate::group::{GroupArgs, InfoGroup, ProbeKind};

pub const DEFAULT_DMIFILE: &str = "/etc/dmidecode.txt";

pub const DMIDECODE_FILE: ProbeKind = ProbeKind::new("DmiDecodeFile", dmidecode_file);

fn dmidecode_file(args: &GroupArgs) -> Result<InfoGroup> {
    let path = args.opt_str("dmifile").unwrap_or(DEFAULT_DMIFILE);
    let mut group = InfoGroup::new("DmiDecodeFile", args);
    group.add_file("DmiDecode", path, None, None)?;
    // Serial numbers and asset tags live in here.
    group.mark_identifying(&["DmiDecode"]);
    Ok(group)
}
