//! Toolchain probes: compilers, Python interpreters, MPI launchers and
//! environment modules.

use serde_json::Value;

use crate::error::Result;
use crate::group::{ArgValue, ChildSpec, Discovery, GroupArgs, InfoGroup, ProbeKind, IDENT_KEY};
use crate::parse::scalar::title_case;
use crate::parse::{mpi_vendor, mpi_version};
use crate::source::{which, SourceCache};

const VERSION_PATTERN: &str = r"(\d+\.\d+\.\d+)";

const C_COMPILERS: &[&str] = &["gcc", "icc", "icx", "clang", "pgcc", "nvc", "xlc", "armclang"];
const CXX_COMPILERS: &[&str] = &["g++", "icpc", "icpx", "clang++", "pg++", "nvc++", "armclang++"];
const FORTRAN_COMPILERS: &[&str] = &["gfortran", "ifort", "ifx", "flang", "pgf90", "nvfortran", "armflang"];
const PYTHONS: &[&str] = &["python2", "python3", "python"];
/// Environment-modules command looked up when none is configured.
pub const DEFAULT_MODULECMD: &str = "modulecmd";

const MPI_LAUNCHERS: &[&str] = &["mpiexec", "mpiexec.hydra", "mpirun", "srun", "aprun", "prun"];

pub const COMPILER_INFO: ProbeKind = ProbeKind::new("CompilerInfo", compiler_info);
pub const C_COMPILER_INFO: ProbeKind = ProbeKind::new("CCompilerInfo", c_compilers);
pub const CXX_COMPILER_INFO: ProbeKind = ProbeKind::new("CPlusCompilerInfo", cxx_compilers);
pub const FORTRAN_COMPILER_INFO: ProbeKind = ProbeKind::new("FortranCompilerInfo", fortran_compilers);
pub const COMPILER_CLASS: ProbeKind = ProbeKind::new("CompilerInfoClass", tool_version_class);
pub const PYTHON_INFO: ProbeKind = ProbeKind::new("PythonInfo", python_info);
pub const PYTHON_CLASS: ProbeKind = ProbeKind::new("PythonInfoClass", tool_version_class);
pub const MPI_INFO: ProbeKind = ProbeKind::new("MpiInfo", mpi_info);
pub const MPI_CLASS: ProbeKind = ProbeKind::new("MpiInfoClass", mpi_class);
pub const MODULES_INFO: ProbeKind = ProbeKind::new("ModulesInfo", modules_info);

/// Candidates present on PATH, in candidate order, with the tool named by
/// `extra` (usually an environment variable such as `CC`) appended.
pub fn available_tools(
    candidates: &[&str],
    extra: Option<String>,
    is_present: impl Fn(&str) -> bool,
) -> Vec<ArgValue> {
    let mut names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    if let Some(extra) = extra.filter(|e| !e.is_empty()) {
        if !names.contains(&extra) {
            names.push(extra);
        }
    }
    names
        .into_iter()
        .filter(|name| is_present(name))
        .map(ArgValue::from)
        .collect()
}

fn on_path(candidates: &[&str], env_var: Option<&str>) -> Vec<ArgValue> {
    let extra = env_var.and_then(|var| std::env::var(var).ok());
    available_tools(candidates, extra, |name| which(name).is_some())
}

fn compiler_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("CompilerInfo", args);
    group.set_discovery(Discovery::children(
        [C_COMPILER_INFO, CXX_COMPILER_INFO, FORTRAN_COMPILER_INFO]
            .into_iter()
            .map(|kind| ChildSpec::mandatory(kind, args.inherit()))
            .collect(),
    ));
    Ok(group)
}

fn compiler_family(args: &GroupArgs, name: &str, candidates: &[&str], env_var: &str) -> InfoGroup {
    let mut group = InfoGroup::new(name, args);
    group.set_discovery(Discovery::list(
        on_path(candidates, Some(env_var)),
        COMPILER_CLASS,
        args.inherit(),
    ));
    group
}

fn c_compilers(args: &GroupArgs) -> Result<InfoGroup> {
    Ok(compiler_family(args, "C", C_COMPILERS, "CC"))
}

fn cxx_compilers(args: &GroupArgs) -> Result<InfoGroup> {
    Ok(compiler_family(args, "C++", CXX_COMPILERS, "CXX"))
}

fn fortran_compilers(args: &GroupArgs) -> Result<InfoGroup> {
    Ok(compiler_family(args, "Fortran", FORTRAN_COMPILERS, "FC"))
}

/// Resolved location of a tool, recorded in extended mode.
fn add_tool_path(group: &mut InfoGroup, executable: &str) {
    let path = which(executable)
        .map(|p| Value::String(p.display().to_string()))
        .unwrap_or(Value::Null);
    group.add_constant("Path", path);
    // Tools in a home directory reveal the user.
    group.mark_identifying(&["Path"]);
}

fn tool_version_class(args: &GroupArgs) -> Result<InfoGroup> {
    let executable = args.str(IDENT_KEY)?;
    let mut group = InfoGroup::new(title_case(executable), args);
    group.add_command("Version", executable, "--version", Some(VERSION_PATTERN), None)?;
    if args.extended {
        add_tool_path(&mut group, executable);
    }
    group.require(&["Version"]);
    Ok(group)
}

fn python_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("PythonInfo", args);
    group.set_discovery(Discovery::list(on_path(PYTHONS, None), PYTHON_CLASS, args.inherit()));
    Ok(group)
}

fn mpi_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("MpiInfo", args);
    group.set_discovery(Discovery::list(
        on_path(MPI_LAUNCHERS, None),
        MPI_CLASS,
        args.inherit(),
    ));
    Ok(group)
}

fn mpi_class(args: &GroupArgs) -> Result<InfoGroup> {
    let executable = args.str(IDENT_KEY)?;
    let mut group = InfoGroup::new(title_case(executable), args);
    group.add_command("Version", executable, "--version", None, Some(mpi_version))?;
    group.add_command("Implementor", executable, "--version", None, Some(mpi_vendor))?;
    if args.extended {
        add_tool_path(&mut group, executable);
    }
    group.require(&["Version", "Implementor"]);
    Ok(group)
}

fn modules_info(args: &GroupArgs) -> Result<InfoGroup> {
    let mut group = InfoGroup::new("ModulesInfo", args);
    if args.extended {
        add_tool_path(&mut group, args.opt_str("modulecmd").unwrap_or(DEFAULT_MODULECMD));
    }
    group.on_update(loaded_modules);
    Ok(group)
}

fn loaded_modules(group: &mut InfoGroup, _cache: &mut SourceCache<'_>) {
    group.set_value("Loaded", split_env_list(std::env::var("LOADEDMODULES").ok()));
    group.set_value("ModulePath", split_env_list(std::env::var("MODULEPATH").ok()));
}

/// Split a colon-separated variable; an unset variable is null.
pub fn split_env_list(value: Option<String>) -> Value {
    match value {
        Some(value) => Value::Array(
            value
                .split(':')
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockBackend;
    use serde_json::json;

    #[test]
    fn available_tools_appends_env_choice() {
        let present = |name: &str| name != "icc";
        let tools = available_tools(&["gcc", "icc"], Some("mpicc".to_string()), present);
        assert_eq!(tools, vec![ArgValue::from("gcc"), ArgValue::from("mpicc")]);
    }

    #[test]
    fn available_tools_ignores_duplicate_env_choice() {
        let tools = available_tools(&["gcc"], Some("gcc".to_string()), |_| true);
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn compiler_version_is_extracted() {
        let mut backend = MockBackend::new();
        backend.add_command(
            "gcc",
            "--version",
            "gcc (Ubuntu 11.4.0-1ubuntu1~22.04) 11.4.0\nCopyright (C) 2021",
        );
        let args = GroupArgs::default().with(IDENT_KEY, "gcc");
        let mut group = COMPILER_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.name(), "Gcc");
        assert_eq!(group.value("Version"), Some(&json!("11.4.0")));
    }

    #[test]
    fn mpi_launcher_is_classified_from_one_run() {
        let mut backend = MockBackend::new();
        backend.add_command(
            "mpirun",
            "--version",
            "mpirun (Open MPI) 4.1.2\n\nReport bugs to http://www.open-mpi.org/community/help/",
        );
        let args = GroupArgs::default().with(IDENT_KEY, "mpirun");
        let mut group = MPI_CLASS.build(&args).unwrap();
        group.update_with(&backend);

        assert_eq!(group.value("Version"), Some(&json!("4.1.2")));
        assert_eq!(group.value("Implementor"), Some(&json!("OpenMPI")));
        assert_eq!(backend.command_runs("mpirun", "--version"), 1);
    }

    #[test]
    fn compiler_info_has_three_families() {
        let mut group = COMPILER_INFO.build(&GroupArgs::default()).unwrap();
        group.generate().unwrap();
        let names: Vec<&str> = group.children().iter().map(InfoGroup::name).collect();
        assert_eq!(names, vec!["C", "C++", "Fortran"]);
    }

    #[test]
    fn env_lists_split_on_colons() {
        assert_eq!(
            split_env_list(Some("gcc/12:openmpi/4.1::".to_string())),
            json!(["gcc/12", "openmpi/4.1"])
        );
        assert_eq!(split_env_list(None), Value::Null);
    }
}
