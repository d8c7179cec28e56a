//! Launcher shims for bundled executables and launch files
//!
//! Every shim is a bash script that locates the bundle root, sources the ROS
//! setup files inside it, points the search paths at the bundle and then
//! execs the real program.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt::Write as _;
use std::os::unix::fs::PermissionsExt;

use super::BundleTree;
use crate::Result;

/// Install subdirectories scanned for package executables
pub const BINARY_SUBDIRS: &[&str] = &["lib", "share"];

/// How a search path variable is extended
#[derive(Debug, Clone, Copy)]
enum Position {
    Prepend,
    Append,
}

/// Search paths exported by every shim. `{prefix}` is the ROS prefix.
const SEARCH_PATHS: &[(&str, Position, &[&str])] = &[
    (
        "LD_LIBRARY_PATH",
        Position::Prepend,
        &["/usr/lib/x86_64-linux-gnu", "/usr/lib"],
    ),
    ("PATH", Position::Prepend, &["{prefix}/bin", "/usr/bin"]),
    (
        "PYTHONPATH",
        Position::Prepend,
        &[
            "{prefix}/lib/python2.7/dist-packages",
            "/usr/lib/python2.7/dist-packages",
        ],
    ),
    (
        "PKG_CONFIG_PATH",
        Position::Prepend,
        &["/usr/lib/pkgconfig", "/usr/lib/x86_64-linux-gnu/pkgconfig"],
    ),
    ("CMAKE_PREFIX_PATH", Position::Append, &["{prefix}"]),
];

/// Bash prelude shared by all shims of one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentScript {
    ros_prefix: Utf8PathBuf,
    workspace_setup: bool,
}

impl EnvironmentScript {
    /// Script for a bundle built from installed debs under `ros_prefix`
    pub fn installed(ros_prefix: impl Into<Utf8PathBuf>) -> Self {
        Self {
            ros_prefix: ros_prefix.into(),
            workspace_setup: false,
        }
    }

    /// Script for a bundle built from a catkin workspace; additionally
    /// sources the workspace's own `install/setup.bash`
    pub fn workspace(ros_prefix: impl Into<Utf8PathBuf>) -> Self {
        Self {
            ros_prefix: ros_prefix.into(),
            workspace_setup: true,
        }
    }

    /// Render the prelude
    pub fn prelude(&self) -> String {
        let prefix = format!("$mydir{}", self.ros_prefix);
        let mut script = String::from("#!/bin/bash\n");
        script.push_str(
            "mydir=$(dirname $(dirname $(builtin cd \"`dirname \"${BASH_SOURCE[0]}\"`\" > /dev/null && pwd)))\n",
        );
        let _ = writeln!(script, ". {}/setup.bash", prefix);
        if self.workspace_setup {
            script.push_str(". $mydir/install/setup.bash\n");
        }
        script.push_str("export ROS_MASTER_URI=http://localhost:11311\n");

        for (variable, position, entries) in SEARCH_PATHS {
            let paths = entries
                .iter()
                .map(|e| {
                    if let Some(rest) = e.strip_prefix("{prefix}") {
                        format!("{}{}", prefix, rest)
                    } else {
                        format!("$mydir{}", e)
                    }
                })
                .collect::<Vec<_>>()
                .join(":");
            let _ = match position {
                Position::Prepend => writeln!(script, "export {0}={1}:${0}", variable, paths),
                Position::Append => writeln!(script, "export {0}=${0}:{1}", variable, paths),
            };
        }

        script
    }

    /// Render a complete shim that execs `command` with the shim's arguments
    pub fn exec(&self, command: &str) -> String {
        format!("{}exec {} \"$@\"\n", self.prelude(), command)
    }
}

/// Write shims for every executable the package installed under
/// `install/<subdir>/<package>/`. Returns the manifest entries.
pub fn collect_binaries(
    tree: &BundleTree,
    package_name: &str,
    script: &EnvironmentScript,
) -> Result<Vec<String>> {
    let mut entries = Vec::new();

    for subdir in BINARY_SUBDIRS {
        let pkg_dir = tree.install_dir().join(subdir).join(package_name);
        if !pkg_dir.is_dir() {
            continue;
        }

        let shim_dir = tree.bin_dir().join(subdir);
        std::fs::create_dir_all(&shim_dir)?;

        for binary in sorted_file_names(&pkg_dir)? {
            let path = pkg_dir.join(&binary);
            // Dangling links and unreadable entries are not binaries
            let Ok(metadata) = std::fs::metadata(&path) else {
                tracing::debug!(path = %path, "Skipping unreadable entry");
                continue;
            };
            if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
                continue;
            }

            let shim_name = binary.replace('_', "-");
            let target = format!("\"$mydir/install/{}/{}/{}\"", subdir, package_name, binary);
            write_shim(&shim_dir.join(&shim_name), &script.exec(&target))?;
            tracing::debug!(binary = %path, shim = %shim_name, "Wrote binary shim");

            entries.push(format!("bin/{}/{}", subdir, shim_name));
        }
    }

    Ok(entries)
}

/// Write a `roslaunch` shim for every file in `launch_dir`, the package's
/// `share/<package>/launch` directory. Returns the manifest entries.
pub fn write_launch_shims(
    tree: &BundleTree,
    package_name: &str,
    launch_dir: &Utf8Path,
    script: &EnvironmentScript,
) -> Result<Vec<String>> {
    if !launch_dir.is_dir() {
        return Ok(Vec::new());
    }

    let shim_dir = tree.bin_dir().join("launch");
    std::fs::create_dir_all(&shim_dir)?;

    let mut entries = Vec::new();
    for launch_file in sorted_file_names(launch_dir)? {
        if !launch_dir.join(&launch_file).is_file() {
            continue;
        }

        let command = format!(
            "roslaunch \"$mydir/install/share/{}/launch/{}\"",
            package_name, launch_file
        );
        write_shim(&shim_dir.join(&launch_file), &script.exec(&command))?;
        entries.push(format!("bin/launch/{}", launch_file));
    }

    Ok(entries)
}

fn sorted_file_names(dir: &Utf8Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in dir.read_dir_utf8()? {
        names.push(entry?.file_name().to_string());
    }
    names.sort();
    Ok(names)
}

fn write_shim(path: &Utf8Path, content: &str) -> Result<()> {
    std::fs::write(path, content)?;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_executable(path: &Utf8Path, content: &str, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_prelude_for_installed_bundle() {
        let script = EnvironmentScript::installed("/opt/ros/jade").prelude();

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains(". $mydir/opt/ros/jade/setup.bash\n"));
        assert!(!script.contains("install/setup.bash"));
        assert!(script.contains(
            "export PATH=$mydir/opt/ros/jade/bin:$mydir/usr/bin:$PATH\n"
        ));
        assert!(script.contains("export CMAKE_PREFIX_PATH=$CMAKE_PREFIX_PATH:$mydir/opt/ros/jade\n"));
        assert!(script.contains("export ROS_MASTER_URI=http://localhost:11311\n"));
    }

    #[test]
    fn test_prelude_for_workspace_bundle() {
        let script = EnvironmentScript::workspace("/opt/ros/indigo").prelude();

        assert!(script.contains(". $mydir/opt/ros/indigo/setup.bash\n. $mydir/install/setup.bash\n"));
    }

    #[test]
    fn test_collect_binaries_only_executables() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(temp_dir.path()).unwrap();
        let tree = BundleTree::new(output, "turtlesim");
        tree.create().unwrap();

        let lib_dir = tree.install_dir().join("lib/turtlesim");
        make_executable(&lib_dir.join("turtlesim_node"), "elf", 0o755);
        make_executable(&lib_dir.join("draw_square"), "elf", 0o755);
        make_executable(&lib_dir.join("notes.txt"), "text", 0o644);
        fs::create_dir_all(lib_dir.join("subdir")).unwrap();

        let script = EnvironmentScript::installed("/opt/ros/jade");
        let entries = collect_binaries(&tree, "turtlesim", &script).unwrap();

        assert_eq!(
            entries,
            vec!["bin/lib/draw-square", "bin/lib/turtlesim-node"]
        );

        let shim_path = tree.bin_dir().join("lib/turtlesim-node");
        let shim = fs::read_to_string(&shim_path).unwrap();
        assert!(shim.ends_with("exec \"$mydir/install/lib/turtlesim/turtlesim_node\" \"$@\"\n"));
        let mode = fs::metadata(&shim_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_collect_binaries_skips_dangling_links() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(temp_dir.path()).unwrap();
        let tree = BundleTree::new(output, "talker");
        tree.create().unwrap();

        let lib_dir = tree.install_dir().join("lib/talker");
        make_executable(&lib_dir.join("talker_node"), "elf", 0o755);
        std::os::unix::fs::symlink("/nonexistent/build/gone", lib_dir.join("zz_dangling")).unwrap();
        std::os::unix::fs::symlink("talker_node", lib_dir.join("talker_alias")).unwrap();

        let script = EnvironmentScript::installed("/opt/ros/jade");
        let entries = collect_binaries(&tree, "talker", &script).unwrap();

        // A link to an executable is still a binary; a dangling one is not
        assert_eq!(entries, vec!["bin/lib/talker-alias", "bin/lib/talker-node"]);
        assert!(!tree.bin_dir().join("lib/zz-dangling").exists());
    }

    #[test]
    fn test_collect_binaries_without_install_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(temp_dir.path()).unwrap();
        let tree = BundleTree::new(output, "empty");
        tree.create().unwrap();

        let script = EnvironmentScript::installed("/opt/ros/jade");
        assert!(collect_binaries(&tree, "empty", &script).unwrap().is_empty());
    }

    #[test]
    fn test_write_launch_shims() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(temp_dir.path()).unwrap();
        let tree = BundleTree::new(&output.join("out"), "demo");
        tree.create().unwrap();

        let launch_dir = output.join("share/demo/launch");
        fs::create_dir_all(&launch_dir).unwrap();
        fs::write(launch_dir.join("sim.launch"), "<launch/>").unwrap();
        fs::write(launch_dir.join("real.launch"), "<launch/>").unwrap();

        let script = EnvironmentScript::installed("/opt/ros/jade");
        let entries = write_launch_shims(&tree, "demo", &launch_dir, &script).unwrap();

        assert_eq!(entries, vec!["bin/launch/real.launch", "bin/launch/sim.launch"]);
        let shim = fs::read_to_string(tree.bin_dir().join("launch/sim.launch")).unwrap();
        assert!(shim.contains("exec roslaunch \"$mydir/install/share/demo/launch/sim.launch\""));
    }

    #[test]
    fn test_missing_launch_dir_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(temp_dir.path()).unwrap();
        let tree = BundleTree::new(output, "demo");
        tree.create().unwrap();

        let script = EnvironmentScript::installed("/opt/ros/jade");
        let entries =
            write_launch_shims(&tree, "demo", &output.join("nope"), &script).unwrap();

        assert!(entries.is_empty());
        assert!(!tree.bin_dir().join("launch").exists());
    }
}
