//! Package parsing and representation
//!
//! This module handles parsing of catkin `package.xml` files (formats 1
//! through 3) into the [`Package`] descriptor used for bundling.

use camino::{Utf8Path, Utf8PathBuf};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

use crate::{Error, Result};

/// A package maintainer as declared in package.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl std::fmt::Display for Maintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Represents a ROS package parsed from package.xml
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Package description
    pub description: Option<String>,

    /// Declared maintainers, in document order
    pub maintainers: Vec<Maintainer>,

    /// Path to the package directory
    pub path: Utf8PathBuf,

    /// Format 1 run dependencies
    pub run_depend: Vec<String>,

    /// Execution dependencies
    pub exec_depend: Vec<String>,

    /// General dependencies (applies to build, exec, and test)
    pub depend: Vec<String>,
}

impl Package {
    /// Parse a package from a package.xml file
    pub fn from_path(package_xml_path: &Utf8Path) -> Result<Self> {
        let content = std::fs::read_to_string(package_xml_path)?;
        let package_dir = package_xml_path
            .parent()
            .ok_or_else(|| Error::package("Invalid package path", "Path has no parent directory"))?
            .to_path_buf();

        Self::from_str(&content, package_dir)
    }

    /// Parse a package from XML content
    pub fn from_str(content: &str, path: Utf8PathBuf) -> Result<Self> {
        let raw: RawPackageXml = from_str(content)?;

        let maintainers = raw
            .maintainer
            .into_iter()
            .map(|m| Maintainer {
                name: m.name.trim().to_string(),
                email: m.email.unwrap_or_default(),
            })
            .collect();

        Ok(Package {
            name: raw.name.trim().to_string(),
            version: raw.version.trim().to_string(),
            description: read_description(content)?,
            maintainers,
            path,
            run_depend: extract_deps(&raw.run_depend),
            exec_depend: extract_deps(&raw.exec_depend),
            depend: extract_deps(&raw.depend),
        })
    }

    /// Get runtime dependencies (run_depend + exec_depend + depend)
    ///
    /// Names are yielded once each, in declaration order.
    pub fn run_dependencies(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.run_depend
            .iter()
            .chain(self.exec_depend.iter())
            .chain(self.depend.iter())
            .map(|s| s.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// The first declared maintainer, if any
    pub fn primary_maintainer(&self) -> Option<&Maintainer> {
        self.maintainers.first()
    }
}

/// Raw package.xml structure for deserialization
#[derive(Debug, Deserialize)]
struct RawPackageXml {
    name: String,
    version: String,
    #[serde(default)]
    maintainer: Vec<RawMaintainer>,
    #[serde(default)]
    run_depend: Vec<Dependency>,
    #[serde(default)]
    exec_depend: Vec<Dependency>,
    #[serde(default)]
    depend: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct RawMaintainer {
    #[serde(rename = "$text")]
    name: String,
    #[serde(rename = "@email")]
    email: Option<String>,
}

/// Dependency element
#[derive(Debug, Deserialize)]
struct Dependency {
    #[serde(rename = "$text")]
    name: String,
    #[serde(rename = "@condition")]
    condition: Option<String>,
}

/// Inner content of the top-level `<description>`, markup included
///
/// Descriptions may embed XHTML such as `<a href>`, which serde cannot map to
/// a string, so the element is read raw instead.
fn read_description(content: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                if depth == 2 && start.name().as_ref() == b"description" {
                    let text = reader.read_text(start.name())?;
                    return Ok(Some(text.trim().to_string()));
                }
            }
            Event::Empty(empty) if depth == 1 && empty.name().as_ref() == b"description" => {
                return Ok(Some(String::new()));
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Extract dependency names from raw dependency list
///
/// Conditional dependencies (REP 149) are skipped.
fn extract_deps(deps: &[Dependency]) -> Vec<String> {
    deps.iter()
        .filter(|d| d.condition.is_none())
        .map(|d| d.name.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format1_package_xml() {
        let xml = r#"<?xml version="1.0"?>
<package>
  <name>turtlesim</name>
  <version>0.5.2</version>
  <description>turtlesim is a tool made for teaching ROS.</description>
  <maintainer email="dthomas@osrfoundation.org">Dirk Thomas</maintainer>
  <license>BSD</license>

  <buildtool_depend>catkin</buildtool_depend>
  <build_depend>roscpp</build_depend>
  <run_depend>roscpp</run_depend>
  <build_depend>std_msgs</build_depend>
  <run_depend>std_msgs</run_depend>
</package>"#;

        let package = Package::from_str(xml, Utf8PathBuf::from("/turtlesim")).unwrap();

        assert_eq!(package.name, "turtlesim");
        assert_eq!(package.version, "0.5.2");
        assert_eq!(
            package.description.as_deref(),
            Some("turtlesim is a tool made for teaching ROS.")
        );
        assert_eq!(package.run_dependencies(), vec!["roscpp", "std_msgs"]);
        assert_eq!(
            package.primary_maintainer().unwrap().to_string(),
            "Dirk Thomas <dthomas@osrfoundation.org>"
        );
    }

    #[test]
    fn test_parse_format2_run_dependencies() {
        let xml = r#"<?xml version="1.0"?>
<package format="2">
  <name>my_ros_package</name>
  <version>2.1.0</version>
  <description>A test package</description>
  <maintainer email="a@example.com">Ann</maintainer>
  <maintainer email="b@example.com">Bob</maintainer>

  <buildtool_depend>catkin</buildtool_depend>
  <build_depend>message_generation</build_depend>
  <exec_depend>message_runtime</exec_depend>
  <exec_depend condition="$ROS_PYTHON_VERSION == 3">python3-yaml</exec_depend>
  <depend>roscpp</depend>
  <depend>message_runtime</depend>
  <test_depend>rostest</test_depend>
</package>"#;

        let package = Package::from_str(xml, Utf8PathBuf::from("/my_package")).unwrap();

        assert_eq!(package.exec_depend, vec!["message_runtime"]);
        assert_eq!(package.depend, vec!["roscpp", "message_runtime"]);
        // Build and test deps are not runtime deps; duplicates collapse
        assert_eq!(package.run_dependencies(), vec!["message_runtime", "roscpp"]);
        assert_eq!(package.maintainers.len(), 2);
        assert_eq!(package.primary_maintainer().unwrap().name, "Ann");
    }

    #[test]
    fn test_parse_minimal_package_xml() {
        let xml = r#"<?xml version="1.0"?>
<package format="3">
  <name>test_package</name>
  <version>1.0.0</version>
</package>"#;

        let package = Package::from_str(xml, Utf8PathBuf::from("/test")).unwrap();

        assert_eq!(package.name, "test_package");
        assert!(package.description.is_none());
        assert!(package.maintainers.is_empty());
        assert!(package.run_dependencies().is_empty());
    }

    #[test]
    fn test_from_path_reads_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp_dir.path()).unwrap();
        let xml_path = root.join("package.xml");
        std::fs::write(
            &xml_path,
            "<package><name>talker</name><version>0.1.0</version></package>",
        )
        .unwrap();

        let package = Package::from_path(&xml_path).unwrap();

        assert_eq!(package.name, "talker");
        assert_eq!(package.path, root);
    }

    #[test]
    fn test_description_keeps_inline_markup() {
        let xml = r#"<?xml version="1.0"?>
<package>
  <name>roscpp</name>
  <version>1.11.21</version>
  <description>
    roscpp is a C++ implementation of ROS. It provides
    a <a href="http://www.ros.org/wiki/Client%20Libraries">client
    library</a> for C++.
  </description>
  <maintainer email="jacob@openrobotics.org">Jacob Perron</maintainer>
  <run_depend>rosconsole</run_depend>
</package>"#;

        let package = Package::from_str(xml, Utf8PathBuf::from("/roscpp")).unwrap();

        let description = package.description.as_deref().unwrap();
        assert!(description.starts_with("roscpp is a C++ implementation of ROS."));
        assert!(description.contains(
            r#"a <a href="http://www.ros.org/wiki/Client%20Libraries">client"#
        ));
        assert!(description.ends_with("library</a> for C++."));
        assert_eq!(package.run_dependencies(), vec!["rosconsole"]);
        assert_eq!(package.primary_maintainer().unwrap().name, "Jacob Perron");
    }

    #[test]
    fn test_nested_description_is_not_the_package_description() {
        let xml = r#"<package>
  <name>exported</name>
  <version>0.1.0</version>
  <export><description>plugin text</description></export>
</package>"#;

        let package = Package::from_str(xml, Utf8PathBuf::from("/exported")).unwrap();
        assert!(package.description.is_none());
    }

    #[test]
    fn test_invalid_xml_is_an_error() {
        let result = Package::from_str("<package><name>x</name>", Utf8PathBuf::from("/x"));
        assert!(matches!(result, Err(Error::XmlParse(_))));
    }
}
