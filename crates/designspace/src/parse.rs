//! `.designspace` XML reader.
//!
//! Handles the `<axes>`, `<sources>` and `<instances>` sections of format
//! 4.x and 5.0 documents. Rules, labels and variable-font sections are
//! skipped.

use std::path::Path;

use log::warn;
use roxmltree::{Document, Node};

use crate::{
    error::{Error, Result},
    lib_dict::{InstanceLib, LibValue},
    model::{Axis, DesignSpace, Instance, Location, Source},
};

impl DesignSpace {
    /// Parse a designspace document from a string.
    ///
    /// Source filenames are joined onto `base_dir`.
    pub fn parse(xml: &str, base_dir: &Path) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "designspace" {
            return Err(Error::NotDesignspace(root.tag_name().name().to_string()));
        }

        let axes = match child(root, "axes") {
            Some(axes) => elements(axes, "axis").map(parse_axis).collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let sources = match child(root, "sources") {
            Some(sources) => elements(sources, "source")
                .map(|node| parse_source(node, &axes, base_dir))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let instances = match child(root, "instances") {
            Some(instances) => elements(instances, "instance")
                .map(|node| parse_instance(node, &axes))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(DesignSpace { path: None, axes, sources, instances })
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn required<'a>(node: Node<'a, '_>, element: &'static str, attribute: &'static str) -> Result<&'a str> {
    node.attribute(attribute).ok_or(Error::MissingAttribute { element, attribute })
}

fn number(value: &str, element: &'static str, attribute: &'static str) -> Result<f64> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        element,
        attribute,
        value: value.to_string(),
    })
}

fn required_number(node: Node, element: &'static str, attribute: &'static str) -> Result<f64> {
    number(required(node, element, attribute)?, element, attribute)
}

fn optional_string(node: Node, attribute: &str) -> Option<String> {
    node.attribute(attribute).map(str::to_string)
}

fn parse_axis(node: Node) -> Result<Axis> {
    let name = required(node, "axis", "name")?;
    let tag = required(node, "axis", "tag")?;

    if node.has_attribute("values") {
        return Err(Error::DiscreteAxis(name.to_string()));
    }

    let minimum = required_number(node, "axis", "minimum")?;
    let default = required_number(node, "axis", "default")?;
    let maximum = required_number(node, "axis", "maximum")?;

    let map = elements(node, "map")
        .map(|m| Ok((required_number(m, "map", "input")?, required_number(m, "map", "output")?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Axis::new(tag, name, minimum, default, maximum).with_map(map))
}

/// Read a `<location>` child. `uservalue` dimensions are mapped to design space.
fn parse_location(node: Node, axes: &[Axis]) -> Result<Location> {
    let mut location = Location::new();
    let Some(loc) = child(node, "location") else {
        return Ok(location);
    };

    for dimension in elements(loc, "dimension") {
        let name = required(dimension, "dimension", "name")?;
        let value = if let Some(xvalue) = dimension.attribute("xvalue") {
            number(xvalue, "dimension", "xvalue")?
        } else if let Some(uservalue) = dimension.attribute("uservalue") {
            let axis = axes
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| Error::UnknownAxis(name.to_string()))?;
            axis.map_forward(number(uservalue, "dimension", "uservalue")?)
        } else {
            return Err(Error::MissingAttribute { element: "dimension", attribute: "xvalue" });
        };
        location.insert(name.to_string(), value);
    }

    Ok(location)
}

fn parse_source(node: Node, axes: &[Axis], base_dir: &Path) -> Result<Source> {
    let filename = required(node, "source", "filename")?;
    if node.has_attribute("layer") {
        warn!("Source '{filename}' names a layer; layer sources are read as whole fonts");
    }

    Ok(Source {
        name: optional_string(node, "name"),
        path: base_dir.join(filename),
        location: parse_location(node, axes)?,
        family_name: optional_string(node, "familyname"),
        style_name: optional_string(node, "stylename"),
    })
}

fn parse_instance(node: Node, axes: &[Axis]) -> Result<Instance> {
    let family_name = optional_string(node, "familyname");
    let style_name = optional_string(node, "stylename");

    let name = match (node.attribute("name"), &family_name, &style_name) {
        (Some(name), _, _) => name.to_string(),
        (None, Some(family), Some(style)) => format!("{family} {style}"),
        (None, Some(only), None) | (None, None, Some(only)) => only.clone(),
        (None, None, None) => {
            return Err(Error::MissingAttribute { element: "instance", attribute: "name" });
        }
    };

    let lib = match child(node, "lib").and_then(|lib| child(lib, "dict")) {
        Some(dict) => parse_lib_dict(dict, &name),
        None => InstanceLib::new(),
    };

    Ok(Instance {
        name,
        location: parse_location(node, axes)?,
        family_name,
        style_name,
        postscript_name: optional_string(node, "postscriptfontname"),
        filename: optional_string(node, "filename"),
        lib,
    })
}

fn parse_lib_dict(dict: Node, instance_name: &str) -> InstanceLib {
    let mut lib = InstanceLib::new();
    let mut children = dict.children().filter(Node::is_element);

    while let Some(key) = children.next() {
        if key.tag_name().name() != "key" {
            warn!("Instance '{instance_name}': expected <key> in lib, found <{}>", key.tag_name().name());
            continue;
        }
        let Some(value) = children.next() else {
            warn!("Instance '{instance_name}': lib key without a value");
            break;
        };
        let key = key.text().unwrap_or_default().trim().to_string();
        lib.insert(key, parse_lib_value(value));
    }

    lib
}

fn parse_lib_value(node: Node) -> LibValue {
    let text = node.text().unwrap_or_default().trim();
    match node.tag_name().name() {
        "true" => LibValue::Bool(true),
        "false" => LibValue::Bool(false),
        "integer" => text.parse().map(LibValue::Integer).unwrap_or(LibValue::Other),
        "real" => text.parse().map(LibValue::Real).unwrap_or(LibValue::Other),
        "string" => LibValue::String(text.to_string()),
        _ => LibValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::EXPORT_LIB_KEY;

    const DOCUMENT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<designspace format="4.1">
  <axes>
    <axis tag="wght" name="Weight" minimum="100" maximum="900" default="400">
      <map input="100" output="20"/>
      <map input="400" output="80"/>
      <map input="900" output="190"/>
    </axis>
  </axes>
  <sources>
    <source filename="masters/Test-Light.ttf" name="Light" familyname="Test" stylename="Light">
      <location><dimension name="Weight" xvalue="20"/></location>
    </source>
    <source filename="masters/Test-Regular.ttf" name="Regular" familyname="Test" stylename="Regular">
      <location><dimension name="Weight" xvalue="80"/></location>
    </source>
  </sources>
  <instances>
    <instance name="Test Bold" familyname="Test" stylename="Bold" postscriptfontname="Test-Bold" filename="instances/Test-Bold.ufo">
      <location><dimension name="Weight" xvalue="150"/></location>
    </instance>
    <instance familyname="Test" stylename="Medium">
      <location><dimension name="Weight" uservalue="650"/></location>
      <lib>
        <dict>
          <key>com.schriftgestaltung.export</key>
          <false/>
          <key>com.example.weight</key>
          <integer>500</integer>
        </dict>
      </lib>
    </instance>
  </instances>
</designspace>
"#;

    #[test]
    fn parses_axes_with_map() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("fonts")).unwrap();
        assert_eq!(ds.axes.len(), 1);
        let axis = &ds.axes[0];
        assert_eq!(axis.tag, "wght");
        assert_eq!((axis.minimum, axis.default, axis.maximum), (100.0, 400.0, 900.0));
        assert_eq!(axis.map.len(), 3);
        assert_eq!(axis.design_default(), 80.0);
    }

    #[test]
    fn resolves_source_paths() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("fonts")).unwrap();
        assert_eq!(ds.sources[0].path, PathBuf::from("fonts/masters/Test-Light.ttf"));
        assert_eq!(ds.sources[1].style_name.as_deref(), Some("Regular"));
        assert_eq!(ds.default_source_index(), Some(1));
    }

    #[test]
    fn parses_instances() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("")).unwrap();
        let bold = &ds.instances[0];
        assert_eq!(bold.name, "Test Bold");
        assert_eq!(bold.postscript_name.as_deref(), Some("Test-Bold"));
        assert_eq!(bold.location.get("Weight"), Some(&150.0));
        assert!(bold.is_exportable());
    }

    #[test]
    fn unnamed_instance_uses_family_and_style() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("")).unwrap();
        assert_eq!(ds.instances[1].name, "Test Medium");
    }

    #[test]
    fn uservalue_is_mapped_to_design_space() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("")).unwrap();
        let medium = ds.instances[1].location["Weight"];
        assert!((medium - 135.0).abs() < 0.001);
    }

    #[test]
    fn reads_instance_lib() {
        let ds = DesignSpace::parse(DOCUMENT, Path::new("")).unwrap();
        let lib = &ds.instances[1].lib;
        assert_eq!(lib.get(EXPORT_LIB_KEY), Some(&LibValue::Bool(false)));
        assert_eq!(lib.get("com.example.weight"), Some(&LibValue::Integer(500)));
        assert!(!ds.instances[1].is_exportable());
    }

    #[test]
    fn rejects_other_root() {
        let result = DesignSpace::parse("<fontinfo/>", Path::new(""));
        assert!(matches!(result, Err(Error::NotDesignspace(name)) if name == "fontinfo"));
    }

    #[test]
    fn rejects_discrete_axis() {
        let xml = r#"<designspace format="5.0"><axes>
            <axis tag="ital" name="Italic" values="0 1" default="0"/>
        </axes></designspace>"#;
        assert!(matches!(
            DesignSpace::parse(xml, Path::new("")),
            Err(Error::DiscreteAxis(name)) if name == "Italic"
        ));
    }

    #[test]
    fn reports_bad_numbers() {
        let xml = r#"<designspace><axes>
            <axis tag="wght" name="Weight" minimum="light" maximum="900" default="400"/>
        </axes></designspace>"#;
        let err = DesignSpace::parse(xml, Path::new("")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidNumber { element: "axis", attribute: "minimum", .. }
        ));
    }

    #[test]
    fn source_requires_filename() {
        let xml = r#"<designspace><sources><source name="x"/></sources></designspace>"#;
        assert!(matches!(
            DesignSpace::parse(xml, Path::new("")),
            Err(Error::MissingAttribute { element: "source", attribute: "filename" })
        ));
    }

    #[test]
    fn load_from_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Test.designspace");
        std::fs::write(&path, DOCUMENT).unwrap();

        let ds = DesignSpace::load(&path).unwrap();
        assert_eq!(ds.path.as_deref(), Some(path.as_path()));
        assert_eq!(ds.sources[0].path, dir.path().join("masters/Test-Light.ttf"));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = DesignSpace::load("does/not/exist.designspace").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert!(err.to_string().contains("does/not/exist.designspace"));
    }
}
