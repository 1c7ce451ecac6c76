use std::fmt::{self, Write};

use anyhow::Result;

pub const FBX_VERSION: i32 = 7400;

/// A property of an FBX node.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl Property {
    fn write(&self, out: &mut String, indent: &str) -> fmt::Result {
        match self {
            Property::Int(value) => write!(out, "{}", value),
            Property::Float(value) => write!(out, "{}", value),
            Property::Double(value) => write!(out, "{}", value),
            Property::String(value) => write!(out, "\"{}\"", value.replace('"', "&quot;")),
            Property::Ints(values) => write_array(out, indent, values),
            Property::Floats(values) => write_array(out, indent, values),
            Property::Doubles(values) => write_array(out, indent, values),
        }
    }
}

fn write_array<T: fmt::Display>(out: &mut String, indent: &str, values: &[T]) -> fmt::Result {
    write!(out, "*{} {{\n{}\ta: ", values.len(), indent)?;
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write!(out, "{}", value)?;
    }
    write!(out, "\n{}}}", indent)
}

impl From<i32> for Property {
    fn from(value: i32) -> Self {
        Property::Int(value.into())
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Property::Int(value)
    }
}

impl From<f32> for Property {
    fn from(value: f32) -> Self {
        Property::Float(value)
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Property::Double(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::String(value.to_owned())
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::String(value)
    }
}

impl From<Vec<i64>> for Property {
    fn from(values: Vec<i64>) -> Self {
        Property::Ints(values)
    }
}

impl From<Vec<f32>> for Property {
    fn from(values: Vec<f32>) -> Self {
        Property::Floats(values)
    }
}

impl From<Vec<f64>> for Property {
    fn from(values: Vec<f64>) -> Self {
        Property::Doubles(values)
    }
}

/// A named record of an FBX file, with its properties and nested records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with(mut self, property: impl Into<Property>) -> Self {
        self.properties.push(property.into());
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Returns the first child with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }

    fn write(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        write!(out, "{}{}: ", indent, self.name)?;
        for (index, property) in self.properties.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            property.write(out, &indent)?;
        }

        if self.children.is_empty() {
            return writeln!(out);
        }
        writeln!(out, " {{")?;
        for child in &self.children {
            child.write(out, depth + 1)?;
        }
        writeln!(out, "{}}}", indent)
    }
}

/// Returns an entry of a `Properties70` record.
pub fn p(name: &str, type_: &str, label: &str, flags: &str, values: &[Property]) -> Node {
    let mut node = Node::new("P").with(name).with(type_).with(label).with(flags);
    node.properties.extend_from_slice(values);
    node
}

pub fn properties70(entries: Vec<Node>) -> Node {
    Node {
        name: "Properties70".to_owned(),
        properties: Vec::new(),
        children: entries,
    }
}

/// An ASCII FBX 7.4 file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fbx {
    pub creator: String,
    pub nodes: Vec<Node>,
}

impl Fbx {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = String::new();

        writeln!(out, "; FBX 7.4.0 project file")?;
        writeln!(out, "; Created by {}", self.creator)?;
        writeln!(out, "; ----------------------------------------------------")?;
        writeln!(out)?;
        Node::new("FBXHeaderExtension")
            .child(Node::new("FBXHeaderVersion").with(1003))
            .child(Node::new("FBXVersion").with(FBX_VERSION))
            .child(Node::new("Creator").with(self.creator.as_str()))
            .write(&mut out, 0)?;
        Node::new("Creator")
            .with(self.creator.as_str())
            .write(&mut out, 0)?;

        for node in &self.nodes {
            writeln!(out)?;
            node.write(&mut out, 0)?;
        }

        Ok(out.into_bytes())
    }

    /// Returns the first top-level record with the given name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn nested_nodes_and_arrays() {
        let node = Node::new("Model")
            .with(1)
            .with("Model::Hips")
            .with("LimbNode")
            .child(Node::new("Version").with(232))
            .child(Node::new("Indexes").with(vec![0i64, 2]));

        let mut out = String::new();
        node.write(&mut out, 0).unwrap();

        assert_eq!(
            "Model: 1, \"Model::Hips\", \"LimbNode\" {\n\tVersion: 232\n\tIndexes: *2 {\n\t\ta: 0,2\n\t}\n}\n",
            out
        );
    }

    #[test]
    fn empty_records_keep_their_braces() {
        let node = Node::new("Objects").child(Node::new("Takes"));

        let mut out = String::new();
        node.write(&mut out, 0).unwrap();

        assert_eq!("Objects:  {\n\tTakes: \n}\n", out);
    }

    #[test]
    fn property_entries() {
        let entry = p("UpAxis", "int", "Integer", "", &[Property::Int(1)]);

        let mut out = String::new();
        entry.write(&mut out, 0).unwrap();

        assert_eq!("P: \"UpAxis\", \"int\", \"Integer\", \"\", 1\n", out);
    }

    #[test]
    fn quotes_are_escaped() {
        let mut out = String::new();
        Property::from("a\"b").write(&mut out, "").unwrap();

        assert_eq!("\"a&quot;b\"", out);
    }

    #[test]
    fn file_starts_with_header() {
        let fbx = Fbx {
            creator: "rigconv".to_owned(),
            nodes: vec![Node::new("Objects")],
        };

        let text = String::from_utf8(fbx.to_bytes().unwrap()).unwrap();

        assert!(text.starts_with("; FBX 7.4.0 project file\n"));
        assert!(text.contains("\tFBXVersion: 7400\n"));
        assert!(text.ends_with("\nObjects: \n"));
    }
}
