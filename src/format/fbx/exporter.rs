use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use glam::{Mat4, Vec3};

use crate::conversion::{
    document::{Curve, Document, DocumentNode, MeshAttachment, NodeKind},
    Asset, Exporter, Handedness, UpAxis, UvOrigin,
};

use super::internal::{p, properties70, Fbx, Node, Property};

/// FBX time units in one second.
pub const KTIME_PER_SECOND: i64 = 46_186_158_000;
/// `TimeMode` value of a custom frame rate.
const TIME_MODE_CUSTOM: i32 = 14;
/// Linear interpolation, constant tangents.
const KEY_ATTR_FLAGS: i64 = 24836;

/// Exports documents as ASCII FBX 7.4 files.
#[derive(Default)]
pub struct FbxExporter {}

impl Exporter for FbxExporter {
    fn export(&self, document: &Document) -> Result<Vec<Asset>> {
        let fbx = Builder::new(document).build();
        Ok(vec![Asset::new(
            fbx.to_bytes()?,
            format!("{}.fbx", document.name),
        )])
    }

    fn uv_origin(&self) -> UvOrigin {
        UvOrigin::BottomLeft
    }

    fn extensions(&self) -> &[&str] {
        &["fbx"]
    }
}

pub fn ktime(seconds: f64) -> i64 {
    (seconds * KTIME_PER_SECOND as f64).round() as i64
}

/// Collects the objects of a document and the connections between them.
struct Builder<'a> {
    document: &'a Document,
    next_id: i64,
    model_ids: Vec<i64>,
    material_ids: Vec<i64>,
    objects: Vec<Node>,
    connections: Vec<Node>,
}

impl<'a> Builder<'a> {
    fn new(document: &'a Document) -> Self {
        let mut builder = Self {
            document,
            next_id: 1_000_000,
            model_ids: Vec::new(),
            material_ids: Vec::new(),
            objects: Vec::new(),
            connections: Vec::new(),
        };
        let model_ids = (0..document.nodes.len()).map(|_| builder.id()).collect();
        builder.model_ids = model_ids;
        builder
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn connect(&mut self, child: i64, parent: i64) {
        self.connections
            .push(Node::new("C").with("OO").with(child).with(parent));
    }

    fn connect_property(&mut self, child: i64, parent: i64, property: &str) {
        self.connections.push(
            Node::new("C")
                .with("OP")
                .with(child)
                .with(parent)
                .with(property),
        );
    }

    fn build(mut self) -> Fbx {
        let document = self.document;

        self.insert_materials();
        for (index, node) in document.nodes.iter().enumerate() {
            self.insert_model(index, node);
        }
        for mesh in &document.meshes {
            self.insert_geometry(mesh);
        }
        self.insert_bind_pose();
        self.insert_animations();

        let creator = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let current_take = document
            .stacks
            .first()
            .map(|stack| stack.name.clone())
            .unwrap_or_default();

        let mut objects = Node::new("Objects");
        objects.children = self.objects;
        let mut connections = Node::new("Connections");
        connections.children = self.connections;

        Fbx {
            creator,
            nodes: vec![
                global_settings(document),
                definitions(&objects),
                objects,
                connections,
                Node::new("Takes").child(Node::new("Current").with(current_take)),
            ],
        }
    }

    fn insert_materials(&mut self) {
        let document = self.document;
        for material in &document.materials {
            let id = self.id();
            self.material_ids.push(id);
            self.objects.push(
                Node::new("Material")
                    .with(id)
                    .with(format!("Material::{}", material.name))
                    .with("")
                    .child(Node::new("Version").with(102))
                    .child(Node::new("ShadingModel").with("phong"))
                    .child(Node::new("MultiLayer").with(0))
                    .child(properties70(vec![
                        color("DiffuseColor", material.diffuse.truncate()),
                        color("AmbientColor", material.ambient.truncate()),
                        color("SpecularColor", material.specular.truncate()),
                        color("EmissiveColor", material.emissive),
                        number("Shininess", material.power),
                        number("Opacity", material.diffuse.w),
                    ])),
            );

            if let Some(path) = &material.texture {
                let texture = self.id();
                let name = format!("Texture::{}_diffuse", material.name);
                self.objects.push(
                    Node::new("Texture")
                        .with(texture)
                        .with(name.as_str())
                        .with("")
                        .child(Node::new("Type").with("TextureVideoClip"))
                        .child(Node::new("Version").with(202))
                        .child(Node::new("TextureName").with(name.as_str()))
                        .child(Node::new("FileName").with(path.as_str()))
                        .child(Node::new("RelativeFilename").with(path.as_str())),
                );
                self.connect_property(texture, id, "DiffuseColor");
            }
        }
    }

    fn insert_model(&mut self, index: usize, node: &DocumentNode) {
        let id = self.model_ids[index];
        let kind = match node.kind {
            NodeKind::Null => "Null",
            NodeKind::Joint => "LimbNode",
            NodeKind::Mesh(_) => "Mesh",
        };

        if node.kind == NodeKind::Joint {
            let attribute = self.id();
            self.objects.push(
                Node::new("NodeAttribute")
                    .with(attribute)
                    .with(format!("NodeAttribute::{}", node.name))
                    .with("LimbNode")
                    .child(Node::new("TypeFlags").with("Skeleton")),
            );
            self.connect(attribute, id);
        }

        self.objects.push(
            Node::new("Model")
                .with(id)
                .with(format!("Model::{}", node.name))
                .with(kind)
                .child(Node::new("Version").with(232))
                .child(properties70(vec![
                    p("RotationOrder", "enum", "", "", &[Property::Int(0)]),
                    vector("Lcl Translation", node.translation),
                    vector("Lcl Rotation", node.rotation),
                    vector("Lcl Scaling", node.scale),
                ]))
                .child(Node::new("Culling").with("CullingOff")),
        );

        let parent = node.parent.map(|parent| self.model_ids[parent]).unwrap_or(0);
        self.connect(id, parent);
    }

    fn insert_geometry(&mut self, mesh: &MeshAttachment) {
        let id = self.id();
        let model = self.model_ids[mesh.node];

        let mut geometry = Node::new("Geometry")
            .with(id)
            .with(format!("Geometry::{}", mesh.name))
            .with("Mesh")
            .child(Node::new("Vertices").with(flatten(&mesh.control_points)))
            .child(Node::new("PolygonVertexIndex").with(polygon_vertex_index(
                &mesh.polygon_vertices,
            )))
            .child(Node::new("GeometryVersion").with(124))
            .child(
                layer_element("LayerElementNormal", "ByVertice", "Direct")
                    .child(Node::new("Normals").with(flatten(&mesh.normals))),
            )
            .child(
                layer_element("LayerElementUV", "ByVertice", "Direct").child(
                    Node::new("UV").with(
                        mesh.uvs
                            .iter()
                            .flat_map(|uv| uv.to_array())
                            .collect::<Vec<f32>>(),
                    ),
                ),
            );

        let mut layer = Node::new("Layer")
            .with(0)
            .child(Node::new("Version").with(100))
            .child(layer_reference("LayerElementNormal"))
            .child(layer_reference("LayerElementUV"));
        if let Some(materials) = &mesh.materials {
            geometry.push(
                layer_element("LayerElementMaterial", "ByPolygon", "IndexToDirect").child(
                    Node::new("Materials")
                        .with(materials.iter().map(|&m| m as i64).collect::<Vec<_>>()),
                ),
            );
            layer.push(layer_reference("LayerElementMaterial"));

            // Materials connect to the model in document order, so that their local indices
            // match the document's.
            for material in self.material_ids.clone() {
                self.connect(material, model);
            }
        }
        geometry.push(layer);

        self.objects.push(geometry);
        self.connect(id, model);

        if let Some(skin) = &mesh.skin {
            let skin_id = self.id();
            self.objects.push(
                Node::new("Deformer")
                    .with(skin_id)
                    .with(format!("Deformer::{}_skin", mesh.name))
                    .with("Skin")
                    .child(Node::new("Version").with(101))
                    .child(Node::new("Link_DeformAcuracy").with(50.)),
            );
            self.connect(skin_id, id);

            for cluster in &skin.clusters {
                let cluster_id = self.id();
                self.objects.push(
                    Node::new("Deformer")
                        .with(cluster_id)
                        .with(format!("SubDeformer::{}", cluster.name))
                        .with("Cluster")
                        .child(Node::new("Version").with(100))
                        .child(Node::new("UserData").with("").with(""))
                        .child(Node::new("Indexes").with(
                            cluster.indices.iter().map(|&i| i as i64).collect::<Vec<_>>(),
                        ))
                        .child(Node::new("Weights").with(cluster.weights.clone()))
                        .child(Node::new("Transform").with(matrix(
                            cluster.transform_link.inverse() * cluster.transform,
                        )))
                        .child(Node::new("TransformLink").with(matrix(cluster.transform_link))),
                );
                self.connect(cluster_id, skin_id);
                self.connect(self.model_ids[cluster.link], cluster_id);
            }
        }
    }

    /// Records the global transforms of the skinned meshes and their bones.
    fn insert_bind_pose(&mut self) {
        let mut poses: BTreeMap<usize, Mat4> = BTreeMap::new();
        for mesh in &self.document.meshes {
            if let Some(skin) = &mesh.skin {
                poses.insert(mesh.node, self.document.nodes[mesh.node].global);
                for cluster in &skin.clusters {
                    poses.insert(cluster.link, cluster.transform_link);
                }
            }
        }
        if poses.is_empty() {
            return;
        }

        let id = self.id();
        let mut pose = Node::new("Pose")
            .with(id)
            .with("Pose::BindPose")
            .with("BindPose")
            .child(Node::new("Type").with("BindPose"))
            .child(Node::new("Version").with(100))
            .child(Node::new("NbPoseNodes").with(poses.len() as i64));
        for (node, global) in poses {
            pose.push(
                Node::new("PoseNode")
                    .child(Node::new("Node").with(self.model_ids[node]))
                    .child(Node::new("Matrix").with(matrix(global))),
            );
        }
        self.objects.push(pose);
    }

    fn insert_animations(&mut self) {
        let document = self.document;
        for stack in &document.stacks {
            let stack_id = self.id();
            let stop = ktime(stack.duration);
            self.objects.push(
                Node::new("AnimationStack")
                    .with(stack_id)
                    .with(format!("AnimStack::{}", stack.name))
                    .with("")
                    .child(properties70(vec![
                        time("LocalStart", 0),
                        time("LocalStop", stop),
                        time("ReferenceStart", 0),
                        time("ReferenceStop", stop),
                    ])),
            );

            for layer in &stack.layers {
                let layer_id = self.id();
                self.objects.push(
                    Node::new("AnimationLayer")
                        .with(layer_id)
                        .with(format!("AnimLayer::{}", layer.name))
                        .with(""),
                );
                self.connect(layer_id, stack_id);

                for curve_node in &layer.curve_nodes {
                    let model = self.model_ids[curve_node.node];
                    let channels = [
                        ("T", "Lcl Translation", &curve_node.translation),
                        ("R", "Lcl Rotation", &curve_node.rotation),
                        ("S", "Lcl Scaling", &curve_node.scale),
                    ];
                    for (label, property, curves) in channels {
                        self.insert_curve_node(label, curves, layer_id, model, property);
                    }
                }
            }
        }
    }

    fn insert_curve_node(
        &mut self,
        label: &str,
        curves: &[Curve; 3],
        layer: i64,
        model: i64,
        property: &str,
    ) {
        let id = self.id();
        let defaults: Vec<Node> = ["d|X", "d|Y", "d|Z"]
            .iter()
            .zip(curves)
            .map(|(channel, curve)| {
                let value = curve.values.first().copied().unwrap_or_default();
                p(channel, "Number", "", "A", &[Property::Float(value)])
            })
            .collect();
        self.objects.push(
            Node::new("AnimationCurveNode")
                .with(id)
                .with(format!("AnimCurveNode::{}", label))
                .with("")
                .child(properties70(defaults)),
        );
        self.connect(id, layer);
        self.connect_property(id, model, property);

        for (channel, curve) in ["d|X", "d|Y", "d|Z"].into_iter().zip(curves) {
            let curve_id = self.id();
            self.objects.push(
                Node::new("AnimationCurve")
                    .with(curve_id)
                    .with("AnimCurve::")
                    .with("")
                    .child(
                        Node::new("Default")
                            .with(curve.values.first().copied().unwrap_or_default()),
                    )
                    .child(Node::new("KeyVer").with(4009))
                    .child(Node::new("KeyTime").with(
                        curve.times.iter().map(|&t| ktime(t)).collect::<Vec<_>>(),
                    ))
                    .child(Node::new("KeyValueFloat").with(curve.values.clone()))
                    .child(Node::new("KeyAttrFlags").with(vec![KEY_ATTR_FLAGS]))
                    .child(Node::new("KeyAttrDataFloat").with(vec![0f32, 0., 0., 0.]))
                    .child(Node::new("KeyAttrRefCount").with(vec![curve.times.len() as i64])),
            );
            self.connect_property(curve_id, id, channel);
        }
    }
}

/// Returns the axis (0 for X, 1 for Y, 2 for Z) and sign of the up, front, and coordinate
/// axes of a document.
fn axis_system(up_axis: UpAxis, handedness: Handedness) -> [(i32, i32); 3] {
    // Right-handed systems, with the front axis being the cross product of the others.
    let [up, front, coord] = match up_axis {
        UpAxis::X => [(0, 1), (2, -1), (1, 1)],
        UpAxis::Y => [(1, 1), (2, 1), (0, 1)],
        UpAxis::Z => [(2, 1), (1, -1), (0, 1)],
    };
    match handedness {
        Handedness::Right => [up, front, coord],
        Handedness::Left => [up, (front.0, -front.1), coord],
    }
}

fn global_settings(document: &Document) -> Node {
    let [up, front, coord] = axis_system(document.up_axis, document.handedness);
    let duration = document
        .stacks
        .iter()
        .map(|stack| stack.duration)
        .fold(0., f64::max);

    Node::new("GlobalSettings")
        .child(Node::new("Version").with(1000))
        .child(properties70(vec![
            integer("UpAxis", up.0),
            integer("UpAxisSign", up.1),
            integer("FrontAxis", front.0),
            integer("FrontAxisSign", front.1),
            integer("CoordAxis", coord.0),
            integer("CoordAxisSign", coord.1),
            integer("OriginalUpAxis", up.0),
            integer("OriginalUpAxisSign", up.1),
            p("UnitScaleFactor", "double", "Number", "", &[Property::Double(1.)]),
            p("OriginalUnitScaleFactor", "double", "Number", "", &[Property::Double(1.)]),
            p("TimeMode", "enum", "", "", &[Property::Int(TIME_MODE_CUSTOM.into())]),
            time("TimeSpanStart", 0),
            time("TimeSpanStop", ktime(duration)),
            p(
                "CustomFrameRate",
                "double",
                "Number",
                "",
                &[Property::Double(document.frame_rate)],
            ),
        ]))
}

/// Counts the objects of each type.
fn definitions(objects: &Node) -> Node {
    let mut counts: Vec<(&str, i64)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for object in &objects.children {
        let name = object.name.as_str();
        match positions.get(name) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(name, counts.len());
                counts.push((name, 1));
            }
        }
    }

    let mut definitions = Node::new("Definitions")
        .child(Node::new("Version").with(100))
        .child(Node::new("Count").with(counts.iter().map(|(_, count)| count).sum::<i64>() + 1))
        .child(Node::new("ObjectType").with("GlobalSettings").child(Node::new("Count").with(1)));
    for (name, count) in counts {
        definitions.push(
            Node::new("ObjectType")
                .with(name)
                .child(Node::new("Count").with(count)),
        );
    }
    definitions
}

fn layer_element(name: &str, mapping: &str, reference: &str) -> Node {
    Node::new(name)
        .with(0)
        .child(Node::new("Version").with(101))
        .child(Node::new("Name").with(""))
        .child(Node::new("MappingInformationType").with(mapping))
        .child(Node::new("ReferenceInformationType").with(reference))
}

fn layer_reference(name: &str) -> Node {
    Node::new("LayerElement")
        .child(Node::new("Type").with(name))
        .child(Node::new("TypedIndex").with(0))
}

/// Marks the last index of each triangle by storing it as `-(index + 1)`.
fn polygon_vertex_index(indices: &[usize]) -> Vec<i64> {
    indices
        .chunks_exact(3)
        .flat_map(|triangle| {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as i64);
            [a, b, -c - 1]
        })
        .collect()
}

fn flatten(vectors: &[Vec3]) -> Vec<f32> {
    vectors.iter().flat_map(|vector| vector.to_array()).collect()
}

fn matrix(matrix: Mat4) -> Vec<f64> {
    matrix.to_cols_array().iter().map(|&v| v as f64).collect()
}

fn integer(name: &str, value: i32) -> Node {
    p(name, "int", "Integer", "", &[Property::Int(value.into())])
}

fn number(name: &str, value: f32) -> Node {
    p(name, "double", "Number", "", &[Property::Float(value)])
}

fn time(name: &str, value: i64) -> Node {
    p(name, "KTime", "Time", "", &[Property::Int(value)])
}

fn color(name: &str, value: Vec3) -> Node {
    let values = value.to_array().map(Property::Float);
    p(name, "Color", "", "A", &values)
}

fn vector(name: &str, value: Vec3) -> Node {
    let values = value.to_array().map(Property::Float);
    p(name, name, "", "A", &values)
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec2, Vec4};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::{
        options::ConversionOptions,
        scene::{
            AnimationClip, AnimationKey, AnimationTrack, Bone, Influence, Material, Mesh,
            SceneModel, SceneNode, Transform, Vertex,
        },
    };

    fn sample_document() -> Document {
        let mut scene = SceneModel::new("Root");
        let hips = scene.add_node(
            scene.root(),
            SceneNode::new("Hips", Transform::Matrix(Mat4::from_translation(Vec3::Y))),
        );
        scene.node_mut(hips).joint = true;
        let mut vertex = Vertex::new(Vec3::X, Vec3::Z, Vec2::ZERO);
        vertex.influences[0] = Influence {
            bone: 0,
            weight: 1.,
        };
        scene.node_mut(scene.root()).meshes.push(Mesh {
            name: "Body".to_owned(),
            vertices: vec![vertex, Vertex::default(), Vertex::default()],
            indices: vec![0, 1, 2],
            material_indices: vec![0],
            has_skinning: true,
            bones: vec![Bone {
                offset: Mat4::from_translation(-Vec3::Y),
                target: Some(hips),
                ..Bone::new("Hips")
            }],
        });
        scene.materials.push(Material {
            name: "Skin".to_owned(),
            diffuse: Vec4::new(1., 0.5, 0.25, 1.),
            texture: Some("textures/skin.png".to_owned()),
            ..Default::default()
        });
        let clip = AnimationClip {
            name: "Walk".to_owned(),
            duration: 1.,
            sample_rate: 30.,
            tracks: vec![AnimationTrack {
                bone: "Hips".to_owned(),
                target: Some(hips),
                keys: vec![
                    AnimationKey::at(0.),
                    AnimationKey {
                        rotation: Quat::from_rotation_x(0.5),
                        ..AnimationKey::at(1.)
                    },
                ],
            }],
        };

        Document::from_scene("Hero", &scene, &ConversionOptions::default())
            .with_animation("Walk", &clip)
    }

    fn export(document: &Document) -> (Fbx, String) {
        let fbx = Builder::new(document).build();
        let text = String::from_utf8(fbx.to_bytes().unwrap()).unwrap();
        (fbx, text)
    }

    fn objects<'a>(fbx: &'a Fbx, name: &'a str) -> impl Iterator<Item = &'a Node> {
        fbx.find("Objects")
            .unwrap()
            .children
            .iter()
            .filter(move |node| node.name == name)
    }

    #[test]
    fn exporter_uses_bottom_left_uvs() {
        let exporter = FbxExporter::default();

        assert_eq!(UvOrigin::BottomLeft, exporter.uv_origin());
        assert_eq!(&["fbx"], exporter.extensions());
        let assets = exporter.export(&sample_document()).unwrap();
        assert_eq!("Walk.fbx", assets[0].path().to_str().unwrap());
    }

    #[test]
    fn file_has_every_section() {
        let (_, text) = export(&sample_document());

        for section in [
            "FBXHeaderExtension:  {",
            "\nGlobalSettings:  {",
            "\nDefinitions:  {",
            "\nObjects:  {",
            "\nConnections:  {",
            "\nTakes:  {",
        ] {
            assert!(text.contains(section), "missing {:?}", section);
        }
        assert!(text.contains("Current: \"Walk\""));
    }

    #[test]
    fn models_follow_the_hierarchy() {
        let (fbx, _) = export(&sample_document());

        let models: Vec<_> = objects(&fbx, "Model")
            .map(|model| (model.properties[1].clone(), model.properties[2].clone()))
            .collect();
        assert_eq!(
            vec![
                (Property::from("Model::Root"), Property::from("Null")),
                (Property::from("Model::Hips"), Property::from("LimbNode")),
                (Property::from("Model::Body_node"), Property::from("Mesh")),
            ],
            models
        );
        let connections = &fbx.find("Connections").unwrap().children;
        let root_to_scene = Node::new("C").with("OO").with(1_000_001i64).with(0i64);
        assert!(connections.contains(&root_to_scene));
        assert_eq!(1, objects(&fbx, "NodeAttribute").count());
    }

    #[test]
    fn geometry_marks_polygon_ends() {
        let (fbx, _) = export(&sample_document());

        let geometry = objects(&fbx, "Geometry").next().unwrap();
        assert_eq!(
            Property::Ints(vec![0, 1, -3]),
            geometry.find("PolygonVertexIndex").unwrap().properties[0]
        );
        let materials = geometry.find("LayerElementMaterial").unwrap();
        assert_eq!(
            Property::Ints(vec![0]),
            materials.find("Materials").unwrap().properties[0]
        );
        assert_eq!(3, geometry.find("Layer").unwrap().children.len() - 1);
    }

    #[test]
    fn skin_clusters_link_bones() {
        let (fbx, _) = export(&sample_document());

        let deformers: Vec<_> = objects(&fbx, "Deformer").collect();
        assert_eq!(2, deformers.len());
        assert_eq!(Property::from("Skin"), deformers[0].properties[2]);
        let cluster = deformers[1];
        assert_eq!(Property::from("Cluster"), cluster.properties[2]);
        assert_eq!(Property::Ints(vec![0]), cluster.find("Indexes").unwrap().properties[0]);
        assert_eq!(
            Property::Doubles(matrix(Mat4::from_translation(Vec3::Y))),
            cluster.find("TransformLink").unwrap().properties[0]
        );
        let hips = 1_000_002i64;
        let link = Node::new("C")
            .with("OO")
            .with(hips)
            .with(cluster.properties[0].clone());
        assert!(fbx.find("Connections").unwrap().children.contains(&link));
        assert_eq!(1, objects(&fbx, "Pose").count());
    }

    #[test]
    fn animation_curves_use_fbx_time() {
        let (fbx, text) = export(&sample_document());

        assert_eq!(1, objects(&fbx, "AnimationStack").count());
        assert_eq!(3, objects(&fbx, "AnimationCurveNode").count());
        let curves: Vec<_> = objects(&fbx, "AnimationCurve").collect();
        assert_eq!(9, curves.len());
        assert_eq!(
            Property::Ints(vec![0, KTIME_PER_SECOND]),
            curves[0].find("KeyTime").unwrap().properties[0]
        );
        assert!(text.contains("AnimLayer::BaseLayer"));
        assert!(text.contains("\"OP\", "));
        assert!(text.contains("\"Lcl Rotation\""));
    }

    #[test]
    fn axis_systems() {
        assert_eq!(
            [(1, 1), (2, 1), (0, 1)],
            axis_system(UpAxis::Y, Handedness::Right)
        );
        assert_eq!(
            [(1, 1), (2, -1), (0, 1)],
            axis_system(UpAxis::Y, Handedness::Left)
        );
        assert_eq!(
            [(2, 1), (1, -1), (0, 1)],
            axis_system(UpAxis::Z, Handedness::Right)
        );
        assert_eq!(
            [(0, 1), (2, -1), (1, 1)],
            axis_system(UpAxis::X, Handedness::Right)
        );
        assert_eq!(
            [(0, 1), (2, 1), (1, 1)],
            axis_system(UpAxis::X, Handedness::Left)
        );
    }

    #[test]
    fn ktime_rounds_seconds() {
        assert_eq!(0, ktime(0.));
        assert_eq!(KTIME_PER_SECOND / 2, ktime(0.5));
        assert_eq!(KTIME_PER_SECOND * 2, ktime(2.));
    }
}
