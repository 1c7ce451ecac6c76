use glam::{Mat4, Quat, Vec2, Vec3};
use log::debug;

use super::{
    coordinates::{decompose_transform, euler_degrees},
    options::{ConversionOptions, Handedness, UpAxis},
    scene::{AnimationClip, Material, Mesh, SceneModel, Transform},
};

/// The name of the single layer of every animation stack.
pub const BASE_LAYER: &str = "BaseLayer";

/// The representation of a converted scene that exporters consume.
///
/// Nodes carry decomposed local transforms with euler rotations in degrees. Every mesh is
/// held by a dedicated node, child of the node that held it in the scene. Node indices
/// below the node count of the source [`SceneModel`] match its [`NodeId`]s.
///
/// [`NodeId`]: super::scene::NodeId
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub handedness: Handedness,
    pub up_axis: UpAxis,
    pub frame_rate: f64,
    /// The node tree. The first node is the root.
    pub nodes: Vec<DocumentNode>,
    pub meshes: Vec<MeshAttachment>,
    pub materials: Vec<Material>,
    pub stacks: Vec<AnimationStack>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Joint,
    /// Holds the mesh attachment with the given index.
    Mesh(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub translation: Vec3,
    /// XYZ euler angles, in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
    /// The transform relative to the origin of the document.
    pub global: Mat4,
}

/// The geometry of a mesh node. Layers have one element per control point.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAttachment {
    pub name: String,
    /// The index of the node that holds the mesh.
    pub node: usize,
    pub control_points: Vec<Vec3>,
    /// Control point indices, three per triangle.
    pub polygon_vertices: Vec<usize>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// The material of each triangle, as an index into [`Document::materials`].
    pub materials: Option<Vec<usize>>,
    pub skin: Option<Skin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub clusters: Vec<Cluster>,
}

/// The influence of one bone over the control points of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    /// The index of the bone node.
    pub link: usize,
    pub indices: Vec<usize>,
    pub weights: Vec<f32>,
    /// The global transform of the mesh node.
    pub transform: Mat4,
    /// The global transform of the bone at bind time, from the mesh global and the bone
    /// offset. It differs from the current global of the bone node in posed scenes.
    pub transform_link: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStack {
    pub name: String,
    /// The duration, in seconds.
    pub duration: f64,
    pub layers: Vec<AnimationLayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLayer {
    pub name: String,
    pub curve_nodes: Vec<CurveNode>,
}

/// The nine scalar curves that animate a node: X, Y, and Z of translation, rotation (in
/// degrees), and scale. All curves of a node share the same key times.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveNode {
    pub node: usize,
    pub translation: [Curve; 3],
    pub rotation: [Curve; 3],
    pub scale: [Curve; 3],
}

impl CurveNode {
    pub fn times(&self) -> &[f64] {
        &self.translation[0].times
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    /// Key times, in seconds.
    pub times: Vec<f64>,
    pub values: Vec<f32>,
}

impl Curve {
    fn push(&mut self, time: f64, value: f32) {
        self.times.push(time);
        self.values.push(value);
    }
}

impl Document {
    /// Builds the document of a converted scene, without animations.
    pub fn from_scene(name: &str, scene: &SceneModel, options: &ConversionOptions) -> Self {
        let globals = scene.world_transforms();
        let mut document = Document {
            name: name.to_owned(),
            handedness: options.handedness,
            up_axis: options.up_axis,
            frame_rate: options.fps,
            nodes: Vec::with_capacity(scene.len()),
            meshes: Vec::new(),
            materials: scene.materials.clone(),
            stacks: Vec::new(),
        };

        for (id, node) in scene.nodes() {
            let (translation, rotation, scale) = decompose(&node.transform);
            document.nodes.push(DocumentNode {
                name: node.name.clone(),
                kind: if node.joint {
                    NodeKind::Joint
                } else {
                    NodeKind::Null
                },
                parent: node.parent().map(|parent| parent.0),
                children: node.children().iter().map(|child| child.0).collect(),
                translation,
                rotation: euler_degrees(rotation),
                scale,
                global: globals[id.0],
            });
        }
        for (id, mesh) in scene.meshes() {
            document.attach_mesh(id.0, mesh);
        }

        document
    }

    fn attach_mesh(&mut self, owner: usize, mesh: &Mesh) {
        let index = self.meshes.len();
        let name = if mesh.name.is_empty() {
            format!("Mesh_{}", index)
        } else {
            mesh.name.clone()
        };
        let node = self.nodes.len();
        let global = self.nodes[owner].global;
        self.nodes.push(DocumentNode {
            name: format!("{}_node", name),
            kind: NodeKind::Mesh(index),
            parent: Some(owner),
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            global,
        });
        self.nodes[owner].children.push(node);

        let skin = if mesh.has_skinning {
            Some(skin_of(mesh, global))
        } else {
            None
        };
        self.meshes.push(MeshAttachment {
            name,
            node,
            control_points: mesh.vertices.iter().map(|vertex| vertex.position).collect(),
            polygon_vertices: mesh.indices.clone(),
            normals: mesh.vertices.iter().map(|vertex| vertex.normal).collect(),
            uvs: mesh.vertices.iter().map(|vertex| vertex.uv).collect(),
            materials: if mesh.material_indices.is_empty() {
                None
            } else {
                Some(mesh.material_indices.clone())
            },
            skin,
        });
    }

    /// Returns a copy of the document that also holds the given clip.
    pub fn with_animation(&self, name: &str, clip: &AnimationClip) -> Self {
        let mut document = self.clone();
        document.name = name.to_owned();
        document.stacks.push(AnimationStack {
            name: clip.name.clone(),
            duration: clip.duration,
            layers: vec![AnimationLayer {
                name: BASE_LAYER.to_owned(),
                curve_nodes: curve_nodes_of(clip),
            }],
        });

        document
    }

    /// Returns the nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| index)
    }
}

fn decompose(transform: &Transform) -> (Vec3, Quat, Vec3) {
    match *transform {
        Transform::Trs {
            translation,
            rotation,
            scale,
        } => (translation, rotation, scale),
        Transform::Matrix(matrix) => decompose_transform(matrix),
    }
}

fn skin_of(mesh: &Mesh, transform: Mat4) -> Skin {
    let mut clusters = Vec::with_capacity(mesh.bones.len());
    for (bone_index, bone) in mesh.bones.iter().enumerate() {
        let link = match bone.target {
            Some(target) => target.0,
            None => {
                debug!("Bone \"{}\" has no node, skipping its cluster", bone.name);
                continue;
            }
        };
        let mut cluster = Cluster {
            name: bone.name.clone(),
            link,
            indices: Vec::new(),
            weights: Vec::new(),
            transform,
            transform_link: transform * bone.offset.inverse(),
        };
        for (vertex_index, vertex) in mesh.vertices.iter().enumerate() {
            let weight: f32 = vertex
                .influences
                .iter()
                .filter(|slot| slot.bone == bone_index && !slot.is_unused())
                .map(|slot| slot.weight)
                .sum();
            if weight > 0. {
                cluster.indices.push(vertex_index);
                cluster.weights.push(weight);
            }
        }
        clusters.push(cluster);
    }

    Skin { clusters }
}

fn curve_nodes_of(clip: &AnimationClip) -> Vec<CurveNode> {
    let mut curve_nodes = Vec::with_capacity(clip.tracks.len());
    for track in &clip.tracks {
        let node = match track.target {
            Some(target) => target.0,
            None => continue,
        };
        let mut curve_node = CurveNode {
            node,
            ..Default::default()
        };
        let mut previous: Option<Vec3> = None;
        for key in &track.keys {
            let rotation = unroll(euler_degrees(key.rotation), previous);
            previous = Some(rotation);
            let components = key
                .translation
                .to_array()
                .into_iter()
                .zip(&mut curve_node.translation)
                .chain(rotation.to_array().into_iter().zip(&mut curve_node.rotation))
                .chain(key.scale.to_array().into_iter().zip(&mut curve_node.scale));
            for (value, curve) in components {
                curve.push(key.time, value);
            }
        }
        curve_nodes.push(curve_node);
    }

    curve_nodes
}

/// Shifts each angle by whole turns so that it's within half a turn of the previous one.
fn unroll(angles: Vec3, previous: Option<Vec3>) -> Vec3 {
    match previous {
        Some(previous) => {
            let delta = angles - previous;
            angles - (delta / 360.).round() * 360.
        }
        None => angles,
    }
}
