use anyhow::{bail, Result};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::keyframes::AnimationSet;

/// The maximum number of bones that can influence a single vertex.
pub const MAX_INFLUENCES: usize = 4;

/// The index of a node in the arena of a [`SceneModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Represents a 3D scene comprised of a node hierarchy, meshes, materials, and animations.
/// It's the intermediary format between conversions.
///
/// Importers produce scenes that use the left-handed Y-up coordinate system, and whose
/// animations are still split into separate channels ([`AnimationSet`]). The transcode
/// pipeline produces scenes in the convention of the output, with merged [`AnimationClip`]s.
///
/// Nodes are stored in an arena and refer to each other by [`NodeId`]. The root is the
/// only node without a parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneModel {
    nodes: Vec<SceneNode>,
    pub materials: Vec<Material>,
    /// Animations as read from the source, one channel list per node.
    pub animation_sets: Vec<AnimationSet>,
    /// Animations with merged keyframes, bound to the nodes of this scene.
    pub animations: Vec<AnimationClip>,
    pub bounds: BoundingBox,
}

impl SceneModel {
    /// Creates a scene with a single root node.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name, Transform::IDENTITY)],
            materials: Vec::new(),
            animation_sets: Vec::new(),
            animations: Vec::new(),
            bounds: BoundingBox::EMPTY,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    /// Returns the number of nodes in the scene, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Inserts a node as the last child of `parent` and returns its id.
    pub fn add_node(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Returns the first node with the given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the ids of all nodes in depth-first pre-order, starting at the root.
    /// Children are visited in insertion order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }

        order
    }

    /// Returns the transform of the node relative to the origin of the scene.
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut node = self.node(id);
        let mut transform = node.transform.to_matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent);
            transform = node.transform.to_matrix() * transform;
        }

        transform
    }

    /// Returns the world transforms of all nodes, indexed by [`NodeId`].
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut transforms = vec![Mat4::IDENTITY; self.nodes.len()];
        for id in self.depth_first() {
            let node = self.node(id);
            let local = node.transform.to_matrix();
            transforms[id.0] = match node.parent {
                Some(parent) => transforms[parent.0] * local,
                None => local,
            };
        }

        transforms
    }

    /// Iterates over all meshes along with the node that holds them.
    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> {
        self.nodes()
            .flat_map(|(id, node)| node.meshes.iter().map(move |mesh| (id, mesh)))
    }

    /// Computes the box that encloses every vertex of the scene in world space.
    pub fn compute_bounds(&self) -> BoundingBox {
        let transforms = self.world_transforms();
        let mut bounds = BoundingBox::EMPTY;
        for (id, mesh) in self.meshes() {
            let transform = transforms[id.0];
            for vertex in &mesh.vertices {
                bounds.extend(transform.transform_point3(vertex.position));
            }
        }

        bounds
    }
}

impl Default for SceneModel {
    fn default() -> Self {
        Self::new("RootNode")
    }
}

/// Represents a named node (frame) of the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// The name of the node. Bones refer to nodes by name, so it should be unique.
    pub name: String,
    /// The transform of the node, relative to its parent.
    pub transform: Transform,
    pub meshes: Vec<Mesh>,
    /// Whether the node is the target of a bone.
    pub joint: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: &str, transform: Transform) -> Self {
        Self {
            name: name.to_owned(),
            transform,
            meshes: Vec::new(),
            joint: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The local transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// An arbitrary affine matrix, as read from the source.
    Matrix(Mat4),
    /// A decomposed transform.
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
}

impl Transform {
    pub const IDENTITY: Self = Transform::Matrix(Mat4::IDENTITY);

    pub fn to_matrix(&self) -> Mat4 {
        match *self {
            Transform::Matrix(matrix) => matrix,
            Transform::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(scale, rotation, translation),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Represents the geometry of a mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// The index buffer. Every three indices form a triangle.
    pub indices: Vec<usize>,
    /// The material of each triangle, as an index into [`SceneModel::materials`].
    /// It's either empty or has one entry per triangle.
    pub material_indices: Vec<usize>,
    pub has_skinning: bool,
    pub bones: Vec<Bone>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks the structural invariants of the mesh.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            bail!(
                "Mesh \"{}\" has {} indices, which is not a multiple of 3",
                self.name,
                self.indices.len()
            );
        }
        if let Some(index) = self.indices.iter().find(|&&i| i >= self.vertices.len()) {
            bail!(
                "Mesh \"{}\" refers to vertex {}, but it only has {} vertices",
                self.name,
                index,
                self.vertices.len()
            );
        }
        if !self.material_indices.is_empty() && self.material_indices.len() != self.triangle_count()
        {
            bail!(
                "Mesh \"{}\" has {} material indices for {} triangles",
                self.name,
                self.material_indices.len(),
                self.triangle_count()
            );
        }
        if self.has_skinning && self.bones.is_empty() {
            bail!("Mesh \"{}\" is skinned, but has no bones", self.name);
        }

        Ok(())
    }
}

/// A bone influence over a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Influence {
    /// The index of the bone in [`Mesh::bones`].
    pub bone: usize,
    /// The weight of the influence. A slot with weight zero is unused.
    pub weight: f32,
}

impl Influence {
    pub fn is_unused(&self) -> bool {
        self.weight == 0.
    }
}

/// Represents a vertex of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub influences: [Influence; MAX_INFLUENCES],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
            influences: [Influence::default(); MAX_INFLUENCES],
        }
    }

    pub fn weight_sum(&self) -> f32 {
        self.influences.iter().map(|influence| influence.weight).sum()
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO)
    }
}

/// Represents a bone of a skinned mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// The name of the node that the bone binds to.
    pub name: String,
    /// The inverse bind matrix of the bone.
    pub offset: Mat4,
    /// The bind pose of the bone. It's used for the node created when no node matches
    /// the name of the bone.
    pub reference: Transform,
    /// The vertices influenced by the bone, as pairs of vertex index and weight.
    pub influences: Vec<(usize, f32)>,
    /// The node that the bone resolved to.
    pub target: Option<NodeId>,
}

impl Bone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            offset: Mat4::IDENTITY,
            reference: Transform::IDENTITY,
            influences: Vec::new(),
            target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Vec4,
    pub ambient: Vec4,
    pub specular: Vec4,
    pub emissive: Vec3,
    pub power: f32,
    /// The path to the diffuse texture.
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        let diffuse = Vec4::new(0.8, 0.8, 0.8, 1.);
        Self {
            name: String::new(),
            diffuse,
            ambient: diffuse,
            specular: Vec4::ONE,
            emissive: Vec3::ZERO,
            power: 32.,
            texture: None,
        }
    }
}

/// Represents an animation whose tracks carry merged keyframes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// The duration of the clip, in seconds.
    pub duration: f64,
    /// The number of keyframes per second the clip was authored at.
    pub sample_rate: f64,
    pub tracks: Vec<AnimationTrack>,
}

/// The keyframes of a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    /// The name of the animated node.
    pub bone: String,
    pub target: Option<NodeId>,
    /// The keyframes, sorted by strictly increasing time.
    pub keys: Vec<AnimationKey>,
}

/// A keyframe that carries all three transform components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationKey {
    /// The time of the keyframe, in seconds.
    pub time: f64,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl AnimationKey {
    /// Creates an identity keyframe at the given time.
    pub fn at(time: f64) -> Self {
        Self {
            time,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Default for AnimationKey {
    fn default() -> Self {
        Self::at(0.)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
