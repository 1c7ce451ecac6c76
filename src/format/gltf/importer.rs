use std::{collections::HashMap, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::{
    animation::{util::ReadOutputs, Interpolation},
    mesh::Mode,
};
use log::{debug, warn};

use crate::conversion::{
    coordinates::{convert_direction, convert_orientation, convert_point, flip_winding, mirror_matrix},
    keyframes::{AnimationSet, NodeChannels, QuatKey, VectorKey},
    scene::{Bone, Material, Mesh, NodeId, SceneModel, SceneNode, Transform, Vertex},
    Asset, Importer,
};

/// Imports glTF 2.0 files. glTF scenes are right-handed, so every transform, vertex, and
/// keyframe is mirrored into the left-handed intermediary scene.
#[derive(Default)]
pub struct GltfImporter {
    /// Whether triangle strips and fans are converted into triangle lists. When unset,
    /// such primitives are skipped.
    pub triangulate: bool,
}

impl Importer for GltfImporter {
    fn import(&self, asset: &Asset) -> Result<SceneModel> {
        let gltf = gltf::Gltf::from_slice(&asset.bytes).context("Invalid glTF file")?;
        let buffers = load_buffers(&gltf, asset.parent_dir())?;
        let names = node_names(&gltf);

        let (mut scene, ids) = convert_hierarchy(&gltf, &names);
        scene.materials = gltf.materials().map(convert_material).collect();

        let skins: Vec<_> = gltf
            .skins()
            .map(|skin| convert_skin(&skin, &buffers, &names))
            .collect();
        for node in gltf.nodes() {
            let id = match ids.get(&node.index()) {
                Some(&id) => id,
                None => continue,
            };
            if let Some(mesh) = node.mesh() {
                let skin = node.skin().map(|skin| skins[skin.index()].as_slice());
                let meshes = self.convert_mesh(&mesh, skin, &buffers)?;
                scene.node_mut(id).meshes = meshes;
            }
        }

        scene.animation_sets = gltf
            .animations()
            .map(|animation| convert_animation(&animation, &buffers, &names))
            .collect();
        scene.bounds = scene.compute_bounds();

        Ok(scene)
    }

    fn extensions(&self) -> &[&str] {
        &["gltf", "glb"]
    }
}

/// Returns the name of every node. Unnamed nodes are named after their index.
fn node_names(gltf: &gltf::Gltf) -> Vec<String> {
    gltf.nodes()
        .map(|node| match node.name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("node_{}", node.index()),
        })
        .collect()
}

/// Builds the node tree of the default scene under a new root. Returns the scene along
/// with the scene node of every visited glTF node.
fn convert_hierarchy(gltf: &gltf::Gltf, names: &[String]) -> (SceneModel, HashMap<usize, NodeId>) {
    let default_scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let root_name = default_scene
        .as_ref()
        .and_then(|scene| scene.name())
        .unwrap_or("RootNode");
    let mut scene = SceneModel::new(root_name);

    let roots: Vec<_> = match &default_scene {
        Some(default_scene) => default_scene.nodes().collect(),
        None => {
            let children: Vec<_> = gltf
                .nodes()
                .flat_map(|node| node.children().map(|child| child.index()))
                .collect();
            gltf.nodes()
                .filter(|node| !children.contains(&node.index()))
                .collect()
        }
    };

    let mut visited: HashMap<usize, NodeId> = HashMap::new();
    let mut stack: Vec<_> = roots.into_iter().rev().map(|node| (node, scene.root())).collect();
    while let Some((node, parent)) = stack.pop() {
        if visited.contains_key(&node.index()) {
            warn!("Node \"{}\" appears more than once in the hierarchy", names[node.index()]);
            continue;
        }
        let matrix = Mat4::from_cols_array_2d(&node.transform().matrix());
        let id = scene.add_node(
            parent,
            SceneNode::new(&names[node.index()], Transform::Matrix(mirror_matrix(matrix))),
        );
        visited.insert(node.index(), id);

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, id)));
    }

    (scene, visited)
}

fn convert_material(material: gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let diffuse = pbr.base_color_factor().into();
    let texture = pbr
        .base_color_texture()
        .and_then(|info| match info.texture().source().source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                Some(texture_path(uri))
            }
            _ => None,
        });

    Material {
        name: match material.name() {
            Some(name) => name.to_owned(),
            None => format!("Material_{}", material.index().unwrap_or_default()),
        },
        diffuse,
        ambient: diffuse,
        emissive: material.emissive_factor().into(),
        texture,
        ..Default::default()
    }
}

/// Decodes the percent-encoded characters of a relative image URI.
fn texture_path(uri: &str) -> String {
    match urlencoding::decode(uri) {
        Ok(path) => path.into_owned(),
        Err(_) => {
            warn!("Texture URI \"{}\" is not valid UTF-8 once decoded", uri);
            uri.to_owned()
        }
    }
}

/// Returns the bones of a skin, without influences.
fn convert_skin(skin: &gltf::Skin, buffers: &[Vec<u8>], names: &[String]) -> Vec<Bone> {
    let reader = skin.reader(|buffer| Some(buffers[buffer.index()].as_slice()));
    let inverse_binds: Vec<_> = reader
        .read_inverse_bind_matrices()
        .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
        .unwrap_or_default();

    skin.joints()
        .enumerate()
        .map(|(index, joint)| {
            let offset = inverse_binds.get(index).copied().unwrap_or(Mat4::IDENTITY);
            let reference = Mat4::from_cols_array_2d(&joint.transform().matrix());
            Bone {
                offset: mirror_matrix(offset),
                reference: Transform::Matrix(mirror_matrix(reference)),
                ..Bone::new(&names[joint.index()])
            }
        })
        .collect()
}

impl GltfImporter {
    /// Converts each supported primitive of a mesh into a separate mesh.
    fn convert_mesh(
        &self,
        mesh: &gltf::Mesh,
        skin: Option<&[Bone]>,
        buffers: &[Vec<u8>],
    ) -> Result<Vec<Mesh>> {
        let name = match mesh.name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("Mesh_{}", mesh.index()),
        };
        let primitive_count = mesh.primitives().len();

        let mut meshes = Vec::with_capacity(primitive_count);
        for primitive in mesh.primitives() {
            let name = if primitive_count > 1 {
                format!("{}_{}", name, primitive.index())
            } else {
                name.clone()
            };
            if let Some(mesh) = self.convert_primitive(&primitive, &name, skin, buffers)? {
                mesh.validate()
                    .with_context(|| format!("Invalid primitive in mesh \"{}\"", name))?;
                debug!(
                    "Imported mesh \"{}\" ({} vertices, {} triangles)",
                    mesh.name,
                    mesh.vertices.len(),
                    mesh.triangle_count()
                );
                meshes.push(mesh);
            }
        }

        Ok(meshes)
    }

    fn convert_primitive(
        &self,
        primitive: &gltf::Primitive,
        name: &str,
        skin: Option<&[Bone]>,
        buffers: &[Vec<u8>],
    ) -> Result<Option<Mesh>> {
        let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].as_slice()));

        let positions: Vec<Vec3> = match reader.read_positions() {
            Some(positions) => positions.map(Vec3::from).collect(),
            None => {
                warn!("Skipping primitive of mesh \"{}\" without positions", name);
                return Ok(None);
            }
        };
        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect())
            .unwrap_or_default();
        let tex_coords: Vec<Vec2> = reader
            .read_tex_coords(0)
            .map(|tex_coords| tex_coords.into_f32().map(Vec2::from).collect())
            .unwrap_or_default();
        let indices: Vec<usize> = reader
            .read_indices()
            .map(|indices| indices.into_u32().map(|i| i as usize).collect())
            .unwrap_or_else(|| (0..positions.len()).collect());

        let mut indices = match triangle_list(primitive.mode(), indices, self.triangulate) {
            Some(indices) => indices,
            None => {
                warn!(
                    "Skipping primitive of mesh \"{}\" with unsupported mode {:?}",
                    name,
                    primitive.mode()
                );
                return Ok(None);
            }
        };
        flip_winding(&mut indices);

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(index, &position)| {
                let normal = normals.get(index).copied().unwrap_or(Vec3::Y);
                let uv = tex_coords.get(index).copied().unwrap_or_default();
                Vertex::new(convert_point(position), convert_direction(normal), uv)
            })
            .collect();

        let mut mesh = Mesh {
            name: name.to_owned(),
            vertices,
            indices,
            ..Default::default()
        };
        if let Some(material) = primitive.material().index() {
            mesh.material_indices = vec![material; mesh.triangle_count()];
        }

        let joints = reader.read_joints(0).map(|joints| joints.into_u16());
        let weights = reader.read_weights(0).map(|weights| weights.into_f32());
        if let (Some(bones), Some(joints), Some(weights)) = (skin, joints, weights) {
            let mut bones = bones.to_vec();
            for (vertex, (joints, weights)) in joints.zip(weights).enumerate() {
                for (&joint, &weight) in joints.iter().zip(&weights) {
                    if weight <= 0. {
                        continue;
                    }
                    match bones.get_mut(joint as usize) {
                        Some(bone) => bone.influences.push((vertex, weight)),
                        None => bail!("Mesh \"{}\" refers to missing joint {}", name, joint),
                    }
                }
            }
            mesh.has_skinning = !bones.is_empty();
            mesh.bones = bones;
        }

        Ok(Some(mesh))
    }
}

/// Converts the indices of a primitive into a triangle list.
fn triangle_list(mode: Mode, indices: Vec<usize>, triangulate: bool) -> Option<Vec<usize>> {
    match mode {
        Mode::Triangles => Some(indices),
        Mode::TriangleStrip if triangulate => Some(
            (0..indices.len().saturating_sub(2))
                .flat_map(|i| {
                    if i % 2 == 0 {
                        [indices[i], indices[i + 1], indices[i + 2]]
                    } else {
                        [indices[i + 1], indices[i], indices[i + 2]]
                    }
                })
                .collect(),
        ),
        Mode::TriangleFan if triangulate => Some(
            (1..indices.len().saturating_sub(1))
                .flat_map(|i| [indices[0], indices[i], indices[i + 1]])
                .collect(),
        ),
        _ => None,
    }
}

fn convert_animation(
    animation: &gltf::Animation,
    buffers: &[Vec<u8>],
    names: &[String],
) -> AnimationSet {
    let mut set = AnimationSet::new(animation.name().unwrap_or_default());
    let mut channel_indices: HashMap<usize, usize> = HashMap::new();

    for channel in animation.channels() {
        let node = channel.target().node();
        let reader = channel.reader(|buffer| Some(buffers[buffer.index()].as_slice()));
        let times: Vec<f64> = match reader.read_inputs() {
            Some(inputs) => inputs.map(f64::from).collect(),
            None => continue,
        };
        set.duration = times.iter().copied().fold(set.duration, f64::max);
        let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;

        let index = *channel_indices.entry(node.index()).or_insert_with(|| {
            set.channels.push(NodeChannels::new(&names[node.index()]));
            set.channels.len() - 1
        });
        let channels = &mut set.channels[index];
        match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                let values = spline_values(values.map(|v| convert_point(v.into())), cubic);
                channels.translations.extend(
                    times
                        .iter()
                        .zip(values)
                        .map(|(&time, value)| VectorKey { time, value }),
                );
            }
            Some(ReadOutputs::Rotations(values)) => {
                let values = spline_values(
                    values
                        .into_f32()
                        .map(|q| convert_orientation(Quat::from_array(q))),
                    cubic,
                );
                channels.rotations.extend(
                    times
                        .iter()
                        .zip(values)
                        .map(|(&time, value)| QuatKey { time, value }),
                );
            }
            Some(ReadOutputs::Scales(values)) => {
                let values = spline_values(values.map(Vec3::from), cubic);
                channels.scales.extend(
                    times
                        .iter()
                        .zip(values)
                        .map(|(&time, value)| VectorKey { time, value }),
                );
            }
            Some(ReadOutputs::MorphTargetWeights(_)) => {
                debug!("Skipping morph target weights of \"{}\"", names[node.index()]);
            }
            None => {}
        }
    }

    set
}

/// Cubic spline samplers store an in-tangent, a value, and an out-tangent per key. Only
/// the values are kept.
fn spline_values<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}

fn load_buffers(gltf: &gltf::Gltf, base_dir: &Path) -> Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let bytes = match buffer.source() {
            gltf::buffer::Source::Uri(uri) => match uri.strip_prefix("data:") {
                Some(data) => decode_data_uri(data)?,
                None => {
                    let path = base_dir.join(uri);
                    std::fs::read(&path)
                        .with_context(|| format!("Failed to read buffer \"{}\"", path.display()))?
                }
            },
            gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| anyhow!("The GLB binary chunk is missing"))?,
        };
        buffers.push(bytes);
    }

    Ok(buffers)
}

/// Decodes the part of a data URI that follows the `data:` prefix.
fn decode_data_uri(data: &str) -> Result<Vec<u8>> {
    const MIME_TYPES: &[&str] = &["application/octet-stream", "application/gltf-buffer"];

    let (header, payload) = data
        .split_once(',')
        .ok_or_else(|| anyhow!("Malformed data URI"))?;
    let (mime_type, base64) = match header.strip_suffix(";base64") {
        Some(mime_type) => (mime_type, true),
        None => (header, false),
    };
    if !MIME_TYPES.contains(&mime_type) {
        bail!("Unsupported buffer type \"{}\"", mime_type);
    }

    if base64 {
        base64::decode(payload).context("Malformed base64 buffer")
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}
