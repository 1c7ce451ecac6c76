use std::{
    collections::{BTreeMap, HashMap},
    mem,
};

use anyhow::Result;
use byteorder::{WriteBytesExt, LE};
use glam::Mat4;
use gltf::{
    json::{
        self,
        accessor::{ComponentType, GenericComponentType, Type},
        animation::{Interpolation, Property},
        mesh::{Primitive, Semantic},
        validation::Checked,
    },
    Glb,
};

use crate::conversion::{
    coordinates::from_euler_degrees,
    document::{Curve, CurveNode, Document, MeshAttachment, NodeKind},
    scene::MAX_INFLUENCES,
    Asset, Exporter,
};

/// Exports documents as glTF 2.0, either as a binary `.glb` file or as a `.gltf` file with
/// an embedded base64 buffer.
pub struct GltfExporter {
    binary: bool,
}

impl GltfExporter {
    pub fn binary() -> Self {
        Self { binary: true }
    }

    pub fn embedded() -> Self {
        Self { binary: false }
    }
}

impl Default for GltfExporter {
    fn default() -> Self {
        Self::binary()
    }
}

// https://www.khronos.org/registry/glTF/specs/2.0/glTF-2.0.html
impl Exporter for GltfExporter {
    fn export(&self, document: &Document) -> Result<Vec<Asset>> {
        let mut root = json::Root::default();
        let mut buffer = Vec::new();

        insert_scene(&mut root, document);
        insert_materials(&mut root, document);
        insert_meshes(&mut root, &mut buffer, document)?;
        insert_animations(&mut root, &mut buffer, document)?;

        root.asset = json::Asset {
            generator: Some(format!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )),
            ..Default::default()
        };

        if self.binary {
            insert_buffer(&mut root, &buffer, None);
            let json_string = json::serialize::to_string(&root)?;
            let bytes = Glb {
                header: gltf::binary::Header {
                    magic: *b"glTF",
                    version: 2,
                    length: calculate_length(&json_string, &buffer) as u32,
                },
                json: json_string.into_bytes().into(),
                bin: if buffer.is_empty() {
                    None
                } else {
                    Some(buffer.into())
                },
            }
            .to_vec()?;

            Ok(vec![Asset::new(bytes, format!("{}.glb", document.name))])
        } else {
            let uri = format!(
                "data:application/octet-stream;base64,{}",
                base64::encode(&buffer)
            );
            insert_buffer(&mut root, &buffer, Some(uri));
            let json_string = json::serialize::to_string_pretty(&root)?;

            Ok(vec![Asset::new(
                json_string.into_bytes(),
                format!("{}.gltf", document.name),
            )])
        }
    }

    fn extensions(&self) -> &[&str] {
        if self.binary {
            &["glb"]
        } else {
            &["gltf"]
        }
    }
}

fn calculate_length(json: &str, bin: &[u8]) -> usize {
    const HEADER_SIZE: usize = 12;
    const CHUNK_HEADER_SIZE: usize = 8;

    let mut length = HEADER_SIZE + CHUNK_HEADER_SIZE + padded(json.len());
    if !bin.is_empty() {
        length += CHUNK_HEADER_SIZE + padded(bin.len());
    }

    length
}

fn padded(length: usize) -> usize {
    (length + 3) & !3
}

/// Inserts one glTF node per document node, keeping their indices.
fn insert_scene(root: &mut json::Root, document: &Document) {
    let mut skin_count = 0;
    for node in &document.nodes {
        let (mesh, skin) = match node.kind {
            NodeKind::Mesh(index) => {
                let skin = if document.meshes[index].skin.is_some() {
                    skin_count += 1;
                    Some(json::Index::new(skin_count - 1))
                } else {
                    None
                };
                (Some(json::Index::new(index as u32)), skin)
            }
            NodeKind::Null | NodeKind::Joint => (None, None),
        };

        root.nodes.push(json::Node {
            name: Some(node.name.clone()),
            children: if node.children.is_empty() {
                None
            } else {
                Some(
                    node.children
                        .iter()
                        .map(|&child| json::Index::new(child as u32))
                        .collect(),
                )
            },
            translation: Some(node.translation.to_array()),
            rotation: Some(json::scene::UnitQuaternion(
                from_euler_degrees(node.rotation).to_array(),
            )),
            scale: Some(node.scale.to_array()),
            mesh,
            skin,
            camera: None,
            extensions: None,
            matrix: None,
            weights: None,
            extras: Default::default(),
        });
    }

    root.scene = Some(json::Index::new(0));
    root.scenes.push(json::Scene {
        nodes: document
            .roots()
            .map(|node| json::Index::new(node as u32))
            .collect(),
        name: Some(document.name.clone()),
        extensions: None,
        extras: Default::default(),
    });
}

fn insert_materials(root: &mut json::Root, document: &Document) {
    for material in &document.materials {
        let base_color_texture = material.texture.as_ref().map(|uri| {
            root.images.push(json::Image {
                uri: Some(uri.clone()),
                buffer_view: None,
                mime_type: None,
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            root.textures.push(json::Texture {
                source: json::Index::new(root.images.len() as u32 - 1),
                sampler: None,
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            json::texture::Info {
                index: json::Index::new(root.textures.len() as u32 - 1),
                tex_coord: 0,
                extensions: None,
                extras: Default::default(),
            }
        });

        root.materials.push(json::Material {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_factor: json::material::PbrBaseColorFactor(material.diffuse.to_array()),
                base_color_texture,
                ..Default::default()
            },
            emissive_factor: json::material::EmissiveFactor(material.emissive.to_array()),
            ..Default::default()
        });
    }
}

fn insert_meshes(root: &mut json::Root, buffer: &mut Vec<u8>, document: &Document) -> Result<()> {
    for mesh in &document.meshes {
        let positions: Vec<f32> = mesh.control_points.iter().flat_map(|p| p.to_array()).collect();
        let normals: Vec<f32> = mesh.normals.iter().flat_map(|n| n.to_array()).collect();
        let uvs: Vec<f32> = mesh.uvs.iter().flat_map(|uv| uv.to_array()).collect();

        let mut attributes = HashMap::new();
        attributes.insert(
            Checked::Valid(Semantic::Positions),
            insert_f32s(root, buffer, &positions, Type::Vec3, true)?,
        );
        attributes.insert(
            Checked::Valid(Semantic::Normals),
            insert_f32s(root, buffer, &normals, Type::Vec3, false)?,
        );
        attributes.insert(
            Checked::Valid(Semantic::TexCoords(0)),
            insert_f32s(root, buffer, &uvs, Type::Vec2, false)?,
        );
        if mesh.skin.is_some() {
            let (joints, weights) = vertex_influences(mesh);
            attributes.insert(
                Checked::Valid(Semantic::Joints(0)),
                insert_u16s(root, buffer, &joints)?,
            );
            attributes.insert(
                Checked::Valid(Semantic::Weights(0)),
                insert_f32s(root, buffer, &weights, Type::Vec4, false)?,
            );
            insert_skin(root, buffer, mesh)?;
        }

        let mut primitives = Vec::new();
        for (material, indices) in triangles_by_material(mesh) {
            primitives.push(Primitive {
                attributes: attributes.clone(),
                extensions: None,
                indices: Some(insert_indices(root, buffer, &indices)?),
                material: material.map(|material| json::Index::new(material as u32)),
                targets: None,
                mode: Default::default(),
                extras: Default::default(),
            });
        }

        root.meshes.push(json::Mesh {
            name: Some(mesh.name.clone()),
            primitives,
            extensions: None,
            weights: None,
            extras: Default::default(),
        });
    }

    Ok(())
}

/// Splits the triangles of a mesh into one index list per material.
fn triangles_by_material(mesh: &MeshAttachment) -> Vec<(Option<usize>, Vec<u32>)> {
    let indices = mesh.polygon_vertices.iter().map(|&i| i as u32);
    match &mesh.materials {
        None => vec![(None, indices.collect())],
        Some(materials) => {
            let mut groups: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
            for (triangle, &material) in mesh.polygon_vertices.chunks_exact(3).zip(materials) {
                groups
                    .entry(material)
                    .or_default()
                    .extend(triangle.iter().map(|&i| i as u32));
            }
            groups
                .into_iter()
                .map(|(material, indices)| (Some(material), indices))
                .collect()
        }
    }
}

/// Returns the joints and weights of every control point, four of each per point. The
/// joints index the clusters of the skin. A point that no cluster weights is bound to the
/// first joint with a full weight.
fn vertex_influences(mesh: &MeshAttachment) -> (Vec<u16>, Vec<f32>) {
    let count = mesh.control_points.len();
    let mut joints = vec![0; count * MAX_INFLUENCES];
    let mut weights = vec![0.; count * MAX_INFLUENCES];
    let mut used = vec![0; count];
    if let Some(skin) = &mesh.skin {
        for (cluster_index, cluster) in skin.clusters.iter().enumerate() {
            for (&point, &weight) in cluster.indices.iter().zip(&cluster.weights) {
                if point >= count || used[point] == MAX_INFLUENCES {
                    continue;
                }
                let slot = point * MAX_INFLUENCES + used[point];
                joints[slot] = cluster_index as u16;
                weights[slot] = weight;
                used[point] += 1;
            }
        }
        if !skin.clusters.is_empty() {
            for point in (0..count).filter(|&point| used[point] == 0) {
                weights[point * MAX_INFLUENCES] = 1.;
            }
        }
    }

    (joints, weights)
}

fn insert_skin(root: &mut json::Root, buffer: &mut Vec<u8>, mesh: &MeshAttachment) -> Result<()> {
    let clusters = match &mesh.skin {
        Some(skin) => &skin.clusters,
        None => return Ok(()),
    };
    let inverse_binds: Vec<f32> = clusters
        .iter()
        .flat_map(|cluster| inverse_bind(cluster.transform, cluster.transform_link).to_cols_array())
        .collect();
    let inverse_bind_matrices = if clusters.is_empty() {
        None
    } else {
        Some(insert_f32s(root, buffer, &inverse_binds, Type::Mat4, false)?)
    };

    root.skins.push(json::Skin {
        inverse_bind_matrices,
        joints: clusters
            .iter()
            .map(|cluster| json::Index::new(cluster.link as u32))
            .collect(),
        skeleton: None,
        name: Some(format!("{}_skin", mesh.name)),
        extensions: None,
        extras: Default::default(),
    });

    Ok(())
}

/// Maps the bind pose of the mesh into the space of the bone.
fn inverse_bind(transform: Mat4, transform_link: Mat4) -> Mat4 {
    transform_link.inverse() * transform
}

fn insert_animations(
    root: &mut json::Root,
    buffer: &mut Vec<u8>,
    document: &Document,
) -> Result<()> {
    for stack in &document.stacks {
        let mut animation = json::Animation {
            name: if stack.name.is_empty() {
                None
            } else {
                Some(stack.name.clone())
            },
            samplers: Vec::new(),
            channels: Vec::new(),
            extensions: None,
            extras: Default::default(),
        };

        for curve_node in stack.layers.iter().flat_map(|layer| &layer.curve_nodes) {
            if curve_node.times().is_empty() {
                continue;
            }
            let times: Vec<f32> = curve_node.times().iter().map(|&t| t as f32).collect();
            let input = insert_f32s(root, buffer, &times, Type::Scalar, true)?;

            let (translations, rotations, scales) = sampled_values(curve_node);
            let outputs = [
                (Property::Translation, insert_f32s(root, buffer, &translations, Type::Vec3, false)?),
                (Property::Rotation, insert_f32s(root, buffer, &rotations, Type::Vec4, false)?),
                (Property::Scale, insert_f32s(root, buffer, &scales, Type::Vec3, false)?),
            ];
            for (property, output) in outputs {
                animation.samplers.push(json::animation::Sampler {
                    input,
                    output,
                    interpolation: Checked::Valid(Interpolation::Linear),
                    extensions: None,
                    extras: Default::default(),
                });
                animation.channels.push(json::animation::Channel {
                    sampler: json::Index::new(animation.samplers.len() as u32 - 1),
                    target: json::animation::Target {
                        node: json::Index::new(curve_node.node as u32),
                        path: Checked::Valid(property),
                        extensions: None,
                        extras: Default::default(),
                    },
                    extensions: None,
                    extras: Default::default(),
                });
            }
        }

        root.animations.push(animation);
    }

    Ok(())
}

/// Returns the translations, quaternion rotations, and scales of the keys of a node.
fn sampled_values(curve_node: &CurveNode) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let count = curve_node.times().len();
    let value = |curves: &[Curve; 3], axis: usize, key: usize| {
        curves[axis].values.get(key).copied().unwrap_or_default()
    };

    let mut translations = Vec::with_capacity(count * 3);
    let mut rotations = Vec::with_capacity(count * 4);
    let mut scales = Vec::with_capacity(count * 3);
    for key in 0..count {
        for axis in 0..3 {
            translations.push(value(&curve_node.translation, axis, key));
            scales.push(value(&curve_node.scale, axis, key));
        }
        let angles = glam::Vec3::new(
            value(&curve_node.rotation, 0, key),
            value(&curve_node.rotation, 1, key),
            value(&curve_node.rotation, 2, key),
        );
        rotations.extend(from_euler_degrees(angles).to_array());
    }

    (translations, rotations, scales)
}

fn insert_buffer(root: &mut json::Root, buffer: &[u8], uri: Option<String>) {
    if buffer.is_empty() {
        return;
    }
    root.buffers.push(json::Buffer {
        byte_length: buffer.len() as u32,
        uri,
        name: None,
        extensions: None,
        extras: Default::default(),
    });
}

fn components(type_: Type) -> usize {
    match type_ {
        Type::Scalar => 1,
        Type::Vec2 => 2,
        Type::Vec3 => 3,
        Type::Vec4 => 4,
        Type::Mat2 => 4,
        Type::Mat3 => 9,
        Type::Mat4 => 16,
    }
}

/// Inserts float elements of the given type. With `bounds`, the accessor carries the
/// per-component minimum and maximum.
fn insert_f32s(
    root: &mut json::Root,
    buffer: &mut Vec<u8>,
    values: &[f32],
    type_: Type,
    bounds: bool,
) -> Result<json::Index<json::Accessor>> {
    let width = components(type_);
    let bounds = if bounds && !values.is_empty() {
        let mut min = vec![f32::MAX; width];
        let mut max = vec![f32::MIN; width];
        for element in values.chunks_exact(width) {
            for (component, &value) in element.iter().enumerate() {
                min[component] = min[component].min(value);
                max[component] = max[component].max(value);
            }
        }
        Some((min, max))
    } else {
        None
    };

    let mut bytes = Vec::with_capacity(values.len() * mem::size_of::<f32>());
    for &value in values {
        bytes.write_f32::<LE>(value)?;
    }
    let view = insert_view(root, buffer, &bytes, None);

    Ok(insert_accessor(
        root,
        view,
        values.len() / width,
        type_,
        ComponentType::F32,
        bounds,
    ))
}

fn insert_u16s(
    root: &mut json::Root,
    buffer: &mut Vec<u8>,
    values: &[u16],
) -> Result<json::Index<json::Accessor>> {
    let mut bytes = Vec::with_capacity(values.len() * mem::size_of::<u16>());
    for &value in values {
        bytes.write_u16::<LE>(value)?;
    }
    let view = insert_view(root, buffer, &bytes, None);

    Ok(insert_accessor(
        root,
        view,
        values.len() / 4,
        Type::Vec4,
        ComponentType::U16,
        None,
    ))
}

fn insert_indices(
    root: &mut json::Root,
    buffer: &mut Vec<u8>,
    values: &[u32],
) -> Result<json::Index<json::Accessor>> {
    let mut bytes = Vec::with_capacity(values.len() * mem::size_of::<u32>());
    for &value in values {
        bytes.write_u32::<LE>(value)?;
    }
    let view = insert_view(
        root,
        buffer,
        &bytes,
        Some(json::buffer::Target::ElementArrayBuffer),
    );

    Ok(insert_accessor(
        root,
        view,
        values.len(),
        Type::Scalar,
        ComponentType::U32,
        None,
    ))
}

fn insert_view(
    root: &mut json::Root,
    buffer: &mut Vec<u8>,
    bytes: &[u8],
    target: Option<json::buffer::Target>,
) -> json::Index<json::buffer::View> {
    align_to(buffer, 4);
    root.buffer_views.push(json::buffer::View {
        buffer: json::Index::new(0),
        byte_offset: Some(buffer.len() as u32),
        byte_length: bytes.len() as u32,
        byte_stride: None,
        name: None,
        target: target.map(Checked::Valid),
        extensions: None,
        extras: Default::default(),
    });
    buffer.extend_from_slice(bytes);

    json::Index::new(root.buffer_views.len() as u32 - 1)
}

fn insert_accessor(
    root: &mut json::Root,
    view: json::Index<json::buffer::View>,
    count: usize,
    type_: Type,
    component_type: ComponentType,
    bounds: Option<(Vec<f32>, Vec<f32>)>,
) -> json::Index<json::Accessor> {
    let (min, max) = match bounds {
        Some((min, max)) => (Some(min.into()), Some(max.into())),
        None => (None, None),
    };
    root.accessors.push(json::Accessor {
        buffer_view: Some(view),
        byte_offset: 0,
        count: count as u32,
        type_: Checked::Valid(type_),
        component_type: Checked::Valid(GenericComponentType(component_type)),
        min,
        max,
        name: None,
        normalized: false,
        sparse: None,
        extensions: None,
        extras: Default::default(),
    });

    json::Index::new(root.accessors.len() as u32 - 1)
}

fn align_to(buffer: &mut Vec<u8>, n: usize) {
    let padding = (n - buffer.len() % n) % n;
    buffer.resize(buffer.len() + padding, 0);
}
