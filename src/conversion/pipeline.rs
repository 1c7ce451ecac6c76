use std::collections::HashMap;

use log::{debug, info, warn};

use super::{
    coordinates::{
        self, convert_direction, convert_point, convert_transform_with_options, flip_v,
        flip_winding,
    },
    keyframes::{self, AnimationSet},
    options::ConversionOptions,
    scene::{AnimationClip, AnimationTrack, Bone, Mesh, NodeId, SceneModel, SceneNode},
    skinning,
};

/// Animation progress is reported when there are more clips than this.
const PROGRESS_THRESHOLD: usize = 10;

/// Converts an imported scene into the convention described by `options`.
///
/// The node hierarchy is rebuilt in depth-first order. Meshes are transcoded as their
/// nodes are visited, and their bones bind to nodes by name. A bone whose node has not
/// been visited yet gets a new node under the root. Animation channels are then merged
/// and bound to the nodes of the new scene.
pub fn transcode(source: &SceneModel, options: &ConversionOptions) -> SceneModel {
    let mut pipeline = Pipeline::new(options);
    let mut target = pipeline.transcode_hierarchy(source);
    target.materials = source.materials.clone();
    target.animations = pipeline.transcode_animations(&source.animation_sets, &target);
    target.bounds = target.compute_bounds();

    info!(
        "Transcoded {} nodes, {} meshes and {} animations",
        target.len(),
        target.meshes().count(),
        target.animations.len()
    );
    target
}

struct Pipeline<'a> {
    options: &'a ConversionOptions,
    /// Maps node names to the nodes of the target scene.
    nodes: HashMap<String, NodeId>,
}

impl<'a> Pipeline<'a> {
    fn new(options: &'a ConversionOptions) -> Self {
        Self {
            options,
            nodes: HashMap::new(),
        }
    }

    fn transcode_hierarchy(&mut self, source: &SceneModel) -> SceneModel {
        let source_root = source.node(source.root());
        let mut target = SceneModel::new(&source_root.name);
        let mut stack = vec![(source.root(), None)];
        while let Some((source_id, parent)) = stack.pop() {
            let source_node = source.node(source_id);
            let options = match parent {
                None => *self.options,
                Some(_) => self.options.without_reorientation(),
            };
            let node = SceneNode::new(
                &source_node.name,
                convert_transform_with_options(source_node.transform.to_matrix(), &options),
            );
            let id = match parent {
                None => {
                    let root = target.root();
                    target.node_mut(root).transform = node.transform;
                    root
                }
                Some(parent) => target.add_node(parent, node),
            };
            debug!("Visiting node \"{}\"", source_node.name);
            self.register(&source_node.name, id);

            let meshes = source_node
                .meshes
                .iter()
                .map(|mesh| self.transcode_mesh(mesh, &mut target))
                .collect();
            target.node_mut(id).meshes = meshes;

            stack.extend(
                source_node
                    .children()
                    .iter()
                    .rev()
                    .map(|&child| (child, Some(id))),
            );
        }

        target
    }

    fn register(&mut self, name: &str, id: NodeId) {
        if !name.is_empty() {
            self.nodes.insert(name.to_owned(), id);
        }
    }

    fn transcode_mesh(&mut self, source: &Mesh, target: &mut SceneModel) -> Mesh {
        let mut mesh = source.clone();
        let flip = self.options.flips_handedness();
        for vertex in &mut mesh.vertices {
            if flip {
                vertex.position = convert_point(vertex.position);
                vertex.normal = convert_direction(vertex.normal);
            }
            vertex.position *= self.options.scale;
            if self.options.flips_v() {
                vertex.uv = flip_v(vertex.uv);
            }
        }
        if flip {
            flip_winding(&mut mesh.indices);
        }

        if mesh.has_skinning && !mesh.bones.is_empty() {
            skinning::normalize(&mut mesh);
            let options = self.options.without_reorientation();
            for bone in &mut mesh.bones {
                bone.offset = convert_transform_with_options(bone.offset, &options).to_matrix();
                bone.reference = convert_transform_with_options(bone.reference.to_matrix(), &options);
                bone.target = Some(self.resolve_bone(bone, target));
            }
        }
        debug!(
            "Transcoded mesh \"{}\" ({} vertices, {} triangles, {} bones)",
            mesh.name,
            mesh.vertices.len(),
            mesh.triangle_count(),
            mesh.bones.len()
        );

        mesh
    }

    /// Returns the node that the bone binds to. When no visited node has its name, a node
    /// with the bone's reference transform is created under the root.
    fn resolve_bone(&mut self, bone: &Bone, target: &mut SceneModel) -> NodeId {
        let id = match self.nodes.get(&bone.name) {
            Some(&id) => id,
            None => {
                debug!("Creating node for bone \"{}\"", bone.name);
                let node = SceneNode::new(&bone.name, bone.reference);
                let id = target.add_node(target.root(), node);
                self.register(&bone.name, id);
                id
            }
        };
        target.node_mut(id).joint = true;
        id
    }

    fn transcode_animations(
        &self,
        sets: &[AnimationSet],
        target: &SceneModel,
    ) -> Vec<AnimationClip> {
        let total = sets.len();
        if total > PROGRESS_THRESHOLD {
            info!("Converting {} animations. This may take a while", total);
        }

        let mut clips = Vec::with_capacity(total);
        for (index, set) in sets.iter().enumerate() {
            if total > PROGRESS_THRESHOLD && index % PROGRESS_THRESHOLD == 0 {
                info!("Progress: {}/{} animations converted", index, total);
            }
            clips.push(self.transcode_animation(set, target));
        }
        if total > PROGRESS_THRESHOLD {
            info!("Progress: {}/{} animations converted", total, total);
        }

        clips
    }

    fn transcode_animation(&self, set: &AnimationSet, target: &SceneModel) -> AnimationClip {
        let mut clip = AnimationClip {
            name: set.name.clone(),
            duration: set.duration,
            sample_rate: if self.options.resample {
                self.options.fps
            } else {
                set.sample_rate
            },
            tracks: Vec::new(),
        };

        for channels in &set.channels {
            if channels.name.is_empty() {
                warn!("Skipping unnamed channel of animation \"{}\"", set.name);
                continue;
            }
            let node = match self.nodes.get(&channels.name) {
                Some(&node) => node,
                None => {
                    warn!(
                        "Skipping channel \"{}\" of animation \"{}\": no node has that name",
                        channels.name, set.name
                    );
                    continue;
                }
            };

            let mut keys = keyframes::merge(channels);
            if keys.is_empty() {
                continue;
            }
            if self.options.resample {
                keys = keyframes::resample_track(&keys, set.duration, self.options.fps);
            }
            let options = if node == target.root() {
                *self.options
            } else {
                self.options.without_reorientation()
            };
            for key in &mut keys {
                *key = coordinates::convert_key(key, &options);
            }

            clip.tracks.push(AnimationTrack {
                bone: channels.name.clone(),
                target: Some(node),
                keys,
            });
        }

        debug!(
            "Converted animation \"{}\" with {} tracks",
            clip.name,
            clip.tracks.len()
        );
        clip
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Quat, Vec2, Vec3};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::{
        keyframes::{NodeChannels, VectorKey},
        options::{Handedness, UpAxis, UvOrigin},
        scene::{Transform, Vertex},
    };

    fn translated(name: &str, translation: Vec3) -> SceneNode {
        SceneNode::new(name, Transform::Matrix(Mat4::from_translation(translation)))
    }

    fn triangle(name: &str) -> Mesh {
        Mesh {
            name: name.to_owned(),
            vertices: vec![
                Vertex::new(Vec3::new(0., 0., 1.), Vec3::Z, Vec2::new(0., 0.)),
                Vertex::new(Vec3::new(1., 0., 1.), Vec3::Z, Vec2::new(1., 0.)),
                Vertex::new(Vec3::new(0., 1., 1.), Vec3::Z, Vec2::new(0., 0.25)),
            ],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    fn bone(name: &str, influences: &[(usize, f32)]) -> Bone {
        Bone {
            influences: influences.to_vec(),
            ..Bone::new(name)
        }
    }

    fn translation_of(transform: &Transform) -> Vec3 {
        transform.to_matrix().w_axis.truncate()
    }

    #[test]
    fn triangle_winding_and_positions_flip() {
        let mut source = SceneModel::new("Root");
        source.node_mut(source.root()).meshes.push(triangle("Tri"));

        let target = transcode(&source, &ConversionOptions::default());

        let mesh = &target.node(target.root()).meshes[0];
        assert_eq!(vec![0, 2, 1], mesh.indices);
        assert_eq!(Vec3::new(0., 0., -1.), mesh.vertices[0].position);
        assert_eq!(Vec3::new(0., 0., -1.), mesh.vertices[0].normal);
        assert_eq!(Vec3::new(0., 0., -1.), target.bounds.min);
    }

    #[test]
    fn left_handed_output_keeps_geometry() {
        let mut source = SceneModel::new("Root");
        source.node_mut(source.root()).meshes.push(triangle("Tri"));
        let options = ConversionOptions {
            handedness: Handedness::Left,
            ..Default::default()
        };

        let target = transcode(&source, &options);

        let mesh = &target.node(target.root()).meshes[0];
        assert_eq!(vec![0, 1, 2], mesh.indices);
        assert_eq!(Vec3::new(0., 0., 1.), mesh.vertices[0].position);
    }

    #[test]
    fn scale_and_uv_origin_apply_to_vertices() {
        let mut source = SceneModel::new("Root");
        source.node_mut(source.root()).meshes.push(triangle("Tri"));
        let options = ConversionOptions {
            scale: 10.,
            uv_origin: UvOrigin::BottomLeft,
            ..Default::default()
        };

        let target = transcode(&source, &options);

        let mesh = &target.node(target.root()).meshes[0];
        assert_eq!(Vec3::new(10., 0., -10.), mesh.vertices[1].position);
        assert_eq!(Vec2::new(0., 0.75), mesh.vertices[2].uv);
    }

    #[test]
    fn hierarchy_is_preserved() {
        let mut source = SceneModel::new("Root");
        let hips = source.add_node(source.root(), translated("Hips", Vec3::new(0., 1., 2.)));
        source.add_node(hips, translated("Spine", Vec3::new(0., 1., 0.)));
        source.add_node(source.root(), translated("Prop", Vec3::ZERO));

        let target = transcode(&source, &ConversionOptions::default());

        let names: Vec<_> = target
            .depth_first()
            .into_iter()
            .map(|id| target.node(id).name.clone())
            .collect();
        assert_eq!(vec!["Root", "Hips", "Spine", "Prop"], names);
        let hips = target.find_node("Hips").unwrap();
        assert!(translation_of(&target.node(hips).transform)
            .abs_diff_eq(Vec3::new(0., 1., -2.), 1e-5));
    }

    #[test]
    fn bones_resolve_to_visited_nodes() {
        let mut source = SceneModel::new("Root");
        let hips = source.add_node(source.root(), translated("Hips", Vec3::Y));
        let body = source.add_node(hips, SceneNode::new("Body", Transform::IDENTITY));
        source.node_mut(body).meshes.push(Mesh {
            has_skinning: true,
            bones: vec![bone("Hips", &[(0, 1.), (1, 1.), (2, 1.)])],
            ..triangle("Body")
        });

        let target = transcode(&source, &ConversionOptions::default());

        let hips = target.find_node("Hips").unwrap();
        let body = target.find_node("Body").unwrap();
        let mesh = &target.node(body).meshes[0];
        assert_eq!(Some(hips), mesh.bones[0].target);
        assert!(target.node(hips).joint);
        assert_eq!(3, target.len());
        assert_eq!(1., mesh.vertices[0].influences[0].weight);
    }

    #[test]
    fn missing_bones_get_nodes_under_root() {
        let mut source = SceneModel::new("Root");
        let body = source.add_node(source.root(), SceneNode::new("Body", Transform::IDENTITY));
        source.node_mut(body).meshes.push(Mesh {
            has_skinning: true,
            bones: vec![Bone {
                reference: Transform::Matrix(Mat4::from_translation(Vec3::new(0., 0., 3.))),
                ..bone("Ghost", &[(0, 0.5), (0, 0.5)])
            }],
            ..triangle("Body")
        });
        source.animation_sets.push(AnimationSet {
            channels: vec![NodeChannels {
                translations: vec![VectorKey {
                    time: 0.,
                    value: Vec3::X,
                }],
                ..NodeChannels::new("Ghost")
            }],
            ..AnimationSet::new("Float")
        });

        let target = transcode(&source, &ConversionOptions::default());

        let ghost = target.find_node("Ghost").unwrap();
        assert_eq!(Some(target.root()), target.node(ghost).parent());
        assert!(target.node(ghost).joint);
        assert!(translation_of(&target.node(ghost).transform)
            .abs_diff_eq(Vec3::new(0., 0., -3.), 1e-5));
        assert_eq!(Some(ghost), target.animations[0].tracks[0].target);
        let slots = target.node(target.find_node("Body").unwrap()).meshes[0].vertices[0].influences;
        assert!((slots[0].weight - 0.5).abs() < 1e-6);
        assert!((slots[1].weight - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bones_visited_before_their_node_keep_a_separate_joint() {
        let mut source = SceneModel::new("Root");
        let body = source.add_node(source.root(), SceneNode::new("Body", Transform::IDENTITY));
        source.node_mut(body).meshes.push(Mesh {
            has_skinning: true,
            bones: vec![bone("Hips", &[(0, 1.), (1, 1.), (2, 1.)])],
            ..triangle("Body")
        });
        let hips = source.add_node(source.root(), translated("Hips", Vec3::Y));
        source.add_node(hips, translated("Spine", Vec3::Y));
        source.animation_sets.push(AnimationSet {
            channels: vec![NodeChannels {
                translations: vec![VectorKey {
                    time: 0.,
                    value: Vec3::X,
                }],
                ..NodeChannels::new("Hips")
            }],
            ..AnimationSet::new("Sway")
        });

        let target = transcode(&source, &ConversionOptions::default());

        let placeholder = NodeId(2);
        let hips = NodeId(3);
        assert_eq!(5, target.len());
        let mesh = &target.node(NodeId(1)).meshes[0];
        assert_eq!(Some(placeholder), mesh.bones[0].target);
        assert_eq!("Hips", target.node(placeholder).name);
        assert_eq!(Some(target.root()), target.node(placeholder).parent());
        assert!(target.node(placeholder).children().is_empty());
        assert_eq!("Hips", target.node(hips).name);
        let spine = target.node(hips).children()[0];
        assert_eq!("Spine", target.node(spine).name);
        assert_eq!(Some(hips), target.animations[0].tracks[0].target);
    }

    #[test]
    fn unresolved_and_unnamed_channels_are_skipped() {
        let mut source = SceneModel::new("Root");
        source.add_node(source.root(), translated("Hips", Vec3::ZERO));
        let key = VectorKey {
            time: 0.,
            value: Vec3::ONE,
        };
        source.animation_sets.push(AnimationSet {
            channels: vec![
                NodeChannels {
                    translations: vec![key],
                    ..NodeChannels::new("Nobody")
                },
                NodeChannels {
                    translations: vec![key],
                    ..NodeChannels::new("")
                },
                NodeChannels::new("Hips"),
                NodeChannels {
                    translations: vec![key],
                    ..NodeChannels::new("Hips")
                },
            ],
            ..AnimationSet::new("Walk")
        });

        let target = transcode(&source, &ConversionOptions::default());

        let clip = &target.animations[0];
        assert_eq!("Walk", clip.name);
        assert_eq!(1, clip.tracks.len());
        assert_eq!("Hips", clip.tracks[0].bone);
        assert_eq!(Vec3::new(1., 1., -1.), clip.tracks[0].keys[0].translation);
    }

    #[test]
    fn up_axis_applies_to_root_only() {
        let mut source = SceneModel::new("Root");
        source.add_node(source.root(), translated("Child", Vec3::new(0., 1., 0.)));
        let options = ConversionOptions {
            up_axis: UpAxis::Z,
            ..Default::default()
        };

        let target = transcode(&source, &options);

        let root = target.node(target.root()).transform.to_matrix();
        assert!(root.abs_diff_eq(Mat4::from_quat(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)), 1e-5));
        let child = target.find_node("Child").unwrap();
        assert!(translation_of(&target.node(child).transform).abs_diff_eq(Vec3::Y, 1e-5));
        let world = target.world_transform(child).w_axis.truncate();
        assert!(world.abs_diff_eq(Vec3::new(0., 0., -1.), 1e-5));
    }

    #[test]
    fn animation_keys_are_scaled_and_resampled() {
        let mut source = SceneModel::new("Root");
        source.add_node(source.root(), translated("Hips", Vec3::ZERO));
        source.animation_sets.push(AnimationSet {
            duration: 1.,
            channels: vec![NodeChannels {
                translations: vec![
                    VectorKey {
                        time: 0.,
                        value: Vec3::ZERO,
                    },
                    VectorKey {
                        time: 1.,
                        value: Vec3::new(0., 0., 2.),
                    },
                ],
                scales: vec![VectorKey {
                    time: 1.,
                    value: Vec3::splat(3.),
                }],
                ..NodeChannels::new("Hips")
            }],
            ..AnimationSet::new("Rise")
        });
        let options = ConversionOptions {
            scale: 2.,
            fps: 2.,
            resample: true,
            ..Default::default()
        };

        let target = transcode(&source, &options);

        let clip = &target.animations[0];
        assert_eq!(2., clip.sample_rate);
        let keys = &clip.tracks[0].keys;
        assert_eq!(3, keys.len());
        assert!(keys[1].translation.abs_diff_eq(Vec3::new(0., 0., -2.), 1e-5));
        assert_eq!(Vec3::splat(3.), keys[2].scale);
    }

    #[test]
    fn many_animations_are_all_converted() {
        let mut source = SceneModel::new("Root");
        for index in 0..25 {
            source
                .animation_sets
                .push(AnimationSet::new(&format!("Clip{}", index)));
        }

        let target = transcode(&source, &ConversionOptions::default());

        assert_eq!(25, target.animations.len());
        assert_eq!("Clip24", target.animations[24].name);
    }
}
