//! Conversion of per-bone influence lists into per-vertex influence slots.

use log::debug;

use super::scene::{Bone, Mesh, Vertex, MAX_INFLUENCES};

/// Weight sums at or below this value are left unnormalized.
pub const EPSILON: f32 = 1e-4;

/// Fills the influence slots of the vertices from the influence lists of the bones.
///
/// Bones are visited in order, and each influence takes the first unused slot of its
/// vertex. Influences beyond [`MAX_INFLUENCES`] per vertex, or that refer to vertices out
/// of range, are dropped. Returns the number of dropped influences.
pub fn assign_influences(vertices: &mut [Vertex], bones: &[Bone]) -> usize {
    let mut dropped = 0;
    for (bone_index, bone) in bones.iter().enumerate() {
        for &(vertex_index, weight) in &bone.influences {
            let vertex = match vertices.get_mut(vertex_index) {
                Some(vertex) => vertex,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            match vertex.influences.iter_mut().find(|slot| slot.is_unused()) {
                Some(slot) => {
                    slot.bone = bone_index;
                    slot.weight = weight;
                }
                None => dropped += 1,
            }
        }
    }

    dropped
}

/// Rescales the weights of every vertex so that they sum to one. Vertices whose weights
/// sum to [`EPSILON`] or less are left untouched.
pub fn normalize_weights(vertices: &mut [Vertex]) {
    for vertex in vertices {
        let total = vertex.weight_sum();
        if total > EPSILON {
            for slot in &mut vertex.influences {
                slot.weight /= total;
            }
        }
    }
}

/// Assigns and normalizes the skin weights of a mesh.
pub fn normalize(mesh: &mut Mesh) {
    let dropped = assign_influences(&mut mesh.vertices, &mesh.bones);
    if dropped > 0 {
        debug!(
            "Dropped {} bone influences from mesh \"{}\" (more than {} per vertex or out of range)",
            dropped, mesh.name, MAX_INFLUENCES
        );
    }
    normalize_weights(&mut mesh.vertices);
}
