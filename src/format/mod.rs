pub mod fbx;
pub mod gltf;
