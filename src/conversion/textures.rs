use std::{
    collections::{HashMap, HashSet},
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use super::scene::Material;

/// The directory, relative to the output, that receives the copied textures.
pub const TEXTURE_DIR: &str = "textures";

/// Copies the textures referenced by the materials into the texture directory of the
/// output, and points the materials to the copies. Textures that cannot be copied keep
/// their original path. Different sources with the same file name get distinct copies.
/// Returns the number of copied files.
pub fn export_textures(materials: &mut [Material], source_dir: &Path, output_dir: &Path) -> usize {
    let target_dir = output_dir.join(TEXTURE_DIR);
    let mut copies: HashMap<PathBuf, String> = HashMap::new();
    let mut file_names: HashSet<OsString> = HashSet::new();
    for material in materials.iter_mut() {
        let texture = match &material.texture {
            Some(texture) => texture.clone(),
            None => continue,
        };
        let source = source_dir.join(&texture);
        if let Some(copy) = copies.get(&source) {
            material.texture = Some(copy.clone());
            continue;
        }

        let mut file_name = match source.file_name() {
            Some(file_name) => file_name.to_owned(),
            None => {
                warn!("Texture \"{}\" has no file name", texture);
                continue;
            }
        };
        if file_names.contains(&file_name) {
            file_name = unique_file_name(&source);
        }
        let result = fs::create_dir_all(&target_dir)
            .and_then(|_| fs::copy(&source, target_dir.join(&file_name)));
        match result {
            Ok(_) => {
                let copy = Path::new(TEXTURE_DIR)
                    .join(&file_name)
                    .to_string_lossy()
                    .replace('\\', "/");
                debug!("Copied texture \"{}\" to \"{}\"", source.display(), copy);
                file_names.insert(file_name);
                copies.insert(source, copy.clone());
                material.texture = Some(copy);
            }
            Err(err) => warn!("Failed to copy texture \"{}\": {}", source.display(), err),
        }
    }

    copies.len()
}

/// Returns the file name of `source` with half a uuid appended to its stem.
fn unique_file_name(source: &Path) -> OsString {
    let uid = uuid::Uuid::new_v4().to_simple().to_string();
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(extension) => format!(
            "{}_{}.{}",
            stem,
            &uid[..uid.len() / 2],
            extension.to_string_lossy()
        ),
        None => format!("{}_{}", stem, &uid[..uid.len() / 2]),
    };
    OsString::from(name)
}

/// Makes the texture paths absolute when the files exist next to the source.
pub fn resolve_textures(materials: &mut [Material], source_dir: &Path) {
    for material in materials.iter_mut() {
        if let Some(texture) = &material.texture {
            let source = source_dir.join(texture);
            if source.is_file() {
                if let Ok(absolute) = source.canonicalize() {
                    material.texture = Some(absolute.to_string_lossy().into_owned());
                }
            }
        }
    }
}
