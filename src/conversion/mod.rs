use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};

pub use self::{
    asset::Asset,
    document::Document,
    options::{ConversionOptions, Handedness, UpAxis, UvOrigin},
    scene::SceneModel,
};
use crate::format::{
    fbx::FbxExporter,
    gltf::{GltfExporter, GltfImporter},
};

pub mod asset;
pub mod coordinates;
pub mod document;
pub mod keyframes;
pub mod options;
pub mod pipeline;
pub mod scene;
pub mod skinning;
pub mod textures;

/// Defines a type that can import asset files into a scene.
pub trait Importer {
    /// Imports an asset file into a new scene. The scene uses the left-handed Y-up
    /// coordinate system, with the UV origin at the top-left corner.
    fn import(&self, asset: &Asset) -> Result<SceneModel>;
    /// Returns the file extensions supported by the importer. These extensions are used to
    /// select the appropriate importer given an asset file.
    ///
    /// The extension should not include the period (e.g "zip", not ".zip").
    fn extensions(&self) -> &[&str];
}

/// Defines a type that can export a document into asset files.
pub trait Exporter {
    /// Exports a document into one or more asset files.
    fn export(&self, document: &Document) -> Result<Vec<Asset>>;
    /// Returns the corner where the output format places the UV origin.
    fn uv_origin(&self) -> UvOrigin {
        UvOrigin::TopLeft
    }
    /// Returns the file extensions produced by the exporter, without the period.
    fn extensions(&self) -> &[&str];
}

/// Returns all importers available.
pub fn importers(options: &ConversionOptions) -> Vec<Box<dyn Importer>> {
    vec![Box::new(GltfImporter {
        triangulate: options.triangulate,
    })]
}

/// Returns all exporters available.
pub fn exporters() -> Vec<Box<dyn Exporter>> {
    vec![
        Box::new(GltfExporter::binary()),
        Box::new(GltfExporter::embedded()),
        Box::new(FbxExporter::default()),
    ]
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

/// The files written by a conversion.
#[derive(Debug, Default)]
pub struct Report {
    pub model: PathBuf,
    pub animations: Vec<PathBuf>,
    pub textures: usize,
    /// The number of animations that failed to export.
    pub failures: usize,
}

/// Converts an asset file into the format selected by the output path.
pub struct Converter {
    options: ConversionOptions,
    importer: Box<dyn Importer>,
    exporter: Box<dyn Exporter>,
}

impl Converter {
    /// Selects the importer and the exporter by the extensions of the given paths.
    pub fn new(input: &Path, output: &Path, mut options: ConversionOptions) -> Result<Self> {
        let extension = extension_of(input);
        let importer = importers(&options)
            .into_iter()
            .find(|importer| importer.extensions().contains(&extension.as_str()))
            .ok_or_else(|| anyhow!("Unsupported input format \"{}\"", input.display()))?;

        let extension = extension_of(output);
        let exporter = exporters()
            .into_iter()
            .find(|exporter| exporter.extensions().contains(&extension.as_str()))
            .ok_or_else(|| anyhow!("Unsupported output format \"{}\"", output.display()))?;
        options.uv_origin = exporter.uv_origin();

        Ok(Self {
            options,
            importer,
            exporter,
        })
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Writes the model, without animations, to `output`, and every animation to
    /// `<output dir>/<input name>/<animation name>.<output extension>`.
    ///
    /// Failing to write the model is fatal. Failing to write an animation is logged and
    /// counted in the report, and the remaining animations are still written.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<Report> {
        info!("Loading \"{}\"", input.display());
        let asset = Asset::from_path(input)?;
        let mut source = self
            .importer
            .import(&asset)
            .with_context(|| format!("Failed to load \"{}\"", input.display()))?;
        info!(
            "Loaded {} nodes, {} meshes, {} materials and {} animations",
            source.len(),
            source.meshes().count(),
            source.materials.len(),
            source.animation_sets.len()
        );

        let output_dir = output.parent().unwrap_or_else(|| Path::new(""));
        let mut report = Report::default();
        if self.options.export_textures {
            report.textures =
                textures::export_textures(&mut source.materials, asset.parent_dir(), output_dir);
        } else {
            textures::resolve_textures(&mut source.materials, asset.parent_dir());
        }

        let target = pipeline::transcode(&source, &self.options);
        let name = output
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(asset.name());
        let model = Document::from_scene(name, &target, &self.options);
        self.write(&model, output)?;
        info!("Exported model to \"{}\"", output.display());
        report.model = output.to_owned();

        let animation_dir = output_dir.join(asset.name());
        let extension = output
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        let mut paths = HashSet::new();
        for (index, clip) in target.animations.iter().enumerate() {
            let name = if clip.name.is_empty() {
                format!("Animation_{}", index)
            } else {
                asset::sanitize_file_name(&clip.name)
            };
            let mut path = animation_dir.join(format!("{}.{}", name, extension));
            if !paths.insert(path.clone()) {
                let uid = uuid::Uuid::new_v4().to_simple().to_string();
                path = animation_dir.join(format!("{}_{}.{}", name, &uid[..uid.len() / 2], extension));
                paths.insert(path.clone());
            }

            let document = model.with_animation(&name, clip);
            match self.write(&document, &path) {
                Ok(_) => {
                    info!("Exported animation \"{}\" to \"{}\"", clip.name, path.display());
                    report.animations.push(path);
                }
                Err(err) => {
                    error!("Failed to export animation \"{}\": {:#}", clip.name, err);
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    fn write(&self, document: &Document, path: &Path) -> Result<()> {
        let assets = self
            .exporter
            .export(document)
            .with_context(|| format!("Failed to export \"{}\"", document.name))?;
        let asset = assets
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Nothing was exported for \"{}\"", document.name))?;

        Asset::new(asset.bytes, path).save()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use glam::{Quat, Vec2, Vec3};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::conversion::{
        keyframes::{AnimationSet, NodeChannels, QuatKey},
        scene::{Mesh, SceneNode, Transform, Vertex},
    };

    #[test]
    fn formats_are_selected_by_extension() {
        let options = ConversionOptions::default();

        let converter = Converter::new(Path::new("in.GLB"), Path::new("out.fbx"), options).unwrap();
        assert_eq!(UvOrigin::BottomLeft, converter.options().uv_origin);

        let converter = Converter::new(Path::new("in.gltf"), Path::new("out.glb"), options).unwrap();
        assert_eq!(UvOrigin::TopLeft, converter.options().uv_origin);

        assert!(Converter::new(Path::new("in.x"), Path::new("out.glb"), options).is_err());
        assert!(Converter::new(Path::new("in.glb"), Path::new("out.obj"), options).is_err());
    }

    fn sample_scene() -> SceneModel {
        let mut scene = SceneModel::new("Root");
        let hips = scene.add_node(scene.root(), SceneNode::new("Hips", Transform::IDENTITY));
        scene.node_mut(hips).meshes.push(Mesh {
            name: "Body".to_owned(),
            vertices: vec![
                Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO),
                Vertex::new(Vec3::X, Vec3::Y, Vec2::X),
                Vertex::new(Vec3::Z, Vec3::Y, Vec2::Y),
            ],
            indices: vec![0, 1, 2],
            ..Default::default()
        });
        for name in ["Walk", "Walk", ""] {
            scene.animation_sets.push(AnimationSet {
                channels: vec![NodeChannels {
                    rotations: vec![QuatKey {
                        time: 0.,
                        value: Quat::from_rotation_y(0.5),
                    }],
                    ..NodeChannels::new("Hips")
                }],
                ..AnimationSet::new(name)
            });
        }
        scene
    }

    #[test]
    fn convert_writes_model_and_animations() {
        let dir = std::env::temp_dir().join(format!(
            "rigconv-{}",
            uuid::Uuid::new_v4().to_simple()
        ));
        let input = dir.join("hero.glb");
        let output = dir.join("out").join("hero.fbx");
        let options = ConversionOptions {
            handedness: Handedness::Left,
            ..Default::default()
        };
        let source = pipeline::transcode(&sample_scene(), &options);
        let mut document = Document::from_scene("hero", &source, &options);
        for clip in &source.animations {
            document = document.with_animation(&clip.name, clip);
        }
        let bytes = GltfExporter::binary().export(&document).unwrap().remove(0).bytes;
        Asset::new(bytes, &input).save().unwrap();

        let converter = Converter::new(&input, &output, ConversionOptions::default()).unwrap();
        let report = converter.convert(&input, &output).unwrap();

        assert!(output.is_file());
        assert_eq!(3, report.animations.len());
        assert_eq!(0, report.failures);
        assert_eq!(dir.join("out").join("hero").join("Walk.fbx"), report.animations[0]);
        assert!(report.animations[1]
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap()
            .starts_with("Walk_"));
        assert_eq!(dir.join("out").join("hero").join("Animation_2.fbx"), report.animations[2]);
        assert!(report.animations.iter().all(|path| path.is_file()));

        fs::remove_dir_all(dir).unwrap();
    }
}
