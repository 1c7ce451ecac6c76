pub use self::{exporter::GltfExporter, importer::GltfImporter};

mod exporter;
mod importer;
