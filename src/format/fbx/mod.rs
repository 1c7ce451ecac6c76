pub use self::exporter::FbxExporter;

mod exporter;
pub mod internal;
