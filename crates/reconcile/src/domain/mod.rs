#![forbid(unsafe_code)]

mod classification;
mod ids;
mod image;
mod records;

pub use classification::{
    ClassificationResult, ParentLabel, StatusCategory, TypeCode, base_display, size_display,
};
pub use ids::{ImageId, normalize};
pub use image::{ForeignFile, ImageFile, Inspection, ListedFile};
pub use records::{
    DomainDisks, DomainRef, PlacementRow, PoolRef, TemplateRecord, VolumeKind, VolumeRecord,
};
