//! Mapper engine data model module.
//!
//! # Purpose
//! Re-exports mapper type descriptors, mapper instances, edit patches, and
//! change payloads used by the registry, store, and pipeline layers.
mod descriptor;
mod mapper;

pub use descriptor::{MapperTypeDescriptor, PropertyKind, PropertySpec};
pub use mapper::{
    MapperChange, MapperChangeOp, MapperConfigMap, MapperId, MapperInstance, MapperPatch,
    NewMapper, Protocol,
};
