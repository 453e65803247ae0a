//! Infragram Core Types and Definitions
//!
//! This crate provides the foundational, immutable types shared by every stage
//! of the Infragram pipeline. It includes:
//!
//! - **Identifiers**: Resource keys and cross-resource references ([`identifier`])
//! - **Values**: Attribute values extracted from declaration blocks ([`value`])
//! - **Resources**: Resource definitions with source locations ([`resource`])
//! - **Conditionals**: Presence classification of resources ([`conditional`])
//! - **Relationships**: Directed, typed edges between resources ([`relationship`])
//! - **Categories**: The closed category lookup with an `Unknown` fallback ([`category`])
//! - **Diagram**: The renderable graph model ([`diagram`])
//! - **Render**: Presets, formats and layout direction ([`render`])
//! - **Colors**: Color handling with CSS color support ([`color::Color`])

pub mod category;
pub mod color;
pub mod conditional;
pub mod diagram;
pub mod identifier;
pub mod relationship;
pub mod render;
pub mod resource;
pub mod value;
