pub mod freehand;
pub mod regions;
pub mod selection;
pub mod transform;
