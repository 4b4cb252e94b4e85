/// Domain layer: entities and value objects of a mirroring run
pub mod entities;
pub mod value_objects;
