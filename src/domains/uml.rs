pub mod uml_factory;
pub mod uml_grouping;
pub mod uml_import;
pub mod uml_items;
pub mod uml_models;
