pub mod layout_doc;
pub mod notes;
pub mod persist;
pub mod settings;
