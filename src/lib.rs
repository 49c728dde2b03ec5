pub mod graph_utils;
pub mod persistence;

pub use graph_utils::scene::{ClickOutcome, GestureState, GraphScene, LabelPrompt, PointerFrame, PointerRelease, PresetLabel};
pub use persistence::layout_doc::LayoutDocument;
