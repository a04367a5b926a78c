pub mod completion;
pub mod confidence_summary;
pub mod flashcard;
pub mod picker;
pub mod progress_bar;
pub mod reset_dialog;
pub mod sign_in;
pub mod stats_panel;
