//! Terminal screens. Each screen owns a state, a `render_*` function and a
//! `handle_input` that turns one key event into an optional action.

pub mod components;
pub mod entry_wizard;
pub mod home;
pub mod import;
pub mod materials;
pub mod project_view;
pub mod project_wizard;
