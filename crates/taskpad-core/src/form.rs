//! Per-screen draft controllers. A controller owns its draft, derives
//! `can_save` from it and only talks to the store on load and submit.

mod create;
mod edit;

pub use create::{CreateDraft, CreateForm};
pub use edit::{EditDraft, EditForm};

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
