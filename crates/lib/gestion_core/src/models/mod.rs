//! Domain models exchanged with the project management API.
//!
//! Field names follow the API's JSON (snake_case) except where noted.

pub mod auth;
pub mod project;
pub mod task;

/// Entities the server identifies by a numeric primary key.
pub trait HasId {
    fn id(&self) -> i64;
}

/// Replace the entry with the same id as `item`, or append it.
///
/// Responses to independent calls may complete in any order, so local
/// collections are reconciled by id rather than by arrival order.
pub fn upsert_by_id<T: HasId>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Remove the entry with `id`. Returns whether anything was removed.
pub fn remove_by_id<T: HasId>(items: &mut Vec<T>, id: i64) -> bool {
    let before = items.len();
    items.retain(|existing| existing.id() != id);
    items.len() != before
}

/// Reject blank required text fields.
pub(crate) fn require_text(field: &str, value: &str) -> crate::CoreResult<()> {
    if value.trim().is_empty() {
        return Err(crate::CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}
