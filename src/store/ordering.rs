// Ordre par groupe - renumérotation canonique et flux de mutation des boutons

use crate::paths::PathResolver;
use crate::store::StoreError;
use crate::store::button::{DEFAULT_GROUP, SoundButton};
use crate::store::repository::ButtonStore;
use log::{debug, info};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Audio file extensions accepted by drop import
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "ogg", "flac"];

/// Order a new member of `group` gets: one past the highest, 0 when empty
pub fn next_order(buttons: &[SoundButton], group: &str) -> u32 {
    buttons
        .iter()
        .filter(|b| b.group == group)
        .map(|b| b.order.saturating_add(1))
        .max()
        .unwrap_or(0)
}

/// Indices of the members of `group`, sorted by order (ties keep slice order)
fn sorted_members(buttons: &[SoundButton], group: &str) -> Vec<usize> {
    let mut members: Vec<usize> = buttons
        .iter()
        .enumerate()
        .filter(|(_, b)| b.group == group)
        .map(|(i, _)| i)
        .collect();
    members.sort_by_key(|&i| buttons[i].order);
    members
}

/// Renumber the members of `group` to `0..n-1` following `members`
fn assign_orders(buttons: &mut [SoundButton], members: &[usize]) -> Vec<Uuid> {
    let mut changed = Vec::new();
    for (position, &index) in members.iter().enumerate() {
        let order = position as u32;
        if buttons[index].order != order {
            buttons[index].order = order;
            changed.push(buttons[index].id);
        }
    }
    changed
}

/// Renumber `group` in place to a contiguous `0..n-1` range
///
/// Members are sorted stably by their current order, so equal orders keep
/// their slice order. Returns the ids whose order changed.
pub fn renormalize(buttons: &mut [SoundButton], group: &str) -> Vec<Uuid> {
    let members = sorted_members(buttons, group);
    assign_orders(buttons, &members)
}

/// Renormalize `group` under the store lock, writing only the orders
pub fn renormalize_group(store: &ButtonStore, group: &str) -> Result<usize, StoreError> {
    let written = store.reorder(|buttons| renormalize(buttons, group))?;
    if written > 0 {
        debug!("Renormalized group '{}': {} records updated", group, written);
    }
    Ok(written)
}

fn group_or_default(group: &str) -> String {
    if group.trim().is_empty() {
        DEFAULT_GROUP.to_string()
    } else {
        group.to_string()
    }
}

/// Append `draft` at the end of its group
pub fn add_button(store: &ButtonStore, draft: SoundButton) -> Result<SoundButton, StoreError> {
    let mut draft = draft;
    draft.group = group_or_default(&draft.group);
    draft.order = next_order(&store.get_all(), &draft.group);

    let created = store.add(draft)?;
    renormalize_group(store, &created.group)?;

    Ok(store.get_by_id(created.id).unwrap_or(created))
}

/// Overwrite `id` with `values`, keeping both affected groups contiguous
///
/// The caller's order is written as-is and then renormalized, so an order
/// past the end of the group lands last.
pub fn edit_button(store: &ButtonStore, id: Uuid, values: &SoundButton) -> Result<bool, StoreError> {
    let Some(previous) = store.get_by_id(id) else {
        return Ok(false);
    };

    let mut values = values.clone();
    values.group = group_or_default(&values.group);

    if !store.update(id, &values)? {
        return Ok(false);
    }

    if previous.group != values.group {
        renormalize_group(store, &previous.group)?;
    }
    renormalize_group(store, &values.group)?;
    Ok(true)
}

/// Delete `id` and close the gap it leaves in its group
pub fn delete_button(store: &ButtonStore, id: Uuid) -> Result<bool, StoreError> {
    let Some(previous) = store.get_by_id(id) else {
        return Ok(false);
    };

    if !store.delete(id)? {
        return Ok(false);
    }

    renormalize_group(store, &previous.group)?;
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn move_button(store: &ButtonStore, id: Uuid, direction: Direction) -> Result<bool, StoreError> {
    let mut moved = false;
    store.reorder(|buttons| {
        let Some(group) = buttons.iter().find(|b| b.id == id).map(|b| b.group.clone()) else {
            return Vec::new();
        };

        let mut members = sorted_members(buttons, &group);
        let Some(position) = members.iter().position(|&i| buttons[i].id == id) else {
            return Vec::new();
        };

        let neighbour = match direction {
            Direction::Up if position > 0 => position - 1,
            Direction::Down if position + 1 < members.len() => position + 1,
            _ => return Vec::new(),
        };
        members.swap(position, neighbour);
        moved = true;

        assign_orders(buttons, &members)
    })?;
    Ok(moved)
}

/// Swap `id` with the member just before it; false at the top or when unknown
pub fn move_up(store: &ButtonStore, id: Uuid) -> Result<bool, StoreError> {
    move_button(store, id, Direction::Up)
}

/// Swap `id` with the member just after it; false at the bottom or when unknown
pub fn move_down(store: &ButtonStore, id: Uuid) -> Result<bool, StoreError> {
    move_button(store, id, Direction::Down)
}

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| e.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Add one button per supported audio file in `paths`, in the default group
///
/// Unsupported files are skipped. Returns the created buttons.
pub fn import_files(
    store: &ButtonStore,
    resolver: &PathResolver,
    paths: &[PathBuf],
) -> Result<Vec<SoundButton>, StoreError> {
    let mut created = Vec::new();

    for path in paths.iter().filter(|p| is_supported_audio_file(p)) {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_path = resolver
            .to_relative_if_possible(path)
            .to_string_lossy()
            .into_owned();
        let order = next_order(&store.get_all(), DEFAULT_GROUP);

        created.push(store.add(SoundButton::new(label, file_path, DEFAULT_GROUP, order))?);
    }

    if !created.is_empty() {
        renormalize_group(store, DEFAULT_GROUP)?;
        info!("Imported {} dropped files", created.len());
    }

    Ok(created)
}
