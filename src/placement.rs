use crate::model::{Laptop, OpError, Room};

/// What a drop actually did, for the caller's response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOutcome {
    pub previous_location: Option<u32>,
    pub swapped_with: Option<String>,
}

/// Drops a laptop onto a desk of its room.
///
/// The desk's current occupant, if any, takes over the mover's previous
/// location (which may be none), so a drop onto an occupied desk is an
/// exchange rather than an eviction. Nothing is mutated unless every check
/// passes.
pub fn place_on_desk(
    laptops: &mut [Laptop],
    room: &Room,
    laptop_id: &str,
    desk_id: u32,
) -> Result<PlaceOutcome, OpError> {
    let desk_total = room.desk_count();
    if desk_id < 1 || desk_id > desk_total {
        return Err(OpError::with_details(
            "not_found",
            format!("desk {} does not exist in room '{}'", desk_id, room.name),
            serde_json::json!({ "deskCount": desk_total }),
        ));
    }
    let mover = laptops
        .iter()
        .position(|l| l.id == laptop_id)
        .ok_or_else(|| OpError::not_found("laptop"))?;
    if laptops[mover].room_id != room.id {
        return Err(OpError::new(
            "cross_room",
            "laptop belongs to a different room and cannot be placed here",
        ));
    }
    // The mover itself never counts as the occupant, so re-dropping a laptop
    // on its own desk is a no-op instead of a self-swap.
    let occupant = laptops.iter().position(|l| {
        l.id != laptop_id && l.room_id == room.id && l.location_id == Some(desk_id)
    });

    let previous_location = laptops[mover].location_id;
    laptops[mover].location_id = Some(desk_id);
    let mut swapped_with = None;
    if let Some(o) = occupant {
        laptops[o].location_id = previous_location;
        swapped_with = Some(laptops[o].id.clone());
    }
    Ok(PlaceOutcome {
        previous_location,
        swapped_with,
    })
}

/// Clears a laptop's desk placement. Detaching an already loose laptop is
/// fine and changes nothing.
pub fn detach_from_desk(laptops: &mut [Laptop], laptop_id: &str) -> Result<(), OpError> {
    let laptop = laptops
        .iter_mut()
        .find(|l| l.id == laptop_id)
        .ok_or_else(|| OpError::not_found("laptop"))?;
    laptop.location_id = None;
    Ok(())
}

/// Detaches every laptop of the room whose desk no longer exists under the
/// new geometry. Desks keep their ids across a resize, so only placements
/// beyond the new desk count are stale. Returns how many were detached.
pub fn repair_after_resize(laptops: &mut [Laptop], room_id: &str, new_desk_count: u32) -> usize {
    let mut detached = 0;
    for laptop in laptops.iter_mut().filter(|l| l.room_id == room_id) {
        if matches!(laptop.location_id, Some(d) if d > new_desk_count) {
            laptop.location_id = None;
            detached += 1;
        }
    }
    detached
}
