use crate::model::{Collections, Group, Laptop, Room, Student};

pub fn room_by_id<'a>(rooms: &'a [Room], id: &str) -> Option<&'a Room> {
    rooms.iter().find(|r| r.id == id)
}

pub fn group_by_id<'a>(groups: &'a [Group], id: &str) -> Option<&'a Group> {
    groups.iter().find(|g| g.id == id)
}

pub fn student_by_id<'a>(students: &'a [Student], id: &str) -> Option<&'a Student> {
    students.iter().find(|s| s.id == id)
}

pub fn laptop_by_id<'a>(laptops: &'a [Laptop], id: &str) -> Option<&'a Laptop> {
    laptops.iter().find(|l| l.id == id)
}

/// Groups a room lists as active, in the room's order. Ids that no longer
/// resolve are skipped rather than reported; group deletion scrubs rooms,
/// so a dangling id only appears in data imported from elsewhere.
pub fn groups_for_room<'a>(data: &'a Collections, room: &Room) -> Vec<&'a Group> {
    room.active_group_ids
        .iter()
        .filter_map(|id| group_by_id(&data.groups, id))
        .collect()
}

pub fn group_of_student<'a>(data: &'a Collections, student: &Student) -> Option<&'a Group> {
    group_by_id(&data.groups, &student.group_id)
}

pub fn room_of_laptop<'a>(data: &'a Collections, laptop: &Laptop) -> Option<&'a Room> {
    room_by_id(&data.rooms, &laptop.room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Collections {
        Collections {
            rooms: vec![Room {
                id: "r1".to_string(),
                name: "Lab".to_string(),
                rows: 2,
                cols: 2,
                corridors_after_rows: Vec::new(),
                corridors_after_cols: Vec::new(),
                active_group_ids: vec!["g2".to_string(), "gone".to_string(), "g1".to_string()],
            }],
            laptops: vec![Laptop {
                id: "l1".to_string(),
                room_id: "r1".to_string(),
                login: "pc-01".to_string(),
                password: None,
                location_id: None,
                student_ids: Vec::new(),
                notes: None,
            }],
            students: vec![Student {
                id: "s1".to_string(),
                name: "Anna".to_string(),
                group_id: "g1".to_string(),
            }],
            groups: vec![
                Group {
                    id: "g1".to_string(),
                    name: "10-A".to_string(),
                },
                Group {
                    id: "g2".to_string(),
                    name: "10-B".to_string(),
                },
            ],
        }
    }

    #[test]
    fn lookups_resolve_by_id() {
        let data = data();
        assert_eq!(room_by_id(&data.rooms, "r1").unwrap().name, "Lab");
        assert!(room_by_id(&data.rooms, "r2").is_none());
        assert_eq!(group_by_id(&data.groups, "g2").unwrap().name, "10-B");
        assert_eq!(student_by_id(&data.students, "s1").unwrap().name, "Anna");
        assert_eq!(laptop_by_id(&data.laptops, "l1").unwrap().login, "pc-01");
    }

    #[test]
    fn room_groups_keep_order_and_skip_dangling_ids() {
        let data = data();
        let names: Vec<&str> = groups_for_room(&data, &data.rooms[0])
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["10-B", "10-A"]);
    }

    #[test]
    fn relations_resolve_through_owners() {
        let data = data();
        assert_eq!(
            group_of_student(&data, &data.students[0]).unwrap().id,
            "g1"
        );
        assert_eq!(room_of_laptop(&data, &data.laptops[0]).unwrap().id, "r1");
    }
}
