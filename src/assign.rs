use crate::model::{Laptop, OpError, Student};

/// Replaces a laptop's assigned students wholesale. Duplicates collapse to
/// their first appearance; order is otherwise kept as given. No cross-laptop
/// uniqueness is imposed: a student may be assigned to several machines.
pub fn set_assigned_students(
    laptops: &mut [Laptop],
    laptop_id: &str,
    student_ids: &[String],
) -> Result<(), OpError> {
    let laptop = laptop_mut(laptops, laptop_id)?;
    let mut ids: Vec<String> = Vec::with_capacity(student_ids.len());
    for id in student_ids {
        if !ids.iter().any(|have| have == id) {
            ids.push(id.clone());
        }
    }
    laptop.student_ids = ids;
    Ok(())
}

pub fn unassign_all(laptops: &mut [Laptop], laptop_id: &str) -> Result<(), OpError> {
    laptop_mut(laptops, laptop_id)?.student_ids.clear();
    Ok(())
}

/// Removes one student from one laptop. Removing a student who was not
/// assigned changes nothing.
pub fn unassign_one(
    laptops: &mut [Laptop],
    laptop_id: &str,
    student_id: &str,
) -> Result<(), OpError> {
    let laptop = laptop_mut(laptops, laptop_id)?;
    laptop.student_ids.retain(|id| id != student_id);
    Ok(())
}

/// Strips a student from every laptop that references them; the cascade half
/// of student deletion. Returns how many laptops were touched.
pub fn remove_student_everywhere(laptops: &mut [Laptop], student_id: &str) -> usize {
    let mut touched = 0;
    for laptop in laptops.iter_mut() {
        let before = laptop.student_ids.len();
        laptop.student_ids.retain(|id| id != student_id);
        if laptop.student_ids.len() != before {
            touched += 1;
        }
    }
    touched
}

/// Students of one group whose name contains the search term, compared
/// case-insensitively, sorted by name. An empty term matches the whole
/// group.
pub fn candidate_students<'a>(
    students: &'a [Student],
    group_id: &str,
    search: &str,
) -> impl Iterator<Item = &'a Student> {
    let needle = search.to_lowercase();
    let mut hits: Vec<&Student> = students
        .iter()
        .filter(|s| s.group_id == group_id)
        .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
        .collect();
    hits.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    hits.into_iter()
}

fn laptop_mut<'a>(laptops: &'a mut [Laptop], laptop_id: &str) -> Result<&'a mut Laptop, OpError> {
    laptops
        .iter_mut()
        .find(|l| l.id == laptop_id)
        .ok_or_else(|| OpError::not_found("laptop"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop(id: &str, student_ids: &[&str]) -> Laptop {
        Laptop {
            id: id.to_string(),
            room_id: "r1".to_string(),
            login: format!("login-{}", id),
            password: None,
            location_id: None,
            student_ids: student_ids.iter().map(|s| s.to_string()).collect(),
            notes: None,
        }
    }

    fn student(id: &str, name: &str, group_id: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            group_id: group_id.to_string(),
        }
    }

    fn ids(laptops: &[Laptop], id: &str) -> Vec<String> {
        laptops
            .iter()
            .find(|l| l.id == id)
            .unwrap()
            .student_ids
            .clone()
    }

    #[test]
    fn set_replaces_wholesale() {
        let mut laptops = vec![laptop("a", &["s1", "s2"])];
        set_assigned_students(
            &mut laptops,
            "a",
            &["s2".to_string(), "s3".to_string()],
        )
        .unwrap();
        assert_eq!(ids(&laptops, "a"), vec!["s2", "s3"]);
    }

    #[test]
    fn set_collapses_duplicates_keeping_first_position() {
        let mut laptops = vec![laptop("a", &[])];
        set_assigned_students(
            &mut laptops,
            "a",
            &["s1".to_string(), "s2".to_string(), "s1".to_string()],
        )
        .unwrap();
        assert_eq!(ids(&laptops, "a"), vec!["s1", "s2"]);
    }

    #[test]
    fn same_student_may_sit_on_several_laptops() {
        let mut laptops = vec![laptop("a", &["s1"]), laptop("b", &[])];
        set_assigned_students(&mut laptops, "b", &["s1".to_string()]).unwrap();
        assert_eq!(ids(&laptops, "a"), vec!["s1"]);
        assert_eq!(ids(&laptops, "b"), vec!["s1"]);
    }

    #[test]
    fn unassign_one_removes_only_the_target() {
        let mut laptops = vec![laptop("a", &["s1", "s2"])];
        unassign_one(&mut laptops, "a", "s1").unwrap();
        assert_eq!(ids(&laptops, "a"), vec!["s2"]);
        // Absent student: no-op, still ok.
        unassign_one(&mut laptops, "a", "s9").unwrap();
        assert_eq!(ids(&laptops, "a"), vec!["s2"]);
    }

    #[test]
    fn unassign_all_empties_the_laptop() {
        let mut laptops = vec![laptop("a", &["s1", "s2"]), laptop("b", &["s1"])];
        unassign_all(&mut laptops, "a").unwrap();
        assert_eq!(ids(&laptops, "a"), Vec::<String>::new());
        assert_eq!(ids(&laptops, "b"), vec!["s1"]);
    }

    #[test]
    fn missing_laptop_is_not_found() {
        let mut laptops = vec![laptop("a", &[])];
        assert_eq!(
            unassign_all(&mut laptops, "zz").unwrap_err().code,
            "not_found"
        );
    }

    #[test]
    fn cascade_strips_student_from_every_laptop() {
        let mut laptops = vec![
            laptop("a", &["s1", "s2"]),
            laptop("b", &["s1"]),
            laptop("c", &["s3"]),
        ];
        let touched = remove_student_everywhere(&mut laptops, "s1");
        assert_eq!(touched, 2);
        assert_eq!(ids(&laptops, "a"), vec!["s2"]);
        assert_eq!(ids(&laptops, "b"), Vec::<String>::new());
        assert_eq!(ids(&laptops, "c"), vec!["s3"]);
    }

    #[test]
    fn candidates_are_group_scoped_and_sorted() {
        let students = vec![
            student("s1", "zoe", "g1"),
            student("s2", "Anna", "g1"),
            student("s3", "mark", "g2"),
            student("s4", "anton", "g1"),
        ];
        let names: Vec<&str> = candidate_students(&students, "g1", "")
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Anna", "anton", "zoe"]);
    }

    #[test]
    fn candidates_match_case_insensitively_anywhere_in_the_name() {
        let students = vec![
            student("s1", "Anna Petrova", "g1"),
            student("s2", "Joanna", "g1"),
            student("s3", "Boris", "g1"),
        ];
        let names: Vec<&str> = candidate_students(&students, "g1", "ANN")
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Anna Petrova", "Joanna"]);
    }

    #[test]
    fn candidates_of_an_unknown_group_are_empty() {
        let students = vec![student("s1", "Anna", "g1")];
        assert_eq!(candidate_students(&students, "g9", "").count(), 0);
    }
}
