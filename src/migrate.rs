use serde_json::Value;

/// Normalizes raw laptop documents to the current shape.
///
/// Two legacy forms are accepted: records carrying a singular `studentId`
/// from before multi-assignment, and records written before assignments
/// existed at all. Both collapse to a `studentIds` array. Returns the records
/// plus whether anything changed, so the caller can persist the rewrite once
/// and skip the write on every later load.
///
/// This never fails: a record with an unusable `studentIds` gets the safest
/// empty value instead, and non-object entries pass through untouched.
pub fn migrate_laptop_records(records: Vec<Value>) -> (Vec<Value>, bool) {
    let mut changed = false;
    let migrated = records
        .into_iter()
        .map(|mut record| {
            let Some(obj) = record.as_object_mut() else {
                return record;
            };
            let has_ids_array = obj
                .get("studentIds")
                .map(|v| v.is_array())
                .unwrap_or(false);
            if !has_ids_array {
                let ids = match obj.remove("studentId") {
                    Some(Value::String(s)) if !s.is_empty() => vec![Value::String(s)],
                    _ => Vec::new(),
                };
                obj.insert("studentIds".to_string(), Value::Array(ids));
                changed = true;
            }
            record
        })
        .collect();
    (migrated, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn singular_student_id_becomes_one_element_array() {
        let (out, changed) = migrate_laptop_records(vec![json!({
            "id": "laptop-1",
            "login": "pc-01",
            "studentId": "student-9"
        })]);
        assert!(changed);
        assert_eq!(out[0]["studentIds"], json!(["student-9"]));
        assert!(out[0].get("studentId").is_none());
    }

    #[test]
    fn null_or_empty_student_id_becomes_empty_array() {
        let (out, changed) = migrate_laptop_records(vec![
            json!({ "id": "a", "studentId": null }),
            json!({ "id": "b", "studentId": "" }),
        ]);
        assert!(changed);
        assert_eq!(out[0]["studentIds"], json!([]));
        assert_eq!(out[1]["studentIds"], json!([]));
        assert!(out.iter().all(|r| r.get("studentId").is_none()));
    }

    #[test]
    fn missing_student_ids_defaults_to_empty_array() {
        let (out, changed) = migrate_laptop_records(vec![json!({ "id": "a", "login": "pc" })]);
        assert!(changed);
        assert_eq!(out[0]["studentIds"], json!([]));
    }

    #[test]
    fn conforming_records_pass_through_unchanged() {
        let records = vec![json!({
            "id": "a",
            "login": "pc",
            "studentIds": ["s1", "s2"]
        })];
        let (out, changed) = migrate_laptop_records(records.clone());
        assert!(!changed);
        assert_eq!(out, records);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (once, first) = migrate_laptop_records(vec![
            json!({ "id": "a", "studentId": "s1" }),
            json!({ "id": "b" }),
        ]);
        assert!(first);
        let (twice, second) = migrate_laptop_records(once.clone());
        assert!(!second);
        assert_eq!(twice, once);
    }

    #[test]
    fn non_array_student_ids_is_replaced_with_empty() {
        let (out, changed) =
            migrate_laptop_records(vec![json!({ "id": "a", "studentIds": null })]);
        assert!(changed);
        assert_eq!(out[0]["studentIds"], json!([]));
    }

    #[test]
    fn non_object_entries_pass_through() {
        let records = vec![json!("garbage"), json!(42)];
        let (out, changed) = migrate_laptop_records(records.clone());
        assert!(!changed);
        assert_eq!(out, records);
    }
}
