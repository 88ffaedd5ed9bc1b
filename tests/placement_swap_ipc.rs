use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classnavd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classnavd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn create_laptop(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    room_id: &str,
    login: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "laptops.create",
        json!({ "roomId": room_id, "login": login }),
    );
    created
        .get("laptopId")
        .and_then(|v| v.as_str())
        .expect("laptopId")
        .to_string()
}

fn location_of(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    room_id: &str,
    laptop_id: &str,
) -> serde_json::Value {
    let listed = request_ok(stdin, reader, id, "laptops.list", json!({ "roomId": room_id }));
    let laptops = listed
        .get("laptops")
        .and_then(|v| v.as_array())
        .expect("laptops array");
    laptops
        .iter()
        .find(|l| l.get("id").and_then(|v| v.as_str()) == Some(laptop_id))
        .and_then(|l| l.get("locationId"))
        .cloned()
        .expect("laptop listed")
}

#[test]
fn placing_onto_an_occupied_desk_swaps_the_occupant() {
    let workspace = temp_dir("classnav-swap");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "admin.login",
        json!({ "login": "admin", "password": "password" }),
    );

    let room = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "rooms.create",
        json!({ "name": "Swap Lab", "rows": 3, "cols": 4 }),
    );
    let room_id = room
        .get("roomId")
        .and_then(|v| v.as_str())
        .expect("roomId")
        .to_string();

    let a = create_laptop(&mut stdin, &mut reader, "4", &room_id, "pc-a");
    let b = create_laptop(&mut stdin, &mut reader, "5", &room_id, "pc-b");
    let c = create_laptop(&mut stdin, &mut reader, "6", &room_id, "pc-c");

    // Move onto an empty desk: nothing to swap.
    let placed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "laptops.place",
        json!({ "roomId": room_id, "laptopId": a, "deskId": 3 }),
    );
    assert_eq!(placed.get("locationId").and_then(|v| v.as_u64()), Some(3));
    assert!(placed.get("previousLocation").map(|v| v.is_null()).unwrap_or(false));
    assert!(placed.get("swappedWith").map(|v| v.is_null()).unwrap_or(false));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "laptops.place",
        json!({ "roomId": room_id, "laptopId": b, "deskId": 5 }),
    );

    // A takes B's desk, B falls back to A's old desk.
    let swapped = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "laptops.place",
        json!({ "roomId": room_id, "laptopId": a, "deskId": 5 }),
    );
    assert_eq!(swapped.get("locationId").and_then(|v| v.as_u64()), Some(5));
    assert_eq!(
        swapped.get("previousLocation").and_then(|v| v.as_u64()),
        Some(3)
    );
    assert_eq!(
        swapped.get("swappedWith").and_then(|v| v.as_str()),
        Some(b.as_str())
    );
    assert_eq!(
        location_of(&mut stdin, &mut reader, "10", &room_id, &b),
        json!(3)
    );

    // Placing a laptop on its own desk changes nothing.
    let noop = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "laptops.place",
        json!({ "roomId": room_id, "laptopId": a, "deskId": 5 }),
    );
    assert_eq!(noop.get("locationId").and_then(|v| v.as_u64()), Some(5));
    assert!(noop.get("swappedWith").map(|v| v.is_null()).unwrap_or(false));

    // An unplaced mover evicts the occupant to nowhere.
    let evicting = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "laptops.place",
        json!({ "roomId": room_id, "laptopId": c, "deskId": 5 }),
    );
    assert_eq!(
        evicting.get("swappedWith").and_then(|v| v.as_str()),
        Some(a.as_str())
    );
    assert_eq!(
        location_of(&mut stdin, &mut reader, "13", &room_id, &a),
        json!(null)
    );
    assert_eq!(
        location_of(&mut stdin, &mut reader, "14", &room_id, &c),
        json!(5)
    );

    // Detach is idempotent.
    let detached = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "laptops.detach",
        json!({ "laptopId": c }),
    );
    assert!(detached.get("locationId").map(|v| v.is_null()).unwrap_or(false));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "laptops.detach",
        json!({ "laptopId": c }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn placement_rejects_bad_desks_and_foreign_rooms() {
    let workspace = temp_dir("classnav-swap-errors");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "admin.login",
        json!({ "login": "admin", "password": "password" }),
    );

    let room1 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "rooms.create",
        json!({ "name": "Main", "rows": 3, "cols": 4 }),
    );
    let room1_id = room1
        .get("roomId")
        .and_then(|v| v.as_str())
        .expect("roomId")
        .to_string();
    let room2 = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "rooms.create",
        json!({ "name": "Annex", "rows": 2, "cols": 2 }),
    );
    let room2_id = room2
        .get("roomId")
        .and_then(|v| v.as_str())
        .expect("roomId")
        .to_string();

    let local = create_laptop(&mut stdin, &mut reader, "5", &room1_id, "pc-main");
    let foreign = create_laptop(&mut stdin, &mut reader, "6", &room2_id, "pc-annex");

    let over = request(
        &mut stdin,
        &mut reader,
        "7",
        "laptops.place",
        json!({ "roomId": room1_id, "laptopId": local, "deskId": 13 }),
    );
    assert_eq!(
        over.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );
    assert_eq!(
        over.pointer("/error/details/deskCount").and_then(|v| v.as_u64()),
        Some(12)
    );

    let zero = request(
        &mut stdin,
        &mut reader,
        "8",
        "laptops.place",
        json!({ "roomId": room1_id, "laptopId": local, "deskId": 0 }),
    );
    assert_eq!(
        zero.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );

    // A laptop registered in another room cannot be placed here.
    let crossed = request(
        &mut stdin,
        &mut reader,
        "9",
        "laptops.place",
        json!({ "roomId": room1_id, "laptopId": foreign, "deskId": 1 }),
    );
    assert_eq!(
        crossed.pointer("/error/code").and_then(|v| v.as_str()),
        Some("cross_room")
    );
    assert_eq!(
        location_of(&mut stdin, &mut reader, "10", &room2_id, &foreign),
        json!(null)
    );

    let unknown_laptop = request(
        &mut stdin,
        &mut reader,
        "11",
        "laptops.place",
        json!({ "roomId": room1_id, "laptopId": "nope", "deskId": 1 }),
    );
    assert_eq!(
        unknown_laptop.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );

    let unknown_room = request(
        &mut stdin,
        &mut reader,
        "12",
        "laptops.place",
        json!({ "roomId": "nope", "laptopId": local, "deskId": 1 }),
    );
    assert_eq!(
        unknown_room.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );

    let detach_unknown = request(
        &mut stdin,
        &mut reader,
        "13",
        "laptops.detach",
        json!({ "laptopId": "nope" }),
    );
    assert_eq!(
        detach_unknown.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_found")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
