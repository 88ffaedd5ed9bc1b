use serde::Serialize;

/// One cell of a composed room grid, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Cell {
    Desk { id: u32 },
    Corridor,
}

/// A room grid expanded for rendering: row-major cells plus the visual column
/// count (desk columns + interior column corridors). Renderers lay the cells
/// out `visual_cols` per visual row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLayout {
    pub visual_cols: u32,
    pub cells: Vec<Cell>,
}

/// Expands a room's geometry into the cell sequence the grid renders.
///
/// Desk ids are assigned 1..=rows*cols walking rows top to bottom and columns
/// left to right. A column marker m inserts one corridor cell after desk
/// column m in every row; a row marker r inserts a full corridor row of
/// `visual_cols` cells after desk row r. Markers outside 1..dim are ignored,
/// so a 1xN or Nx1 room never gets a corridor and the grid never starts or
/// ends with one.
pub fn compose(
    rows: u32,
    cols: u32,
    corridors_after_rows: &[u32],
    corridors_after_cols: &[u32],
) -> RoomLayout {
    let row_markers = interior_markers(corridors_after_rows, rows);
    let col_markers = interior_markers(corridors_after_cols, cols);
    let visual_cols = cols + col_markers.len() as u32;

    let mut cells = Vec::with_capacity((rows * visual_cols) as usize);
    let mut next_desk = 1u32;
    for r in 0..rows {
        for c in 0..cols {
            cells.push(Cell::Desk { id: next_desk });
            next_desk += 1;
            if col_markers.contains(&(c + 1)) {
                cells.push(Cell::Corridor);
            }
        }
        if row_markers.contains(&(r + 1)) {
            for _ in 0..visual_cols {
                cells.push(Cell::Corridor);
            }
        }
    }

    RoomLayout { visual_cols, cells }
}

/// Markers strictly inside (0, dim), sorted and deduplicated. The same
/// normalization runs when room geometry is saved, so this is the single
/// definition of which markers count.
pub fn interior_markers(markers: &[u32], dim: u32) -> Vec<u32> {
    let mut out: Vec<u32> = markers
        .iter()
        .copied()
        .filter(|&m| m >= 1 && m < dim)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
