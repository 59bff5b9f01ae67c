use crate::spreadsheet::cell::Cell;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// All non-empty cells of one worksheet, indexed by position and by row.
#[derive(Debug)]
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name as shown on the workbook tab
    pub(crate) name: String,
    /// Cells in reading order
    pub(crate) cells: Vec<Cell>,
    /// (row, col) to position in `cells`
    indexes: HashMap<(usize, usize), usize>,
    /// row to positions in `cells`, ordered by row
    rows: BTreeMap<usize, Vec<usize>>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            indexes: HashMap::new(),
            rows: BTreeMap::new(),
        }
    }

    /// Adds a cell. A later cell at the same position replaces the earlier one.
    pub(crate) fn push(&mut self, cell: Cell) {
        let position = (cell.row, cell.col);
        if let Some(index) = self.indexes.get(&position) {
            self.cells[*index] = cell;
            return;
        }
        let index = self.cells.len();
        self.indexes.insert(position, index);
        self.rows.entry(cell.row).or_default().push(index);
        self.cells.push(cell);
    }

    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes.get(&(row, col)).map(|index| &self.cells[*index])
    }

    /// Cells of one row ordered by column
    pub(crate) fn row(&self, row: usize) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.rows
            .get(&row)
            .map(|indexes| indexes.iter().map(|index| &self.cells[*index]).collect())
            .unwrap_or_default();
        cells.sort_by_key(|cell| cell.col);
        cells
    }

    /// Row indexes holding at least one cell, starting at `lower`, ascending
    pub(crate) fn row_indexes_from(&self, lower: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows.range(lower..).map(|(row, _)| *row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::Text,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("schema.xlsx", "users");
        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_indexes_from(0).count(), 0);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("schema.xlsx", "users");
        push(&mut sheet, 1, 3, "type");
        push(&mut sheet, 1, 1, "column");
        push(&mut sheet, 4, 1, "email");
        push(&mut sheet, 2, 1, "id");

        assert_eq!(sheet.cells.len(), 4);
        assert_eq!(sheet.get(4, 1).map(|cell| cell.value.as_str()), Some("email"));
        assert_eq!(sheet.get(3, 1), None);

        let header: Vec<&str> = sheet.row(1).iter().map(|cell| cell.value.as_str()).collect();
        assert_eq!(header, vec!["column", "type"]);
        assert_eq!(sheet.row_indexes_from(2).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn sheet_overwrite_same_position() {
        let mut sheet = Sheet::new("schema.xlsx", "users");
        push(&mut sheet, 2, 0, "first");
        push(&mut sheet, 2, 0, "second");
        assert_eq!(sheet.cells.len(), 1);
        assert_eq!(sheet.row(2)[0].value, "second");
    }
}
