//! Pure placement math for the three trial layouts. Nothing here touches a
//! surface; the planner hands structured (row, column-span) records to
//! whichever renderer consumes them.

use crate::order::PresentationOrder;

/// Sizing of one grid track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track {
    Px(f32),
    /// Sized to content by the renderer.
    Auto,
    /// Fractional share of the remaining space.
    Fr(u16),
}

/// A 1-indexed run of grid lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub fn one(start: u32) -> Self {
        Self { start, len: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: Span,
    pub column: Span,
}

impl Cell {
    pub fn at(row: u32, column: u32) -> Self {
        Self {
            row: Span::one(row),
            column: Span::one(column),
        }
    }
}

/// A radio-input slot together with the value it records when selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionCell {
    pub cell: Cell,
    pub value: u32,
}

/// Placement of one question inside the table grid.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRow {
    /// Display slot, 0-based.
    pub display_position: usize,
    /// Index of the question in the configured order; responses are keyed
    /// by this, never by the display slot.
    pub original_index: usize,
    /// 1-indexed grid row (row 1 is the header).
    pub row: u32,
    pub number_cell: Cell,
    pub statement_cell: Cell,
    pub option_cells: Vec<OptionCell>,
}

/// Grid layout for the shared-scale table variant: a numbering column, a
/// statement column, then one `1fr` track per label.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlan {
    pub columns: Vec<Track>,
    pub rows: Vec<Track>,
    pub width_px: Option<u32>,
    /// One header cell per shared label, all in row 1.
    pub header_cells: Vec<Cell>,
    /// Row whose bottom edge carries the header rule.
    pub header_rule_row: u32,
    /// Column whose right edge divides statements from the scale.
    pub divider_column: u32,
    /// 1-indexed rows to shade (row 1 = header); always the even rows.
    pub shaded_rows: Vec<u32>,
    pub question_rows: Vec<QuestionRow>,
}

const NUMBER_COLUMN_PX: f32 = 40.0;
const STATEMENT_COLUMN: u32 = 2;
/// Grid column of the first label track (after numbering and statement).
const FIRST_LABEL_COLUMN: u32 = 3;

pub fn plan_table(
    order: &PresentationOrder,
    label_count: usize,
    width_px: Option<u32>,
    alternate_row_color: bool,
) -> TablePlan {
    let n = order.len();
    let m = label_count as u32;

    let mut columns = vec![Track::Px(NUMBER_COLUMN_PX), Track::Auto];
    columns.extend(std::iter::repeat_n(Track::Fr(1), label_count));
    let rows = vec![Track::Fr(1); n + 1];

    let header_cells = (0..m)
        .map(|j| Cell::at(1, FIRST_LABEL_COLUMN + j))
        .collect();

    // Row 1 is the header, so the first data row (row 2) is shaded and
    // shading alternates from there.
    let shaded_rows = if alternate_row_color {
        (2..=n as u32 + 1).filter(|k| k % 2 == 0).collect()
    } else {
        Vec::new()
    };

    let question_rows = (0..n)
        .map(|pos| {
            let row = pos as u32 + 2;
            QuestionRow {
                display_position: pos,
                original_index: order.original_index(pos),
                row,
                number_cell: Cell::at(row, 1),
                statement_cell: Cell::at(row, STATEMENT_COLUMN),
                option_cells: (0..m)
                    .map(|j| OptionCell {
                        cell: Cell::at(row, FIRST_LABEL_COLUMN + j),
                        value: j,
                    })
                    .collect(),
            }
        })
        .collect();

    TablePlan {
        columns,
        rows,
        width_px,
        header_cells,
        header_rule_row: 1,
        divider_column: STATEMENT_COLUMN,
        shaded_rows,
        question_rows,
    }
}

/// One element of a semantic-differential scale row, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleItem {
    /// `pole` is 0 for the left extreme, 1 for the right.
    Pole { pole: usize },
    Option { value: u32 },
}

/// One question's scale in the semantic-differential variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleRow {
    pub display_position: usize,
    pub original_index: usize,
    /// Every item gets an equal share of the row: `100 / (labels + 2)`.
    pub item_width_pct: f32,
    pub items: Vec<ScaleItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalePlan {
    pub width_px: Option<u32>,
    pub rows: Vec<ScaleRow>,
}

/// Lays out the stacked per-question scales. `label_counts` is indexed by
/// original question index; scales may differ in length.
pub fn plan_scales(
    order: &PresentationOrder,
    label_counts: &[usize],
    width_px: Option<u32>,
) -> ScalePlan {
    let rows = (0..order.len())
        .map(|pos| {
            let original_index = order.original_index(pos);
            let m = label_counts[original_index];
            let mut items = Vec::with_capacity(m + 2);
            items.push(ScaleItem::Pole { pole: 0 });
            items.extend((0..m as u32).map(|value| ScaleItem::Option { value }));
            items.push(ScaleItem::Pole { pole: 1 });
            ScaleRow {
                display_position: pos,
                original_index,
                item_width_pct: 100.0 / (m as f32 + 2.0),
                items,
            }
        })
        .collect();
    ScalePlan { width_px, rows }
}

/// Two-row grid for the video variant: options in row 1 flanked by the
/// poles, label texts in row 2 under their options.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoScalePlan {
    pub columns: Vec<Track>,
    pub width_px: Option<u32>,
    pub pole_left: Cell,
    pub pole_right: Cell,
    pub option_cells: Vec<OptionCell>,
    pub label_cells: Vec<Cell>,
}

pub fn plan_video_scale(label_count: usize, width_px: Option<u32>) -> VideoScalePlan {
    let m = label_count as u32;
    let mut columns = vec![Track::Auto];
    columns.extend(std::iter::repeat_n(Track::Fr(1), label_count));
    columns.push(Track::Auto);

    VideoScalePlan {
        columns,
        width_px,
        pole_left: Cell::at(1, 1),
        pole_right: Cell::at(1, m + 2),
        option_cells: (0..m)
            .map(|j| OptionCell {
                cell: Cell::at(1, j + 2),
                value: j,
            })
            .collect(),
        label_cells: (0..m).map(|j| Cell::at(2, j + 2)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_rows_are_shaded() {
        let order = PresentationOrder::identity(5);
        let plan = plan_table(&order, 4, None, true);
        // Rows 2..=6 hold data; 1-indexed even rows get the shade.
        assert_eq!(plan.shaded_rows, vec![2, 4, 6]);

        let plain = plan_table(&order, 4, None, false);
        assert!(plain.shaded_rows.is_empty());
    }

    #[test]
    fn table_tracks_are_number_statement_then_one_fr_per_label() {
        let order = PresentationOrder::identity(2);
        let plan = plan_table(&order, 3, Some(600), true);
        assert_eq!(plan.columns.len(), 5);
        assert_eq!(plan.columns[0], Track::Px(40.0));
        assert_eq!(plan.columns[1], Track::Auto);
        assert!(plan.columns[2..].iter().all(|t| *t == Track::Fr(1)));
        assert_eq!(plan.rows.len(), 3);
        assert_eq!(plan.width_px, Some(600));
    }

    #[test]
    fn empty_table_keeps_header_only() {
        let plan = plan_table(&PresentationOrder::identity(0), 3, None, true);
        assert!(plan.question_rows.is_empty());
        assert!(plan.shaded_rows.is_empty());
        assert_eq!(plan.header_cells.len(), 3);
        assert_eq!(plan.header_rule_row, 1);
    }

    #[test]
    fn question_rows_follow_the_presentation_order() {
        let order = PresentationOrder::from_permutation(3, vec![2, 0, 1]).unwrap();
        let plan = plan_table(&order, 2, None, true);
        let originals: Vec<usize> = plan.question_rows.iter().map(|r| r.original_index).collect();
        assert_eq!(originals, vec![2, 0, 1]);
        assert_eq!(plan.question_rows[0].row, 2);
        assert_eq!(plan.question_rows[2].row, 4);
        let values: Vec<u32> = plan.question_rows[0]
            .option_cells
            .iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec![0, 1]);
    }

    #[test]
    fn scale_items_split_the_row_evenly() {
        let order = PresentationOrder::identity(2);
        let plan = plan_scales(&order, &[3, 5], None);
        assert_eq!(plan.rows[0].item_width_pct, 100.0 / 5.0);
        assert_eq!(plan.rows[1].item_width_pct, 100.0 / 7.0);
        assert_eq!(plan.rows[0].items.len(), 5);
        assert_eq!(plan.rows[0].items[0], ScaleItem::Pole { pole: 0 });
        assert_eq!(plan.rows[0].items[4], ScaleItem::Pole { pole: 1 });
        assert_eq!(plan.rows[0].items[1], ScaleItem::Option { value: 0 });
    }

    #[test]
    fn variable_scale_lengths_follow_original_indices() {
        let order = PresentationOrder::from_permutation(2, vec![1, 0]).unwrap();
        let plan = plan_scales(&order, &[3, 5], None);
        // Question 1 (5 labels) is displayed first.
        assert_eq!(plan.rows[0].original_index, 1);
        assert_eq!(plan.rows[0].items.len(), 7);
        assert_eq!(plan.rows[1].items.len(), 5);
    }

    #[test]
    fn video_scale_flanks_options_with_poles() {
        let plan = plan_video_scale(4, Some(500));
        assert_eq!(plan.columns.len(), 6);
        assert_eq!(plan.columns[0], Track::Auto);
        assert_eq!(plan.columns[5], Track::Auto);
        assert_eq!(plan.pole_left, Cell::at(1, 1));
        assert_eq!(plan.pole_right, Cell::at(1, 6));
        assert_eq!(plan.option_cells.len(), 4);
        assert_eq!(plan.label_cells[0], Cell::at(2, 2));
        assert_eq!(plan.option_cells[3].cell, Cell::at(1, 5));
    }
}
