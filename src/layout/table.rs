//! Tables: equal-width columns, fixed-height rows, and a header that is
//! redrawn at the top of every page the table continues onto.

use super::{LayoutRun, EPSILON};
use crate::canvas::Canvas;
use crate::error::{BlockError, MdPdfError};
use crate::image_loader::ImageFetcher;
use crate::text::inline::strip_inline_formatting;

/// A validated table with plain-text cells.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableData {
    pub header: Vec<String>,
    /// Every row has exactly `header.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    /// Strip cell markup and normalize row widths.
    ///
    /// A table without header cells, or with a row wider than its header,
    /// is malformed. Short rows are padded with empty cells.
    pub fn parse(header: &[String], rows: &[Vec<String>]) -> Result<Self, BlockError> {
        if header.is_empty() {
            return Err(BlockError::TableParseError(
                "table has no header cells".to_string(),
            ));
        }
        let columns = header.len();

        let mut parsed_rows = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() > columns {
                return Err(BlockError::TableParseError(format!(
                    "row {} has {} cells but the header has {}",
                    i + 1,
                    row.len(),
                    columns
                )));
            }
            let mut cells: Vec<String> = row.iter().map(|c| strip_inline_formatting(c)).collect();
            cells.resize(columns, String::new());
            parsed_rows.push(cells);
        }

        Ok(Self {
            header: header.iter().map(|c| strip_inline_formatting(c)).collect(),
            rows: parsed_rows,
        })
    }

    pub fn columns(&self) -> usize {
        self.header.len()
    }
}

impl<C: Canvas, F: ImageFetcher> LayoutRun<'_, C, F> {
    pub(super) fn layout_table(
        &mut self,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), MdPdfError> {
        let table = match TableData::parse(header, rows) {
            Ok(table) => table,
            Err(error) => return self.table_placeholder(error),
        };

        let row_height = self.options.layout.table_row_height;
        let column_width = self.content_width() / table.columns() as f64;
        let total_height = row_height * (table.rows.len() + 1) as f64;

        // The whole table moves to a fresh page when it would not fit here.
        self.ensure_room(total_height);
        self.draw_table_row(&table.header, column_width, true)?;

        for row in &table.rows {
            if self.cursor.y + row_height > self.cursor.threshold + EPSILON {
                self.break_page("table row");
                self.draw_table_row(&table.header, column_width, true)?;
            }
            self.draw_table_row(row, column_width, false)?;
        }

        self.advance(self.body_line());
        Ok(())
    }

    fn draw_table_row(
        &mut self,
        cells: &[String],
        column_width: f64,
        is_header: bool,
    ) -> Result<(), MdPdfError> {
        self.ensure_page()?;
        let options = self.options;
        let (layout, theme) = (&options.layout, &options.theme);

        let (size, fill, border) = if is_header {
            (
                layout.table_header_font_size,
                theme.table_header_fill,
                theme.table_header_border,
            )
        } else {
            (
                layout.table_body_font_size,
                theme.table_body_fill,
                theme.table_body_border,
            )
        };
        let mut style = self.body_style(size);
        if is_header {
            style = style.bold();
        }

        let row_height = layout.table_row_height;
        let padding = layout.table_cell_padding;
        let y = self.cursor.y;
        let text_y = y + (row_height - size) / 2.0;

        for (i, cell) in cells.iter().enumerate() {
            let x = self.cursor.left + i as f64 * column_width;
            self.canvas
                .draw_rect(x, y, column_width, row_height, Some(fill), Some(border))?;
            let text = self.text.truncate_with_ellipsis(
                self.canvas.fonts(),
                cell,
                column_width - 2.0 * padding,
                &style,
            );
            self.canvas.draw_text(&text, x + padding, text_y, &style)?;
        }

        self.cursor.y += row_height;
        Ok(())
    }

    fn table_placeholder(&mut self, error: BlockError) -> Result<(), MdPdfError> {
        let options = self.options;
        let style = self
            .body_style(options.layout.placeholder_font_size)
            .with_color(options.theme.error);
        self.record_placeholder(error);
        self.draw_wrapped(
            "[table render failed]",
            self.cursor.left,
            self.content_width(),
            &style,
            0.0,
        )?;
        self.advance(self.body_line());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let t = TableData::parse(&cells(&["A", "B", "C"]), &[cells(&["1"])]).unwrap();
        assert_eq!(t.rows[0], cells(&["1", "", ""]));
    }

    #[test]
    fn test_parse_strips_markup() {
        let t = TableData::parse(&cells(&["**Name**"]), &[cells(&["`x`"])]).unwrap();
        assert_eq!(t.header, cells(&["Name"]));
        assert_eq!(t.rows[0], cells(&["x"]));
    }

    #[test]
    fn test_parse_rejects_empty_header() {
        assert!(matches!(
            TableData::parse(&[], &[cells(&["1"])]),
            Err(BlockError::TableParseError(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wide_row() {
        let err = TableData::parse(&cells(&["A"]), &[cells(&["1", "2"])]).unwrap_err();
        assert!(err.to_string().contains("row 1 has 2 cells"));
    }
}
