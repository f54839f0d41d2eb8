// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! One-shot rendering: widgets are drawn into an off-screen buffer which is
//! then written to the output line by line, with or without colors.

use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{Clear, ClearType};
use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Paragraph, Row, Table, Widget};

/// Width used when the terminal size cannot be determined
const FALLBACK_WIDTH: u16 = 100;

pub fn terminal_width() -> u16 {
    crossterm::terminal::size()
        .ok()
        .map(|(width, _)| width)
        .filter(|&width| width > 0)
        .unwrap_or(FALLBACK_WIDTH)
}

/// Table column: header plus width bounds
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
    pub min: u16,
    pub max: Option<u16>,
}

impl Column {
    pub fn new(header: &'static str) -> Self {
        Self {
            header,
            min: 0,
            max: None,
        }
    }

    pub fn min(mut self, min: u16) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: u16) -> Self {
        self.max = Some(max);
        self
    }
}

/// Bordered table whose columns are sized to their content
pub struct BoxedTable<'a> {
    columns: Vec<Column>,
    rows: Vec<Vec<Text<'a>>>,
    header_style: Style,
    border_style: Style,
}

impl<'a> BoxedTable<'a> {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            header_style: Style::default().add_modifier(Modifier::BOLD),
            border_style: Style::default(),
        }
    }

    pub fn header_style(mut self, style: Style) -> Self {
        self.header_style = style;
        self
    }

    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }

    pub fn push_row(&mut self, cells: Vec<Text<'a>>) {
        self.rows.push(cells);
    }

    pub fn widths(&self) -> Vec<u16> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let content = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(Text::width)
                    .max()
                    .unwrap_or(0)
                    .max(column.header.chars().count());
                let width = u16::try_from(content).unwrap_or(u16::MAX).max(column.min);
                column.max.map_or(width, |max| width.min(max))
            })
            .collect()
    }

    /// Borders, header, header rule and rows
    pub fn height(&self) -> u16 {
        let rows: usize = self.rows.iter().map(|row| row_height(row) as usize).sum();
        u16::try_from(rows + 4).unwrap_or(u16::MAX)
    }

    pub fn width(&self) -> u16 {
        let widths = self.widths();
        let spacing = widths.len().saturating_sub(1) as u16;
        widths.iter().sum::<u16>().saturating_add(spacing).saturating_add(2)
    }

    fn into_widget(self) -> Table<'a> {
        let widths: Vec<Constraint> = self.widths().into_iter().map(Constraint::Length).collect();
        let header = Row::new(self.columns.iter().map(|c| c.header))
            .style(self.header_style)
            .bottom_margin(1);
        let rows = self.rows.into_iter().map(|cells| {
            let height = row_height(&cells);
            Row::new(cells).height(height)
        });

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(self.border_style);

        Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1)
    }
}

fn row_height(cells: &[Text<'_>]) -> u16 {
    let lines = cells.iter().map(Text::height).max().unwrap_or(1).max(1);
    u16::try_from(lines).unwrap_or(u16::MAX)
}

/// Writes rendered widgets to an output stream
pub struct Printer<W: Write> {
    out: W,
    width: u16,
    color: bool,
}

impl Printer<Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), terminal_width(), color)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, width: u16, color: bool) -> Self {
        Self { out, width, color }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    /// Draw a widget into a `width` x `height` area and write it out
    pub fn render<T: Widget>(&mut self, widget: T, width: u16, height: u16) -> io::Result<()> {
        let mut buffer = Buffer::empty(Rect::new(0, 0, width.min(self.width), height));
        widget.render(buffer.area, &mut buffer);
        write_buffer(&mut self.out, &buffer, self.color)
    }

    pub fn lines(&mut self, lines: Vec<Line<'_>>) -> io::Result<()> {
        let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        self.render(Paragraph::new(lines), self.width, height)
    }

    pub fn line<'l>(&mut self, line: impl Into<Line<'l>>) -> io::Result<()> {
        self.lines(vec![line.into()])
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn table(&mut self, table: BoxedTable<'_>) -> io::Result<()> {
        let width = table.width().min(self.width);
        let height = table.height();
        let border_style = table.border_style;

        let mut buffer = Buffer::empty(Rect::new(0, 0, width, height));
        table.into_widget().render(buffer.area, &mut buffer);

        // Rule between header and body, where the header margin left a gap
        if width >= 2 && height > 2 {
            for x in 0..width {
                let symbol = match x {
                    0 => "├",
                    x if x == width - 1 => "┤",
                    _ => "─",
                };
                if let Some(cell) = buffer.cell_mut((x, 2)) {
                    cell.set_symbol(symbol).set_style(border_style);
                }
            }
        }

        write_buffer(&mut self.out, &buffer, self.color)
    }

    /// Clear the screen and move the cursor home
    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Write buffer rows as text, trailing blanks trimmed.
///
/// Cells covered by a preceding wide symbol are skipped.
pub fn write_buffer<W: Write>(out: &mut W, buffer: &Buffer, color: bool) -> io::Result<()> {
    let width = buffer.area.width as usize;
    if width == 0 {
        return Ok(());
    }

    for row in buffer.content.chunks(width) {
        let end = row.iter().rposition(|c| !is_blank(c)).map_or(0, |i| i + 1);
        let mut current: Option<(Color, Color, Modifier)> = None;
        let mut hidden = 0usize;

        for cell in &row[..end] {
            if hidden > 0 {
                hidden -= 1;
                continue;
            }
            if cell.skip {
                continue;
            }
            if color {
                let style = (cell.fg, cell.bg, cell.modifier);
                if current != Some(style) {
                    apply_style(out, style)?;
                    current = Some(style);
                }
            }
            out.write_all(cell.symbol().as_bytes())?;
            hidden = Span::raw(cell.symbol()).width().saturating_sub(1);
        }

        if current.is_some() {
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
        writeln!(out)?;
    }

    out.flush()
}

fn is_blank(cell: &Cell) -> bool {
    cell.symbol() == " " && cell.bg == Color::Reset
}

fn apply_style<W: Write>(out: &mut W, (fg, bg, modifier): (Color, Color, Modifier)) -> io::Result<()> {
    queue!(out, SetAttribute(Attribute::Reset))?;
    if fg != Color::Reset {
        queue!(out, SetForegroundColor(term_color(fg)))?;
    }
    if bg != Color::Reset {
        queue!(out, SetBackgroundColor(term_color(bg)))?;
    }
    for (flag, attribute) in [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::REVERSED, Attribute::Reverse),
    ] {
        if modifier.contains(flag) {
            queue!(out, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

/// ratatui's named colors use the light variants for the plain names
fn term_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Plain-text output of a printer run
    pub(crate) fn plain(width: u16, draw: impl FnOnce(&mut Printer<Vec<u8>>) -> io::Result<()>) -> String {
        let mut printer = Printer::new(Vec::new(), width, false);
        draw(&mut printer).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_lines_are_trimmed() {
        let text = plain(40, |p| {
            p.line("hello")?;
            p.blank()?;
            p.line(Line::from(vec![Span::raw("a"), Span::styled(" b", Style::default().fg(Color::Red))]))
        });
        assert_eq!(text, "hello\n\na b\n");
    }

    #[test]
    fn test_colored_output_has_escapes() {
        let mut printer = Printer::new(Vec::new(), 20, true);
        printer
            .line(Span::styled("hot", Style::default().fg(Color::Red)))
            .unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert!(text.contains("\u{1b}["));
        assert!(text.contains("hot"));
    }

    #[test]
    fn test_table_sizes_to_content() {
        let mut table = BoxedTable::new(vec![Column::new("Node"), Column::new("CPU").min(5)]);
        table.push_row(vec![Text::from("cpu001"), Text::from("1/8")]);
        table.push_row(vec![Text::from("n2"), Text::from(vec![Line::from("a"), Line::from("b")])]);

        assert_eq!(table.widths(), vec![6, 5]);
        assert_eq!(table.width(), 6 + 1 + 5 + 2);
        assert_eq!(table.height(), 4 + 1 + 2);

        let text = plain(80, |p| p.table(table));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "╭────────────╮");
        assert_eq!(lines[1], "│Node   CPU  │");
        assert_eq!(lines[2], "├────────────┤");
        assert_eq!(lines[3], "│cpu001 1/8  │");
        assert_eq!(lines[4], "│n2     a    │");
        assert_eq!(lines[5], "│       b    │");
        assert_eq!(lines[6], "╰────────────╯");
    }

    #[test]
    fn test_max_width_truncates() {
        let mut table = BoxedTable::new(vec![Column::new("Name").max(4)]);
        table.push_row(vec![Text::from("a-very-long-name")]);
        assert_eq!(table.widths(), vec![4]);
        let text = plain(80, |p| p.table(table));
        assert!(text.contains("│a-ve│"));
    }

    #[test]
    fn test_term_color_mapping() {
        assert_eq!(term_color(Color::Red), TermColor::DarkRed);
        assert_eq!(term_color(Color::LightRed), TermColor::Red);
        assert_eq!(term_color(Color::Rgb(1, 2, 3)), TermColor::Rgb { r: 1, g: 2, b: 3 });
    }
}
