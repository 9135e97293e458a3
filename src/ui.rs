use std::time::Duration;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::model::{EditView, Modus, UIData};

pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER_HEIGHT: usize = 2;
pub const COLUMN_SPACING: u16 = 1;
pub const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.render_table(uidata, table_area, frame.buffer_mut());
        self.render_statusline(uidata, status_area, frame.buffer_mut());

        if uidata.show_popup {
            self.render_popup(uidata, frame.area(), frame.buffer_mut());
        }
    }

    fn render_table(&self, uidata: &UIData, area: Rect, buf: &mut Buffer) {
        let dragging = matches!(uidata.modus, Modus::RESIZE | Modus::MOVE);

        let header = Row::new(uidata.headers.iter().enumerate().map(|(cidx, h)| {
            let label = match h.sort {
                Some(direction) => format!("{} {}", h.name, direction.symbol()),
                None => h.name.clone(),
            };
            let cell = Cell::from(label);
            if dragging && cidx == uidata.selected_column {
                cell.style(Style::new().reversed())
            } else {
                cell
            }
        }))
        .style(Style::new().bold().underlined())
        .height(TABLE_HEADER_HEIGHT as u16);

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            Row::new(row.iter().enumerate().map(|(cidx, value)| {
                match &uidata.edit {
                    Some(edit) if edit.row == ridx && edit.column == cidx => {
                        Cell::from(Self::edit_line(edit))
                    }
                    _ => Cell::from(value.as_str()),
                }
            }))
        });

        let widths = uidata.headers.iter().map(|h| Constraint::Length(h.width));

        let title = Line::from(format!(" {} ", uidata.name).bold());
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .block(Block::bordered().title(title.centered()))
            .row_highlight_style(Style::new().bg(Color::DarkGray))
            .cell_highlight_style(Style::new().reversed());

        let mut state = TableState::default()
            .with_selected_cell(Some((uidata.selected_row, uidata.selected_column)));
        StatefulWidget::render(table, area, buf, &mut state);
    }

    /// The pending buffer with the cursor shown as a reversed char.
    fn edit_line(edit: &EditView) -> Line<'static> {
        let before: String = edit.text.chars().take(edit.curser_pos).collect();
        let at: String = edit
            .text
            .chars()
            .nth(edit.curser_pos)
            .map(String::from)
            .unwrap_or_else(|| " ".to_string());
        let after: String = edit.text.chars().skip(edit.curser_pos + 1).collect();

        let base = match edit.error {
            Some(_) => Style::new().fg(Color::Red),
            None => Style::new().fg(Color::Yellow),
        };
        Line::from(vec![
            Span::styled(before, base),
            Span::styled(at, base.reversed()),
            Span::styled(after, base),
        ])
    }

    fn render_statusline(&self, uidata: &UIData, area: Rect, buf: &mut Buffer) {
        let position = format!(
            " {}/{} ",
            (uidata.abs_selected_row + 1).min(uidata.nrows),
            uidata.nrows
        );
        let modus = format!(" {:?} ", uidata.modus);
        let message = match &uidata.edit {
            Some(EditView {
                error: Some(error), ..
            }) => Span::from(format!(" {} ", error)).red(),
            _ if uidata.last_status_message_update.elapsed() > STATUS_MESSAGE_TIMEOUT => {
                Span::from("")
            }
            _ => Span::from(format!(" {} ", uidata.status_message)),
        };
        Paragraph::new(Line::from(vec![
            modus.black().on_cyan(),
            position.bold(),
            message,
        ]))
        .render(area, buf);
    }

    fn render_popup(&self, uidata: &UIData, area: Rect, buf: &mut Buffer) {
        let area = Self::popup_area(area, 80, 80);
        Clear.render(area, buf);
        Paragraph::new(uidata.popup_message.as_str())
            .block(Block::bordered().title(Line::from(" Help ".bold()).centered()))
            .render(area, buf);
    }

    fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
        let [area] = vertical.areas(area);
        let [area] = horizontal.areas(area);
        area
    }
}
