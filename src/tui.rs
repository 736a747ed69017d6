use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::layout::Constraint;
use ratatui::style::{self, Style};
use ratatui::symbols;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, LegendPosition};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Stylize,
    text::Line,
    widgets::{Block, Widget},
};

use crate::history::History;

const PALETTE: [style::Color; 12] = [
    style::Color::Red,
    style::Color::Green,
    style::Color::Yellow,
    style::Color::Blue,
    style::Color::Magenta,
    style::Color::Cyan,
    style::Color::LightRed,
    style::Color::LightGreen,
    style::Color::LightYellow,
    style::Color::LightBlue,
    style::Color::LightMagenta,
    style::Color::LightCyan,
];

// Line chart of every player's cash over the rounds of one game
pub struct HistoryChart<'a> {
    history: &'a History,
}

impl<'a> HistoryChart<'a> {
    pub fn new(history: &'a History) -> Self {
        HistoryChart { history }
    }
}

fn axis_labels(low: f64, high: f64) -> Vec<String> {
    vec![
        format!("{:.0}", low),
        format!("{:.0}", (low + high) / 2.0),
        format!("{:.0}", high),
    ]
}

impl Widget for HistoryChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let points: Vec<Vec<(f64, f64)>> = self.history
            .iter()
            .map(|(_name, series)| series.iter().map(|s| (s.round as f64, s.cash as f64)).collect())
            .collect();

        let datasets: Vec<Dataset> = self.history
            .iter()
            .zip(points.iter())
            .enumerate()
            .map(|(i, ((name, _series), data))| {
                Dataset::default()
                    .name(name.to_string())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                    .data(data)
            })
            .collect();

        let max_round = self.history.last_round().max(1) as f64;
        let (low, high) = self.history.cash_bounds();
        let (low, high) = (low.min(0) as f64, high.max(1) as f64);

        let block = Block::bordered()
            .title(Line::from(" Player Financial History ".bold()).centered())
            .title_bottom(Line::from(vec![" Quit ".into(), "<q> ".blue().bold()]).right_aligned());

        Chart::new(datasets)
            .block(block)
            .x_axis(
                Axis::default()
                    .title("Round of the Game")
                    .bounds([0.0, max_round])
                    .labels(axis_labels(0.0, max_round)),
            )
            .y_axis(
                Axis::default()
                    .title("Player Cash Reserves (in $) at End of Round")
                    .bounds([low, high])
                    .labels(axis_labels(low, high)),
            )
            .legend_position(Some(LegendPosition::TopLeft))
            .hidden_legend_constraints((Constraint::Ratio(1, 1), Constraint::Ratio(1, 1)))
            .render(area, buf);
    }
}

// Draw the chart full screen until the user presses q or Esc
pub fn show_chart(history: &History) -> Result<()> {
    let mut terminal = ratatui::init();

    let result = (|| -> Result<()> {
        loop {
            terminal.draw(|frame| {
                frame.render_widget(HistoryChart::new(history), frame.area());
            })?;

            if let Event::Key(key_event) = event::read()? {
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                match key_event.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    _ => {},
                }
            }
        }
    })();

    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_chart_renders_title_and_players() {
        let mut history = History::new(vec!["Alice".to_string(), "Bob".to_string()]);
        history.record(0, 0, 1000).unwrap();
        history.record(1, 0, 1000).unwrap();
        history.record(0, 1, 1400).unwrap();
        history.record(1, 1, 300).unwrap();

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        HistoryChart::new(&history).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("Player Financial History"));
        assert!(text.contains("Alice"));
        assert!(text.contains("Bob"));
    }

    #[test]
    fn test_empty_history_renders() {
        let history = History::new(Vec::new());
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        HistoryChart::new(&history).render(area, &mut buf);

        assert!(buffer_text(&buf).contains("Financial"));
    }

    #[test]
    fn test_axis_labels() {
        assert_eq!(axis_labels(0.0, 10.0), vec!["0", "5", "10"]);
    }
}
