use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn render_error<B: Backend>(frame: &mut Frame<B>, size: Rect, error: &str) {
    let popup_area = centered_rect(60, 25, size);

    let error_msg = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(error),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().title("Error").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(error_msg, popup_area);
}

pub fn render_message<B: Backend>(frame: &mut Frame<B>, size: Rect, title: &str, lines: Vec<Spans>) {
    let popup_area = centered_rect(60, 40, size);

    let popup = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// Single line text prompt, e.g. a file path.
pub fn render_input<B: Backend>(frame: &mut Frame<B>, size: Rect, title: &str, label: &str, value: &str) {
    let popup_area = centered_rect(70, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(label),
        Spans::from(format!("{}|", value)),
        Spans::from(""),
        Spans::from("<Enter> Confirm  <Esc> Cancel"),
    ])
    .block(Block::default().title(title.to_string()).borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}
