use super::app::App;
use dragonball_admin::{DomainController, Origin, Record, RecordFilter, View};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table},
};

/// Header line for a listing: paging or active filters, plus load state.
fn status_line<T: Record>(listing: &DomainController<T>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    if listing.pagination_visible() {
        spans.push(Span::raw(format!(
            "Page {} of {}",
            listing.page(),
            listing.total_pages()
        )));
    } else {
        let filters: Vec<String> = listing
            .filters()
            .describe()
            .into_iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect();
        spans.push(Span::styled(
            format!("Filtered: {}", filters.join(", ")),
            Style::default().fg(Color::Magenta),
        ));
    }
    if listing.is_loading() {
        spans.push(Span::styled(
            "  Loading...",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(error) = listing.error() {
        spans.push(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    spans
}

fn listing_table<T: Record>(listing: &DomainController<T>, title: &str) -> Table<'static> {
    let header = Row::new(
        T::columns()
            .iter()
            .map(|column| Cell::from(*column))
            .chain(std::iter::once(Cell::from("Origin"))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let entries = listing.entries();
    let empty = entries.is_empty();
    let rows: Vec<Row> = entries
        .into_iter()
        .map(|entry| {
            let origin = entry.origin();
            let style = match origin {
                Origin::Local => Style::default().fg(Color::Green),
                Origin::Remote => Style::default(),
            };
            Row::new(
                entry
                    .record()
                    .cells()
                    .into_iter()
                    .map(Cell::from)
                    .chain(std::iter::once(Cell::from(origin.to_string()))),
            )
            .style(style)
        })
        .collect();

    let title = if empty && !listing.is_loading() {
        format!(" {} (no {}s found) ", title, T::LABEL)
    } else {
        format!(" {} ", title)
    };

    let mut widths = vec![Constraint::Length(10)];
    widths.extend((1..T::columns().len()).map(|_| Constraint::Fill(1)));
    widths.push(Constraint::Length(8));

    Table::new(rows, widths).header(header).block(
        Block::default().borders(Borders::ALL).title(title),
    )
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),  // Header
                Constraint::Min(5),     // Listing grows
                Constraint::Length(10), // Output
                Constraint::Length(3),  // Input
            ]
            .as_ref(),
        )
        .split(f.area());

    // Header
    let view = app.console.view();
    let who = match app.console.session.user() {
        Some(user) => format!("{} ({})", user.username, user.role),
        None => "signed out".to_string(),
    };
    let mut spans = vec![
        Span::styled(
            format!("{} ", view.title()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {} | ", who)),
    ];
    spans.extend(match view {
        View::Characters => status_line(&app.console.characters),
        View::Planets => status_line(&app.console.planets),
    });
    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Dragon Ball Admin "));
    f.render_widget(header, chunks[0]);

    // Listing
    if app.console.session.is_authenticated() {
        let table = match view {
            View::Characters => listing_table(&app.console.characters, view.title()),
            View::Planets => listing_table(&app.console.planets, view.title()),
        };
        f.render_widget(table, chunks[1]);
    } else {
        let prompt = Paragraph::new("Sign in to see the listings: login <username> <password>")
            .block(Block::default().borders(Borders::ALL).title(" Login "));
        f.render_widget(prompt, chunks[1]);
    }

    // Output Area: only the last messages that fit
    let inner_height = chunks[2].height.saturating_sub(2) as usize;
    let skip_count = app.messages.len().saturating_sub(inner_height);

    let messages: Vec<ListItem> = app
        .messages
        .iter()
        .skip(skip_count)
        .map(|line| ListItem::new(line.clone()))
        .collect();

    let messages_panel = List::new(messages)
        .block(Block::default().borders(Borders::ALL).title(" Output "))
        .style(Style::default().fg(Color::White));

    f.render_widget(messages_panel, chunks[2]);

    // Input Area
    let textarea_rect = chunks[3];
    f.render_widget(&app.textarea, textarea_rect);

    // Autocomplete Popup, drawn above the single-line input
    if app.popup_open && !app.suggestions.is_empty() {
        let col = app.textarea.cursor().1 as u16;

        let width = 30;
        let height = 6.min(app.suggestions.len() as u16 + 2);
        let screen = f.area();

        let area = Rect::new(
            (textarea_rect.x + col + 1).min(screen.width.saturating_sub(width)),
            textarea_rect.y.saturating_sub(height),
            width.min(screen.width),
            height,
        );

        f.render_widget(Clear, area);

        let items: Vec<ListItem> = app
            .suggestions
            .iter()
            .map(|s| ListItem::new(s.as_str()))
            .collect();

        let mut state = ListState::default();
        state.select(Some(app.suggestion_index));

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Suggestions"))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol(">> ");

        f.render_stateful_widget(list, area, &mut state);
    }
}
