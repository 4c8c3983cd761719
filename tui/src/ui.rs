use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app_state::{App, Focus};

/// Render the three selection panels, the module details and the status bar.
pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(8),
                Constraint::Length(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(22),
                Constraint::Percentage(33),
                Constraint::Percentage(45),
            ]
            .as_ref(),
        )
        .split(rows[0]);

    let categories: Vec<ListItem> = app
        .categories()
        .iter()
        .map(|category| ListItem::new(category.as_str()))
        .collect();
    render_list(
        f,
        panels[0],
        "Categories",
        categories,
        app.category_index(),
        app.focus() == Focus::Categories,
    );

    let modules: Vec<ListItem> = app
        .current_modules()
        .into_iter()
        .map(|module| ListItem::new(module.name.clone()))
        .collect();
    render_list(
        f,
        panels[1],
        "Modules",
        modules,
        app.module_index(),
        app.focus() == Focus::Modules,
    );

    let actions: Vec<ListItem> = app
        .current_actions()
        .into_iter()
        .map(|(name, args)| {
            ListItem::new(Line::from(vec![
                Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(args, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    render_list(
        f,
        panels[2],
        "Actions",
        actions,
        app.action_index(),
        app.focus() == Focus::Actions,
    );

    let details = match app.current_module() {
        Some(module) => vec![
            Line::from(vec![
                Span::styled(module.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("  ({})", module.command)),
            ]),
            Line::from(module.description.clone()),
        ],
        None => vec![Line::from("No module selected.")],
    };
    let details = Paragraph::new(details)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Details").borders(Borders::ALL));
    f.render_widget(details, rows[1]);

    let status = match app.editing() {
        Some(buffer) => Line::from(vec![
            "Args: ".yellow().bold(),
            Span::raw(format!("{buffer}_")),
        ]),
        None => status_line(app.status()),
    };
    let help = " Tab/Shift-Tab focus | arrows move | Enter run | e edit args | q quit ";
    let status = Paragraph::new(status).block(Block::default().title(help).borders(Borders::ALL));
    f.render_widget(status, rows[2]);
}

fn render_list(
    f: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem>,
    selected: usize,
    focused: bool,
) {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let empty = items.is_empty();
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !empty {
        state.select(Some(selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// Colour the `[TAG]` of a module's final status line.
fn status_line(status: &str) -> Line<'_> {
    for (label, color) in [
        ("[OK]", Color::Green),
        ("[ERROR]", Color::Red),
        ("[WARN]", Color::Yellow),
        ("[INFO]", Color::Cyan),
    ] {
        if let Some(idx) = status.find(label) {
            let (head, tail) = status.split_at(idx);
            let (tag, rest) = tail.split_at(label.len());
            return Line::from(vec![
                Span::raw(head),
                Span::styled(tag, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(rest),
            ]);
        }
    }
    Line::from(status)
}
