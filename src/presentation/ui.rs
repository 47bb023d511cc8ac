use crate::application::{App, AppMode, DriveDetail};
use crate::domain::{Center, DriveDashboard, DriveField, Polygon, WizardStep};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let banner_height = if app.wizard.banner().is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_steps(f, app, chunks[1]);
    if let Some(banner) = app.wizard.banner() {
        render_banner(f, banner, chunks[2]);
    }
    match app.step() {
        WizardStep::Details => render_fields(f, app, chunks[3]),
        WizardStep::Area => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[3]);
            render_fields(f, app, columns[0]);
            let draft = app.wizard.form().draft();
            render_area_preview(f, draft.polygon.as_ref(), draft.center, columns[1]);
        }
        WizardStep::Review => render_review(f, app, chunks[3]),
    }
    render_status_bar(f, app, chunks[4]);

    match app.mode {
        AppMode::Help => render_help_popup(f, app.help_scroll),
        AppMode::Detail => {
            if let Some(detail) = &app.detail {
                render_detail_popup(f, detail);
            }
        }
        AppMode::Normal | AppMode::Editing => {}
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let busy = if app.wizard.is_submitting() { " | Submitting..." } else { "" };
    let header = Paragraph::new(format!(
        "PawHub - Create Drive | Step {}/{}: {}{}",
        app.step().index() + 1,
        WizardStep::ALL.len(),
        app.step().label(),
        busy
    ))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_steps(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = WizardStep::ALL
        .iter()
        .map(|step| Line::from(format!("{}. {}", step.index() + 1, step.label())))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Steps"))
        .select(app.step().index())
        .style(Style::default().fg(Color::Yellow))
        .highlight_style(Style::default().bg(Color::LightBlue).fg(Color::Black));
    f.render_widget(tabs, area);
}

fn render_banner(f: &mut Frame, message: &str, area: Rect) {
    let banner = Paragraph::new(format!("{} (Esc to dismiss)", message))
        .block(Block::default().borders(Borders::ALL).title("Error"))
        .style(Style::default().fg(Color::Red));
    f.render_widget(banner, area);
}

fn render_fields(f: &mut Frame, app: &App, area: Rect) {
    let draft = app.wizard.form().draft();
    let errors = app.wizard.form().errors();

    let rows: Vec<Row> = app
        .step()
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let selected = index == app.selected_field;
            let value = if selected && app.mode == AppMode::Editing {
                format!("{}_", app.input)
            } else {
                draft.field_text(*field)
            };
            let error = errors.get(*field).unwrap_or("");

            let label_style = if selected {
                Style::default().bg(Color::LightBlue).fg(Color::Black)
            } else if is_required(*field) {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value_style = if selected && app.mode == AppMode::Editing {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(field.label()).style(label_style),
                Cell::from(value).style(value_style),
                Cell::from(error).style(Style::default().fg(Color::Red)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Percentage(45),
            Constraint::Percentage(55),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Drive {}", app.step().label())),
    )
    .column_spacing(1);

    f.render_widget(table, area);
}

fn is_required(field: DriveField) -> bool {
    !matches!(
        field,
        DriveField::Description | DriveField::RangeKm | DriveField::CommunityForming
    )
}

/// `([min_x, max_x], [min_y, max_y])` framing the polygon and center with a margin.
pub fn preview_bounds(polygon: Option<&Polygon>, center: Option<Center>) -> ([f64; 2], [f64; 2]) {
    let mut points: Vec<[f64; 2]> = polygon.map(|p| p.outer_ring().to_vec()).unwrap_or_default();
    if let Some(center) = center {
        points.push([center.lng, center.lat]);
    }
    if points.is_empty() {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    }

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), [x, y]| {
            (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
        },
    );
    let margin_x = ((max_x - min_x) * 0.1).max(0.001);
    let margin_y = ((max_y - min_y) * 0.1).max(0.001);
    (
        [min_x - margin_x, max_x + margin_x],
        [min_y - margin_y, max_y + margin_y],
    )
}

fn render_area_preview(f: &mut Frame, polygon: Option<&Polygon>, center: Option<Center>, area: Rect) {
    let (x_bounds, y_bounds) = preview_bounds(polygon, center);
    let title = match polygon {
        Some(polygon) => format!("Area ({} vertices)", polygon.vertex_count()),
        None => "Area (nothing drawn)".to_string(),
    };

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            if let Some(polygon) = polygon {
                for ring in polygon.coordinates() {
                    for edge in ring.windows(2) {
                        ctx.draw(&CanvasLine::new(
                            edge[0][0],
                            edge[0][1],
                            edge[1][0],
                            edge[1][1],
                            Color::Green,
                        ));
                    }
                }
            }
            if let Some(center) = center {
                ctx.draw(&Points {
                    coords: &[(center.lng, center.lat)],
                    color: Color::Red,
                });
            }
        });
    f.render_widget(canvas, area);
}

fn render_review(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let draft = app.wizard.form().draft();
    let mut lines: Vec<Line> = WizardStep::Details
        .fields()
        .iter()
        .chain(WizardStep::Area.fields())
        .map(|field| {
            let value = draft.field_text(*field);
            Line::from(vec![
                Span::styled(
                    format!("{:<20}", field.label()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(if value.is_empty() { "-".to_string() } else { value }),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        if app.wizard.is_submitting() {
            "Creating drive..."
        } else {
            "Ctrl+G: create drive | Ctrl+Y: copy payload JSON"
        },
        Style::default().add_modifier(Modifier::BOLD),
    )));

    let summary = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Review"))
        .wrap(Wrap { trim: false });
    f.render_widget(summary, columns[0]);
    render_area_preview(f, draft.polygon.as_ref(), draft.center, columns[1]);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let input_text = match app.mode {
        AppMode::Normal => {
            if let Some(ref status) = app.status_message {
                status.clone()
            } else {
                "Enter: edit | Ctrl+N: next | Ctrl+P: back | Ctrl+G: create | Ctrl+X: discard | F1/?: help | q: quit".to_string()
            }
        }
        AppMode::Editing => match app.selected_field() {
            Some(DriveField::Polygon) => {
                "GeoJSON or @file, empty deletes the area (Enter to save, Esc to cancel)".to_string()
            }
            Some(DriveField::Center) => "lat,lng (Enter to save, Esc to cancel)".to_string(),
            _ => "Enter to save, Esc to cancel".to_string(),
        },
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
        AppMode::Detail => "Esc/Enter: back to the wizard".to_string(),
    };

    let status = Paragraph::new(input_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal => Style::default(),
            AppMode::Editing => Style::default().fg(Color::Green),
            AppMode::Help => Style::default().fg(Color::Cyan),
            AppMode::Detail => Style::default().fg(Color::Magenta),
        });
    f.render_widget(status, area);
}

fn popup_area(area: Rect) -> Rect {
    Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    }
}

fn render_detail_popup(f: &mut Frame, detail: &DriveDetail) {
    let area = popup_area(f.area());
    f.render_widget(Clear, area);

    let (title, lines) = match detail {
        DriveDetail::Loading { route, .. } => {
            (route.clone(), vec!["Loading drive dashboard...".to_string()])
        }
        DriveDetail::Unavailable { route, reason } => (
            route.clone(),
            vec![format!("Drive created, but its dashboard is unavailable: {}", reason)],
        ),
        DriveDetail::Loaded(dashboard) => (dashboard.mission_details.route(), dashboard_lines(dashboard)),
    };

    let popup = Paragraph::new(lines.join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Drive {}", title))
                .style(Style::default().fg(Color::Magenta)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn dashboard_lines(dashboard: &DriveDashboard) -> Vec<String> {
    let drive = &dashboard.mission_details;
    let details = &drive.details;
    let kpis = &dashboard.kpis;
    let mut lines = vec![
        format!("Title:              {}", details.title),
        format!("Date:               {}", details.date),
        format!("City / Area:        {} / {}", details.city, details.area),
        format!("Center:             {}", details.center),
        format!(
            "Range (km):         {}",
            details.range_km.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
        ),
        format!(
            "Community forming:  {}",
            if details.community_forming { "yes" } else { "no" }
        ),
        format!("Area vertices:      {}", details.polygon.vertex_count()),
    ];
    if let Some(created_at) = &drive.created_at {
        lines.push(format!("Created at:         {}", created_at));
    }

    lines.push(String::new());
    lines.push("=== DRIVE STATISTICS ===".to_string());
    lines.push(format!("Animals covered:    {}", kpis.animals_covered));
    lines.push(format!("Sterilized:         {}", kpis.tagged_sterilized));
    lines.push(format!("Area (km²):         {:.2}", kpis.area_coverage_km2));

    lines.push(String::new());
    lines.push(format!("=== VOLUNTEERS ({}) ===", dashboard.volunteers.len()));
    if dashboard.volunteers.is_empty() {
        lines.push("No volunteers yet".to_string());
    }
    for volunteer in dashboard.leaderboard().into_iter().take(5) {
        lines.push(format!("{:<20}{} points", volunteer.name, volunteer.points));
    }

    if !details.description.is_empty() {
        lines.push(String::new());
        lines.push(details.description.clone());
    }
    lines
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let popup_area = popup_area(f.area());
    f.render_widget(Clear, popup_area);

    let help_text = get_help_text();
    let help_lines: Vec<&str> = help_text.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("PawHub Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

fn get_help_text() -> String {
    r#"PAWHUB DRIVE WIZARD

=== STEPS ===
1. Details     Title, description, date, range, city, area, community forming
2. Area        Map center and the drive area polygon
3. Review      Check everything, then create the drive

Moving forward checks the current step; fields with problems are marked
in red. Going back is always allowed, except while a submission runs.
A created drive opens its dashboard: KPIs and the volunteer leaderboard.

=== FIELDS ===
Title           Required
Date            Required, YYYY-MM-DD
Range (km)      Optional, zero or greater; empty clears it
City / Area     Required
Community       Enter toggles yes/no
Center          lat,lng (for example 19.06,72.83)
Polygon         GeoJSON Polygon geometry or Feature, or @path/to/file.json
                Open rings are closed automatically; empty input deletes

=== KEYS ===
↑↓ / Tab        Move between fields
Enter / F2      Edit the selected field
Ctrl+N          Next step
Ctrl+P          Previous step
Ctrl+G          Create the drive (Review step)
Ctrl+Y          Copy the payload JSON to the clipboard
Ctrl+X          Discard the draft (also abandons a running submission)
Esc             Dismiss the error banner
F1 or ?         Show this help
q               Quit

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window"#
        .to_string()
}
