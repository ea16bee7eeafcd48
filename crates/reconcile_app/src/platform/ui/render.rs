use reconcile_core::{
    AppViewModel, DownloadAffordance, FilteredView, GlobalView, ListEntry, Notice,
    ProgressStatus, ProgressView, QueryValidationView, SessionState, Severity,
};

const BAR_WIDTH: usize = 20;

/// Text for one redraw, split so the shell can skip unchanged parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub status: Vec<String>,
    pub body: Vec<String>,
    pub notices: Vec<String>,
}

pub fn render(view: &AppViewModel) -> Frame {
    Frame {
        status: status_lines(view),
        body: body_lines(view),
        notices: view.notices.iter().map(format_notice).collect(),
    }
}

fn status_lines(view: &AppViewModel) -> Vec<String> {
    let session_label = match view.session {
        SessionState::Idle => "Idle",
        SessionState::Submitting => "Processing",
        SessionState::Succeeded => "Processed",
        SessionState::Failed => "Failed",
        SessionState::Cancelled => "Cancelled",
    };
    let file_label = |name: &Option<String>| name.clone().unwrap_or_else(|| "-".to_string());

    let mut actions = Vec::new();
    if view.can_upload {
        actions.push("upload");
    }
    if view.can_cancel {
        actions.push("cancel");
    }

    let mut lines = vec![format!(
        "Session: {} | Crystal: {} | Query: {}{}",
        session_label,
        file_label(&view.crystal_file),
        file_label(&view.query_file),
        if actions.is_empty() {
            String::new()
        } else {
            format!(" | Ready: {}", actions.join(", "))
        }
    )];
    if let Some(progress) = view.progress {
        lines.push(progress_line(progress));
    }
    if let Some(download) = &view.download {
        lines.push(format!(
            "Downloading {}: {} bytes",
            download.label,
            format_with_commas(download.bytes)
        ));
    }
    lines
}

fn progress_line(progress: ProgressView) -> String {
    let filled = usize::from(progress.percent.min(100)) * BAR_WIDTH / 100;
    let status = match progress.status {
        ProgressStatus::Running => "processing",
        ProgressStatus::Completed => "done",
        ProgressStatus::Failed => "failed",
        ProgressStatus::Cancelled => "cancelled",
    };
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        progress.percent,
        status
    )
}

fn body_lines(view: &AppViewModel) -> Vec<String> {
    let mut lines = match (&view.global, &view.filtered, &view.query_validation) {
        (Some(global), _, _) => global_lines(global),
        (None, Some(filtered), _) => filtered_lines(filtered),
        (None, None, Some(summary)) => query_validation_lines(summary),
        (None, None, None) => {
            vec!["No report yet. Choose both files and type `upload`.".to_string()]
        }
    };

    let selection = &view.selection;
    if selection.professional.is_some() || selection.user.is_some() {
        lines.push(format!(
            "Selected: professional={} user={}",
            selection.professional.as_deref().unwrap_or("-"),
            selection.user.as_deref().unwrap_or("-")
        ));
    }
    lines
}

fn global_lines(global: &GlobalView) -> Vec<String> {
    let mut lines = vec![
        "== General summary ==".to_string(),
        format!(
            "Services (Crystal): {}",
            format_with_commas(global.total_services_crystal)
        ),
        format!(
            "Services (Query): {}",
            format_with_commas(global.total_services_query)
        ),
        format!("Professionals: {}", format_with_commas(global.num_professionals)),
        format!("Users: {}", format_with_commas(global.num_users)),
    ];
    push_counts(&mut lines, "Services by category", &global.services_by_category);
    push_list(&mut lines, "Professionals (prof #n)", &global.professionals);
    push_list(&mut lines, "Users (user #n)", &global.users);
    lines
}

fn filtered_lines(filtered: &FilteredView) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", filtered.title)];
    if let Some(total) = filtered.total_services {
        lines.push(format!("Total services: {}", format_with_commas(total)));
    }
    if let Some(total) = filtered.total_users {
        lines.push(format!("Total users: {}", format_with_commas(total)));
    }
    push_download(&mut lines, filtered.download.as_ref());
    push_counts(&mut lines, "Services by category", &filtered.services_by_category);
    push_counts(&mut lines, "Detailed services", &filtered.detailed_services);
    lines.push("Type `back` to return to the summary.".to_string());
    lines
}

fn query_validation_lines(summary: &QueryValidationView) -> Vec<String> {
    let mut lines = vec![
        "== User validation (Query) ==".to_string(),
        format!("Users in Query: {}", format_with_commas(summary.total_users)),
        format!("Also in Crystal: {}", format_with_commas(summary.users_in_crystal)),
        format!(
            "Only in Query: {}",
            format_with_commas(summary.users_only_in_query)
        ),
    ];
    push_download(&mut lines, summary.download.as_ref());
    lines.push("Type `back` to return to the summary.".to_string());
    lines
}

fn push_download(lines: &mut Vec<String>, download: Option<&DownloadAffordance>) {
    if let Some(download) = download {
        let label = download.file_name.as_deref().unwrap_or(&download.link);
        lines.push(format!("Report file: {label} (type `download`)"));
    }
}

fn push_counts(lines: &mut Vec<String>, heading: &str, counts: &[(String, u64)]) {
    if counts.is_empty() {
        return;
    }
    lines.push(format!("{heading}:"));
    lines.extend(
        counts
            .iter()
            .map(|(name, count)| format!("  {name}: {}", format_with_commas(*count))),
    );
}

fn push_list(lines: &mut Vec<String>, heading: &str, entries: &[ListEntry]) {
    lines.push(format!("{heading}:"));
    if entries.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("  #{} {}", i + 1, entry.display)),
    );
}

fn format_notice(notice: &Notice) -> String {
    let tag = match notice.severity {
        Severity::Info => "INFO",
        Severity::Success => "OK",
        Severity::Warning => "WARN",
        Severity::Error => "ERROR",
    };
    match notice.kind {
        Some(kind) => format!("[{tag}] ({kind}) {}", notice.message),
        None => format!("[{tag}] {}", notice.message),
    }
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
