use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use reconcile_core::{
    filter_list, update, AppState, EntityKind, FileHandle, FileRole, Msg, ProcessedReport,
};
use reconcile_engine::EngineHandle;
use reconcile_logging::{reconcile_debug, reconcile_info};

use super::config::{Cli, Config};
use super::effects::EffectRunner;
use super::ui::commands::{parse_command, selection_msg, Input, HELP};
use super::ui::render::{render, Frame};

/// Throttles rendering and drives teardown timers between inputs.
const TICK: Duration = Duration::from_millis(75);

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(&cli).context("loading configuration")?;
    reconcile_logging::initialize(
        config.log_destination()?,
        LevelFilter::Info,
        &reconcile_logging::default_log_path(),
    );
    let engine = EngineHandle::new(config.engine_config()?).context("starting engine runtime")?;
    reconcile_info!("Engine started against {}", config.base_url);

    let mut app = App::new(
        AppState::with_limits(config.validation_limits()),
        EffectRunner::new(engine, config.progress_grace()),
    );

    if let Some(path) = cli.crystal {
        app.handle_input(Input::Choose {
            role: FileRole::Crystal,
            path: Some(path),
        });
    }
    if let Some(path) = cli.query {
        app.handle_input(Input::Choose {
            role: FileRole::Query,
            path: Some(path),
        });
    }
    println!("{HELP}");
    app.dispatch_msg(Msg::Tick);
    app.render_if_dirty(true);

    let (input_tx, input_rx) = mpsc::channel::<Input>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(parse_command(&line)).is_err() {
                return;
            }
        }
        let _ = input_tx.send(Input::Quit);
    });

    loop {
        match input_rx.recv_timeout(TICK) {
            Ok(Input::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(input) => app.handle_input(input),
            Err(RecvTimeoutError::Timeout) => app.dispatch_msg(Msg::Tick),
        }
        for msg in app.effects.poll() {
            app.dispatch_msg(msg);
        }
        app.render_if_dirty(false);
    }

    reconcile_info!("Leaving");
    Ok(())
}

struct App {
    state: AppState,
    effects: EffectRunner,
    last_frame: Frame,
}

impl App {
    fn new(state: AppState, effects: EffectRunner) -> Self {
        Self {
            state,
            effects,
            last_frame: Frame::default(),
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Msg(msg) => self.dispatch_msg(msg),
            Input::Choose { role, path } => match choose_file(role, path) {
                Ok(msg) => self.dispatch_msg(msg),
                Err(message) => println!("{message}"),
            },
            Input::Pick { kind, index } => match pick(self.state.report(), kind, index) {
                Some(key) => self.dispatch_msg(selection_msg(kind, Some(key))),
                None => println!("There is no {kind} #{index} in the current list."),
            },
            Input::Help => println!("{HELP}"),
            Input::Invalid(message) => println!("{message}"),
            Input::Quit => {}
        }
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        if !effects.is_empty() {
            reconcile_debug!("Dispatching {} effect(s)", effects.len());
            self.effects.enqueue(effects);
        }
    }

    fn render_if_dirty(&mut self, force: bool) {
        if !self.state.consume_dirty() && !force {
            return;
        }
        let view = self.state.view();
        let frame = render(&view);
        let mut out = io::stdout().lock();

        if force || frame.body != self.last_frame.body {
            for line in &frame.body {
                let _ = writeln!(out, "{line}");
            }
        }
        if force || frame.status != self.last_frame.status {
            for line in &frame.status {
                let _ = writeln!(out, "{line}");
            }
        }
        for line in &frame.notices {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
        drop(out);

        let had_notices = !frame.notices.is_empty();
        self.last_frame = frame;
        if had_notices {
            // Notices are printed once; clearing them needs no redraw.
            self.dispatch_msg(Msg::NoticesAcknowledged);
            self.state.consume_dirty();
        }
    }
}

fn choose_file(role: FileRole, path: Option<PathBuf>) -> Result<Msg, String> {
    let handle = match path {
        Some(path) => {
            let meta = fs::metadata(&path)
                .map_err(|err| format!("Cannot use {}: {err}", path.display()))?;
            if !meta.is_file() {
                return Err(format!("{} is not a file.", path.display()));
            }
            Some(FileHandle::new(path, meta.len()))
        }
        None => None,
    };
    Ok(match role {
        FileRole::Crystal => Msg::CrystalChosen(handle),
        FileRole::Query => Msg::QueryChosen(handle),
    })
}

/// Resolves a 1-based position in the list the summary shows. Works from any
/// screen once a report is loaded.
fn pick(report: Option<&ProcessedReport>, kind: EntityKind, index: usize) -> Option<String> {
    let report = report?;
    let names = match kind {
        EntityKind::Professional => &report.professionals,
        EntityKind::User => &report.users,
    };
    filter_list(names)
        .into_iter()
        .nth(index.checked_sub(1)?)
        .map(|entry| entry.key)
}
