use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use portal_core::{
    update, AppState, AppViewModel, DraftField, Msg, TransferStatus, WizardKind,
};
use portal_engine::EngineConfig;
use portal_logging::portal_warn;

use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::session::{default_state_dir, SessionStore};

pub fn run_app() {
    logging::initialize(LogDestination::Both);

    let state_dir = default_state_dir();
    let store = SessionStore::new(state_dir.clone());
    let restored = store.load();

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();

    let config = EngineConfig::default_with_download_dir(state_dir.join("downloads"));
    let user_id = std::env::var("PORTAL_USER_ID").unwrap_or_else(|_| "local-user".to_string());
    let runner = EffectRunner::new(config, msg_tx.clone(), store, user_id.clone());

    if let Some(session) = restored {
        runner.restore_session(&session);
        let _ = msg_tx.send(Msg::SessionRestored { session });
    }

    // Background tick to throttle rendering and UI updates.
    {
        let msg_tx = msg_tx.clone();
        thread::spawn(move || {
            let interval = Duration::from_millis(75);
            while msg_tx.send(Msg::Tick).is_ok() {
                thread::sleep(interval);
            }
        });
    }

    let quit = Arc::new(AtomicBool::new(false));
    spawn_console(msg_tx, user_id, quit.clone());

    let mut state = AppState::new();
    while let Ok(msg) = msg_rx.recv() {
        if quit.load(Ordering::Relaxed) {
            break;
        }
        let (next, effects) = update(std::mem::take(&mut state), msg);
        state = next;
        runner.enqueue(effects);
        if state.consume_dirty() {
            render(&state.view());
        }
    }
}

fn spawn_console(msg_tx: mpsc::Sender<Msg>, user_id: String, quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() == "quit" {
                quit.store(true, Ordering::Relaxed);
                let _ = msg_tx.send(Msg::NoOp);
                break;
            }
            match parse_command(&line, &user_id) {
                Some(msg) => {
                    if msg_tx.send(msg).is_err() {
                        break;
                    }
                }
                None => portal_warn!("unrecognized command: {}", line),
            }
        }
    });
}

/// Maps one console line onto a core message.
fn parse_command(line: &str, user_id: &str) -> Option<Msg> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let rest = |skip: usize| -> String {
        line.split_whitespace()
            .skip(skip)
            .collect::<Vec<_>>()
            .join(" ")
    };

    Some(match command {
        "login" => Msg::AdminLoginSubmitted {
            username: parts.next()?.to_string(),
            password: parts.next()?.to_string(),
        },
        "logout" => Msg::LogoutClicked,
        "jobs" => Msg::BrowserOpened,
        "filter" => match parts.next()? {
            "text" => Msg::FilterTextChanged(rest(2)),
            "loc" => Msg::FilterLocationChanged(rest(2)),
            "type" => {
                let value = rest(2);
                Msg::FilterTypeChanged((value != "-").then_some(value))
            }
            "salary" => Msg::FilterMinSalaryChanged(parts.next().and_then(|v| v.parse().ok())),
            "days" => Msg::FilterPostedWithinChanged(parts.next().and_then(|v| v.parse().ok())),
            _ => return None,
        },
        "select" => Msg::JobSelected {
            job_id: parts.next()?.to_string(),
        },
        "save" => Msg::SaveToggled {
            job_id: parts.next()?.to_string(),
        },
        "apply" => Msg::ApplyToggled {
            job_id: parts.next()?.to_string(),
        },
        "wizard" => Msg::WizardOpened {
            kind: match parts.next()? {
                "job" => WizardKind::JobPosting,
                "profile" => WizardKind::ProfileCompletion,
                _ => return None,
            },
            prefill: None,
            owner: user_id.to_string(),
        },
        "set" => Msg::FieldEdited {
            field: draft_field(parts.next()?)?,
            value: rest(2),
        },
        "skill+" => Msg::SkillAdded(rest(1)),
        "skill-" => Msg::SkillRemoved(rest(1)),
        "photo" => {
            let name = parts.next()?.to_string();
            let data = std::fs::read(&name).ok()?;
            Msg::PhotoPicked {
                size_bytes: data.len() as u64,
                name,
                data,
            }
        }
        "next" => Msg::NextClicked,
        "back" => Msg::BackClicked,
        "submit" => Msg::SubmitClicked,
        "close" => Msg::WizardClosed,
        "overlay" => match parts.next() {
            Some("close") => Msg::OverlayClosed,
            _ => Msg::OverlayOpened,
        },
        "chat" => Msg::ChatMessageSent {
            recipient: parts.next()?.to_string(),
            body: rest(2),
        },
        "drive" => match parts.next() {
            None => Msg::DriveOpened,
            Some("up") => {
                let name = parts.next()?.to_string();
                let data = std::fs::read(&name).ok()?;
                let mime_type = mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .to_string();
                Msg::DriveUploadPicked {
                    name,
                    mime_type,
                    data,
                }
            }
            Some("dl") => Msg::DriveDownloadClicked {
                file_id: parts.next()?.to_string(),
                name: parts.next()?.to_string(),
            },
            Some("rm") => Msg::DriveDeleteClicked {
                file_id: parts.next()?.to_string(),
                name: parts.next()?.to_string(),
            },
            Some("mkdir") => Msg::DriveFolderSubmitted { name: rest(2) },
            Some("connect") => Msg::DriveConnectClicked,
            Some("off") => Msg::DriveDisconnectClicked,
            Some(_) => return None,
        },
        "dismiss" => Msg::NoticeDismissed,
        _ => return None,
    })
}

fn draft_field(name: &str) -> Option<DraftField> {
    Some(match name {
        "title" => DraftField::Title,
        "type" => DraftField::EmploymentType,
        "description" => DraftField::Description,
        "link" => DraftField::ExternalLink,
        "name" => DraftField::FullName,
        "phone" => DraftField::Phone,
        "role" => DraftField::Role,
        "location" => DraftField::Location,
        "bio" => DraftField::Bio,
        _ => return None,
    })
}

fn render(view: &AppViewModel) {
    if let Some(notice) = &view.notice {
        println!("! {notice}");
    }
    if let Some(wizard) = &view.wizard {
        if wizard.completed {
            println!("wizard {:?}: completed", wizard.kind);
        } else {
            println!(
                "wizard {:?}: step {}/{}{}{}",
                wizard.kind,
                wizard.step,
                wizard.step_count,
                if wizard.is_submitting {
                    " (submitting)"
                } else {
                    ""
                },
                if wizard.job_limit_reached {
                    " [posting limit reached]"
                } else {
                    ""
                },
            );
            for (field, reason) in &wizard.errors {
                println!("  {}: {}", field.as_str(), reason);
            }
            if let Some(failure) = &wizard.submit_failure {
                println!("  submit failed: {failure}");
            }
        }
    }
    for job in &view.jobs {
        println!(
            "{} {} | {} | {} | {}{}{}  match {}%",
            if job.selected { ">" } else { " " },
            job.job_id,
            job.title,
            job.employment_type,
            job.location,
            if job.saved { " [saved]" } else { "" },
            if job.applied { " [applied]" } else { "" },
            job.skill_match_percent,
        );
    }
    if !view.online.is_empty() || view.unread_total > 0 {
        println!(
            "online: {} | unread: {}",
            view.online.join(", "),
            view.unread_total
        );
    }
    for file in &view.drive_files {
        println!(
            "  {} {} ({})",
            if file.is_folder { "dir " } else { "file" },
            file.name,
            file.id
        );
    }
    for transfer in &view.transfers {
        let status = match transfer.status {
            TransferStatus::Running => format!("{}%", transfer.progress),
            TransferStatus::Done => "done".to_string(),
            TransferStatus::Error => "error".to_string(),
        };
        println!("  [{:?}] {} {}", transfer.kind, transfer.label, status);
    }
}
