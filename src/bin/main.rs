#[macro_use]
extern crate rocket;

use dotenv::dotenv;
use rocket::form::Form;
use rocket::serde::json::{json, Value};
use rocket::State;
use standup_bot::config::Config;
use standup_bot::handle;
use standup_bot::report;
use standup_bot::signature::{SigningSecret, SlackRequest};
use standup_bot::slack::SlackClient;
use standup_bot::{SlackActionPayload, SlackActionResponse, SlackSlashEvent, StatusStore};
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

struct ReportDir(PathBuf);

/// Runs a blocking store call off the async workers.
async fn run_blocking<T, E, F>(f: F) -> Result<T, BoxError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Error + Send + Sync + 'static,
{
    Ok(rocket::tokio::task::spawn_blocking(f).await??)
}

fn ephemeral(text: String) -> Value {
    json!({ "response_type": "ephemeral", "text": text })
}

#[get("/")]
fn index() -> &'static str {
    "Hello, world!"
}

#[post("/standup", data = "<request>")]
async fn command_standup(request: SlackRequest, store: &State<StatusStore>) -> Value {
    let event: SlackSlashEvent = match Form::parse(&request.0) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "unreadable slash command");
            return ephemeral(handle::get_error_copy(&e));
        }
    };

    let store = store.inner().clone();
    let user_id = event.user_id.clone();
    match run_blocking(move || handle::standup(&user_id, &store)).await {
        Ok(prompt) => prompt,
        Err(e) => {
            error!(user_id = %event.user_id, error = %e, "could not load today's standup");
            ephemeral(handle::get_error_copy(&e))
        }
    }
}

#[post("/actions", data = "<request>")]
fn post_action(
    request: SlackRequest,
    store: &State<StatusStore>,
    slack: &State<SlackClient>,
) -> &'static str {
    let payload: SlackActionPayload = match Form::<SlackActionResponse>::parse(&request.0)
        .map_err(|e| e.to_string())
        .and_then(|form| serde_json::from_str(&form.payload).map_err(|e| e.to_string()))
    {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "unreadable interaction payload");
            return "";
        }
    };

    let store = store.inner().clone();
    let slack = slack.inner().clone();

    rocket::tokio::spawn(async move {
        let user_id = payload.user.id.clone();
        let response_url = payload.response_url.clone();

        let result = match run_blocking(move || handle::action(&payload, &store)).await {
            Ok(Some(record)) => match handle::announcement(&record) {
                Some((channel, text, blocks)) => slack
                    .post_message(&channel, &text, blocks)
                    .await
                    .map_err(BoxError::from),
                None => Ok(()),
            },
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!(user_id = %user_id, error = %e, "failed to handle standup action");
            if let Some(url) = response_url {
                if let Err(e) = slack.respond(&url, &handle::get_error_copy(&e)).await {
                    error!(error = %e, "could not tell the user about it either");
                }
            }
        }
    });

    ""
}

#[post("/generate-report", data = "<request>")]
fn command_generate_report(
    request: SlackRequest,
    store: &State<StatusStore>,
    slack: &State<SlackClient>,
    report_dir: &State<ReportDir>,
) -> Value {
    let event: SlackSlashEvent = match Form::parse(&request.0) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "unreadable slash command");
            return ephemeral(handle::get_error_copy(&e));
        }
    };

    let text = event.text.clone().unwrap_or_default();
    let wanted = match handle::parse_report_command(&text, &event.user_id) {
        Ok(wanted) => wanted,
        Err(copy) => return ephemeral(copy),
    };
    let copy = handle::get_report_started_copy(&wanted);

    let store = store.inner().clone();
    let slack = slack.inner().clone();
    let dir = report_dir.0.clone();

    rocket::tokio::spawn(async move {
        let title = format!(
            "Standup report for {} ({} to {})",
            wanted.user_id, wanted.start, wanted.end
        );
        let exported = run_blocking(move || {
            report::export_report(&store, &wanted.user_id, wanted.start, wanted.end, &dir)
        })
        .await;

        let result = match exported {
            Ok(report) => {
                let uploaded = slack
                    .upload_file(&event.channel_id, &report.path, &report.file_name, &title)
                    .await
                    .map_err(BoxError::from);
                // the file only exists to be uploaded
                if let Err(e) = rocket::tokio::fs::remove_file(&report.path).await {
                    warn!(path = %report.path.display(), error = %e, "could not remove report file");
                }
                uploaded
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!(user_id = %event.user_id, error = %e, "report failed");
            if let Err(e) = slack
                .respond(&event.response_url, &handle::get_error_copy(&e))
                .await
            {
                error!(error = %e, "could not tell the user about it either");
            }
        }
    });

    ephemeral(copy)
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = StatusStore::connect(
        &config.database.url,
        config.database.pool_size,
        config.database.timeout,
    )?;
    store.create_tables()?;

    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", "0.0.0.0"));

    info!(port = config.port, report_dir = %config.report_dir.display(), "starting standup bot");

    let server = rocket::custom(figment)
        .manage(store)
        .manage(SlackClient::new(config.bot_token)?)
        .manage(SigningSecret(config.signing_secret))
        .manage(ReportDir(config.report_dir))
        .mount(
            "/",
            routes![index, command_standup, post_action, command_generate_report],
        );

    rocket::execute(server.launch())?;
    info!("standup bot stopped");
    Ok(())
}
