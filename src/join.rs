use log::{error, info};
use serde::Deserialize;

use crate::api::ChatBackend;
use crate::models::JoinRequest;
use crate::pages::{layout, Notice};

/// Fields posted by the join form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinForm {
    #[serde(default)]
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(String),
    MissingName,
    Failed,
}

pub async fn submit(backend: &dyn ChatBackend, form: JoinForm) -> JoinOutcome {
    if form.name.is_empty() {
        return JoinOutcome::MissingName;
    }

    let request = JoinRequest {
        name: form.name,
        alias: form.alias,
    };
    match backend.join(&request).await {
        Ok(token) => {
            info!("{} joined the chat", request.name);
            JoinOutcome::Joined(token)
        }
        Err(e) => {
            error!("Join failed for {}: {}", request.name, e);
            JoinOutcome::Failed
        }
    }
}

pub fn render(notice: Option<&Notice>) -> String {
    let body = r#"<div class="screen screen-center">
<form id="join-form" class="card" method="post" action="/login">
<div><h5>Join</h5></div>
<div>
<label for="inputName">Insert a name</label>
<input id="inputName" name="name" placeholder="john doe" required autocomplete="off">
<small class="required-hint">required!</small>
</div>
<div>
<label for="alias">Insert a alias</label>
<input id="alias" name="alias" placeholder="johnny" autocomplete="off">
</div>
<div class="actions">
<button type="submit" class="button button-wide">Start</button>
</div>
</form>
</div>"#;
    layout("Join", body, notice)
}
