//! User management route handlers (general admin only).
//!
//! Every action mutates the session's [`AdminUsersScreen`] and redirects back
//! to the listing, which renders the screen's current snapshot. Failures the
//! screen shows itself (directory errors, partial deletes, empty selection)
//! redirect too; busy and stale-confirmation conflicts answer 409.

use std::sync::Arc;

use amooora_core::{AccessStatus, Role, UserId};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdminGeneral;
use crate::screens::{
    AdminUsersScreen, DeleteConfirmation, DraftField, ScreenError, ScreenPhase, ScreenRow,
};
use crate::shell::NavShell;
use crate::state::AppState;

const LISTING: &str = "/admin/users";

/// One `<option>` of a select.
#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Row view for templates.
#[derive(Debug, Clone)]
pub struct UserRowView {
    pub id: String,
    pub label: String,
    pub email: String,
    pub role_label: &'static str,
    pub status_label: &'static str,
    pub role_options: Vec<ChoiceView>,
    pub status_options: Vec<ChoiceView>,
    pub updated_at: String,
    pub dirty: bool,
    pub selected: bool,
    pub is_self: bool,
    pub saving: bool,
}

impl From<&ScreenRow> for UserRowView {
    fn from(row: &ScreenRow) -> Self {
        Self {
            id: row.record.id.to_string(),
            label: row.record.label().to_string(),
            email: row.record.email.clone().unwrap_or_default(),
            role_label: row.record.role.label(),
            status_label: row.record.status.label(),
            role_options: Role::ALL
                .into_iter()
                .map(|role| ChoiceView {
                    value: role.as_str(),
                    label: role.label(),
                    selected: role == row.draft.role,
                })
                .collect(),
            status_options: AccessStatus::ALL
                .into_iter()
                .map(|status| ChoiceView {
                    value: status.as_str(),
                    label: status.label(),
                    selected: status == row.draft.status,
                })
                .collect(),
            updated_at: row
                .record
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            dirty: row.dirty,
            selected: row.selected,
            is_self: row.is_self,
            saving: row.saving,
        }
    }
}

/// User management page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub shell: NavShell,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub query: String,
    pub rows: Vec<UserRowView>,
    pub total: usize,
    pub selected_count: usize,
    pub all_selected: bool,
    pub busy: bool,
    pub deleting: bool,
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub shell: NavShell,
    pub prompt: String,
    pub count: usize,
    pub ids: String,
    pub labels: Vec<String>,
}

/// Query parameters for the listing.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Draft fields submitted with a row.
#[derive(Debug, Deserialize)]
pub struct DraftForm {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Confirmed delete form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    /// Comma-separated user IDs, exactly as confirmed.
    pub ids: String,
}

async fn screen(state: &AppState, admin: &RequireAdminGeneral) -> Arc<AdminUsersScreen> {
    state
        .screens()
        .users_screen(&admin.session_key, &admin.admin_id, &admin.access.browser)
        .await
}

/// Redirect back to the listing unless the error needs its own response.
fn back_to_listing<T>(result: Result<T, ScreenError>) -> Result<Redirect, AppError> {
    match result {
        Ok(_)
        | Err(
            ScreenError::Directory(_)
            | ScreenError::PartialDelete { .. }
            | ScreenError::EmptySelection,
        ) => Ok(Redirect::to(LISTING)),
        Err(e) => Err(e.into()),
    }
}

fn apply_draft(screen: &AdminUsersScreen, id: &UserId, form: &DraftForm) -> Result<(), AppError> {
    if let Some(role) = form.role.as_deref() {
        let role = role.parse::<Role>().map_err(AppError::BadRequest)?;
        screen.edit_draft(id, DraftField::Role(role));
    }
    if let Some(status) = form.status.as_deref() {
        let status = status.parse::<AccessStatus>().map_err(AppError::BadRequest)?;
        screen.edit_draft(id, DraftField::Status(status));
    }
    Ok(())
}

/// User management page.
#[instrument(skip(admin, state, query))]
pub async fn index(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> UsersTemplate {
    let screen = screen(&state, &admin).await;
    if let Some(q) = query.q.as_deref() {
        screen.search(q.trim());
    }

    let snapshot = screen.snapshot();
    UsersTemplate {
        shell: NavShell::build(&admin.access.state, LISTING),
        loading: snapshot.phase == ScreenPhase::Loading,
        error: snapshot.phase.error().map(str::to_string),
        notice: snapshot.notice,
        query: snapshot.query,
        rows: snapshot.rows.iter().map(UserRowView::from).collect(),
        total: snapshot.total,
        selected_count: snapshot.selected_count,
        all_selected: snapshot.all_selected,
        busy: snapshot.busy,
        deleting: snapshot.deleting,
    }
}

/// Reload the records.
#[instrument(skip(admin, state))]
pub async fn reload(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let screen = screen(&state, &admin).await;
    back_to_listing(screen.load(&admin.access.browser).await)
}

/// Toggle selection of every visible row.
#[instrument(skip(admin, state))]
pub async fn select_all(admin: RequireAdminGeneral, State(state): State<AppState>) -> Redirect {
    screen(&state, &admin).await.toggle_select_all();
    Redirect::to(LISTING)
}

/// Toggle selection of one row.
#[instrument(skip(admin, state))]
pub async fn select(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Redirect {
    screen(&state, &admin).await.toggle_select(&id);
    Redirect::to(LISTING)
}

/// Edit one row's draft.
#[instrument(skip(admin, state, form))]
pub async fn draft(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Form(form): Form<DraftForm>,
) -> Result<Redirect, AppError> {
    let screen = screen(&state, &admin).await;
    apply_draft(&screen, &id, &form)?;
    Ok(Redirect::to(LISTING))
}

/// Apply the submitted draft and save the row.
#[instrument(skip(admin, state, form))]
pub async fn save(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Form(form): Form<DraftForm>,
) -> Result<Redirect, AppError> {
    let screen = screen(&state, &admin).await;
    apply_draft(&screen, &id, &form)?;
    back_to_listing(screen.save_row(&id, &admin.access.browser).await)
}

/// Confirmation step naming the number of accounts.
#[instrument(skip(admin, state))]
pub async fn confirm_delete_page(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let screen = screen(&state, &admin).await;
    let confirmation = match screen.request_delete() {
        Ok(confirmation) => confirmation,
        Err(e) => return back_to_listing::<()>(Err(e)).map(IntoResponse::into_response),
    };

    let records = screen.records();
    let labels = confirmation
        .ids()
        .iter()
        .map(|id| {
            records
                .iter()
                .find(|r| &r.id == id)
                .map_or_else(|| id.to_string(), |r| r.label().to_string())
        })
        .collect();

    Ok(ConfirmDeleteTemplate {
        shell: NavShell::build(&admin.access.state, LISTING),
        prompt: confirmation.prompt(),
        count: confirmation.count(),
        ids: confirmation
            .ids()
            .iter()
            .map(UserId::as_str)
            .collect::<Vec<_>>()
            .join(","),
        labels,
    }
    .into_response())
}

/// Delete the confirmed accounts.
#[instrument(skip(admin, state, form))]
pub async fn delete(
    admin: RequireAdminGeneral,
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, AppError> {
    let confirmation = DeleteConfirmation::new(
        form.ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::from),
    );
    let screen = screen(&state, &admin).await;
    back_to_listing(
        screen
            .confirm_delete(&confirmation, &admin.access.browser)
            .await,
    )
}
