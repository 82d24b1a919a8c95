//! Public pages and capability-gated admin sections.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::CurrentAccess;
use crate::shell::{NavShell, Section};

/// Section card on the home page.
#[derive(Debug, Clone)]
pub struct SectionCard {
    pub title: &'static str,
    pub description: &'static str,
    pub href: String,
}

impl From<Section> for SectionCard {
    fn from(section: Section) -> Self {
        Self {
            title: section.title(),
            description: section.description(),
            href: format!("/{}", section.slug()),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub shell: NavShell,
    pub sections: Vec<SectionCard>,
}

/// Public section page template.
#[derive(Template, WebTemplate)]
#[template(path = "section.html")]
pub struct SectionTemplate {
    pub shell: NavShell,
    pub title: &'static str,
    pub description: &'static str,
    /// Link to the admin page when the user may manage the section.
    pub manage_href: Option<String>,
}

/// Admin section page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/section.html")]
pub struct AdminSectionTemplate {
    pub shell: NavShell,
    pub title: &'static str,
    pub role_label: String,
}

/// Home page handler.
#[instrument(skip(access))]
pub async fn home(access: CurrentAccess) -> HomeTemplate {
    HomeTemplate {
        shell: NavShell::build(&access.state, "/"),
        sections: Section::ALL.into_iter().map(SectionCard::from).collect(),
    }
}

fn section_page(section: Section, access: &CurrentAccess) -> SectionTemplate {
    let path = format!("/{}", section.slug());
    SectionTemplate {
        shell: NavShell::build(&access.state, &path),
        title: section.title(),
        description: section.description(),
        manage_href: section
            .can_manage(&access.capabilities())
            .then(|| format!("/admin/{}", section.slug())),
    }
}

/// Places page handler.
#[instrument(skip(access))]
pub async fn places(access: CurrentAccess) -> SectionTemplate {
    section_page(Section::Places, &access)
}

/// Events page handler.
#[instrument(skip(access))]
pub async fn events(access: CurrentAccess) -> SectionTemplate {
    section_page(Section::Events, &access)
}

/// Services page handler.
#[instrument(skip(access))]
pub async fn services(access: CurrentAccess) -> SectionTemplate {
    section_page(Section::Services, &access)
}

/// Admin section handler; requires the section's manage capability.
#[instrument(skip(access))]
pub async fn admin_section(access: CurrentAccess, Path(slug): Path<String>) -> Response {
    let Some(section) = Section::from_slug(&slug) else {
        return AppError::NotFound(format!("section {slug}")).into_response();
    };

    let path = format!("/admin/{}", section.slug());
    if let Err(rejection) = access.require(section.can_manage(&access.capabilities()), &path) {
        return rejection.into_response();
    }

    AdminSectionTemplate {
        shell: NavShell::build(&access.state, &path),
        title: section.title(),
        role_label: access
            .state
            .role
            .map(|r| r.label().to_string())
            .unwrap_or_default(),
    }
    .into_response()
}
