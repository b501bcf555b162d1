use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use std::sync::Arc;

use super::session::{GateRejection, Session};
use crate::{
    models::{Role, User},
    AppState,
};

/// A role a handler requires.
pub trait Capability: Send + Sync + 'static {
    const ROLE: Role;
}

#[derive(Debug, Clone, Copy)]
pub struct StudentAccess;

#[derive(Debug, Clone, Copy)]
pub struct TeacherAccess;

impl Capability for StudentAccess {
    const ROLE: Role = Role::Student;
}

impl Capability for TeacherAccess {
    const ROLE: Role = Role::Teacher;
}

/// Admits only sessions whose current role grants `C`. Anyone else is
/// redirected to their own landing page, or to login when signed out.
#[derive(Debug, Clone)]
pub struct Authorized<C: Capability> {
    pub session: Session,
    _capability: PhantomData<C>,
}

impl<C: Capability> Authorized<C> {
    pub fn user(&self) -> &User {
        &self.session.user
    }

    pub fn username(&self) -> &str {
        &self.session.user.username
    }
}

pub type Student = Authorized<StudentAccess>;
pub type Teacher = Authorized<TeacherAccess>;

/// The single role check applied before every gated handler.
pub fn check_capability<C: Capability>(session: &Session) -> Result<(), GateRejection> {
    if session.role == C::ROLE {
        Ok(())
    } else {
        tracing::debug!(
            username = %session.user.username,
            role = %session.role,
            required = %C::ROLE,
            "Role mismatch, redirecting"
        );
        Err(GateRejection::WrongRole(session.role))
    }
}

impl<C: Capability> FromRequestParts<Arc<AppState>> for Authorized<C> {
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        check_capability::<C>(&session)?;
        Ok(Authorized {
            session,
            _capability: PhantomData,
        })
    }
}
