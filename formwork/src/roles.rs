// roles.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, marker::PhantomData};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::auth::{AuthError, AuthUser};
use crate::site::Site;

// ---- TRAIT ----
pub trait BitRole: Copy + IntoEnumIterator + Debug + 'static {
    fn as_usize(self) -> usize;
}

// ---- PERMISSION CHECK ----
pub const fn has_permission(mask: usize, role: usize) -> bool {
    if role >= usize::BITS as usize {
        return false;
    }
    mask & (1 << role) != 0
}

// ---- FORMATTING ----
pub fn format_roles<R: BitRole>(mask: usize) -> Vec<String> {
    let mut roles = R::iter()
        .filter(|r| has_permission(mask, r.as_usize()))
        .map(|r| format!("{:?}", r))
        .collect::<Vec<_>>();
    roles.sort();
    roles
}

// ---- ROLES ----
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[repr(usize)]
pub enum Role {
    Admin = 0,
    #[default]
    User = 1,
}

impl Role {
    pub const fn bit(self) -> usize {
        1 << (self as usize)
    }
}

impl BitRole for Role {
    fn as_usize(self) -> usize {
        self as usize
    }
}

// ---- EXTRACTOR ----
/// Authenticated user whose role is in `MASK`.
pub struct Permit<const MASK: usize, R: BitRole = Role>(pub AuthUser, PhantomData<R>);

impl<const MASK: usize, R: BitRole> Permit<MASK, R> {
    pub fn describe() -> String {
        format_roles::<R>(MASK).join(", ")
    }

    pub fn into_user(self) -> AuthUser {
        self.0
    }
}

impl<const MASK: usize, R: BitRole> std::ops::Deref for Permit<MASK, R> {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.0
    }
}

impl<const MASK: usize, R: BitRole> FromRequestParts<Site> for Permit<MASK, R> {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, site: &Site) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, site).await?;

        if !has_permission(MASK, user.role.as_usize()) {
            tracing::debug!(
                user_id = %user.id,
                role = %user.role,
                allowed = %Self::describe(),
                "role not permitted"
            );
            return Err(AuthError::Forbidden);
        }

        Ok(Permit(user, PhantomData))
    }
}

// ---- MACRO ----
#[macro_export]
macro_rules! permit {
    ($($role:ident)|+ $(,)?) => {
        $crate::roles::Permit::<{
            0 $(| $crate::roles::Role::$role.bit())+
        }, $crate::roles::Role>
    };
}

pub type AdminOnly = permit!(Admin);
