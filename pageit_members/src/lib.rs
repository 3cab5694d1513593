#![forbid(unsafe_code)]
//! Member/Team sample domain on top of `pageit`.
//!
//! [`repository::MemberRepository`] holds the member finders, paging, bulk
//! update, fetch joins and transaction-scoped reads; [`http`] serves pages of
//! [`dto::MemberDto`] over axum.

pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod http;
pub mod logging;
pub mod repository;

pub use dto::{MemberDto, PageBody};
pub use entity::{Member, MemberWithTeam, Team};
pub use repository::{MemberRepository, MemberRepositoryCustom, TeamRepository};
