use crate::{registry::Snapshot, timestamp::Timestamp};
use askama::Template;
use derive_more::Constructor;

#[derive(Template, Constructor)]
#[template(path = "home.html")]
pub(crate) struct Home<'a> {
    snapshot: &'a Snapshot,
    now: Timestamp,
}

#[derive(Debug, Constructor, Template)]
#[template(path = "error.html")]
pub(crate) struct Error {
    code: warp::http::StatusCode,
}
