mod record;
mod timewindow;

pub mod webhook;

pub use record::*;
pub use timewindow::*;

pub type GithubHandle = String;
